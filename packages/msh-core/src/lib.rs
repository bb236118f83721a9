//! msh-core holds everything the automation controller does on top of the device layer:
//! the task model and its runner, the builtin hunting sequences, task resources,
//! the emulator launcher and the files shared with the encounter counter.

use std::time::Duration;

use msh_controller::{Desktop, Gamepad, WindowInfo};

pub mod builtin;
pub mod comm;
pub mod config;
pub mod hunter;
pub mod launcher;
pub mod resource;
pub mod task;

pub use hunter::{Hunter, RunOutcome};
pub use task::{Action, Task, TaskStep};

/// Something that can be run by an [`Executor`]
pub trait TaskRecipe<T: Executor> {
    type Res;
    fn run(&self, runner: &T) -> anyhow::Result<Self::Res>;
}

/// The environment a [`Task`] runs in
pub trait Executor {
    fn gamepad(&self) -> &dyn Gamepad;

    fn desktop(&self) -> &dyn Desktop;

    /// Emulator windows found when the run started
    fn windows(&self) -> &[WindowInfo];

    fn get_task(&self, name: &str) -> Option<&Task>;

    /// Keys that make up the emulator's soft reset hotkey
    fn soft_reset_keys(&self) -> &[char];

    fn emit_task_evt(&self, _evt: TaskEvt) {}

    fn wait(&self, duration: Duration) {
        self.gamepad().wait(duration)
    }
}

/// Events emitted while a task runs
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TaskEvt {
    /// Human readable status line, the same one the CLI prints
    Status(String),
    ExecStat {
        task: String,
        step: TaskStep,
        cur: usize,
        total: usize,
    },
    Repeat {
        task: String,
        cur: u32,
        total: u32,
    },
    EncounterSignaled,
}
