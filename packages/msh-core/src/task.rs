//! Task definitions
//!
//! Every task is either one of the [`crate::builtin`] sequences or a `xxx.toml` file under
//! `resources/tasks`, and deserializes into a [`Task`].
//!
//! A [`Task`] is made of [`TaskStep`]s, each wrapping an [`Action`] with some timing
//! attributes. [`Action`] is only the data, running it is done through [`TaskRecipe`].

use std::time::Duration;

use anyhow::{bail, Context};
use color_print::cprintln;
use log::info;
use msh_controller::{
    Button, Direction, Gamepad, Keyboard, WindowManager, DEFAULT_PRESS, DEFAULT_TAP,
};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{Executor, TaskEvt, TaskRecipe};

const FOCUS_SETTLE: Duration = Duration::from_millis(50);
const SOFT_RESET_HOLD: Duration = Duration::from_millis(100);

/// Actions are what a step in a task file can do
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Run another task referenced by name
    ByName(String),
    Press {
        button: Button,
        /// Defaults to 0.2s
        hold_sec: Option<f64>,
    },
    Tilt {
        direction: Direction,
        /// Defaults to a 0.05s tap
        hold_sec: Option<f64>,
    },
    Wait(f64),
    /// Send the soft reset hotkey to every emulator window
    SoftReset,
    /// Open the party menu and the summary of the pokemon in `slot` (1-6)
    Summary { slot: u8 },
}

impl Action {
    pub fn by_name(name: impl AsRef<str>) -> Self {
        Self::ByName(name.as_ref().to_string())
    }

    pub fn press(button: Button) -> Self {
        Self::Press {
            button,
            hold_sec: None,
        }
    }

    pub fn tilt(direction: Direction) -> Self {
        Self::Tilt {
            direction,
            hold_sec: None,
        }
    }

    pub fn hold(direction: Direction, sec: f64) -> Self {
        Self::Tilt {
            direction,
            hold_sec: Some(sec),
        }
    }
}

/// Seconds from a task file, negative and non finite values are rejected
pub fn secs(sec: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(sec)
        .map_err(|err| anyhow::anyhow!("invalid duration {sec}s: {err}"))
}

impl Action {
    /// Check the timings and the party slot without running anything
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            Action::Press { hold_sec, .. } | Action::Tilt { hold_sec, .. } => {
                hold_sec.map(secs).transpose()?;
            }
            Action::Wait(sec) => {
                secs(*sec)?;
            }
            Action::Summary { slot } => {
                summary_moves(*slot)?;
            }
            Action::ByName(_) | Action::SoftReset => {}
        }
        Ok(())
    }
}

/// The stick moves leading from the first party slot to `slot`
pub fn summary_moves(slot: u8) -> anyhow::Result<&'static [Direction]> {
    use Direction::*;
    Ok(match slot {
        1 => &[],
        2 => &[Right],
        3 => &[Down],
        4 => &[Right, Down],
        5 => &[Left, Up],
        6 => &[Left, Up, Right],
        _ => bail!("party slot must be within 1..=6, got {slot}"),
    })
}

impl<T: Executor> TaskRecipe<T> for Action {
    type Res = ();
    fn run(&self, runner: &T) -> anyhow::Result<Self::Res> {
        let pad = runner.gamepad();
        match self {
            Action::ByName(name) => {
                let task = runner
                    .get_task(name)
                    .ok_or_else(|| anyhow::anyhow!("failed to get task by name: {:?}", name))?;
                task.run(runner)
            }
            Action::Press { button, hold_sec } => pad.press(
                *button,
                hold_sec.map(secs).transpose()?.unwrap_or(DEFAULT_PRESS),
            ),
            Action::Tilt {
                direction,
                hold_sec,
            } => pad.hold(
                *direction,
                hold_sec.map(secs).transpose()?.unwrap_or(DEFAULT_TAP),
            ),
            Action::Wait(sec) => {
                runner.wait(secs(*sec)?);
                Ok(())
            }
            Action::SoftReset => {
                let desktop = runner.desktop();
                for window in runner.windows() {
                    desktop.focus_window(window)?;
                    runner.wait(FOCUS_SETTLE);
                    desktop.press_chord(runner.soft_reset_keys(), SOFT_RESET_HOLD)?;
                    runner.wait(FOCUS_SETTLE);
                }
                Ok(())
            }
            Action::Summary { slot } => {
                let moves = summary_moves(*slot)?;
                pad.press(Button::X, DEFAULT_PRESS)?;
                runner.wait(Duration::from_millis(50));
                pad.tap(Direction::Down)?;
                runner.wait(Duration::from_millis(50));
                pad.press(Button::A, DEFAULT_PRESS)?;
                runner.wait(Duration::from_millis(1250));
                for direction in moves {
                    pad.tap(*direction)?;
                    runner.wait(Duration::from_millis(100));
                }
                pad.press(Button::A, DEFAULT_PRESS)?;
                runner.wait(Duration::from_millis(250));
                pad.press(Button::A, DEFAULT_PRESS)
            }
        }
    }
}

/// A complete [`Task`] is made of several [`TaskStep`]s
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub desc: Option<String>,
    /// Whether finishing this task counts as one encounter when it is run as a hunt
    pub encounter: Option<bool>,
    pub steps: Vec<TaskStep>,
}

impl Task {
    pub fn from_steps(steps: Vec<TaskStep>) -> Self {
        Self {
            name: "unnamed".to_string(),
            desc: None,
            encounter: None,
            steps,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_desc(mut self, desc: &str) -> Self {
        self.desc = Some(desc.to_string());
        self
    }

    pub fn as_hunt(mut self) -> Self {
        self.encounter = Some(true);
        self
    }

    pub fn is_hunt(&self) -> bool {
        self.encounter.unwrap_or(false)
    }

    /// Total scripted time of this task, resolving nested tasks through `lookup`
    ///
    /// Soft resets are counted for a single window.
    pub fn duration(&self, lookup: &dyn Fn(&str) -> Option<Task>) -> anyhow::Result<Duration> {
        let mut total = Duration::ZERO;
        for step in &self.steps {
            let once = match &step.action {
                Action::ByName(name) => lookup(name)
                    .ok_or_else(|| anyhow::anyhow!("failed to get task by name: {:?}", name))?
                    .duration(lookup)?,
                Action::Press { hold_sec, .. } => {
                    hold_sec.map(secs).transpose()?.unwrap_or(DEFAULT_PRESS)
                }
                Action::Tilt { hold_sec, .. } => {
                    hold_sec.map(secs).transpose()?.unwrap_or(DEFAULT_TAP)
                }
                Action::Wait(sec) => secs(*sec)?,
                Action::SoftReset => FOCUS_SETTLE * 2 + SOFT_RESET_HOLD,
                Action::Summary { slot } => {
                    let moves = summary_moves(*slot)?.len() as u32;
                    DEFAULT_PRESS * 4
                        + DEFAULT_TAP
                        + Duration::from_millis(50 + 50 + 1250 + 250)
                        + (DEFAULT_TAP + Duration::from_millis(100)) * moves
                }
            };
            let times = step.repeat.unwrap_or(0) + 1;
            total += step.delay()? + (once + step.wait()?) * times;
        }
        Ok(total)
    }

    /// Reject steps whose timings or party slots cannot run
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            step.validate()
                .with_context(|| format!("task {} step {}", self.name, i))?;
        }
        Ok(())
    }
}

impl<T: Executor> TaskRecipe<T> for Task {
    type Res = ();
    fn run(&self, runner: &T) -> anyhow::Result<Self::Res> {
        info!("[Task<{}>] running...", self.name);
        for (i, step) in self.steps.iter().enumerate() {
            runner.emit_task_evt(TaskEvt::ExecStat {
                task: self.name.clone(),
                step: step.clone(),
                cur: i,
                total: self.steps.len(),
            });
            cprintln!(
                "<m><strong>[Task]</strong></m>: executing task {}({}/{}): {:?}",
                self.name,
                i,
                self.steps.len(),
                step.action
            );
            let res = step.run(runner);
            if res.is_err() && !step.skip_if_failed.unwrap_or(false) {
                return res;
            }
        }
        Ok(())
    }
}

/// TaskStep wraps an [`Action`] with some extra attributes
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    /// Delay before this step starts
    pub delay_sec: Option<f64>,
    /// Keep going if this step fails instead of aborting the task
    pub skip_if_failed: Option<bool>,
    /// Extra executions after the first one
    pub repeat: Option<u32>,
    /// Wait after every execution of the action
    pub wait_sec: Option<f64>,
    pub action: Action,
}

impl From<Action> for TaskStep {
    fn from(action: Action) -> Self {
        Self::from_action(action)
    }
}

impl TaskStep {
    pub fn from_action(action: Action) -> Self {
        Self {
            delay_sec: None,
            skip_if_failed: None,
            repeat: None,
            wait_sec: None,
            action,
        }
    }

    pub fn with_delay(mut self, sec: f64) -> Self {
        self.delay_sec = Some(sec);
        self
    }

    pub fn with_wait(mut self, sec: f64) -> Self {
        self.wait_sec = Some(sec);
        self
    }

    pub fn skip_if_failed(mut self) -> Self {
        self.skip_if_failed = Some(true);
        self
    }

    pub fn with_repeat(mut self, times: u32) -> Self {
        self.repeat = Some(times);
        self
    }

    /// Run the action `n` times in total
    pub fn times(self, n: u32) -> Self {
        self.with_repeat(n.saturating_sub(1))
    }

    fn delay(&self) -> anyhow::Result<Duration> {
        secs(self.delay_sec.unwrap_or(0.0))
    }

    fn wait(&self) -> anyhow::Result<Duration> {
        secs(self.wait_sec.unwrap_or(0.0))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.delay()?;
        self.wait()?;
        self.action.validate()
    }
}

impl<T: Executor> TaskRecipe<T> for TaskStep {
    type Res = ();
    fn run(&self, runner: &T) -> anyhow::Result<Self::Res> {
        runner.wait(self.delay()?);

        let wait = self.wait()?;
        let exec = || {
            let res = self.action.run(runner);
            runner.wait(wait);
            res
        };

        let total = self.repeat.unwrap_or(0);
        // first run
        let mut res = exec();
        for i in 0..total {
            // Fail fast for repeat
            if res.is_err() {
                break;
            }
            if let Action::ByName(name) = &self.action {
                runner.emit_task_evt(TaskEvt::Repeat {
                    task: name.clone(),
                    cur: i + 2,
                    total: total + 1,
                });
            }
            res = exec()
        }
        res
    }
}
