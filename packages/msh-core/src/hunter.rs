//! [`Hunter`] runs tasks against the emulators and keeps the encounter counter informed.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use color_print::cprintln;
use log::{error, info, warn};
use msh_controller::{Button, Desktop, Direction, Gamepad, WindowInfo, WindowManager};

use crate::{
    comm::CommFiles,
    config::Config,
    launcher::{self, Launcher},
    resource::Resource,
    task::Task,
    Executor, TaskEvt, TaskRecipe,
};

/// What [`Hunter::run_task`] ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Another task was still running, nothing was done
    Busy,
    /// No emulator window was found, nothing was pressed
    NoWindows,
}

pub struct Hunter {
    gamepad: Arc<dyn Gamepad + Send + Sync>,
    desktop: Arc<dyn Desktop + Send + Sync>,
    resource: Arc<Resource>,
    comm: CommFiles,
    launcher: Mutex<Launcher>,
    window_title: String,
    soft_reset_keys: Vec<char>,
    emulator_count: AtomicU32,
    busy: AtomicBool,
    fast_forward: AtomicBool,

    task_evt_tx: async_channel::Sender<TaskEvt>,
    pub task_evt_rx: async_channel::Receiver<TaskEvt>,
}

impl Debug for Hunter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hunter")
    }
}

/// Clears the busy flag when the run ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A single task run, bound to the windows found when it started
struct Session<'a> {
    hunter: &'a Hunter,
    windows: Vec<WindowInfo>,
}

impl Executor for Session<'_> {
    fn gamepad(&self) -> &dyn Gamepad {
        self.hunter.gamepad.as_ref()
    }

    fn desktop(&self) -> &dyn Desktop {
        self.hunter.desktop.as_ref()
    }

    fn windows(&self) -> &[WindowInfo] {
        &self.windows
    }

    fn get_task(&self, name: &str) -> Option<&Task> {
        self.hunter.resource.get_task(name)
    }

    fn soft_reset_keys(&self) -> &[char] {
        &self.hunter.soft_reset_keys
    }

    fn emit_task_evt(&self, evt: TaskEvt) {
        self.hunter.emit_task_evt(evt)
    }
}

impl Hunter {
    pub fn new(
        config: &Config,
        gamepad: Arc<dyn Gamepad + Send + Sync>,
        desktop: Arc<dyn Desktop + Send + Sync>,
        resource: Arc<Resource>,
    ) -> Self {
        let (task_evt_tx, task_evt_rx) = async_channel::unbounded();
        let comm = config.comm.clone();
        if let Err(err) = comm.init(config.emulator.count) {
            error!("failed to initialize communication files: {err:#}");
        }
        Self {
            gamepad,
            desktop,
            resource,
            comm,
            launcher: Mutex::new(Launcher::new(config.emulator.clone())),
            window_title: config.emulator.window_title.clone(),
            soft_reset_keys: config.input.soft_reset_keys.clone(),
            emulator_count: AtomicU32::new(config.emulator.count),
            busy: AtomicBool::new(false),
            fast_forward: AtomicBool::new(false),
            task_evt_tx,
            task_evt_rx,
        }
    }

    pub fn with_launcher(self, launcher: Launcher) -> Self {
        *self.launcher() = launcher;
        self
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn emulator_count(&self) -> u32 {
        self.emulator_count.load(Ordering::SeqCst)
    }

    pub fn set_emulator_count(&self, count: u32) {
        self.emulator_count.store(count, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    fn launcher(&self) -> MutexGuard<'_, Launcher> {
        self.launcher.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit_task_evt(&self, evt: TaskEvt) {
        if let TaskEvt::Status(status) = &evt {
            cprintln!("<g><strong>[Hunter]</strong></g>: {}", status);
        }
        // unbounded, only fails once every receiver is gone
        let _ = self.task_evt_tx.try_send(evt);
    }

    fn status(&self, status: impl Into<String>) {
        self.emit_task_evt(TaskEvt::Status(status.into()));
    }

    fn write_emulator_count(&self) {
        if let Err(err) = self.comm.write_emulator_count(self.emulator_count()) {
            error!("failed to update emulator count file: {err:#}");
        }
    }

    /// The emulator windows currently open, at most [`Hunter::emulator_count`] of them
    pub fn find_windows(&self) -> anyhow::Result<Vec<WindowInfo>> {
        self.desktop
            .find_windows(&self.window_title, self.emulator_count() as usize)
    }

    /// Run the task named `name` on every emulator
    ///
    /// Hunts signal one encounter to the counter when they complete.
    pub fn run_task(&self, name: impl AsRef<str>) -> anyhow::Result<RunOutcome> {
        let name = name.as_ref();
        let Some(_guard) = self.try_begin() else {
            warn!("a task is already running, ignoring {name}");
            return Ok(RunOutcome::Busy);
        };
        let task = self
            .resource
            .get_task(name)
            .ok_or_else(|| anyhow::anyhow!("failed to get task by name: {:?}", name))?;

        self.write_emulator_count();
        let windows = self.find_windows()?;
        if windows.is_empty() {
            warn!("No {} windows found", self.window_title);
            self.status(format!("No {} windows found", self.window_title));
            return Ok(RunOutcome::NoWindows);
        }

        self.status(format!(
            "Starting {} for {} emulators...",
            task.name,
            windows.len()
        ));
        let session = Session {
            hunter: self,
            windows,
        };
        task.run(&session)?;

        if task.is_hunt() {
            match self.comm.signal_encounter() {
                Ok(()) => self.emit_task_evt(TaskEvt::EncounterSignaled),
                Err(err) => error!("failed to update encounter trigger file: {err:#}"),
            }
        }
        self.status(format!("{} completed", task.name));
        Ok(RunOutcome::Completed)
    }

    pub fn press(&self, button: Button, hold: Duration) -> anyhow::Result<()> {
        self.gamepad.press(button, hold)
    }

    pub fn tilt(&self, direction: Direction, hold: Duration) -> anyhow::Result<()> {
        self.gamepad.hold(direction, hold)
    }

    pub fn fast_forward(&self) -> bool {
        self.fast_forward.load(Ordering::SeqCst)
    }

    pub fn set_fast_forward(&self, on: bool) -> anyhow::Result<()> {
        self.gamepad.set_button(Button::FastForward, on)?;
        self.fast_forward.store(on, Ordering::SeqCst);
        self.status(format!("Fast Forward {}", if on { "ON" } else { "OFF" }));
        Ok(())
    }

    pub fn toggle_fast_forward(&self) -> anyhow::Result<bool> {
        let on = !self.fast_forward();
        self.set_fast_forward(on)?;
        Ok(on)
    }

    /// Open [`Hunter::emulator_count`] emulators in `rows` rows
    pub fn open_emulators(&self, rows: u32) -> anyhow::Result<usize> {
        let count = self.emulator_count();
        self.status(format!("Opening {count} emulators in {rows} rows..."));
        let windows = self.launcher().open(self.desktop.as_ref(), count, rows)?;
        self.write_emulator_count();
        self.status(format!(
            "{count} emulators opened and positioned in {rows} rows"
        ));
        Ok(windows.len())
    }

    /// Tile the emulator windows that are already open, nothing is started
    pub fn arrange_emulators(&self, rows: u32) -> anyhow::Result<usize> {
        let windows = self.find_windows()?;
        let placed = launcher::arrange(
            self.desktop.as_ref(),
            &windows,
            self.emulator_count(),
            rows,
        );
        self.write_emulator_count();
        self.status(format!("{placed} windows positioned in {rows} rows"));
        Ok(placed)
    }

    /// Emulator processes started by [`Hunter::open_emulators`] and not closed since
    pub fn running_emulators(&self) -> usize {
        self.launcher().running()
    }

    pub fn close_emulators(&self) -> anyhow::Result<()> {
        self.status("Closing emulators...");
        self.launcher().close(self.desktop.as_ref())?;
        self.status("All emulators closed");
        Ok(())
    }

    /// Release everything held on the virtual gamepad
    pub fn reset_gamepad(&self) -> anyhow::Result<()> {
        info!("resetting gamepad");
        self.gamepad.reset()?;
        self.fast_forward.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use msh_controller::{recording::InputKind, RecordingController};

    use super::*;
    use crate::{
        launcher::LaunchDelays,
        task::{Action, TaskStep},
    };

    struct Fixture {
        _dir: tempfile::TempDir,
        config: Config,
        controller: Arc<RecordingController>,
        hunter: Hunter,
    }

    fn fixture(windows: usize, extra: Vec<Task>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.comm = CommFiles::in_dir(dir.path());
        config.emulator.count = 4;
        let controller = Arc::new(RecordingController::default().with_windows("melonDS", windows));

        let resource = Arc::new(Resource::builtin().with_tasks(extra));

        let hunter = Hunter::new(&config, controller.clone(), controller.clone(), resource)
            .with_launcher(Launcher::new(config.emulator.clone()).with_delays(LaunchDelays {
                spawn_interval: Duration::ZERO,
                settle: Duration::ZERO,
                close: Duration::ZERO,
            }));
        Fixture {
            _dir: dir,
            config,
            controller,
            hunter,
        }
    }

    fn drain(hunter: &Hunter) -> Vec<TaskEvt> {
        let mut evts = vec![];
        while let Ok(evt) = hunter.task_evt_rx.try_recv() {
            evts.push(evt);
        }
        evts
    }

    #[test]
    fn test_init_comm_files() {
        let f = fixture(1, vec![]);
        assert_eq!(f.config.comm.read_emulator_count(), Some(4));
        assert_eq!(
            fs::read_to_string(&f.config.comm.encounter_trigger).unwrap(),
            "0"
        );
    }

    #[test]
    fn test_run_hunt_signals_encounter() {
        let f = fixture(2, vec![]);
        f.hunter.set_emulator_count(2);
        assert_eq!(
            f.hunter.run_task("simple_reset").unwrap(),
            RunOutcome::Completed
        );
        assert!(!f.hunter.is_busy());
        assert_eq!(f.config.comm.read_emulator_count(), Some(2));
        assert_ne!(
            fs::read_to_string(&f.config.comm.encounter_trigger).unwrap(),
            "0"
        );
        let evts = drain(&f.hunter);
        assert!(evts
            .iter()
            .any(|e| matches!(e, TaskEvt::EncounterSignaled)));

        // both windows got the reset hotkey
        let focused = f
            .controller
            .events()
            .iter()
            .filter(|e| matches!(e.kind, InputKind::Focus(_)))
            .count();
        assert_eq!(focused, 2);
    }

    #[test]
    fn test_helper_does_not_signal() {
        let f = fixture(1, vec![]);
        f.hunter.run_task("bike_lap").unwrap();
        assert_eq!(
            fs::read_to_string(&f.config.comm.encounter_trigger).unwrap(),
            "0"
        );
        assert!(!drain(&f.hunter)
            .iter()
            .any(|e| matches!(e, TaskEvt::EncounterSignaled)));
    }

    #[test]
    fn test_no_windows() {
        let f = fixture(0, vec![]);
        assert_eq!(
            f.hunter.run_task("eevee").unwrap(),
            RunOutcome::NoWindows
        );
        assert!(f.controller.events().is_empty());
        assert!(!f.hunter.is_busy());
    }

    #[test]
    fn test_busy_is_noop() {
        let f = fixture(1, vec![]);
        let guard = f.hunter.try_begin().unwrap();
        assert!(f.hunter.try_begin().is_none());
        assert_eq!(f.hunter.run_task("eevee").unwrap(), RunOutcome::Busy);
        assert!(f.controller.events().is_empty());
        drop(guard);
        assert_eq!(
            f.hunter.run_task("simple_reset").unwrap(),
            RunOutcome::Completed
        );
    }

    #[test]
    fn test_failure_clears_busy() {
        let broken = Task::from_steps(vec![
            Action::press(Button::A).into(),
            TaskStep::from_action(Action::Summary { slot: 9 }),
        ])
        .with_name("broken")
        .as_hunt();
        let f = fixture(1, vec![broken]);
        assert!(f.hunter.run_task("broken").is_err());
        assert!(!f.hunter.is_busy());
        // no encounter for an aborted run
        assert_eq!(
            fs::read_to_string(&f.config.comm.encounter_trigger).unwrap(),
            "0"
        );
        assert!(f.hunter.run_task("unknown").is_err());
        assert!(!f.hunter.is_busy());
    }

    #[test]
    fn test_eevee_timing() {
        let f = fixture(1, vec![]);
        f.hunter.run_task("eevee").unwrap();
        let lookup = |name: &str| f.hunter.resource().get_task(name).cloned();
        let expected = f
            .hunter
            .resource()
            .get_task("eevee")
            .unwrap()
            .duration(&lookup)
            .unwrap();
        assert_eq!(f.controller.elapsed(), expected);
        let pressed = f.controller.pressed_buttons();
        // Start twice while skipping the title screen
        assert_eq!(pressed[..2], [Button::Start, Button::Start]);
        assert_eq!(pressed.last(), Some(&Button::A));
    }

    #[test]
    fn test_bike_lap_repeats() {
        let f = fixture(1, vec![]);
        f.hunter.run_task("primo_slugma_egg").unwrap();
        let repeats = drain(&f.hunter)
            .into_iter()
            .filter(|e| matches!(e, TaskEvt::Repeat { task, .. } if task == "bike_lap"))
            .count();
        assert_eq!(repeats, 33);
    }

    #[test]
    fn test_fast_forward() {
        let f = fixture(1, vec![]);
        assert!(f.hunter.toggle_fast_forward().unwrap());
        assert!(f.hunter.fast_forward());
        assert!(!f.hunter.toggle_fast_forward().unwrap());
        let kinds: Vec<InputKind> = f.controller.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InputKind::Button {
                    button: Button::FastForward,
                    pressed: true
                },
                InputKind::Button {
                    button: Button::FastForward,
                    pressed: false
                },
            ]
        );
    }

    #[test]
    fn test_close_emulators() {
        let f = fixture(3, vec![]);
        f.hunter.close_emulators().unwrap();
        assert!(f.hunter.find_windows().unwrap().is_empty());
        assert_eq!(f.hunter.running_emulators(), 0);
    }

    #[test]
    fn test_arrange_emulators() {
        let f = fixture(3, vec![]);
        f.hunter.set_emulator_count(3);
        assert_eq!(f.hunter.arrange_emulators(1).unwrap(), 3);
        let placed = f
            .controller
            .events()
            .iter()
            .filter(|e| matches!(e.kind, InputKind::Position { .. }))
            .count();
        assert_eq!(placed, 3);
        assert_eq!(f.config.comm.read_emulator_count(), Some(3));
        assert_eq!(f.hunter.running_emulators(), 0);
    }

    #[test]
    fn test_reset_gamepad_releases_fast_forward() {
        let f = fixture(1, vec![]);
        f.hunter.set_fast_forward(true).unwrap();
        f.hunter.reset_gamepad().unwrap();
        let last_ff = f
            .controller
            .events()
            .into_iter()
            .filter_map(|e| match e.kind {
                InputKind::Button {
                    button: Button::FastForward,
                    pressed,
                } => Some(pressed),
                _ => None,
            })
            .last();
        assert_eq!(last_ff, Some(false));
        assert!(!f.hunter.fast_forward());
    }
}
