//! `msh ui`, one [`Hunter`] kept alive behind task buttons and a virtual gamepad.
//!
//! Everything that presses buttons or starts processes runs on a blocking worker, the window
//! only follows [`TaskEvt`]s and the result of the job it started last.

use std::{fmt, sync::Arc};

use iced::{
    widget::{
        button, column, container, horizontal_rule, horizontal_space, row, scrollable, text,
        text_editor, text_input,
    },
    window, Alignment, Element, Length, Subscription, Task,
};
use msh_controller::{Button, Direction, DEFAULT_PRESS, DEFAULT_TAP};
use msh_core::{Hunter, RunOutcome, TaskEvt};
use tracing::{error, info};

pub const MAX_EMULATORS: u32 = 32;
pub const MAX_ROWS: u32 = 4;

/// Blocking work handed to a worker thread
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Run(String),
    Press(Button),
    Tilt(Direction),
    Open,
    Close,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Run(name) => write!(f, "{name}"),
            Job::Press(button) => write!(f, "press {button}"),
            Job::Tilt(direction) => write!(f, "tilt {direction}"),
            Job::Open => write!(f, "open emulators"),
            Job::Close => write!(f, "close emulators"),
        }
    }
}

impl Job {
    /// Run on the calling thread, returns the line to show once it is done
    pub fn execute(&self, hunter: &Hunter, rows: u32, dry_run: bool) -> anyhow::Result<String> {
        Ok(match self {
            Job::Run(name) => match hunter.run_task(name)? {
                RunOutcome::Completed => format!("{name} completed"),
                RunOutcome::Busy => format!("Another task is running, {name} was skipped"),
                RunOutcome::NoWindows => "No emulator windows found".to_string(),
            },
            Job::Press(button) => {
                hunter.press(*button, DEFAULT_PRESS)?;
                format!("Pressed {button}")
            }
            Job::Tilt(direction) => {
                hunter.tilt(*direction, DEFAULT_TAP)?;
                format!("Moved {direction}")
            }
            Job::Open if dry_run => {
                let placed = hunter.arrange_emulators(rows)?;
                format!("{placed} windows positioned in {rows} rows")
            }
            Job::Open => {
                let opened = hunter.open_emulators(rows)?;
                format!("{opened} emulators opened")
            }
            Job::Close => {
                hunter.close_emulators()?;
                "All emulators closed".to_string()
            }
        })
    }
}

pub struct Ui {
    hunter: Arc<Hunter>,
    dry_run: bool,
    rows: u32,
    count_input: String,
    rows_input: String,
    /// `(name, is hunt)` for every task, in resource order
    tasks: Vec<(String, bool)>,
    executing: Option<Job>,
    status: String,
    log_content: text_editor::Content,
}

#[derive(Debug, Clone)]
pub enum Message {
    Start(Job),
    Finished { job: Job, res: Result<String, String> },
    ToggleFastForward,
    CountChanged(String),
    RowsChanged(String),
    TaskEvt(TaskEvt),
    LogEdit(text_editor::Action),
    CloseRequested,
}

/// Keep the digits of `input`, and its value when it lies in `1..=max`
fn parse_bounded(input: &str, max: u32) -> (String, Option<u32>) {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    let value = digits.parse().ok().filter(|n| (1..=max).contains(n));
    (digits, value)
}

impl Ui {
    pub fn new(hunter: Arc<Hunter>, rows: u32, dry_run: bool) -> Self {
        let tasks = hunter
            .resource()
            .tasks()
            .map(|task| (task.name.clone(), task.is_hunt()))
            .collect();
        Self {
            count_input: hunter.emulator_count().to_string(),
            rows_input: rows.to_string(),
            hunter,
            dry_run,
            rows,
            tasks,
            executing: None,
            status: "Ready".to_string(),
            log_content: text_editor::Content::new(),
        }
    }

    fn log(&mut self, s: impl AsRef<str>) {
        self.log_content
            .perform(text_editor::Action::Move(text_editor::Motion::DocumentEnd));
        self.log_content
            .perform(text_editor::Action::Edit(text_editor::Edit::Paste(
                Arc::new(format!("{}\n", s.as_ref())),
            )));
    }

    fn start(&mut self, job: Job) -> Task<Message> {
        if let Some(current) = &self.executing {
            self.status = format!("Busy with {current}, {job} ignored");
            return Task::none();
        }
        info!("starting {job}");
        self.executing = Some(job.clone());

        let (hunter, rows, dry_run) = (self.hunter.clone(), self.rows, self.dry_run);
        let work = job.clone();
        Task::perform(
            async move {
                match tokio::task::spawn_blocking(move || work.execute(&hunter, rows, dry_run))
                    .await
                {
                    Ok(res) => res.map_err(|err| format!("{err:#}")),
                    Err(err) => Err(format!("worker failed: {err}")),
                }
            },
            move |res| Message::Finished {
                job: job.clone(),
                res,
            },
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Start(job) => return self.start(job),
            Message::Finished { job, res } => {
                if self.executing.as_ref() == Some(&job) {
                    self.executing = None;
                }
                match res {
                    Ok(line) => self.status = line,
                    Err(err) => {
                        error!("{job} failed: {err}");
                        self.status = format!("Error: {err}");
                    }
                }
                let line = format!("{job}: {}", self.status);
                self.log(line);
            }
            Message::ToggleFastForward => {
                if let Err(err) = self.hunter.toggle_fast_forward() {
                    error!("failed to toggle fast forward: {err:#}");
                    self.status = format!("Error: {err:#}");
                }
            }
            Message::CountChanged(input) => {
                let (digits, count) = parse_bounded(&input, MAX_EMULATORS);
                if let Some(count) = count {
                    self.hunter.set_emulator_count(count);
                }
                self.count_input = digits;
            }
            Message::RowsChanged(input) => {
                let (digits, rows) = parse_bounded(&input, MAX_ROWS);
                if let Some(rows) = rows {
                    self.rows = rows;
                }
                self.rows_input = digits;
            }
            Message::TaskEvt(evt) => match evt {
                TaskEvt::Status(status) => {
                    self.log(&status);
                    self.status = status;
                }
                TaskEvt::ExecStat {
                    task,
                    step,
                    cur,
                    total,
                } => self.log(format!("[{task}] {cur}/{total} {:?}", step.action)),
                TaskEvt::Repeat { task, cur, total } => {
                    self.log(format!("[{task}] repeat {cur}/{total}"))
                }
                TaskEvt::EncounterSignaled => self.log("Encounter signaled to the counter"),
                _ => {}
            },
            Message::LogEdit(action) => {
                if !action.is_edit() {
                    self.log_content.perform(action);
                }
            }
            Message::CloseRequested => {
                if let Err(err) = self.hunter.reset_gamepad() {
                    error!("failed to reset the gamepad: {err:#}");
                }
                return iced::exit();
            }
        }
        Task::none()
    }

    fn job_button(&self, label: impl ToString, job: Job) -> iced::widget::Button<'_, Message> {
        let b = button(text(label.to_string()));
        if self.executing.is_none() {
            b.on_press(Message::Start(job))
        } else {
            b
        }
    }

    fn gamepad(&self) -> Element<'_, Message> {
        let pad = |button: Button| self.job_button(button, Job::Press(button)).width(56.0);
        let dir = |direction: Direction| self.job_button(direction, Job::Tilt(direction)).width(56.0);

        let dpad = column![
            text("D-Pad"),
            dir(Direction::Up),
            row![dir(Direction::Left), dir(Direction::Down), dir(Direction::Right)].spacing(2),
        ]
        .spacing(2)
        .align_x(Alignment::Center);
        let face = column![
            text("Buttons"),
            pad(Button::X),
            row![pad(Button::Y), pad(Button::A)].spacing(60),
            pad(Button::B),
        ]
        .spacing(2)
        .align_x(Alignment::Center);

        let fast_forward = self.hunter.fast_forward();
        let style = if fast_forward {
            button::success
        } else {
            button::secondary
        };
        let ff = button(text(format!(
            "Fast Forward {}",
            if fast_forward { "ON" } else { "OFF" }
        )))
        .style(style)
        .on_press(Message::ToggleFastForward);

        column![
            row![pad(Button::L), horizontal_space(), pad(Button::R)].width(240.0),
            row![dpad, horizontal_space(), face].width(Length::Fill),
            row![pad(Button::Select), pad(Button::Start)].spacing(8),
            ff,
        ]
        .spacing(12)
        .align_x(Alignment::Center)
        .into()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let emulators = row![
            text("Emulators"),
            text_input("16", &self.count_input)
                .on_input(Message::CountChanged)
                .width(48.0),
            text("Rows"),
            text_input("2", &self.rows_input)
                .on_input(Message::RowsChanged)
                .width(40.0),
            self.job_button("Open Emulators", Job::Open),
            self.job_button("Close All Emulators", Job::Close),
            horizontal_space(),
            text(format!("{} launched", self.hunter.running_emulators())),
        ]
        .spacing(6)
        .align_y(Alignment::Center);

        let tasks = column(self.tasks.iter().map(|(name, hunt)| {
            let b = self
                .job_button(name, Job::Run(name.clone()))
                .width(Length::Fill);
            if *hunt {
                b.style(button::primary).into()
            } else {
                b.style(button::secondary).into()
            }
        }))
        .spacing(2);

        let busy = if self.hunter.is_busy() {
            text("Running").style(text::primary)
        } else if self.dry_run {
            text("Dry run")
        } else {
            text("Idle")
        };

        column![
            emulators,
            horizontal_rule(1),
            row![
                scrollable(tasks).width(Length::FillPortion(2)),
                container(self.gamepad()).width(Length::FillPortion(3)),
            ]
            .spacing(12)
            .height(Length::Fill),
            horizontal_rule(1),
            row![text(self.status.as_str()), horizontal_space(), busy].spacing(6),
            text_editor(&self.log_content)
                .on_action(Message::LogEdit)
                .height(Length::Fixed(140.0)),
        ]
        .spacing(6)
        .padding(8)
        .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            Subscription::run_with_id("task-evt", self.hunter.task_evt_rx.clone())
                .map(Message::TaskEvt),
            window::close_requests().map(|_| Message::CloseRequested),
        ])
    }
}

pub fn run(hunter: Arc<Hunter>, rows: u32, dry_run: bool) -> iced::Result {
    iced::application("melonDS Shiny Hunter", Ui::update, Ui::view)
        .subscription(Ui::subscription)
        .window(window::Settings {
            size: iced::Size::new(820.0, 680.0),
            exit_on_close_request: false,
            ..Default::default()
        })
        .run_with(move || (Ui::new(hunter, rows, dry_run), Task::none()))
}

#[cfg(test)]
mod test {
    use msh_controller::{recording::InputKind, RecordingController};
    use msh_core::{comm::CommFiles, config::Config, resource::Resource};

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        controller: Arc<RecordingController>,
        ui: Ui,
    }

    fn fixture(windows: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.comm = CommFiles::in_dir(dir.path());
        config.emulator.count = 2;
        let controller = Arc::new(RecordingController::default().with_windows("melonDS", windows));
        let hunter = Hunter::new(
            &config,
            controller.clone(),
            controller.clone(),
            Arc::new(Resource::builtin()),
        );
        Fixture {
            _dir: dir,
            controller,
            ui: Ui::new(Arc::new(hunter), 1, true),
        }
    }

    #[test]
    fn test_tasks_listed() {
        let f = fixture(1);
        assert_eq!(f.ui.tasks.len(), f.ui.hunter.resource().task_names().len());
        assert!(f.ui.tasks.iter().any(|(name, hunt)| name == "eevee" && *hunt));
        assert!(f.ui.tasks.iter().any(|(name, hunt)| name == "bike_lap" && !*hunt));
    }

    #[test]
    fn test_execute_jobs() {
        let f = fixture(2);
        let hunter = &f.ui.hunter;
        assert_eq!(
            Job::Run("simple_reset".to_string())
                .execute(hunter, 1, true)
                .unwrap(),
            "simple_reset completed"
        );
        assert!(!hunter.is_busy());
        assert_eq!(
            Job::Press(Button::A).execute(hunter, 1, true).unwrap(),
            "Pressed A"
        );
        assert_eq!(
            Job::Open.execute(hunter, 1, true).unwrap(),
            "2 windows positioned in 1 rows"
        );
        assert!(Job::Run("missing".to_string())
            .execute(hunter, 1, true)
            .is_err());
        assert_eq!(
            Job::Close.execute(hunter, 1, true).unwrap(),
            "All emulators closed"
        );
        assert_eq!(
            Job::Run("eevee".to_string())
                .execute(hunter, 1, true)
                .unwrap(),
            "No emulator windows found"
        );
        assert!(f.controller.pressed_buttons().contains(&Button::A));
    }

    #[test]
    fn test_one_job_at_a_time() {
        let mut f = fixture(1);
        f.ui.executing = Some(Job::Run("eevee".to_string()));
        let _ = f.ui.update(Message::Start(Job::Press(Button::B)));
        assert_eq!(f.ui.executing, Some(Job::Run("eevee".to_string())));
        assert!(f.ui.status.starts_with("Busy with eevee"));

        let _ = f.ui.update(Message::Finished {
            job: Job::Run("eevee".to_string()),
            res: Err("no windows".to_string()),
        });
        assert!(f.ui.executing.is_none());
        assert_eq!(f.ui.status, "Error: no windows");
        assert!(f.ui.log_content.text().contains("eevee: Error: no windows"));
    }

    #[test]
    fn test_task_evts_logged() {
        let mut f = fixture(1);
        f.ui.hunter.run_task("simple_reset").unwrap();
        while let Ok(evt) = f.ui.hunter.task_evt_rx.try_recv() {
            let _ = f.ui.update(Message::TaskEvt(evt));
        }
        assert_eq!(f.ui.status, "simple_reset completed");
        assert!(f.ui.log_content.text().contains("Encounter signaled"));
    }

    #[test]
    fn test_emulator_settings() {
        let mut f = fixture(1);
        let _ = f.ui.update(Message::CountChanged("2x4".to_string()));
        assert_eq!(f.ui.count_input, "24");
        assert_eq!(f.ui.hunter.emulator_count(), 24);
        let _ = f.ui.update(Message::CountChanged("99".to_string()));
        assert_eq!(f.ui.hunter.emulator_count(), 24);
        let _ = f.ui.update(Message::RowsChanged("3".to_string()));
        assert_eq!(f.ui.rows, 3);
        let _ = f.ui.update(Message::RowsChanged("0".to_string()));
        assert_eq!(f.ui.rows, 3);
    }

    #[test]
    fn test_close_releases_gamepad() {
        let mut f = fixture(1);
        let _ = f.ui.update(Message::ToggleFastForward);
        assert!(f.ui.hunter.fast_forward());
        let _ = f.ui.update(Message::CloseRequested);
        assert!(!f.ui.hunter.fast_forward());
        let released = f.controller.events().into_iter().any(|e| {
            e.kind
                == InputKind::Button {
                    button: Button::FastForward,
                    pressed: false,
                }
        });
        assert!(released);
    }
}
