mod ui;

use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use color_print::cprintln;
use msh::utils::init_logger;
use msh_controller::{
    create_desktop, create_gamepad, Button, Desktop, Direction, Gamepad, RecordingController,
    DEFAULT_PRESS, DEFAULT_TAP,
};
use msh_core::{
    config::{Config, DEFAULT_CONFIG_FILE},
    resource::Resource,
    task::secs,
    Hunter, RunOutcome, TaskEvt,
};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(author, version, about = "Drive melonDS emulators through shiny hunting sequences", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Record inputs on a virtual controller instead of touching the host
    #[arg(long, global = true)]
    dry_run: bool,

    /// Number of emulators, overrides the configuration
    #[arg(short = 'n', long, global = true)]
    emulators: Option<u32>,

    /// Rows to tile the emulator windows in, overrides the configuration
    #[arg(short, long, global = true)]
    rows: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Open the controller window, the emulators are left as they are
    Ui,
    /// Start the emulators on the most recent rom and tile them
    Open,
    /// Close every emulator window
    Close,
    /// Run a task on every emulator
    Run { task: String },
    /// List the available tasks
    List,
    /// Press a button on the virtual gamepad
    Press {
        button: Button,
        /// Seconds to hold the button
        #[arg(long, value_parser = parse_hold)]
        hold: Option<Duration>,
    },
    /// Push the stick towards a direction
    Tilt {
        direction: Direction,
        /// Seconds to hold the stick
        #[arg(long, value_parser = parse_hold)]
        hold: Option<Duration>,
    },
    /// Hold or release the fast forward button
    FastForward { state: Switch },
    /// Write every task as toml into a directory
    DumpTasks { dir: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn parse_hold(s: &str) -> anyhow::Result<Duration> {
    secs(s.parse()?)
}

type Devices = (
    Arc<dyn Gamepad + Send + Sync>,
    Arc<dyn Desktop + Send + Sync>,
);

fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(count) = cli.emulators {
        config.emulator.count = count;
    }
    if let Some(rows) = cli.rows {
        config.emulator.rows = rows;
    }
    let resource = Resource::load_or_builtin(&config.resource_dir)?;

    match &cli.command {
        Command::List => {
            list_tasks(&resource);
            return Ok(());
        }
        Command::DumpTasks { dir } => {
            let count = resource.dump(dir)?;
            cprintln!(
                "<m><strong>[Task]</strong></m>: wrote {} tasks to {}",
                count,
                dir.display()
            );
            return Ok(());
        }
        _ => {}
    }

    let recording = cli.dry_run.then(|| {
        Arc::new(
            RecordingController::default()
                .with_windows(&config.emulator.window_title, config.emulator.count as usize),
        )
    });
    let (gamepad, desktop): Devices = match &recording {
        Some(recording) => (
            recording.clone() as Arc<dyn Gamepad + Send + Sync>,
            recording.clone() as Arc<dyn Desktop + Send + Sync>,
        ),
        None => (
            Arc::from(create_gamepad(config.input.vjoy_device)?),
            Arc::from(create_desktop()?),
        ),
    };

    let hunter = Hunter::new(&config, gamepad, desktop, Arc::new(resource));
    if let Command::Ui = cli.command {
        ui::run(Arc::new(hunter), config.emulator.rows, cli.dry_run)?;
        return Ok(());
    }
    spawn_task_evt_logger(hunter.task_evt_rx.clone());

    match cli.command {
        Command::Open if cli.dry_run => {
            info!("dry run, not starting melonDS");
            hunter.arrange_emulators(config.emulator.rows)?;
        }
        Command::Open => {
            hunter.open_emulators(config.emulator.rows)?;
        }
        Command::Close => hunter.close_emulators()?,
        Command::Run { task } => {
            let res = hunter.run_task(&task);
            // nothing stays held if the task stopped halfway
            hunter.reset_gamepad()?;
            match res? {
                RunOutcome::Completed => {}
                RunOutcome::NoWindows => {
                    anyhow::bail!("no {} windows found", config.emulator.window_title)
                }
                RunOutcome::Busy => warn!("another task is running"),
            }
        }
        Command::Press { button, hold } => {
            hunter.press(button, hold.unwrap_or(DEFAULT_PRESS))?;
        }
        Command::Tilt { direction, hold } => {
            hunter.tilt(direction, hold.unwrap_or(DEFAULT_TAP))?;
        }
        Command::FastForward { state } => hunter.set_fast_forward(state == Switch::On)?,
        Command::Ui | Command::List | Command::DumpTasks { .. } => {}
    }

    if let Some(recording) = recording {
        cprintln!(
            "<c><strong>[DryRun]</strong></c>: {} inputs over {:.2}s",
            recording.events().len(),
            recording.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn list_tasks(resource: &Resource) {
    let lookup = |name: &str| resource.get_task(name).cloned();
    for task in resource.tasks() {
        let duration = match task.duration(&lookup) {
            Ok(duration) => format!("{:.2}s", duration.as_secs_f64()),
            Err(err) => {
                warn!("{}: {err:#}", task.name);
                "?".to_string()
            }
        };
        let desc = task.desc.as_deref().unwrap_or_default();
        if task.is_hunt() {
            cprintln!("<g><strong>{}</strong></g> [hunt] {} {}", task.name, duration, desc);
        } else {
            cprintln!("<strong>{}</strong> {} {}", task.name, duration, desc);
        }
    }
}

fn spawn_task_evt_logger(rx: async_channel::Receiver<TaskEvt>) {
    thread::spawn(move || {
        while let Ok(evt) = rx.recv_blocking() {
            match evt {
                TaskEvt::ExecStat {
                    task,
                    step,
                    cur,
                    total,
                } => debug!("[{task}] step {cur}/{total}: {:?}", step.action),
                TaskEvt::Repeat { task, cur, total } => debug!("[{task}] {cur}/{total}"),
                TaskEvt::EncounterSignaled => info!("encounter signaled to the counter"),
                _ => {}
            }
        }
    });
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["msh", "--dry-run", "-n", "4", "run", "soft_reset"]);
        assert!(cli.dry_run);
        assert_eq!(cli.emulators, Some(4));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(matches!(cli.command, Command::Run { task } if task == "soft_reset"));

        let cli = Cli::parse_from(["msh", "press", "start", "--hold", "1.5"]);
        assert!(matches!(
            cli.command,
            Command::Press { button: Button::Start, hold: Some(h) } if h == Duration::from_millis(1500)
        ));
        assert!(Cli::try_parse_from(["msh", "press", "a", "--hold", "-1"]).is_err());
        assert!(Cli::try_parse_from(["msh", "tilt", "up", "--hold", "NaN"]).is_err());
        assert!(Cli::try_parse_from(["msh", "tilt", "up", "--hold", "soon"]).is_err());

        let cli = Cli::parse_from(["msh", "-c", "other.toml", "ui"]);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Command::Ui));

        let cli = Cli::parse_from(["msh", "fast-forward", "on", "--rows", "2"]);
        assert_eq!(cli.rows, Some(2));
        assert!(matches!(cli.command, Command::FastForward { state: Switch::On }));

        assert!(Cli::try_parse_from(["msh", "tilt", "sideways"]).is_err());
    }
}
