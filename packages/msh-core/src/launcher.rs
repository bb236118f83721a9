//! Opening, arranging and closing the emulator instances

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Child, Command},
    thread,
    time::{Duration, SystemTime},
};

use anyhow::{bail, Context};
use color_print::cprintln;
use log::{debug, error, info, warn};
use msh_controller::{Desktop, WindowInfo, WindowManager};

use crate::config::EmulatorConfig;

/// Space kept free for the taskbar at the bottom of the screen
const TASKBAR_HEIGHT: i32 = 40;
/// Windows are shifted left to hide their invisible border
const LEFT_BORDER: i32 = 10;

/// The rom next to the most recently played save
#[derive(Debug, Clone, PartialEq)]
pub struct RecentRom {
    pub nds: PathBuf,
    pub sav: PathBuf,
}

/// Find the most recently modified `.sav` in `roms_dir` and the `.nds` with the same stem
pub fn find_recent_rom(roms_dir: impl AsRef<Path>) -> anyhow::Result<RecentRom> {
    let roms_dir = roms_dir.as_ref();
    if !roms_dir.is_dir() {
        bail!("ROMs directory not found: {}", roms_dir.display());
    }

    let mut recent: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(roms_dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sav") {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if recent.as_ref().map_or(true, |(t, _)| modified > *t) {
            recent = Some((modified, path));
        }
    }
    let Some((_, sav)) = recent else {
        bail!("No .sav files found in {}", roms_dir.display());
    };

    let nds = sav.with_extension("nds");
    if !nds.exists() {
        bail!("No matching .nds file found for {}", sav.display());
    }
    Ok(RecentRom { nds, sav })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Tile `count` windows row by row in a grid with `rows` rows
pub fn grid_layout(count: u32, rows: u32, screen: (u32, u32)) -> Vec<Rect> {
    if count == 0 || rows == 0 {
        return vec![];
    }
    let cols = count.div_ceil(rows);
    let (screen_w, screen_h) = (screen.0 as i32, screen.1 as i32);
    let width = screen_w / cols as i32;
    let height = screen_h / rows as i32;

    (0..count as i32)
        .map(|i| {
            let (col, row) = (i % cols as i32, i / cols as i32);
            let x = col * width - LEFT_BORDER;
            let y = row * height;
            let height = if y + height > screen_h - TASKBAR_HEIGHT {
                height - TASKBAR_HEIGHT
            } else {
                height
            };
            Rect {
                x,
                y,
                width: width as u32,
                height: height.max(0) as u32,
            }
        })
        .collect()
}

/// Place `windows` on the grid for `count` windows in `rows` rows, returns how many were placed
pub fn arrange(desktop: &dyn Desktop, windows: &[WindowInfo], count: u32, rows: u32) -> usize {
    let layout = grid_layout(count, rows, desktop.screen_size());
    let mut placed = 0;
    for (i, (window, rect)) in windows.iter().zip(layout).enumerate() {
        match desktop.position_window(window, rect.x, rect.y, rect.width, rect.height) {
            Ok(()) => placed += 1,
            Err(err) => error!("failed to position window {i}: {err:#}"),
        }
    }
    placed
}

#[derive(Debug, Clone, Copy)]
pub struct LaunchDelays {
    /// Between two spawned processes
    pub spawn_interval: Duration,
    /// After the last spawn, before looking for the windows
    pub settle: Duration,
    /// After asking everything to close
    pub close: Duration,
}

impl Default for LaunchDelays {
    fn default() -> Self {
        Self {
            spawn_interval: Duration::from_millis(300),
            settle: Duration::from_millis(2500),
            close: Duration::from_millis(500),
        }
    }
}

/// Owns the emulator processes it spawned
#[derive(Debug)]
pub struct Launcher {
    config: EmulatorConfig,
    delays: LaunchDelays,
    children: Vec<Child>,
}

impl Launcher {
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            delays: LaunchDelays::default(),
            children: vec![],
        }
    }

    pub fn with_delays(mut self, delays: LaunchDelays) -> Self {
        self.delays = delays;
        self
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Emulator windows currently open, at most `limit`
    pub fn find_windows(&self, desktop: &dyn Desktop, limit: usize) -> anyhow::Result<Vec<WindowInfo>> {
        desktop.find_windows(&self.config.window_title, limit)
    }

    /// Close whatever is running, then start `count` emulators on the most recent rom and
    /// tile them in `rows` rows. Returns the windows that were found.
    pub fn open(
        &mut self,
        desktop: &dyn Desktop,
        count: u32,
        rows: u32,
    ) -> anyhow::Result<Vec<WindowInfo>> {
        if count == 0 || rows == 0 {
            bail!("emulator count and rows must be positive, got {count} and {rows}");
        }
        let melon_path = self.config.melon_path.clone();
        if !melon_path.exists() {
            bail!("melonDS not found at {}", melon_path.display());
        }
        let rom = find_recent_rom(&self.config.roms_dir)?;
        cprintln!(
            "<m><strong>[Launcher]</strong></m>: opening {} emulators in {} rows with {}",
            count,
            rows,
            rom.nds.display()
        );

        self.close(desktop)?;

        for i in 0..count {
            let child = Command::new(&melon_path)
                .arg(&rom.nds)
                .spawn()
                .with_context(|| format!("failed to start {}", melon_path.display()))?;
            debug!("spawned emulator {i} (pid {})", child.id());
            self.children.push(child);
            thread::sleep(self.delays.spawn_interval);
        }
        thread::sleep(self.delays.settle);

        let windows = self.find_windows(desktop, count as usize)?;
        if windows.len() < count as usize {
            warn!("only found {}/{} emulator windows", windows.len(), count);
        }
        arrange(desktop, &windows, count, rows);
        info!("{count} emulators opened and positioned in {rows} rows");
        Ok(windows)
    }

    /// Kill the processes this launcher started and close every other emulator window
    pub fn close(&mut self, desktop: &dyn Desktop) -> anyhow::Result<()> {
        for mut child in self.children.drain(..) {
            if let Err(err) = child.kill() {
                debug!("failed to kill emulator {}: {err}", child.id());
            }
            let _ = child.wait();
        }
        for window in self.find_windows(desktop, usize::MAX)? {
            if let Err(err) = desktop.close_window(&window) {
                debug!("failed to close {:?}: {err:#}", window.title);
            }
        }
        thread::sleep(self.delays.close);
        info!("all emulators closed");
        Ok(())
    }

    pub fn running(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod test {
    use msh_controller::{recording::InputKind, RecordingController};

    use super::*;

    fn no_delays() -> LaunchDelays {
        LaunchDelays {
            spawn_interval: Duration::ZERO,
            settle: Duration::ZERO,
            close: Duration::ZERO,
        }
    }

    #[test]
    fn test_grid_layout() {
        let layout = grid_layout(24, 3, (1920, 1080));
        assert_eq!(layout.len(), 24);
        // 8 columns of 240x360
        assert_eq!(
            layout[0],
            Rect {
                x: -10,
                y: 0,
                width: 240,
                height: 360
            }
        );
        assert_eq!(
            layout[9],
            Rect {
                x: 230,
                y: 360,
                width: 240,
                height: 360
            }
        );
        // bottom row makes room for the taskbar
        assert_eq!(
            layout[23],
            Rect {
                x: 1670,
                y: 720,
                width: 240,
                height: 320
            }
        );
    }

    #[test]
    fn test_grid_layout_uneven() {
        let layout = grid_layout(5, 2, (1000, 800));
        // 3 columns, the last row is not full
        assert_eq!(layout.len(), 5);
        assert_eq!(layout[3].y, 400);
        assert_eq!(layout[3].x, -10);
        assert_eq!(layout[4].x, 323);
        assert_eq!(layout[4].height, 360);
        assert_eq!(layout[0].height, 400);
        assert!(grid_layout(0, 3, (1000, 800)).is_empty());
        assert!(grid_layout(3, 0, (1000, 800)).is_empty());
    }

    #[test]
    fn test_arrange() {
        let desktop = RecordingController::new((1200, 800)).with_windows("melonDS", 3);
        let windows = desktop.find_windows("melonDS", 3).unwrap();
        assert_eq!(arrange(&desktop, &windows, 3, 1), 3);
        let positions: Vec<InputKind> = desktop.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            positions[2],
            InputKind::Position {
                handle: 3,
                x: 790,
                y: 0,
                width: 400,
                height: 760
            }
        );
    }

    #[test]
    fn test_find_recent_rom() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_recent_rom(dir.path().join("missing")).is_err());
        assert!(find_recent_rom(dir.path()).is_err());

        let now = SystemTime::now();
        for (stem, age) in [("platinum", 60), ("heartgold", 10), ("black", 30)] {
            let sav = dir.path().join(format!("{stem}.sav"));
            fs::write(&sav, "").unwrap();
            fs::File::options()
                .write(true)
                .open(&sav)
                .unwrap()
                .set_modified(now - Duration::from_secs(age))
                .unwrap();
        }
        // the newest save has no rom yet
        assert!(find_recent_rom(dir.path()).is_err());

        fs::write(dir.path().join("heartgold.nds"), "").unwrap();
        let rom = find_recent_rom(dir.path()).unwrap();
        assert_eq!(rom.nds, dir.path().join("heartgold.nds"));
        assert_eq!(rom.sav, dir.path().join("heartgold.sav"));
    }

    #[test]
    fn test_open_requires_emulator() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = Launcher::new(EmulatorConfig {
            melon_path: dir.path().join("melonDS.exe"),
            roms_dir: dir.path().to_owned(),
            ..Default::default()
        })
        .with_delays(no_delays());
        let desktop = RecordingController::default();
        let err = launcher.open(&desktop, 4, 2).unwrap_err();
        assert!(err.to_string().contains("melonDS not found"));
        assert!(launcher.open(&desktop, 0, 2).is_err());
    }

    #[test]
    fn test_close_windows() {
        let mut launcher = Launcher::new(EmulatorConfig::default()).with_delays(no_delays());
        let desktop = RecordingController::default().with_windows("melonDS", 3);
        launcher.close(&desktop).unwrap();
        let closed = desktop
            .events()
            .iter()
            .filter(|e| matches!(e.kind, InputKind::Close(_)))
            .count();
        assert_eq!(closed, 3);
        assert!(launcher.find_windows(&desktop, 10).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_open_spawns_processes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.sav"), "").unwrap();
        fs::write(dir.path().join("game.nds"), "").unwrap();

        // any executable accepting one argument stands in for the emulator
        let mut launcher = Launcher::new(EmulatorConfig {
            melon_path: PathBuf::from("/bin/sh"),
            roms_dir: dir.path().to_owned(),
            ..Default::default()
        })
        .with_delays(no_delays());
        let desktop = RecordingController::default().with_windows("melonDS", 2);

        // the stale windows are closed first and no new ones show up
        let windows = launcher.open(&desktop, 2, 1).unwrap();
        assert!(windows.is_empty());
        assert_eq!(launcher.running(), 2);
        assert!(!desktop
            .events()
            .iter()
            .any(|e| matches!(e.kind, InputKind::Position { .. })));

        launcher.close(&desktop).unwrap();
        assert_eq!(launcher.running(), 0);
    }
}
