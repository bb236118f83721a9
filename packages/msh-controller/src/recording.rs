//! A controller that records inputs against a virtual clock instead of touching the host.
//!
//! Waiting only advances the clock, so a full hunting sequence replays instantly.

use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use crate::{Axis, Button, Gamepad, Keyboard, WindowInfo, WindowManager};

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Button { button: Button, pressed: bool },
    Axis { axis: Axis, value: u16 },
    KeyDown(char),
    KeyUp(char),
    Focus(isize),
    Position { handle: isize, x: i32, y: i32, width: u32, height: u32 },
    Close(isize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Virtual time since the controller was created
    pub at: Duration,
    pub kind: InputKind,
}

#[derive(Debug, Default)]
struct State {
    clock: Duration,
    events: Vec<InputEvent>,
    windows: Vec<WindowInfo>,
}

#[derive(Debug)]
pub struct RecordingController {
    screen: (u32, u32),
    state: Mutex<State>,
}

impl Default for RecordingController {
    fn default() -> Self {
        Self::new((1920, 1080))
    }
}

impl RecordingController {
    pub fn new(screen: (u32, u32)) -> Self {
        Self {
            screen,
            state: Mutex::new(State::default()),
        }
    }

    /// Pretend `count` windows titled `title` are open
    pub fn with_windows(self, title: &str, count: usize) -> Self {
        {
            let mut state = self.state();
            state.windows = (0..count)
                .map(|i| WindowInfo {
                    handle: i as isize + 1,
                    title: format!("{title} {i}"),
                    position: (0, 0),
                    size: (256, 384),
                })
                .collect();
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // a poisoned lock only means a test panicked while recording
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, kind: InputKind) {
        let mut state = self.state();
        let at = state.clock;
        state.events.push(InputEvent { at, kind });
    }

    pub fn elapsed(&self) -> Duration {
        self.state().clock
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.state().events.clone()
    }

    /// Only the button presses (rising edges), in order
    pub fn pressed_buttons(&self) -> Vec<Button> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e.kind {
                InputKind::Button {
                    button,
                    pressed: true,
                } => Some(button),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.events.clear();
        state.clock = Duration::ZERO;
    }
}

impl Gamepad for RecordingController {
    fn set_button(&self, button: Button, pressed: bool) -> anyhow::Result<()> {
        self.record(InputKind::Button { button, pressed });
        Ok(())
    }

    fn set_axis(&self, axis: Axis, value: u16) -> anyhow::Result<()> {
        self.record(InputKind::Axis { axis, value });
        Ok(())
    }

    fn wait(&self, duration: Duration) {
        self.state().clock += duration;
    }
}

impl Keyboard for RecordingController {
    fn key_down(&self, key: char) -> anyhow::Result<()> {
        self.record(InputKind::KeyDown(key));
        Ok(())
    }

    fn key_up(&self, key: char) -> anyhow::Result<()> {
        self.record(InputKind::KeyUp(key));
        Ok(())
    }

    fn press_chord(&self, keys: &[char], hold: Duration) -> anyhow::Result<()> {
        for key in keys {
            self.key_down(*key)?;
        }
        self.wait(hold);
        for key in keys {
            self.key_up(*key)?;
        }
        Ok(())
    }
}

impl WindowManager for RecordingController {
    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn list_windows(&self) -> anyhow::Result<Vec<WindowInfo>> {
        Ok(self.state().windows.clone())
    }

    fn position_window(
        &self,
        window: &WindowInfo,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> anyhow::Result<()> {
        self.record(InputKind::Position {
            handle: window.handle,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn focus_window(&self, window: &WindowInfo) -> anyhow::Result<()> {
        self.record(InputKind::Focus(window.handle));
        Ok(())
    }

    fn close_window(&self, window: &WindowInfo) -> anyhow::Result<()> {
        self.record(InputKind::Close(window.handle));
        self.state().windows.retain(|w| w.handle != window.handle);
        Ok(())
    }
}
