//! msh-controller contains the basic device manipulating functions like
//! virtual gamepad buttons and axes, emulator window placement and keyboard chords.

use std::{fmt, str::FromStr, thread, time::Duration};

use serde::{Deserialize, Serialize};

pub mod desktop;
pub mod recording;

pub use desktop::{create_desktop, create_gamepad};
pub use recording::{InputEvent, RecordingController};

/// Default time a button is held down by [`Gamepad::press`]
pub const DEFAULT_PRESS: Duration = Duration::from_millis(200);
/// Default time a direction is held by [`Gamepad::tap`]
pub const DEFAULT_TAP: Duration = Duration::from_millis(50);

pub const AXIS_MIN: u16 = 0x0000;
pub const AXIS_CENTER: u16 = 0x4000;
pub const AXIS_MAX: u16 = 0x8000;

/// DS buttons as they are mapped onto the virtual joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    B,
    A,
    Y,
    X,
    L,
    R,
    Select,
    Start,
    FastForward,
}

impl Button {
    pub const ALL: [Button; 9] = [
        Button::B,
        Button::A,
        Button::Y,
        Button::X,
        Button::L,
        Button::R,
        Button::Select,
        Button::Start,
        Button::FastForward,
    ];

    /// The 1-based button id on the virtual joystick
    pub fn id(&self) -> u8 {
        match self {
            Button::B => 1,
            Button::A => 2,
            Button::Y => 3,
            Button::X => 4,
            Button::L => 5,
            Button::R => 6,
            Button::Select => 7,
            Button::Start => 8,
            Button::FastForward => 9,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Button {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Button::ALL
            .into_iter()
            .find(|b| b.to_string().to_lowercase() == s)
            .or(match s.as_str() {
                "ff" | "fast_forward" | "fast-forward" => Some(Button::FastForward),
                _ => None,
            })
            .ok_or_else(|| anyhow::anyhow!("unknown button: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The axis and the value this direction pushes it to
    pub fn axis_value(&self) -> (Axis, u16) {
        match self {
            Direction::Left => (Axis::X, AXIS_MIN),
            Direction::Right => (Axis::X, AXIS_MAX),
            Direction::Up => (Axis::Y, AXIS_MIN),
            Direction::Down => (Axis::Y, AXIS_MAX),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Direction::ALL
            .into_iter()
            .find(|d| d.to_string().to_lowercase() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown direction: {s}"))
    }
}

/// [`Gamepad`] drives the virtual controller every emulator instance listens to.
///
/// Implementors only provide the raw button/axis setters, timing helpers are
/// built on top of [`Gamepad::wait`] so a virtual clock can replace real sleeping.
pub trait Gamepad {
    fn set_button(&self, button: Button, pressed: bool) -> anyhow::Result<()>;

    fn set_axis(&self, axis: Axis, value: u16) -> anyhow::Result<()>;

    /// Release every button and recenter both axes
    fn reset(&self) -> anyhow::Result<()> {
        for button in Button::ALL {
            self.set_button(button, false)?;
        }
        self.set_axis(Axis::X, AXIS_CENTER)?;
        self.set_axis(Axis::Y, AXIS_CENTER)
    }

    fn wait(&self, duration: Duration) {
        thread::sleep(duration)
    }

    /// Press `button`, hold it for `hold`, then release it
    fn press(&self, button: Button, hold: Duration) -> anyhow::Result<()> {
        self.set_button(button, true)?;
        self.wait(hold);
        self.set_button(button, false)
    }

    /// Push the stick towards `direction` for `duration`, then recenter it
    fn hold(&self, direction: Direction, duration: Duration) -> anyhow::Result<()> {
        let (axis, value) = direction.axis_value();
        self.set_axis(axis, value)?;
        self.wait(duration);
        self.set_axis(axis, AXIS_CENTER)
    }

    fn tap(&self, direction: Direction) -> anyhow::Result<()> {
        self.hold(direction, DEFAULT_TAP)
    }
}

// MARK: Desktop

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Platform window handle
    pub handle: isize,
    pub title: String,
    pub position: (i32, i32),
    pub size: (u32, u32),
}

pub trait WindowManager {
    /// Primary monitor size in pixels
    fn screen_size(&self) -> (u32, u32);

    /// All visible top-level windows
    fn list_windows(&self) -> anyhow::Result<Vec<WindowInfo>>;

    /// Restore the window and place it on top at the given rect
    fn position_window(
        &self,
        window: &WindowInfo,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> anyhow::Result<()>;

    fn focus_window(&self, window: &WindowInfo) -> anyhow::Result<()>;

    /// Ask the window to close itself
    fn close_window(&self, window: &WindowInfo) -> anyhow::Result<()>;

    /// Visible windows whose title contains `title`, at most `limit` of them
    fn find_windows(&self, title: &str, limit: usize) -> anyhow::Result<Vec<WindowInfo>> {
        Ok(self
            .list_windows()?
            .into_iter()
            .filter(|w| w.title.contains(title))
            .take(limit)
            .collect())
    }
}

pub trait Keyboard {
    fn key_down(&self, key: char) -> anyhow::Result<()>;

    fn key_up(&self, key: char) -> anyhow::Result<()>;

    /// Hold every key in `keys` together for `hold`
    fn press_chord(&self, keys: &[char], hold: Duration) -> anyhow::Result<()> {
        for key in keys {
            self.key_down(*key)?;
        }
        thread::sleep(hold);
        for key in keys {
            self.key_up(*key)?;
        }
        Ok(())
    }
}

/// Everything the helper needs from the host desktop
pub trait Desktop: WindowManager + Keyboard {}

impl<T: WindowManager + Keyboard> Desktop for T {}
