use std::time::Duration;

use anyhow::Result;
use enigo::{Direction::Press, Direction::Release, Enigo, Key, Keyboard as _, Settings};
use log::{debug, info};
use windows::Win32::{
    Foundation::{BOOL, HWND, LPARAM, RECT, WPARAM},
    UI::WindowsAndMessaging::{
        EnumWindows, GetSystemMetrics, GetWindowRect, GetWindowTextW, IsWindowVisible,
        PostMessageW, SetForegroundWindow, SetWindowPos, ShowWindow, HWND_TOP, SM_CXSCREEN,
        SM_CYSCREEN, SWP_SHOWWINDOW, SW_RESTORE, WM_CLOSE,
    },
};

use crate::{Desktop, Gamepad, Keyboard, WindowInfo, WindowManager};

use super::vjoy::VJoyGamepad;

pub fn create_desktop() -> Result<Box<dyn Desktop + Send + Sync>> {
    info!("desktop connecting in platform: windows");
    Ok(Box::new(WindowsDesktop::new()))
}

pub fn create_gamepad(device: u32) -> Result<Box<dyn Gamepad + Send + Sync>> {
    info!("acquiring vJoy device {device}");
    Ok(Box::new(VJoyGamepad::acquire(device)?))
}

struct WindowsDesktop {
    width: u32,
    height: u32,
}

impl WindowsDesktop {
    fn new() -> Self {
        let (width, height) = unsafe {
            (
                GetSystemMetrics(SM_CXSCREEN) as u32,
                GetSystemMetrics(SM_CYSCREEN) as u32,
            )
        };
        debug!("WindowsDesktop created, screen {width}x{height}");
        Self { width, height }
    }

    fn key(&self, key: char, direction: enigo::Direction) -> Result<()> {
        let mut enigo = Enigo::new(&Settings::default())?;
        enigo.key(Key::Unicode(key), direction)?;
        Ok(())
    }
}

fn hwnd(window: &WindowInfo) -> HWND {
    HWND(window.handle as *mut _)
}

impl WindowManager for WindowsDesktop {
    fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows: Vec<WindowInfo> = Vec::new();
        unsafe {
            EnumWindows(
                Some(enum_window_proc),
                LPARAM(&mut windows as *mut _ as isize),
            )?;
        }
        Ok(windows)
    }

    fn position_window(
        &self,
        window: &WindowInfo,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_RESTORE);
            SetWindowPos(
                hwnd(window),
                Some(HWND_TOP),
                x,
                y,
                width as i32,
                height as i32,
                SWP_SHOWWINDOW,
            )?;
        }
        Ok(())
    }

    fn focus_window(&self, window: &WindowInfo) -> Result<()> {
        let focused = unsafe { SetForegroundWindow(hwnd(window)).as_bool() };
        if !focused {
            anyhow::bail!("failed to focus window {:?}", window.title)
        }
        Ok(())
    }

    fn close_window(&self, window: &WindowInfo) -> Result<()> {
        unsafe { PostMessageW(Some(hwnd(window)), WM_CLOSE, WPARAM(0), LPARAM(0))? };
        Ok(())
    }
}

impl Keyboard for WindowsDesktop {
    fn key_down(&self, key: char) -> Result<()> {
        self.key(key, Press)
    }

    fn key_up(&self, key: char) -> Result<()> {
        self.key(key, Release)
    }

    fn press_chord(&self, keys: &[char], hold: Duration) -> Result<()> {
        let mut enigo = Enigo::new(&Settings::default())?;
        for key in keys {
            enigo.key(Key::Unicode(*key), Press)?;
        }
        std::thread::sleep(hold);
        for key in keys {
            enigo.key(Key::Unicode(*key), Release)?;
        }
        Ok(())
    }
}

/// Collects every visible, titled top-level window into the `Vec<WindowInfo>` behind `lparam`
extern "system" fn enum_window_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
    unsafe {
        if !IsWindowVisible(hwnd).as_bool() {
            return true.into();
        }

        let mut title = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut title);
        if len == 0 {
            return true.into();
        }

        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_ok() {
            let windows: &mut Vec<WindowInfo> = &mut *(lparam.0 as *mut Vec<WindowInfo>);
            windows.push(WindowInfo {
                handle: hwnd.0 as isize,
                title: String::from_utf16_lossy(&title[..len as usize]),
                position: (rect.left, rect.top),
                size: (
                    (rect.right - rect.left) as u32,
                    (rect.bottom - rect.top) as u32,
                ),
            });
        }

        true.into()
    }
}
