//! vJoy virtual joystick, loaded from `vJoyInterface.dll` at runtime.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use windows::{
    core::{s, w, PCSTR},
    Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW},
};

use crate::{Axis, Button, Gamepad};

const HID_USAGE_X: u32 = 0x30;
const HID_USAGE_Y: u32 = 0x31;

type AcquireVjd = unsafe extern "C" fn(u32) -> i32;
type RelinquishVjd = unsafe extern "C" fn(u32);
type ResetVjd = unsafe extern "C" fn(u32) -> i32;
type SetBtn = unsafe extern "C" fn(i32, u32, u8) -> i32;
type SetAxis = unsafe extern "C" fn(i32, u32, u32) -> i32;

struct Api {
    relinquish: RelinquishVjd,
    reset: ResetVjd,
    set_btn: SetBtn,
    set_axis: SetAxis,
}

pub struct VJoyGamepad {
    device: u32,
    api: Api,
}

unsafe fn proc<T>(module: windows::Win32::Foundation::HMODULE, name: PCSTR) -> Result<T> {
    let f = GetProcAddress(module, name)
        .with_context(|| format!("vJoyInterface.dll is missing {}", name.display()))?;
    Ok(std::mem::transmute_copy(&f))
}

impl VJoyGamepad {
    pub fn acquire(device: u32) -> Result<Self> {
        let (acquire, api) = unsafe {
            let module = LoadLibraryW(w!("vJoyInterface.dll"))
                .context("failed to load vJoyInterface.dll, is vJoy installed?")?;
            let acquire: AcquireVjd = proc(module, s!("AcquireVJD"))?;
            let api = Api {
                relinquish: proc(module, s!("RelinquishVJD"))?,
                reset: proc(module, s!("ResetVJD"))?,
                set_btn: proc(module, s!("SetBtn"))?,
                set_axis: proc(module, s!("SetAxis"))?,
            };
            (acquire, api)
        };
        if unsafe { acquire(device) } == 0 {
            bail!("failed to acquire vJoy device {device}");
        }
        info!("vJoy device {device} acquired");
        let pad = Self { device, api };
        pad.reset()?;
        Ok(pad)
    }
}

impl Gamepad for VJoyGamepad {
    fn set_button(&self, button: Button, pressed: bool) -> Result<()> {
        if unsafe { (self.api.set_btn)(pressed as i32, self.device, button.id()) } == 0 {
            bail!("vJoy rejected button {button}");
        }
        Ok(())
    }

    fn set_axis(&self, axis: Axis, value: u16) -> Result<()> {
        let usage = match axis {
            Axis::X => HID_USAGE_X,
            Axis::Y => HID_USAGE_Y,
        };
        if unsafe { (self.api.set_axis)(value as i32, self.device, usage) } == 0 {
            bail!("vJoy rejected axis {axis:?}");
        }
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        if unsafe { (self.api.reset)(self.device) } == 0 {
            warn!("ResetVJD failed, releasing inputs one by one");
            for button in Button::ALL {
                self.set_button(button, false)?;
            }
        }
        self.set_axis(Axis::X, crate::AXIS_CENTER)?;
        self.set_axis(Axis::Y, crate::AXIS_CENTER)
    }
}

impl Drop for VJoyGamepad {
    fn drop(&mut self) {
        unsafe { (self.api.relinquish)(self.device) };
    }
}
