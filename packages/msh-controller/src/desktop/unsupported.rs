use anyhow::Result;

use crate::{Desktop, Gamepad};

pub fn create_desktop() -> Result<Box<dyn Desktop + Send + Sync>> {
    anyhow::bail!(
        "desktop control is not supported on {}, use --dry-run",
        std::env::consts::OS
    )
}

pub fn create_gamepad(_device: u32) -> Result<Box<dyn Gamepad + Send + Sync>> {
    anyhow::bail!(
        "virtual joystick is not supported on {}, use --dry-run",
        std::env::consts::OS
    )
}
