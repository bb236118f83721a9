//! some utils

use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logger() {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// The `msh` executable shipped next to the running one, or whatever `msh` is on `PATH`
pub fn controller_exe() -> PathBuf {
    let name = format!("msh{}", env::consts::EXE_SUFFIX);
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// `msh --config <config> ui`, the controller window, emulators are left running
pub fn controller_command(exe: impl AsRef<Path>, config: impl AsRef<Path>) -> Command {
    let mut cmd = Command::new(exe.as_ref());
    cmd.arg("--config").arg(config.as_ref()).arg("ui");
    cmd
}
