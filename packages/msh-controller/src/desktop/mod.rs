use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod vjoy;
        mod windows_desktop;
        use windows_desktop as imp;
    } else {
        mod unsupported;
        use unsupported as imp;
    }
}

pub use imp::{create_desktop, create_gamepad};
