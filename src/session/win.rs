use anyhow::Result;
use tracing::{debug, error, instrument};
use windows::Win32::{
    Foundation::BOOL,
    System::StationsAndDesktops::{
        CloseDesktop, OpenInputDesktop, SwitchDesktop, DESKTOP_CONTROL_FLAGS,
        DESKTOP_SWITCHDESKTOP,
    },
};

use super::SessionMonitor;

/// The input desktop can't be opened or switched to while the secure desktop of the lock screen
/// is shown.
#[instrument]
pub fn is_input_desktop_locked() -> bool {
    let desktop = match unsafe {
        OpenInputDesktop(DESKTOP_CONTROL_FLAGS(0), BOOL::from(false), DESKTOP_SWITCHDESKTOP)
    } {
        Ok(desktop) => desktop,
        Err(e) => {
            debug!("Input desktop is not accessible {e:?}");
            return true;
        }
    };

    let switched = unsafe { SwitchDesktop(desktop) }.is_ok();
    if let Err(e) = unsafe { CloseDesktop(desktop) } {
        error!("Failed to close desktop handle {e:?}");
    }
    !switched
}

#[derive(Default)]
pub struct WindowsSessionMonitor {}

impl WindowsSessionMonitor {
    pub fn new() -> Self {
        Self {}
    }
}

impl SessionMonitor for WindowsSessionMonitor {
    fn is_locked(&mut self) -> Result<bool> {
        Ok(is_input_desktop_locked())
    }
}
