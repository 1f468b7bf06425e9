//! Detection of a locked user session. [GenericSessionMonitor] picks the implementation for the
//! platform the crate was built for.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use anyhow::Result;

/// Contract every platform has to implement.
#[cfg_attr(test, mockall::automock)]
pub trait SessionMonitor {
    /// Whether the session is currently locked or behind the screen saver.
    fn is_locked(&mut self) -> Result<bool>;
}

/// Serves as a cross-compatible [SessionMonitor] implementation.
pub struct GenericSessionMonitor {
    inner: Box<dyn SessionMonitor>,
}

impl GenericSessionMonitor {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsSessionMonitor;
                Ok(Self {
                    inner: Box::new(WindowsSessionMonitor::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::X11SessionMonitor;
                Ok(Self {
                    inner: Box::new(X11SessionMonitor::new()?),
                })
            }
            else {
                tracing::warn!("Built without session support, lock detection is off");
                Ok(Self {
                    inner: Box::new(NeverLocked),
                })
            }
        }
    }
}

impl SessionMonitor for GenericSessionMonitor {
    fn is_locked(&mut self) -> Result<bool> {
        self.inner.is_locked()
    }
}

/// Used when no platform backend is compiled in.
pub struct NeverLocked;

impl SessionMonitor for NeverLocked {
    fn is_locked(&mut self) -> Result<bool> {
        Ok(false)
    }
}
