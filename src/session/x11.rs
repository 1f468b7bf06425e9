use anyhow::{anyhow, Result};
use tracing::instrument;
use xcb::{
    screensaver::{QueryInfo, QueryInfoReply},
    x::{Drawable, Window},
    Connection,
};

use super::SessionMonitor;

/// `ScreenSaverOn` from the MIT-SCREEN-SAVER extension. Most lockers on X11 activate the screen
/// saver together with the lock.
const SCREEN_SAVER_ON: u8 = 1;

pub struct X11SessionMonitor {
    connection: Connection,
    preferred_screen: i32,
}

impl X11SessionMonitor {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        Ok(Self {
            connection,
            preferred_screen,
        })
    }

    fn root(&self) -> Result<Window> {
        // Only one screen is supported.
        self.connection
            .get_setup()
            .roots()
            .nth(self.preferred_screen.max(0) as usize)
            .map(|screen| screen.root())
            .ok_or_else(|| anyhow!("Screen {} does not exist", self.preferred_screen))
    }
}

impl SessionMonitor for X11SessionMonitor {
    #[instrument(skip(self))]
    fn is_locked(&mut self) -> Result<bool> {
        let root = self.root()?;
        let cookie = self.connection.send_request(&QueryInfo {
            drawable: Drawable::Window(root),
        });
        let reply: QueryInfoReply = self.connection.wait_for_reply(cookie)?;
        Ok(reply.state() == SCREEN_SAVER_ON)
    }
}
