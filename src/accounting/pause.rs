use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Stopped,
    Running,
    PausedManual,
    PausedByLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseSource {
    Manual,
    Lock,
}

/// Arbitrates manual pause requests against session lock signals.
///
/// A lock always wins. Manual requests issued while locked do not touch the state, they are
/// latched and replayed when the session is unlocked.
#[derive(Debug, Clone, Default)]
pub struct PauseController {
    state: TimerState,
    was_manually_paused: bool,
    locked: bool,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Whether a manual pause is in effect or waiting for the unlock.
    pub fn manual_pause_pending(&self) -> bool {
        match self.state {
            TimerState::PausedManual => true,
            TimerState::PausedByLock => self.was_manually_paused,
            TimerState::Running | TimerState::Stopped => false,
        }
    }

    /// Returns `true` when the state changed.
    pub fn pause(&mut self, source: PauseSource) -> bool {
        let previous = self.state;
        match source {
            PauseSource::Lock => {
                self.locked = true;
                match self.state {
                    TimerState::Running => {
                        self.was_manually_paused = false;
                        self.state = TimerState::PausedByLock;
                    }
                    TimerState::PausedManual => {
                        self.was_manually_paused = true;
                        self.state = TimerState::PausedByLock;
                    }
                    TimerState::PausedByLock | TimerState::Stopped => {}
                }
            }
            PauseSource::Manual => match self.state {
                TimerState::Running => self.state = TimerState::PausedManual,
                TimerState::PausedByLock => {
                    debug!("Session is locked, latching manual pause");
                    self.was_manually_paused = true;
                }
                TimerState::PausedManual | TimerState::Stopped => {}
            },
        }
        self.log_transition(previous, source)
    }

    /// Returns `true` when the state changed.
    pub fn resume(&mut self, source: PauseSource) -> bool {
        let previous = self.state;
        match source {
            PauseSource::Lock => {
                self.locked = false;
                if self.state == TimerState::PausedByLock {
                    self.state = if self.was_manually_paused {
                        TimerState::PausedManual
                    } else {
                        TimerState::Running
                    };
                    self.was_manually_paused = false;
                }
            }
            PauseSource::Manual => match self.state {
                TimerState::PausedManual => self.state = TimerState::Running,
                TimerState::PausedByLock => {
                    debug!("Session is locked, latching manual resume");
                    self.was_manually_paused = false;
                }
                TimerState::Running | TimerState::Stopped => {}
            },
        }
        self.log_transition(previous, source)
    }

    /// Leaves `Stopped`. Inside a locked session the timer comes up paused by the lock.
    pub fn start(&mut self) -> bool {
        if self.state != TimerState::Stopped {
            return false;
        }
        self.was_manually_paused = false;
        self.state = if self.locked {
            TimerState::PausedByLock
        } else {
            TimerState::Running
        };
        info!("Timer started as {:?}", self.state);
        true
    }

    /// Forces `Stopped` and forgets any latched manual intent.
    pub fn stop(&mut self) -> bool {
        self.was_manually_paused = false;
        if self.state == TimerState::Stopped {
            return false;
        }
        info!("Timer stopped from {:?}", self.state);
        self.state = TimerState::Stopped;
        true
    }

    fn log_transition(&self, previous: TimerState, source: PauseSource) -> bool {
        if previous == self.state {
            return false;
        }
        info!("Timer {:?} -> {:?} ({source:?})", previous, self.state);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{PauseController, PauseSource, TimerState};

    fn running() -> PauseController {
        let mut controller = PauseController::new();
        controller.start();
        controller
    }

    #[test]
    fn lock_then_unlock_resumes() {
        let mut controller = running();
        assert!(controller.pause(PauseSource::Lock));
        assert_eq!(controller.state(), TimerState::PausedByLock);
        assert!(controller.resume(PauseSource::Lock));
        assert_eq!(controller.state(), TimerState::Running);
    }

    #[test]
    fn manual_pause_survives_lock_cycle() {
        let mut controller = running();
        controller.pause(PauseSource::Manual);
        controller.pause(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::PausedByLock);
        controller.resume(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::PausedManual);
    }

    #[test]
    fn lock_pause_is_idempotent() {
        let mut controller = running();
        controller.pause(PauseSource::Manual);
        controller.pause(PauseSource::Lock);
        assert!(!controller.pause(PauseSource::Lock));
        controller.resume(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::PausedManual);
    }

    #[test]
    fn manual_resume_cannot_clear_lock() {
        let mut controller = running();
        controller.pause(PauseSource::Lock);
        assert!(!controller.resume(PauseSource::Manual));
        assert_eq!(controller.state(), TimerState::PausedByLock);
    }

    #[test]
    fn manual_intent_is_replayed_on_unlock() {
        let mut controller = running();
        controller.pause(PauseSource::Lock);
        assert!(!controller.pause(PauseSource::Manual));
        assert!(controller.manual_pause_pending());
        controller.resume(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::PausedManual);

        controller.pause(PauseSource::Lock);
        controller.resume(PauseSource::Manual);
        controller.resume(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::Running);
    }

    #[test]
    fn stop_discards_latched_flags() {
        let mut controller = running();
        controller.pause(PauseSource::Manual);
        controller.pause(PauseSource::Lock);
        assert!(controller.stop());
        assert_eq!(controller.state(), TimerState::Stopped);

        controller.resume(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::Stopped);
        controller.start();
        assert_eq!(controller.state(), TimerState::Running);
    }

    #[test]
    fn start_inside_locked_session_waits_for_unlock() {
        let mut controller = PauseController::new();
        controller.pause(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::Stopped);
        controller.start();
        assert_eq!(controller.state(), TimerState::PausedByLock);
        controller.resume(PauseSource::Lock);
        assert_eq!(controller.state(), TimerState::Running);
    }
}
