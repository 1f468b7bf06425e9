//! The accrual state machine.
//!
//! [AccrualEngine] owns every piece of mutable accounting state. It is driven by a uniform tick
//! and never schedules anything on its own: day boundaries are found by comparing the stored date
//! with the clock on every tick.
//!
//! ```text
//! NotStarted -> Running <-> Paused* -> Running -> ...
//! Running/Paused -> Expired(normal) -> Expired(overtime)
//! ```
//!
//! The expiry phases are flags layered on top of accrual. The counter keeps going after expiry,
//! only the notifications change.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    config::BudgetConfig,
    daemon::storage::state_store::StateStore,
    utils::{clock::Clock, time::minutes_to_seconds},
};

use super::{
    carryover::resolve_carryover,
    display::{DisplayInput, DisplayState},
    notifier::{notification_events, NotificationEvent, NotificationKind, Phase, ThresholdInput},
    pause::{PauseController, PauseSource, TimerState},
    records::{ElapsedRecord, OvertimeRecord, PenaltyRecord, PersistedState},
};

/// Ticks between two routine saves. Transitions are saved immediately.
pub const DEFAULT_FLUSH_INTERVAL: u64 = 5;

const TEN_MINUTES: u64 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("The budget has not run out yet, overtime can only be granted afterwards")]
    BudgetNotExhausted,
}

/// Operating system session signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    Locked,
    Unlocked,
}

pub struct AccrualEngine<S: StateStore> {
    store: S,
    clock: Box<dyn Clock>,
    config: BudgetConfig,
    controller: PauseController,
    enabled: bool,
    recorded_date: NaiveDate,
    seconds_elapsed: u64,
    maximum_seconds: u64,
    maximum_overtime_seconds: u64,
    overtime_active: bool,
    overtime_expired: bool,
    carried_overtime: bool,
    overtime: Option<OvertimeRecord>,
    penalty: Option<PenaltyRecord>,
    ten_minute_warning_sent: bool,
    flush_interval: u64,
    ticks_since_flush: u64,
    dirty: bool,
}

impl<S: StateStore> AccrualEngine<S> {
    /// Restores the engine from `store`. An unreadable store is not fatal, the day starts from
    /// scratch instead.
    pub async fn load(store: S, clock: Box<dyn Clock>, config: BudgetConfig) -> Self {
        let today = clock.today();
        let persisted = match store.load().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!("No saved state, starting a fresh day");
                PersistedState::fresh(today, config.enabled)
            }
            Err(e) => {
                warn!("Failed to load saved state, starting a fresh day: {e}");
                PersistedState::fresh(today, config.enabled)
            }
        };

        let mut engine = Self {
            store,
            clock,
            enabled: config.enabled,
            config,
            controller: PauseController::new(),
            recorded_date: today,
            seconds_elapsed: 0,
            maximum_seconds: 0,
            maximum_overtime_seconds: 0,
            overtime_active: false,
            overtime_expired: false,
            carried_overtime: false,
            overtime: persisted.overtime,
            penalty: persisted.penalty,
            ten_minute_warning_sent: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            ticks_since_flush: 0,
            dirty: false,
        };

        let seconds = if persisted.elapsed.recorded_date == today {
            persisted.elapsed.seconds_elapsed
        } else {
            debug!(
                "Saved elapsed time belongs to {}, resetting",
                persisted.elapsed.recorded_date
            );
            0
        };
        engine.begin_day(today, seconds);
        engine.refresh_run_state();
        if persisted.paused_across_restart {
            engine.controller.pause(PauseSource::Manual);
        }
        engine.flush().await;
        engine
    }

    pub fn with_flush_interval(mut self, ticks: u64) -> Self {
        self.flush_interval = ticks.max(1);
        self
    }

    pub fn timer_state(&self) -> TimerState {
        self.controller.state()
    }

    pub fn seconds_elapsed(&self) -> u64 {
        self.seconds_elapsed
    }

    pub fn maximum_seconds(&self) -> u64 {
        self.maximum_seconds
    }

    pub fn maximum_overtime_seconds(&self) -> u64 {
        self.maximum_overtime_seconds
    }

    pub fn is_overtime(&self) -> bool {
        self.overtime_active
    }

    pub fn is_overtime_expired(&self) -> bool {
        self.overtime_expired
    }

    pub fn carried_overtime(&self) -> bool {
        self.carried_overtime
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Whether the last save failed and is waiting for a retry.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayInput {
            seconds_elapsed: self.seconds_elapsed,
            maximum_seconds: self.maximum_seconds,
            maximum_overtime_seconds: self.maximum_overtime_seconds,
            overtime_active: self.overtime_active,
            timer_state: self.controller.state(),
        }
        .into()
    }

    /// Advances the machine by one second. Ticks are dropped unless the timer is running, but the
    /// day boundary is checked on every call.
    pub async fn on_tick(&mut self) -> Vec<NotificationEvent> {
        let today = self.clock.today();
        if today != self.recorded_date {
            self.roll_over(today).await;
        }

        if !self.controller.is_running() {
            return vec![];
        }

        let before = self.phase();
        self.seconds_elapsed = self.seconds_elapsed.saturating_add(1);

        if !self.overtime_active && self.seconds_elapsed >= self.maximum_seconds {
            self.open_overtime();
        }
        if self.overtime_active
            && !self.overtime_expired
            && self.maximum_overtime_seconds > 0
            && self.seconds_elapsed >= self.overtime_limit()
        {
            info!("Overtime of {} seconds is used up", self.maximum_overtime_seconds);
            self.overtime_expired = true;
        }
        let after = self.phase();

        let mut events = notification_events(&ThresholdInput {
            seconds_elapsed: self.seconds_elapsed,
            maximum_seconds: self.maximum_seconds,
            maximum_overtime_seconds: self.maximum_overtime_seconds,
            before,
            after,
        });
        events.retain(|event| {
            if event.kind != NotificationKind::TenMinutesRemaining {
                return true;
            }
            !std::mem::replace(&mut self.ten_minute_warning_sent, true)
        });

        self.ticks_since_flush += 1;
        if before != after || self.ticks_since_flush >= self.flush_interval {
            self.flush().await;
        }
        events
    }

    /// Returns `true` when the timer state changed.
    pub async fn pause(&mut self, source: PauseSource) -> bool {
        if source == PauseSource::Lock && !self.config.pause_on_lock {
            debug!("Ignoring lock, pausing on lock is disabled");
            return false;
        }
        let changed = self.controller.pause(source);
        self.flush().await;
        changed
    }

    /// Returns `true` when the timer state changed.
    pub async fn resume(&mut self, source: PauseSource) -> bool {
        if source == PauseSource::Lock && !self.config.pause_on_lock {
            debug!("Ignoring unlock, pausing on lock is disabled");
            return false;
        }
        let changed = self.controller.resume(source);
        self.flush().await;
        changed
    }

    pub async fn session_signal(&mut self, signal: SessionSignal) -> bool {
        match signal {
            SessionSignal::Locked => self.pause(PauseSource::Lock).await,
            SessionSignal::Unlocked => self.resume(PauseSource::Lock).await,
        }
    }

    pub async fn set_enabled(&mut self, enabled: bool) -> bool {
        info!("Timer {}", if enabled { "enabled" } else { "disabled" });
        self.enabled = enabled;
        let changed = self.refresh_run_state();
        self.flush().await;
        changed
    }

    /// Replaces the configuration as a whole and recomputes today's budget from it. Elapsed time
    /// and today's overtime window are kept.
    pub async fn reconfigure(&mut self, config: BudgetConfig) {
        info!("Applying new configuration");
        let lock_pause_dropped = self.config.pause_on_lock && !config.pause_on_lock;
        self.enabled = config.enabled;
        self.config = config;

        let today = self.clock.today();
        if today != self.recorded_date {
            self.roll_over(today).await;
        } else {
            self.overtime = self.current_overtime();
            // The warning is once per day, a bigger budget does not rearm it.
            let warned = self.ten_minute_warning_sent;
            self.begin_day(today, self.seconds_elapsed);
            self.ten_minute_warning_sent |= warned;
        }

        if lock_pause_dropped {
            self.controller.resume(PauseSource::Lock);
        }
        self.refresh_run_state();
        self.flush().await;
    }

    /// Sets today's overtime allowance. Only possible once the budget has run out.
    pub async fn grant_overtime(&mut self, minutes: f64) -> Result<(), EngineError> {
        if !self.overtime_active {
            return Err(EngineError::BudgetNotExhausted);
        }
        let seconds = minutes_to_seconds(minutes);
        info!("Granting {seconds} seconds of overtime");

        let today = self.recorded_date;
        self.overtime = Some(match self.overtime {
            Some(record) if record.recorded_date == today => OvertimeRecord {
                maximum_overtime_seconds: seconds,
                ..record
            },
            _ => OvertimeRecord {
                overtime_seconds: 0,
                recorded_date: today,
                maximum_overtime_seconds: seconds,
            },
        });
        self.maximum_overtime_seconds = seconds;
        self.overtime_expired = seconds > 0 && self.seconds_elapsed >= self.overtime_limit();
        self.flush().await;
        Ok(())
    }

    /// Moves the elapsed counter by `delta` seconds, never below zero.
    pub async fn adjust_elapsed(&mut self, delta: i64) {
        self.seconds_elapsed = if delta < 0 {
            self.seconds_elapsed.saturating_sub(delta.unsigned_abs())
        } else {
            self.seconds_elapsed.saturating_add(delta.unsigned_abs())
        };
        info!("Elapsed time adjusted by {delta}s to {}", self.seconds_elapsed);

        if self.overtime_expired && self.seconds_elapsed < self.overtime_limit() {
            self.overtime_expired = false;
        }
        self.flush().await;
    }

    /// Saves the current snapshot. Failures are logged and retried on the next save.
    pub async fn flush(&mut self) {
        self.ticks_since_flush = 0;
        let state = self.persisted_state();
        match self.store.save(&state).await {
            Ok(()) => {
                if self.dirty {
                    info!("State saved again after an earlier failure");
                }
                self.dirty = false;
            }
            Err(e) => {
                error!("Failed to save state, keeping it in memory: {e}");
                self.dirty = true;
            }
        }
    }

    fn phase(&self) -> Phase {
        Phase {
            overtime_active: self.overtime_active,
            overtime_expired: self.overtime_expired,
        }
    }

    fn overtime_limit(&self) -> u64 {
        self.maximum_seconds
            .saturating_add(self.maximum_overtime_seconds)
    }

    /// Resolves budget and carry-over for `today` starting from `seconds` of elapsed time.
    fn begin_day(&mut self, today: NaiveDate, seconds: u64) {
        let base_seconds = self.config.budget.maximum_seconds(today.weekday());
        let carryover = resolve_carryover(base_seconds, self.overtime, self.penalty, today);

        self.recorded_date = today;
        self.seconds_elapsed = seconds;
        self.maximum_seconds = carryover.maximum_seconds;
        self.maximum_overtime_seconds = carryover.maximum_overtime_seconds;
        self.overtime_active = carryover.overtime_active;
        self.carried_overtime = carryover.carried_overtime;
        self.overtime = carryover.overtime;
        self.penalty = carryover.penalty;
        self.overtime_expired = self.overtime_active
            && self.maximum_overtime_seconds > 0
            && seconds >= self.overtime_limit();
        self.ten_minute_warning_sent = self.maximum_seconds >= TEN_MINUTES
            && seconds >= self.maximum_seconds - TEN_MINUTES;

        info!(
            "Day {today}: budget {base_seconds}s, effective {}s, elapsed {seconds}s, overtime {}",
            self.maximum_seconds, self.overtime_active
        );
    }

    async fn roll_over(&mut self, today: NaiveDate) {
        info!("Day changed from {} to {today}", self.recorded_date);
        // The finished day's overtime is settled under its own date first.
        self.overtime = self.current_overtime();
        self.begin_day(today, 0);
        self.refresh_run_state();
        self.flush().await;
    }

    fn open_overtime(&mut self) {
        info!("Budget of {} seconds is exhausted", self.maximum_seconds);
        self.overtime_active = true;
        if self.overtime.map(|o| o.recorded_date) != Some(self.recorded_date) {
            self.maximum_overtime_seconds = minutes_to_seconds(self.config.default_overtime_minutes);
            self.overtime = Some(OvertimeRecord {
                overtime_seconds: 0,
                recorded_date: self.recorded_date,
                maximum_overtime_seconds: self.maximum_overtime_seconds,
            });
        }
    }

    /// Overtime record with today's figures brought up to date.
    fn current_overtime(&self) -> Option<OvertimeRecord> {
        self.overtime.map(|record| {
            if record.recorded_date == self.recorded_date {
                OvertimeRecord {
                    overtime_seconds: self.seconds_elapsed.saturating_sub(self.maximum_seconds),
                    maximum_overtime_seconds: self.maximum_overtime_seconds,
                    ..record
                }
            } else {
                record
            }
        })
    }

    fn persisted_state(&self) -> PersistedState {
        PersistedState {
            elapsed: ElapsedRecord {
                seconds_elapsed: self.seconds_elapsed,
                recorded_date: self.recorded_date,
            },
            overtime: self.current_overtime(),
            penalty: self.penalty,
            timer_enabled: self.enabled,
            paused_across_restart: self.controller.manual_pause_pending(),
        }
    }

    /// Moves the controller in or out of `Stopped`. Returns `true` when it changed.
    fn refresh_run_state(&mut self) -> bool {
        let runnable = self.enabled && (self.maximum_seconds > 0 || self.overtime_active);
        if runnable {
            self.controller.start()
        } else {
            if self.enabled {
                info!("No budget left for today, the timer stays stopped");
            }
            self.controller.stop()
        }
    }
}
