use chrono::NaiveDate;

use crate::utils::time::seconds_to_minutes;

/// Active seconds counted for `recorded_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedRecord {
    pub seconds_elapsed: u64,
    pub recorded_date: NaiveDate,
}

impl ElapsedRecord {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            seconds_elapsed: 0,
            recorded_date: today,
        }
    }
}

/// Overtime accrued on `recorded_date`. Overtime is kept in whole seconds, minutes are only a
/// presentation of the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvertimeRecord {
    pub overtime_seconds: u64,
    pub recorded_date: NaiveDate,
    pub maximum_overtime_seconds: u64,
}

impl OvertimeRecord {
    pub fn overtime_minutes(&self) -> f64 {
        seconds_to_minutes(self.overtime_seconds)
    }
}

/// Budget reduction taken from yesterday's overtime and applied to `recorded_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyRecord {
    pub penalty_seconds: u64,
    pub recorded_date: NaiveDate,
}

/// Everything that has to survive a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub elapsed: ElapsedRecord,
    pub overtime: Option<OvertimeRecord>,
    pub penalty: Option<PenaltyRecord>,
    pub timer_enabled: bool,
    pub paused_across_restart: bool,
}

impl PersistedState {
    pub fn fresh(today: NaiveDate, timer_enabled: bool) -> Self {
        Self {
            elapsed: ElapsedRecord::fresh(today),
            overtime: None,
            penalty: None,
            timer_enabled,
            paused_across_restart: false,
        }
    }
}
