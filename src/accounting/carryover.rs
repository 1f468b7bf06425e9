//! Resolution of overtime across the day boundary.
//!
//! Overtime is a one-day-forward liability. Overtime recorded today keeps today's grace window
//! open, overtime recorded yesterday shrinks today's budget, anything older is dropped.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::utils::time::previous_day;

use super::records::{OvertimeRecord, PenaltyRecord};

/// Budget figures for the day after carry-over was applied, plus the records that stay
/// applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carryover {
    pub maximum_seconds: u64,
    pub maximum_overtime_seconds: u64,
    pub overtime_active: bool,
    /// Yesterday's overtime was larger than today's whole budget.
    pub carried_overtime: bool,
    pub overtime: Option<OvertimeRecord>,
    pub penalty: Option<PenaltyRecord>,
}

pub fn resolve_carryover(
    base_seconds: u64,
    overtime: Option<OvertimeRecord>,
    penalty: Option<PenaltyRecord>,
    today: NaiveDate,
) -> Carryover {
    let penalty_today = penalty.filter(|p| p.recorded_date == today);
    let yesterday = previous_day(today);

    let (overtime, penalty, restored) = match overtime {
        Some(record) if record.recorded_date == today => {
            debug!("Restoring today's overtime window {record:?}");
            (Some(record), penalty_today, true)
        }
        Some(record) if Some(record.recorded_date) == yesterday => {
            info!(
                "Consuming {} minutes of yesterday's overtime",
                record.overtime_minutes()
            );
            let penalty = PenaltyRecord {
                penalty_seconds: record.overtime_seconds,
                recorded_date: today,
            };
            (None, Some(penalty), false)
        }
        Some(record) => {
            debug!("Dropping stale overtime record {record:?}");
            (None, penalty_today, false)
        }
        None => (None, penalty_today, false),
    };

    let penalty_seconds = penalty.map_or(0, |p| p.penalty_seconds);
    let carried_overtime = penalty_seconds > base_seconds;
    let maximum_seconds = base_seconds.saturating_sub(penalty_seconds);

    Carryover {
        maximum_seconds,
        maximum_overtime_seconds: overtime.map_or(0, |o| o.maximum_overtime_seconds),
        overtime_active: restored || carried_overtime,
        carried_overtime,
        overtime,
        penalty,
    }
}
