use serde::{Deserialize, Serialize};

use crate::utils::time::{format_hms, format_signed_hms};

use super::pause::TimerState;

pub const NO_BUDGET_LABEL: &str = "--:--:--";

/// Continuous label/tray information, independent of notification events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub elapsed_formatted: String,
    pub remaining_formatted: String,
    pub is_overtime: bool,
    /// Overtime itself is exceeded, the remaining label is negative.
    pub is_expired: bool,
    pub timer_state: TimerState,
    pub seconds_elapsed: u64,
    pub remaining_seconds: i64,
    pub maximum_seconds: u64,
    pub maximum_overtime_seconds: u64,
}

/// Raw figures the engine hands over for formatting.
#[derive(Debug, Clone, Copy)]
pub struct DisplayInput {
    pub seconds_elapsed: u64,
    pub maximum_seconds: u64,
    pub maximum_overtime_seconds: u64,
    pub overtime_active: bool,
    pub timer_state: TimerState,
}

impl DisplayInput {
    pub fn remaining_seconds(&self) -> i64 {
        let limit = if self.overtime_active {
            self.maximum_seconds
                .saturating_add(self.maximum_overtime_seconds)
        } else {
            self.maximum_seconds
        };
        i64::try_from(limit)
            .unwrap_or(i64::MAX)
            .saturating_sub(i64::try_from(self.seconds_elapsed).unwrap_or(i64::MAX))
    }
}

impl From<DisplayInput> for DisplayState {
    fn from(input: DisplayInput) -> Self {
        let remaining_seconds = input.remaining_seconds();
        let has_budget = input.maximum_seconds > 0 || input.overtime_active;

        let (elapsed_formatted, remaining_formatted) = if has_budget {
            (
                format_hms(input.seconds_elapsed),
                format_signed_hms(remaining_seconds),
            )
        } else {
            (NO_BUDGET_LABEL.to_string(), NO_BUDGET_LABEL.to_string())
        };

        DisplayState {
            elapsed_formatted,
            remaining_formatted,
            is_overtime: input.overtime_active,
            is_expired: input.overtime_active && remaining_seconds < 0,
            timer_state: input.timer_state,
            seconds_elapsed: input.seconds_elapsed,
            remaining_seconds,
            maximum_seconds: input.maximum_seconds,
            maximum_overtime_seconds: input.maximum_overtime_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::accounting::pause::TimerState;

    use super::{DisplayInput, DisplayState, NO_BUDGET_LABEL};

    fn input(elapsed: u64, overtime_active: bool) -> DisplayInput {
        DisplayInput {
            seconds_elapsed: elapsed,
            maximum_seconds: 3600,
            maximum_overtime_seconds: 600,
            overtime_active,
            timer_state: TimerState::Running,
        }
    }

    #[test]
    fn remaining_before_overtime_is_plain_difference() {
        for elapsed in [0, 1, 1800, 3599] {
            let state = DisplayState::from(input(elapsed, false));
            assert_eq!(state.remaining_seconds, 3600 - elapsed as i64);
            assert!(!state.is_overtime);
        }
    }

    #[test]
    fn overtime_extends_remaining_and_goes_negative() {
        let state = DisplayState::from(input(3900, true));
        assert_eq!(state.remaining_formatted, "00:05:00");
        assert!(!state.is_expired);

        let state = DisplayState::from(input(4261, true));
        assert_eq!(state.remaining_formatted, "-00:01:01");
        assert!(state.is_expired);
    }

    #[test]
    fn huge_overtime_allowance_saturates() {
        let state = DisplayState::from(DisplayInput {
            seconds_elapsed: 100,
            maximum_seconds: 36,
            maximum_overtime_seconds: u64::MAX,
            overtime_active: true,
            timer_state: TimerState::Running,
        });
        assert_eq!(state.remaining_seconds, i64::MAX - 100);
        assert!(!state.is_expired);
    }

    #[test]
    fn no_budget_shows_placeholder() {
        let state = DisplayState::from(DisplayInput {
            seconds_elapsed: 12,
            maximum_seconds: 0,
            maximum_overtime_seconds: 0,
            overtime_active: false,
            timer_state: TimerState::Stopped,
        });
        assert_eq!(state.elapsed_formatted, NO_BUDGET_LABEL);
        assert_eq!(state.remaining_formatted, NO_BUDGET_LABEL);
    }
}
