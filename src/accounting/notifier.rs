use serde::{Deserialize, Serialize};

const TEN_MINUTES: u64 = 600;
const REPEAT_PERIOD: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TenMinutesRemaining,
    BudgetExpired,
    BudgetExpiredRepeat,
    OvertimeExpired,
    OvertimeExpiredRepeat,
}

impl NotificationKind {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TenMinutesRemaining => "10 minutes of computer time remaining",
            Self::BudgetExpired | Self::BudgetExpiredRepeat => {
                "Your computer time is out. You can grant yourself overtime"
            }
            Self::OvertimeExpired | Self::OvertimeExpiredRepeat => {
                "Your overtime is out as well"
            }
        }
    }
}

/// Emitted for the display layer, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub seconds_elapsed: u64,
    pub remaining_seconds: i64,
}

impl NotificationEvent {
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

/// Phase flags of the machine at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Phase {
    pub overtime_active: bool,
    pub overtime_expired: bool,
}

/// Inputs of one tick. `before` holds the flags as they were before the tick was applied.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdInput {
    pub seconds_elapsed: u64,
    pub maximum_seconds: u64,
    pub maximum_overtime_seconds: u64,
    pub before: Phase,
    pub after: Phase,
}

impl ThresholdInput {
    fn remaining_seconds(&self) -> i64 {
        let limit = if self.after.overtime_active {
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

/// Returns the notifications due on this tick only. Each kind is edge triggered so a level that
/// stays true does not produce duplicates.
pub fn due_notifications(input: &ThresholdInput) -> Vec<NotificationKind> {
    let ThresholdInput {
        seconds_elapsed,
        maximum_seconds,
        maximum_overtime_seconds,
        before,
        after,
    } = *input;
    let on_minute = seconds_elapsed % REPEAT_PERIOD == 0;
    let mut due = Vec::new();

    if maximum_seconds >= TEN_MINUTES && seconds_elapsed == maximum_seconds - TEN_MINUTES {
        due.push(NotificationKind::TenMinutesRemaining);
    }

    if after.overtime_active && !before.overtime_active {
        due.push(NotificationKind::BudgetExpired);
    } else if after.overtime_active && !after.overtime_expired && on_minute {
        due.push(NotificationKind::BudgetExpiredRepeat);
    }

    if after.overtime_expired && !before.overtime_expired {
        if maximum_overtime_seconds > 0 {
            due.push(NotificationKind::OvertimeExpired);
        }
    } else if after.overtime_expired && on_minute {
        due.push(NotificationKind::OvertimeExpiredRepeat);
    }

    due
}

pub fn notification_events(input: &ThresholdInput) -> Vec<NotificationEvent> {
    let remaining_seconds = input.remaining_seconds();
    due_notifications(input)
        .into_iter()
        .map(|kind| NotificationEvent {
            kind,
            seconds_elapsed: input.seconds_elapsed,
            remaining_seconds,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{due_notifications, notification_events, NotificationKind, Phase, ThresholdInput};

    fn input(elapsed: u64, before: Phase, after: Phase) -> ThresholdInput {
        ThresholdInput {
            seconds_elapsed: elapsed,
            maximum_seconds: 3600,
            maximum_overtime_seconds: 600,
            before,
            after,
        }
    }

    const NORMAL: Phase = Phase {
        overtime_active: false,
        overtime_expired: false,
    };
    const OVERTIME: Phase = Phase {
        overtime_active: true,
        overtime_expired: false,
    };
    const EXPIRED: Phase = Phase {
        overtime_active: true,
        overtime_expired: true,
    };

    #[test]
    fn ten_minute_warning_fires_on_exact_second() {
        assert_eq!(
            due_notifications(&input(3000, NORMAL, NORMAL)),
            vec![NotificationKind::TenMinutesRemaining]
        );
        assert!(due_notifications(&input(2999, NORMAL, NORMAL)).is_empty());
        assert!(due_notifications(&input(3001, NORMAL, NORMAL)).is_empty());
    }

    #[test]
    fn ten_minute_warning_needs_a_long_enough_budget() {
        let short = ThresholdInput {
            seconds_elapsed: 0,
            maximum_seconds: 599,
            maximum_overtime_seconds: 0,
            before: NORMAL,
            after: NORMAL,
        };
        assert!(due_notifications(&short).is_empty());
    }

    #[test]
    fn budget_expiry_is_edge_triggered() {
        assert_eq!(
            due_notifications(&input(3600, NORMAL, OVERTIME)),
            vec![NotificationKind::BudgetExpired]
        );
        assert!(due_notifications(&input(3601, OVERTIME, OVERTIME)).is_empty());
        assert_eq!(
            due_notifications(&input(3660, OVERTIME, OVERTIME)),
            vec![NotificationKind::BudgetExpiredRepeat]
        );
    }

    #[test]
    fn remaining_saturates_for_huge_allowances() {
        let event = notification_events(&ThresholdInput {
            seconds_elapsed: 3600,
            maximum_seconds: 3600,
            maximum_overtime_seconds: u64::MAX,
            before: NORMAL,
            after: OVERTIME,
        });
        assert_eq!(event[0].kind, NotificationKind::BudgetExpired);
        assert_eq!(event[0].remaining_seconds, i64::MAX - 3600);
    }

    #[test]
    fn overtime_expiry_replaces_budget_repeats() {
        assert_eq!(
            due_notifications(&input(4200, OVERTIME, EXPIRED)),
            vec![NotificationKind::OvertimeExpired]
        );
        assert_eq!(
            due_notifications(&input(4260, EXPIRED, EXPIRED)),
            vec![NotificationKind::OvertimeExpiredRepeat]
        );
        assert!(due_notifications(&input(4261, EXPIRED, EXPIRED)).is_empty());
    }
}
