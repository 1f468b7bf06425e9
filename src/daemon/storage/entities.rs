use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    accounting::records::{ElapsedRecord, OvertimeRecord, PenaltyRecord, PersistedState},
    utils::time::{minutes_to_seconds, seconds_to_minutes},
};

/// The struct used for storing state on the disk. It is a flat key/value document so the file
/// stays readable and older files with missing keys still load.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StateEntity {
    pub seconds_elapsed: u64,
    pub recorded_date: NaiveDate,
    #[serde(default)]
    pub overtime_minutes: f64,
    #[serde(default)]
    pub overtime_date: Option<NaiveDate>,
    #[serde(default)]
    pub maximum_minutes_overtime: f64,
    #[serde(default)]
    pub penalty_seconds: u64,
    #[serde(default)]
    pub penalty_date: Option<NaiveDate>,
    #[serde(default)]
    pub timer_enabled: bool,
    #[serde(default)]
    pub timer_paused_across_restart: bool,
}

impl From<&PersistedState> for StateEntity {
    fn from(state: &PersistedState) -> Self {
        StateEntity {
            seconds_elapsed: state.elapsed.seconds_elapsed,
            recorded_date: state.elapsed.recorded_date,
            overtime_minutes: state.overtime.map_or(0., |o| o.overtime_minutes()),
            overtime_date: state.overtime.map(|o| o.recorded_date),
            maximum_minutes_overtime: state
                .overtime
                .map_or(0., |o| seconds_to_minutes(o.maximum_overtime_seconds)),
            penalty_seconds: state.penalty.map_or(0, |p| p.penalty_seconds),
            penalty_date: state.penalty.map(|p| p.recorded_date),
            timer_enabled: state.timer_enabled,
            timer_paused_across_restart: state.paused_across_restart,
        }
    }
}

impl From<StateEntity> for PersistedState {
    fn from(entity: StateEntity) -> Self {
        PersistedState {
            elapsed: ElapsedRecord {
                seconds_elapsed: entity.seconds_elapsed,
                recorded_date: entity.recorded_date,
            },
            overtime: entity.overtime_date.map(|recorded_date| OvertimeRecord {
                overtime_seconds: minutes_to_seconds(entity.overtime_minutes),
                recorded_date,
                maximum_overtime_seconds: minutes_to_seconds(entity.maximum_minutes_overtime),
            }),
            penalty: entity.penalty_date.map(|recorded_date| PenaltyRecord {
                penalty_seconds: entity.penalty_seconds,
                recorded_date,
            }),
            timer_enabled: entity.timer_enabled,
            paused_across_restart: entity.timer_paused_across_restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::StateEntity;
    use crate::accounting::records::PersistedState;

    #[test]
    fn reads_document_with_missing_optional_keys() {
        let entity: StateEntity =
            serde_json::from_str(r#"{"secondsElapsed": 42, "recordedDate": "2024-05-15"}"#)
                .unwrap();
        let state = PersistedState::from(entity);

        assert_eq!(state.elapsed.seconds_elapsed, 42);
        assert_eq!(
            state.elapsed.recorded_date,
            NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
        );
        assert!(state.overtime.is_none());
        assert!(state.penalty.is_none());
        assert!(!state.timer_enabled);
    }

    #[test]
    fn fractional_overtime_minutes_round_to_seconds() {
        let entity: StateEntity = serde_json::from_str(
            r#"{
                "secondsElapsed": 0,
                "recordedDate": "2024-05-15",
                "overtimeMinutes": 2.5,
                "overtimeDate": "2024-05-14",
                "maximumMinutesOvertime": 0.0166
            }"#,
        )
        .unwrap();
        let overtime = PersistedState::from(entity).overtime.unwrap();

        assert_eq!(overtime.overtime_seconds, 150);
        assert_eq!(overtime.maximum_overtime_seconds, 1);
    }
}
