use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Allowed usage per weekday in decimal hours. An absent day is a zero budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyBudget {
    pub monday: Option<f64>,
    pub tuesday: Option<f64>,
    pub wednesday: Option<f64>,
    pub thursday: Option<f64>,
    pub friday: Option<f64>,
    pub saturday: Option<f64>,
    pub sunday: Option<f64>,
}

impl DailyBudget {
    /// Same number of hours every day.
    pub fn uniform(hours: f64) -> Self {
        Self {
            monday: Some(hours),
            tuesday: Some(hours),
            wednesday: Some(hours),
            thursday: Some(hours),
            friday: Some(hours),
            saturday: Some(hours),
            sunday: Some(hours),
        }
    }

    pub fn hours(&self, weekday: Weekday) -> Option<f64> {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn set_hours(&mut self, weekday: Weekday, hours: Option<f64>) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = hours;
    }

    /// Resolves the day's limit in whole seconds, truncating fractional seconds.
    pub fn maximum_seconds(&self, weekday: Weekday) -> u64 {
        match self.hours(weekday) {
            Some(hours) if hours.is_finite() && hours > 0. => (hours * 3600.) as u64,
            Some(_) => 0,
            None => {
                warn!("No budget configured for {weekday}, treating it as zero");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::DailyBudget;

    #[test]
    fn resolves_hours_into_seconds() {
        let mut budget = DailyBudget::default();
        budget.set_hours(Weekday::Mon, Some(2.));
        budget.set_hours(Weekday::Sat, Some(1.5));

        assert_eq!(budget.maximum_seconds(Weekday::Mon), 7200);
        assert_eq!(budget.maximum_seconds(Weekday::Sat), 5400);
    }

    #[test]
    fn missing_and_invalid_days_are_zero() {
        let mut budget = DailyBudget::uniform(1.);
        budget.set_hours(Weekday::Sun, None);
        budget.set_hours(Weekday::Tue, Some(-4.));
        budget.set_hours(Weekday::Wed, Some(f64::NAN));

        assert_eq!(budget.maximum_seconds(Weekday::Sun), 0);
        assert_eq!(budget.maximum_seconds(Weekday::Tue), 0);
        assert_eq!(budget.maximum_seconds(Weekday::Wed), 0);
        assert_eq!(budget.maximum_seconds(Weekday::Thu), 3600);
    }

    #[test]
    fn absent_fields_deserialize_as_missing() {
        let budget: DailyBudget = serde_json::from_str(r#"{"friday": 3.0}"#).unwrap();
        assert_eq!(budget.hours(Weekday::Fri), Some(3.));
        assert_eq!(budget.hours(Weekday::Mon), None);
    }
}
