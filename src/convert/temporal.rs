//! Date <-> DateTime

use crate::error::{Error, Result};
use crate::model::{Value, ValueType};

/// Date becomes midnight UTC; DateTime drops its time of day
pub struct TemporalConverter;

impl super::ValueConverter for TemporalConverter {
    fn name(&self) -> &str {
        "temporal"
    }

    fn converts(&self, from: ValueType, to: ValueType) -> bool {
        matches!(
            (from, to),
            (ValueType::Date, ValueType::DateTime) | (ValueType::DateTime, ValueType::Date)
        )
    }

    fn convert(&self, value: &Value, to: ValueType) -> Result<Value> {
        let from = value.value_type();
        match to {
            ValueType::DateTime => value
                .as_date()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Value::date_time(naive.and_utc()))
                .ok_or_else(|| Error::conversion(from, to, "not a date")),
            ValueType::Date => value
                .as_date_time()
                .map(|dt| Value::date(dt.date_naive()))
                .ok_or_else(|| Error::conversion(from, to, "not a datetime")),
            _ => Err(Error::conversion(from, to, "not a temporal target")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_date_to_datetime_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2019, 7, 14).unwrap();
        let converted = ValueType::DateTime.convert(&Value::date(date)).unwrap();
        assert_eq!(
            converted.to_text().unwrap().unwrap(),
            "2019-07-14T00:00:00.000+0000"
        );
    }

    #[test]
    fn test_datetime_to_date_drops_time() {
        let dt = ValueType::DateTime
            .value_of_str("2019-07-14T23:59:59.999+0000")
            .unwrap();
        let converted = ValueType::Date.convert(&dt).unwrap();
        assert_eq!(
            converted,
            Value::date(NaiveDate::from_ymd_opt(2019, 7, 14).unwrap())
        );
    }
}
