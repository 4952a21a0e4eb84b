//! Numeric conversions

use bigdecimal::ToPrimitive;

use crate::error::{Error, Result};
use crate::model::{parse_big_decimal, parse_decimal, Value, ValueType};

use super::ValueConverter;

/// Integer <-> Decimal. Narrowing truncates toward zero.
pub struct NumericConverter;

impl ValueConverter for NumericConverter {
    fn name(&self) -> &str {
        "numeric"
    }

    fn converts(&self, from: ValueType, to: ValueType) -> bool {
        from.is_numeric() && to.is_numeric() && from != to
    }

    fn convert(&self, value: &Value, to: ValueType) -> Result<Value> {
        let from = value.value_type();
        match to {
            ValueType::Decimal => value
                .as_decimal()
                .map(Value::decimal)
                .ok_or_else(|| Error::conversion(from, to, "not a number")),
            ValueType::Integer => {
                let d = value
                    .as_decimal()
                    .ok_or_else(|| Error::conversion(from, to, "not a number"))?;
                truncate(d).map(Value::integer).ok_or_else(|| {
                    Error::conversion(from, to, format!("{} does not fit an integer", d))
                })
            }
            _ => Err(Error::conversion(from, to, "not a numeric target")),
        }
    }
}

fn truncate(d: f64) -> Option<i64> {
    let t = d.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

/// Text -> Integer/Decimal through an arbitrary-precision parse
pub struct TextToNumericConverter;

impl ValueConverter for TextToNumericConverter {
    fn name(&self) -> &str {
        "text-to-numeric"
    }

    fn converts(&self, from: ValueType, to: ValueType) -> bool {
        from == ValueType::Text && to.is_numeric()
    }

    fn convert(&self, value: &Value, to: ValueType) -> Result<Value> {
        let text = value.as_text().unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(to.null_value());
        }
        let fail = |reason: &str| {
            Error::conversion(ValueType::Text, to, format!("'{}' {}", text.trim(), reason))
        };
        let decimal = parse_big_decimal(text).ok_or_else(|| fail("is not a number"))?;
        match to {
            ValueType::Integer => decimal
                .with_scale(0)
                .to_i64()
                .map(Value::integer)
                .ok_or_else(|| fail("does not fit an integer")),
            _ => parse_decimal(text)
                .map(Value::decimal)
                .ok_or_else(|| fail("does not fit a decimal")),
        }
    }
}
