//! Identity and text-based conversions

use crate::error::{Error, Result};
use crate::model::{Value, ValueType};

use super::ValueConverter;

/// Same type in and out
pub struct IdentityConverter;

impl ValueConverter for IdentityConverter {
    fn name(&self) -> &str {
        "identity"
    }

    fn converts(&self, from: ValueType, to: ValueType) -> bool {
        from == to
    }

    fn convert(&self, value: &Value, _to: ValueType) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Text -> any type, through the target type's parser
pub struct TextParseConverter;

impl ValueConverter for TextParseConverter {
    fn name(&self) -> &str {
        "text-parse"
    }

    fn converts(&self, from: ValueType, to: ValueType) -> bool {
        from == ValueType::Text && to != ValueType::Text
    }

    fn convert(&self, value: &Value, to: ValueType) -> Result<Value> {
        let text = value
            .as_text()
            .ok_or_else(|| Error::conversion(value.value_type(), to, "not a text value"))?;
        to.value_of_str(text)
    }
}

/// Any type -> Text, through the source type's formatter
pub struct ToTextConverter;

impl ValueConverter for ToTextConverter {
    fn name(&self) -> &str {
        "to-text"
    }

    fn converts(&self, _from: ValueType, to: ValueType) -> bool {
        to == ValueType::Text
    }

    fn convert(&self, value: &Value, to: ValueType) -> Result<Value> {
        Ok(match value.to_text()? {
            Some(text) => Value::text(text),
            None => to.null_value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trips_through_other_types() {
        let text = Value::text("true");
        let boolean = ValueType::Boolean.convert(&text).unwrap();
        assert_eq!(boolean, Value::boolean(true));
        assert_eq!(ValueType::Text.convert(&boolean).unwrap(), text);
    }

    #[test]
    fn test_malformed_text_is_a_conversion_error() {
        let err = ValueType::Date.convert(&Value::text("31/12/1999")).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
    }
}
