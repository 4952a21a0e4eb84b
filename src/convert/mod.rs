//! Conversion of values between types

mod numeric;
mod temporal;
mod text;

use lazy_static::lazy_static;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Value, ValueType};

pub use self::numeric::{NumericConverter, TextToNumericConverter};
pub use self::temporal::TemporalConverter;
pub use self::text::{IdentityConverter, TextParseConverter, ToTextConverter};

/// A rule converting values from one type to another
pub trait ValueConverter: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Whether this converter handles the `(from, to)` pair
    fn converts(&self, from: ValueType, to: ValueType) -> bool;

    /// Convert a non-null scalar value of a handled source type
    fn convert(&self, value: &Value, to: ValueType) -> Result<Value>;
}

/// Ordered list of converters; the first one accepting a pair handles it
pub struct ConverterRegistry {
    converters: Vec<Box<dyn ValueConverter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: ConverterRegistry = ConverterRegistry::new();
}

/// Process-wide registry holding the built-in converters
pub fn default_registry() -> &'static ConverterRegistry {
    &DEFAULT_REGISTRY
}

impl ConverterRegistry {
    /// Registry with the built-in converters, in precedence order
    pub fn new() -> Self {
        Self {
            converters: vec![
                Box::new(IdentityConverter),
                Box::new(NumericConverter),
                Box::new(TemporalConverter),
                Box::new(TextToNumericConverter),
                Box::new(TextParseConverter),
                Box::new(ToTextConverter),
            ],
        }
    }

    /// Registry with no converters at all
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Append a converter; it is consulted after every converter already registered
    pub fn register(&mut self, converter: Box<dyn ValueConverter>) {
        self.converters.push(converter);
    }

    /// Insert a converter ahead of all existing ones
    pub fn register_first(&mut self, converter: Box<dyn ValueConverter>) {
        self.converters.insert(0, converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// First converter handling the pair
    pub fn find(&self, from: ValueType, to: ValueType) -> Result<&dyn ValueConverter> {
        self.converters
            .iter()
            .find(|c| c.converts(from, to))
            .map(|c| c.as_ref())
            .ok_or_else(|| Error::conversion(from, to, "no converter registered"))
    }

    /// Convert `value` to `to`. Nulls map to nulls and sequences convert element-wise,
    /// but an unhandled pair is an error either way.
    pub fn convert(&self, value: &Value, to: ValueType) -> Result<Value> {
        let from = value.value_type();
        let converter = self.find(from, to)?;
        debug!(converter = converter.name(), %from, %to, "converting value");

        if value.is_sequence() {
            return match value.as_sequence() {
                Some(elements) => {
                    let converted = elements
                        .iter()
                        .map(|e| self.convert_scalar(converter, e, to))
                        .collect::<Result<Vec<_>>>()?;
                    to.sequence_of(converted)
                }
                None => Ok(to.null_sequence()),
            };
        }
        self.convert_scalar(converter, value, to)
    }

    fn convert_scalar(
        &self,
        converter: &dyn ValueConverter,
        value: &Value,
        to: ValueType,
    ) -> Result<Value> {
        if value.is_null() {
            return Ok(to.null_value());
        }
        converter.convert(value, to)
    }
}
