//! Semantic value types and their native representations

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::convert;
use crate::error::{Error, Result};

use super::value::{self, Value};

/// Canonical text pattern for `date` values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical text pattern for `datetime` values
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Patterns tried, in order, when a `datetime` text is not in canonical form.
/// Patterns without an offset are read as UTC.
const LEGACY_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

lazy_static! {
    static ref LOCALE_PATTERN: Regex =
        Regex::new(r"^([A-Za-z]{2,3})(?:[_-]([A-Za-z]{2}|[0-9]{3}))?$").unwrap();
}

/// The closed set of semantic value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Locale,
    Binary,
}

const ALL_TYPES: [ValueType; 8] = [
    ValueType::Text,
    ValueType::Integer,
    ValueType::Decimal,
    ValueType::Boolean,
    ValueType::Date,
    ValueType::DateTime,
    ValueType::Locale,
    ValueType::Binary,
];

impl ValueType {
    /// Every built-in type, in declaration order
    pub fn all() -> &'static [ValueType] {
        &ALL_TYPES
    }

    /// Look up a type by its registered name (case-insensitive)
    pub fn type_for(name: &str) -> Result<ValueType> {
        let wanted = name.trim();
        ALL_TYPES
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownValueType(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
            ValueType::Locale => "locale",
            ValueType::Binary => "binary",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Decimal)
    }

    pub fn is_date_time(self) -> bool {
        matches!(self, ValueType::Date | ValueType::DateTime)
    }

    /// Whether values of this type define an ordering
    pub fn is_comparable(self) -> bool {
        !matches!(self, ValueType::Binary)
    }

    /// Whether a native payload can be wrapped as this type without a converter.
    /// Text accepts anything through its textual form; Decimal widens integers.
    pub fn accepts(self, native: &Native) -> bool {
        let kind = native.natural_type();
        kind == self
            || self == ValueType::Text
            || (self == ValueType::Decimal && kind == ValueType::Integer)
    }

    pub fn null_value(self) -> Value {
        Value::null(self)
    }

    pub fn null_sequence(self) -> Value {
        Value::null_sequence(self)
    }

    /// Parse a value from its text form. Blank text is null for every type but Text.
    pub fn value_of_str(self, text: &str) -> Result<Value> {
        if self != ValueType::Text && text.trim().is_empty() {
            return Ok(self.null_value());
        }
        let native = self.parse_native(text)?;
        Ok(Value::scalar(self, native))
    }

    /// Wrap a native payload, coercing only where [`ValueType::accepts`] allows it
    pub fn value_of(self, native: Native) -> Result<Value> {
        let kind = native.natural_type();
        if let Native::Decimal(d) = native {
            if !d.is_finite() {
                let reason = format!("{} is not a finite number", d);
                return Err(Error::conversion(kind, self, reason));
            }
        }
        if kind == self {
            return Ok(Value::scalar(self, native));
        }
        match (self, native) {
            (ValueType::Text, other) => Ok(Value::scalar(self, Native::Text(other.render()))),
            (ValueType::Decimal, Native::Integer(i)) => {
                Ok(Value::scalar(self, Native::Decimal(i as f64)))
            }
            _ => Err(Error::conversion(kind, self, "native payload not accepted")),
        }
    }

    /// Text form of a value of this type; `None` for null
    pub fn format(self, value: &Value) -> Result<Option<String>> {
        if value.value_type() != self {
            return Err(Error::conversion(
                value.value_type(),
                self,
                "value is not of this type",
            ));
        }
        if value.is_null() {
            return Ok(None);
        }
        if let Some(elements) = value.as_sequence() {
            return value::encode_sequence(elements).map(Some);
        }
        Ok(value.native()?.map(|n| n.render()))
    }

    /// Order two values of this type. Nulls sort first; sequences compare element-wise.
    pub fn compare(self, a: &Value, b: &Value) -> Result<Ordering> {
        if !self.is_comparable() {
            return Err(Error::Unsupported(format!(
                "{} values have no ordering",
                self
            )));
        }
        for v in [a, b] {
            if v.value_type() != self {
                return Err(Error::conversion(
                    v.value_type(),
                    self,
                    "cannot compare values of different types",
                ));
            }
        }
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Less),
            (false, true) => return Ok(Ordering::Greater),
            (false, false) => {}
        }
        match (a.as_sequence(), b.as_sequence()) {
            (Some(xs), Some(ys)) => {
                for (x, y) in xs.iter().zip(ys.iter()) {
                    let ord = self.compare(x, y)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(xs.len().cmp(&ys.len()))
            }
            (None, None) => match (a.native()?, b.native()?) {
                (Some(x), Some(y)) => x.compare(&y),
                _ => Ok(Ordering::Equal),
            },
            _ => Err(Error::Unsupported(
                "cannot compare a sequence with a scalar".to_string(),
            )),
        }
    }

    /// Convert a value to this type through the default converter registry
    pub fn convert(self, value: &Value) -> Result<Value> {
        convert::default_registry().convert(value, self)
    }

    /// Build a sequence; every element must already be of this type
    pub fn sequence_of(self, values: Vec<Value>) -> Result<Value> {
        if let Some(bad) = values.iter().find(|v| v.value_type() != self) {
            return Err(Error::conversion(
                bad.value_type(),
                self,
                "sequence elements must share the sequence type",
            ));
        }
        if let Some(nested) = values.iter().find(|v| v.is_sequence()) {
            return Err(Error::conversion(
                nested.value_type(),
                self,
                "sequences cannot be nested",
            ));
        }
        Ok(Value::sequence(self, values))
    }

    /// Parse a sequence from its text form (a JSON array of element texts)
    pub fn sequence_of_str(self, text: &str) -> Result<Value> {
        if text.trim().is_empty() {
            return Ok(self.null_sequence());
        }
        let elements = value::decode_sequence(self, text)?;
        Ok(Value::sequence(self, elements))
    }

    pub(crate) fn parse_native(self, text: &str) -> Result<Native> {
        let trimmed = text.trim();
        let fail = |reason: String| Error::conversion(ValueType::Text, self, reason);
        match self {
            ValueType::Text => Ok(Native::Text(text.to_string())),
            ValueType::Integer => trimmed
                .parse::<i64>()
                .map(Native::Integer)
                .map_err(|_| fail(format!("'{}' is not an integer", trimmed))),
            ValueType::Decimal => parse_decimal(trimmed)
                .map(Native::Decimal)
                .ok_or_else(|| fail(format!("'{}' is not a finite decimal number", trimmed))),
            ValueType::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Native::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Native::Boolean(false))
                } else {
                    Err(fail(format!("'{}' is not a boolean", trimmed)))
                }
            }
            ValueType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(Native::Date)
                .map_err(|e| fail(format!("'{}' is not a date: {}", trimmed, e))),
            ValueType::DateTime => parse_date_time(trimmed)
                .map(Native::DateTime)
                .ok_or_else(|| fail(format!("'{}' is not a datetime", trimmed))),
            ValueType::Locale => Locale::from_str(trimmed).map(Native::Locale),
            ValueType::Binary => BASE64
                .decode(trimmed)
                .map(Native::Binary)
                .map_err(|e| fail(format!("invalid base64 payload: {}", e))),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ValueType::type_for(s)
    }
}

/// Arbitrary-precision parse used before any numeric coercion of text
pub(crate) fn parse_big_decimal(text: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(text.trim()).ok()
}

/// Decimal text to the nearest finite `f64`. The text must be a valid
/// arbitrary-precision number; out-of-range magnitudes are rejected.
pub(crate) fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    parse_big_decimal(trimmed)?;
    trimmed.parse::<f64>().ok().filter(|d| d.is_finite())
}

/// -0.0 folds into 0.0 and every NaN into one NaN, so that ordering,
/// equality and hashing of decimals agree
fn canonical_decimal(d: f64) -> f64 {
    if d.is_nan() {
        f64::NAN
    } else if d == 0.0 {
        0.0
    } else {
        d
    }
}

fn parse_date_time(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, DATETIME_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in LEGACY_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A language tag with an optional region, rendered as `language[_REGION]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    pub fn new(language: &str, region: Option<&str>) -> Result<Self> {
        let tag = match region {
            Some(r) => format!("{}_{}", language, r),
            None => language.to_string(),
        };
        tag.parse()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = LOCALE_PATTERN.captures(s.trim()).ok_or_else(|| {
            Error::conversion(
                ValueType::Text,
                ValueType::Locale,
                format!("'{}' is not a locale tag", s),
            )
        })?;
        Ok(Self {
            language: caps[1].to_ascii_lowercase(),
            region: caps.get(2).map(|m| m.as_str().to_ascii_uppercase()),
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}_{}", self.language, region),
            None => write!(f, "{}", self.language),
        }
    }
}

/// Native payload carried by a scalar value
#[derive(Debug, Clone)]
pub enum Native {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Locale(Locale),
    Binary(Vec<u8>),
}

impl Native {
    /// The value type this payload belongs to without coercion
    pub fn natural_type(&self) -> ValueType {
        match self {
            Native::Text(_) => ValueType::Text,
            Native::Integer(_) => ValueType::Integer,
            Native::Decimal(_) => ValueType::Decimal,
            Native::Boolean(_) => ValueType::Boolean,
            Native::Date(_) => ValueType::Date,
            Native::DateTime(_) => ValueType::DateTime,
            Native::Locale(_) => ValueType::Locale,
            Native::Binary(_) => ValueType::Binary,
        }
    }

    /// Canonical text form of the payload
    pub fn render(&self) -> String {
        match self {
            Native::Text(s) => s.clone(),
            Native::Integer(i) => i.to_string(),
            Native::Decimal(d) => d.to_string(),
            Native::Boolean(b) => b.to_string(),
            Native::Date(d) => d.format(DATE_FORMAT).to_string(),
            Native::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            Native::Locale(l) => l.to_string(),
            Native::Binary(bytes) => BASE64.encode(bytes),
        }
    }

    fn compare(&self, other: &Native) -> Result<Ordering> {
        match (self, other) {
            (Native::Text(a), Native::Text(b)) => Ok(a.cmp(b)),
            (Native::Integer(a), Native::Integer(b)) => Ok(a.cmp(b)),
            (Native::Decimal(a), Native::Decimal(b)) => {
                Ok(canonical_decimal(*a).total_cmp(&canonical_decimal(*b)))
            }
            (Native::Boolean(a), Native::Boolean(b)) => Ok(a.cmp(b)),
            (Native::Date(a), Native::Date(b)) => Ok(a.cmp(b)),
            (Native::DateTime(a), Native::DateTime(b)) => Ok(a.cmp(b)),
            (Native::Locale(a), Native::Locale(b)) => Ok(a.cmp(b)),
            _ => Err(Error::Unsupported(format!(
                "cannot order {} against {}",
                self.natural_type(),
                other.natural_type()
            ))),
        }
    }
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Native::Text(a), Native::Text(b)) => a == b,
            (Native::Integer(a), Native::Integer(b)) => a == b,
            // Handle NaN comparison
            (Native::Decimal(a), Native::Decimal(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            (Native::Boolean(a), Native::Boolean(b)) => a == b,
            (Native::Date(a), Native::Date(b)) => a == b,
            (Native::DateTime(a), Native::DateTime(b)) => a == b,
            (Native::Locale(a), Native::Locale(b)) => a == b,
            (Native::Binary(a), Native::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Native {}

impl Hash for Native {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Native::Text(s) => s.hash(state),
            Native::Integer(i) => i.hash(state),
            Native::Decimal(d) => canonical_decimal(*d).to_bits().hash(state),
            Native::Boolean(b) => b.hash(state),
            Native::Date(d) => d.hash(state),
            Native::DateTime(dt) => dt.hash(state),
            Native::Locale(l) => l.hash(state),
            Native::Binary(bytes) => bytes.hash(state),
        }
    }
}

impl From<&str> for Native {
    fn from(s: &str) -> Self {
        Native::Text(s.to_string())
    }
}

impl From<String> for Native {
    fn from(s: String) -> Self {
        Native::Text(s)
    }
}

impl From<i64> for Native {
    fn from(i: i64) -> Self {
        Native::Integer(i)
    }
}

impl From<f64> for Native {
    fn from(f: f64) -> Self {
        Native::Decimal(f)
    }
}

impl From<bool> for Native {
    fn from(b: bool) -> Self {
        Native::Boolean(b)
    }
}

impl From<NaiveDate> for Native {
    fn from(d: NaiveDate) -> Self {
        Native::Date(d)
    }
}

impl From<DateTime<Utc>> for Native {
    fn from(dt: DateTime<Utc>) -> Self {
        Native::DateTime(dt)
    }
}

impl From<Locale> for Native {
    fn from(l: Locale) -> Self {
        Native::Locale(l)
    }
}

impl From<Vec<u8>> for Native {
    fn from(bytes: Vec<u8>) -> Self {
        Native::Binary(bytes)
    }
}
