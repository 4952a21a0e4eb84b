//! Immutable typed values: null, scalar, sequence, or lazily loaded

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};

use crate::error::{Error, Result};

use super::value_type::{Locale, Native, ValueType};

/// Supplies a payload on demand instead of holding it inline.
///
/// Backends use this for large binary columns: the value reports nullness
/// without fetching, and the bytes are only read when asked for.
pub trait ValueLoader: Send + Sync {
    fn is_null(&self) -> bool;

    fn load(&self) -> Result<Native>;
}

#[derive(Clone)]
enum Content {
    Null,
    Scalar(Native),
    Loaded(Arc<dyn ValueLoader>),
    Sequence(Arc<[Value]>),
    NullSequence,
}

/// A typed datum. The type never changes after construction.
#[derive(Clone)]
pub struct Value {
    value_type: ValueType,
    content: Content,
}

impl Value {
    pub(crate) fn null(value_type: ValueType) -> Self {
        Self {
            value_type,
            content: Content::Null,
        }
    }

    pub(crate) fn null_sequence(value_type: ValueType) -> Self {
        Self {
            value_type,
            content: Content::NullSequence,
        }
    }

    /// Datetimes are cut to whole milliseconds, the precision of their text form
    pub(crate) fn scalar(value_type: ValueType, native: Native) -> Self {
        let native = match native {
            Native::DateTime(dt) => Native::DateTime(dt.trunc_subsecs(3)),
            other => other,
        };
        Self {
            value_type,
            content: Content::Scalar(native),
        }
    }

    pub(crate) fn sequence(value_type: ValueType, elements: Vec<Value>) -> Self {
        Self {
            value_type,
            content: Content::Sequence(elements.into()),
        }
    }

    /// A binary value whose bytes are fetched through `loader` when read
    pub fn binary_loader(loader: Arc<dyn ValueLoader>) -> Self {
        Self {
            value_type: ValueType::Binary,
            content: Content::Loaded(loader),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::scalar(ValueType::Text, Native::Text(s.into()))
    }

    pub fn integer(i: i64) -> Self {
        Self::scalar(ValueType::Integer, Native::Integer(i))
    }

    pub fn decimal(d: f64) -> Self {
        Self::scalar(ValueType::Decimal, Native::Decimal(d))
    }

    pub fn boolean(b: bool) -> Self {
        Self::scalar(ValueType::Boolean, Native::Boolean(b))
    }

    pub fn date(d: NaiveDate) -> Self {
        Self::scalar(ValueType::Date, Native::Date(d))
    }

    pub fn date_time(dt: DateTime<Utc>) -> Self {
        Self::scalar(ValueType::DateTime, Native::DateTime(dt))
    }

    /// A datetime from milliseconds since the Unix epoch
    pub fn from_millis(millis: i64) -> Result<Self> {
        DateTime::from_timestamp_millis(millis)
            .map(Self::date_time)
            .ok_or_else(|| {
                Error::conversion(
                    ValueType::Integer,
                    ValueType::DateTime,
                    format!("{} ms is out of range", millis),
                )
            })
    }

    pub fn locale(l: Locale) -> Self {
        Self::scalar(ValueType::Locale, Native::Locale(l))
    }

    pub fn binary(bytes: Vec<u8>) -> Self {
        Self::scalar(ValueType::Binary, Native::Binary(bytes))
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_null(&self) -> bool {
        match &self.content {
            Content::Null | Content::NullSequence => true,
            Content::Loaded(loader) => loader.is_null(),
            Content::Scalar(_) | Content::Sequence(_) => false,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.content, Content::Sequence(_) | Content::NullSequence)
    }

    /// Elements of a non-null sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match &self.content {
            Content::Sequence(elements) => Some(&elements[..]),
            _ => None,
        }
    }

    /// Number of elements: 0 for null, 1 for a scalar
    pub fn size(&self) -> usize {
        match &self.content {
            Content::Sequence(elements) => elements.len(),
            _ if self.is_null() => 0,
            _ => 1,
        }
    }

    /// The scalar payload, loading it if needed. `None` for nulls and sequences.
    pub fn native(&self) -> Result<Option<Cow<'_, Native>>> {
        match &self.content {
            Content::Scalar(native) => Ok(Some(Cow::Borrowed(native))),
            Content::Loaded(loader) if !loader.is_null() => {
                let native = loader.load()?;
                if native.natural_type() != self.value_type {
                    return Err(Error::conversion(
                        native.natural_type(),
                        self.value_type,
                        "loader returned a payload of the wrong type",
                    ));
                }
                Ok(Some(Cow::Owned(native)))
            }
            _ => Ok(None),
        }
    }

    // Only binary values are loaded, so typed accessors other than
    // `as_bytes` never need to go through the loader.
    fn inline(&self) -> Option<&Native> {
        match &self.content {
            Content::Scalar(native) => Some(native),
            _ => None,
        }
    }

    /// Payload used for equality and hashing. A loader that fails is
    /// identified by its address instead.
    fn payload(&self) -> std::result::Result<Option<Cow<'_, Native>>, usize> {
        match &self.content {
            Content::Loaded(loader) => self
                .native()
                .map_err(|_| Arc::as_ptr(loader) as *const () as usize),
            _ => Ok(self.native().ok().flatten()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self.inline() {
            Some(Native::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.inline() {
            Some(Native::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self.inline() {
            Some(Native::Decimal(d)) => Some(*d),
            Some(Native::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self.inline() {
            Some(Native::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self.inline() {
            Some(Native::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self.inline() {
            Some(Native::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_locale(&self) -> Option<&Locale> {
        match self.inline() {
            Some(Native::Locale(l)) => Some(l),
            _ => None,
        }
    }

    /// Binary payload, loading it if the value is backed by a [`ValueLoader`]
    pub fn as_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self.native()? {
            Some(native) => match native.into_owned() {
                Native::Binary(bytes) => Ok(Some(bytes)),
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Text form through the value's own type; `None` for null
    pub fn to_text(&self) -> Result<Option<String>> {
        self.value_type.format(self)
    }

    /// Boolean negation. Null passes through; other types are rejected.
    pub fn not(&self) -> Result<Value> {
        if self.value_type != ValueType::Boolean {
            return Err(Error::Unsupported(format!(
                "'not' is only defined for boolean values, got {}",
                self.value_type
            )));
        }
        if self.is_sequence() {
            return Err(Error::Unsupported(
                "'not' is not defined for sequences".to_string(),
            ));
        }
        match self.native()? {
            Some(native) => match &*native {
                Native::Boolean(b) => Ok(Value::boolean(!b)),
                _ => Ok(self.clone()),
            },
            None => Ok(self.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.value_type != other.value_type {
            return false;
        }
        match (&self.content, &other.content) {
            (Content::Null, Content::Null) => true,
            (Content::NullSequence, Content::NullSequence) => true,
            (Content::Sequence(a), Content::Sequence(b)) => a == b,
            (Content::Sequence(_) | Content::NullSequence, _)
            | (_, Content::Sequence(_) | Content::NullSequence) => false,
            // Scalars, loaded or inline, compare by payload
            _ => self.payload() == other.payload(),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type.hash(state);
        match &self.content {
            Content::NullSequence => 0u8.hash(state),
            Content::Sequence(elements) => {
                1u8.hash(state);
                elements.hash(state);
            }
            Content::Null | Content::Scalar(_) | Content::Loaded(_) => {
                2u8.hash(state);
                self.payload().hash(state);
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            Content::Null => write!(f, "null::<{}>", self.value_type),
            Content::NullSequence => write!(f, "null[]::<{}>", self.value_type),
            Content::Scalar(native) => write!(f, "{:?}::<{}>", native, self.value_type),
            Content::Sequence(elements) => {
                f.debug_list().entries(elements.iter()).finish()?;
                write!(f, "::<{}>", self.value_type)
            }
            Content::Loaded(_) => write!(f, "<loaded>::<{}>", self.value_type),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(Some(text)) => write!(f, "{}", text),
            Ok(None) => Ok(()),
            Err(_) => write!(f, "<unreadable {}>", self.value_type),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::decimal(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

/// Encode sequence elements as a JSON array of their text forms (null stays null)
pub(crate) fn encode_sequence(elements: &[Value]) -> Result<String> {
    let items = elements
        .iter()
        .map(|e| {
            Ok(match e.to_text()? {
                Some(text) => serde_json::Value::String(text),
                None => serde_json::Value::Null,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    serde_json::to_string(&items).map_err(|e| Error::Backend(e.into()))
}

/// Decode the text produced by [`encode_sequence`] into values of `value_type`
pub(crate) fn decode_sequence(value_type: ValueType, text: &str) -> Result<Vec<Value>> {
    let fail = |reason: String| Error::conversion(ValueType::Text, value_type, reason);
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| fail(format!("sequence is not a JSON array: {}", e)))?;
    let items = match parsed {
        serde_json::Value::Array(items) => items,
        _ => return Err(fail("sequence is not a JSON array".to_string())),
    };
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Null => Ok(value_type.null_value()),
            serde_json::Value::String(s) => value_type.value_of_str(&s),
            serde_json::Value::Number(n) => value_type.value_of_str(&n.to_string()),
            serde_json::Value::Bool(b) => value_type.value_of_str(&b.to_string()),
            other => Err(fail(format!("unsupported sequence element: {}", other))),
        })
        .collect()
}
