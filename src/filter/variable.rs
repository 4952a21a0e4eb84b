//! Filters over variable metadata

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{AttributeAware, ValueType, Variable};

use super::{Filter, FilterType};

enum NameMatcher {
    Prefix(String),
    Pattern(Regex),
}

/// Matches variables by name prefix or regular expression
pub struct VariableNameFilter {
    filter_type: FilterType,
    matcher: NameMatcher,
}

impl VariableNameFilter {
    pub fn prefix(filter_type: FilterType, prefix: impl Into<String>) -> Self {
        Self {
            filter_type,
            matcher: NameMatcher::Prefix(prefix.into()),
        }
    }

    /// The pattern is searched anywhere in the name; anchor it to match whole names.
    pub fn pattern(filter_type: FilterType, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            Error::InvalidConfiguration(format!("bad variable pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            filter_type,
            matcher: NameMatcher::Pattern(regex),
        })
    }
}

impl Filter<Variable> for VariableNameFilter {
    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn matches(&self, variable: &Variable) -> Option<bool> {
        Some(match &self.matcher {
            NameMatcher::Prefix(prefix) => variable.name().starts_with(prefix.as_str()),
            NameMatcher::Pattern(regex) => regex.is_match(variable.name()),
        })
    }

    fn name(&self) -> &str {
        "variable-name"
    }
}

/// Matches variables carrying an attribute, optionally with a given text value
pub struct VariableAttributeFilter {
    filter_type: FilterType,
    attribute: String,
    value: Option<String>,
}

impl VariableAttributeFilter {
    pub fn new(filter_type: FilterType, attribute: impl Into<String>) -> Self {
        Self {
            filter_type,
            attribute: attribute.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl Filter<Variable> for VariableAttributeFilter {
    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn matches(&self, variable: &Variable) -> Option<bool> {
        let Some(attribute) = variable.attribute(&self.attribute) else {
            return Some(false);
        };
        match &self.value {
            None => Some(true),
            // an attribute value that cannot be rendered gives no verdict
            Some(expected) => attribute
                .value()
                .to_text()
                .ok()
                .map(|text| text.as_deref() == Some(expected.as_str())),
        }
    }

    fn name(&self) -> &str {
        "variable-attribute"
    }
}

pub struct VariableValueTypeFilter {
    filter_type: FilterType,
    value_type: ValueType,
}

impl VariableValueTypeFilter {
    pub fn new(filter_type: FilterType, value_type: ValueType) -> Self {
        Self {
            filter_type,
            value_type,
        }
    }
}

impl Filter<Variable> for VariableValueTypeFilter {
    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn matches(&self, variable: &Variable) -> Option<bool> {
        Some(variable.value_type() == self.value_type)
    }

    fn name(&self) -> &str {
        "variable-value-type"
    }
}
