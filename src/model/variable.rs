//! Column metadata: variables, categories and attributes

use std::hash::{Hash, Hasher};

use super::value::Value;
use super::value_type::{Locale, ValueType};

/// Identity of an attribute within its owner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeKey {
    pub namespace: Option<String>,
    pub name: String,
    pub locale: Option<Locale>,
}

/// A named, optionally namespaced and localised, value attached to metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    namespace: Option<String>,
    locale: Option<Locale>,
    value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            locale: None,
            value: value.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    pub fn is_localised(&self) -> bool {
        self.locale.is_some()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn key(&self) -> AttributeKey {
        AttributeKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            locale: self.locale.clone(),
        }
    }

    fn has_key(&self, namespace: Option<&str>, name: &str, locale: Option<&Locale>) -> bool {
        self.name == name
            && self.namespace.as_deref() == namespace
            && self.locale.as_ref() == locale
    }
}

/// Shared lookups for anything carrying attributes
pub trait AttributeAware {
    fn attributes(&self) -> &[Attribute];

    fn has_attributes(&self) -> bool {
        !self.attributes().is_empty()
    }

    /// First attribute with this name outside any namespace, whatever its locale
    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes()
            .iter()
            .find(|a| a.name == name && a.namespace.is_none())
    }

    fn attribute_for(
        &self,
        namespace: Option<&str>,
        name: &str,
        locale: Option<&Locale>,
    ) -> Option<&Attribute> {
        self.attributes()
            .iter()
            .find(|a| a.has_key(namespace, name, locale))
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Text form of the named attribute's value
    fn attribute_text(&self, name: &str) -> Option<String> {
        self.attribute(name).map(|a| a.value.to_string())
    }
}

/// Overlay `declared` on top of `inherited`, one attribute at a time.
/// A declared attribute replaces the inherited one with the same key;
/// inherited attributes with no declared counterpart are kept.
pub fn merge_attributes(inherited: &[Attribute], declared: &[Attribute]) -> Vec<Attribute> {
    let mut merged = inherited.to_vec();
    for attribute in declared {
        match merged.iter_mut().find(|a| a.key() == attribute.key()) {
            Some(slot) => *slot = attribute.clone(),
            None => merged.push(attribute.clone()),
        }
    }
    merged
}

/// One admissible code of a variable
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    name: String,
    code: Option<String>,
    missing: bool,
    attributes: Vec<Attribute>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            missing: false,
            attributes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn missing(mut self, missing: bool) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_missing(&self) -> bool {
        self.missing
    }
}

impl AttributeAware for Category {
    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

/// Schema of one column. Identified by its owning table and its name.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    table: Option<String>,
    value_type: ValueType,
    entity_type: String,
    repeatable: bool,
    unit: Option<String>,
    mime_type: Option<String>,
    occurrence_group: Option<String>,
    referenced_entity_type: Option<String>,
    same_as: Option<String>,
    index: usize,
    categories: Vec<Category>,
    attributes: Vec<Attribute>,
}

impl Variable {
    pub fn builder(
        name: impl Into<String>,
        value_type: ValueType,
        entity_type: impl Into<String>,
    ) -> VariableBuilder {
        VariableBuilder {
            variable: Variable {
                name: name.into(),
                table: None,
                value_type,
                entity_type: entity_type.into(),
                repeatable: false,
                unit: None,
                mime_type: None,
                occurrence_group: None,
                referenced_entity_type: None,
                same_as: None,
                index: 0,
                categories: Vec::new(),
                attributes: Vec::new(),
            },
        }
    }

    /// Start a builder pre-filled with this variable's definition
    pub fn to_builder(&self) -> VariableBuilder {
        VariableBuilder {
            variable: self.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn occurrence_group(&self) -> Option<&str> {
        self.occurrence_group.as_deref()
    }

    pub fn referenced_entity_type(&self) -> Option<&str> {
        self.referenced_entity_type.as_deref()
    }

    /// Name of the variable this one is declared equivalent to
    pub fn same_as(&self) -> Option<&str> {
        self.same_as.as_deref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Null value shaped for this variable: a null sequence when repeatable
    pub fn null_value(&self) -> Value {
        if self.repeatable {
            self.value_type.null_sequence()
        } else {
            self.value_type.null_value()
        }
    }

    /// Whether `value` is null or matches a category flagged as missing.
    /// A sequence is missing only when every element is.
    pub fn is_missing_value(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        if let Some(elements) = value.as_sequence() {
            return elements.iter().all(|e| self.is_missing_value(e));
        }
        let text = value.to_string();
        self.categories
            .iter()
            .any(|c| c.missing && c.name == text)
    }
}

impl AttributeAware for Variable {
    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.name == other.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.name.hash(state);
    }
}

/// Builder for [`Variable`]; the built variable is immutable
#[derive(Debug, Clone)]
pub struct VariableBuilder {
    variable: Variable,
}

impl VariableBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.variable.name = name.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.variable.table = Some(table.into());
        self
    }

    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.variable.repeatable = repeatable;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.variable.unit = Some(unit.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.variable.mime_type = Some(mime_type.into());
        self
    }

    pub fn occurrence_group(mut self, group: impl Into<String>) -> Self {
        self.variable.occurrence_group = Some(group.into());
        self
    }

    pub fn referenced_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.variable.referenced_entity_type = Some(entity_type.into());
        self
    }

    pub fn same_as(mut self, variable_name: impl Into<String>) -> Self {
        self.variable.same_as = Some(variable_name.into());
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.variable.index = index;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.variable.categories.push(category);
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.variable.attributes.push(attribute);
        self
    }

    pub fn attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.variable.attributes = attributes;
        self
    }

    pub fn build(self) -> Variable {
        self.variable
    }
}
