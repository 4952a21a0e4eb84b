//! JSON descriptor of a static datasource
//!
//! ```json
//! {
//!   "name": "study",
//!   "tables": [{
//!     "name": "visits",
//!     "entity_type": "Participant",
//!     "variables": [
//!       { "name": "age", "value_type": "integer", "unit": "year" },
//!       { "name": "tags", "value_type": "text", "repeatable": true }
//!     ],
//!     "entities": [
//!       { "id": "p1", "created": "2020-01-01", "values": { "age": 42, "tags": ["a", "b"] } }
//!     ]
//!   }]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::model::{Attribute, Category, Locale, StaticTimestamps, Value, ValueType, Variable};

use super::{StaticDatasource, StaticValueTable};

#[derive(Debug, Deserialize)]
struct DatasourceDescriptor {
    name: String,
    #[serde(default)]
    tables: Vec<TableDescriptor>,
}

#[derive(Debug, Deserialize)]
struct TableDescriptor {
    name: String,
    entity_type: String,
    created: Option<String>,
    updated: Option<String>,
    #[serde(default)]
    variables: Vec<VariableDescriptor>,
    #[serde(default)]
    entities: Vec<EntityDescriptor>,
}

#[derive(Debug, Deserialize)]
struct VariableDescriptor {
    name: String,
    value_type: ValueType,
    #[serde(default)]
    repeatable: bool,
    unit: Option<String>,
    mime_type: Option<String>,
    occurrence_group: Option<String>,
    referenced_entity_type: Option<String>,
    #[serde(default)]
    categories: Vec<CategoryDescriptor>,
    #[serde(default)]
    attributes: Vec<AttributeDescriptor>,
}

#[derive(Debug, Deserialize)]
struct CategoryDescriptor {
    name: String,
    code: Option<String>,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    attributes: Vec<AttributeDescriptor>,
}

#[derive(Debug, Deserialize)]
struct AttributeDescriptor {
    name: String,
    value: String,
    namespace: Option<String>,
    locale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntityDescriptor {
    id: String,
    created: Option<String>,
    updated: Option<String>,
    #[serde(default)]
    values: serde_json::Map<String, JsonValue>,
}

/// Read a datasource descriptor file
pub fn load_descriptor(path: &Path) -> Result<StaticDatasource> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor: {}", path.display()))?;
    parse_descriptor(&text)
}

/// Build a datasource from descriptor text
pub fn parse_descriptor(text: &str) -> Result<StaticDatasource> {
    let descriptor: DatasourceDescriptor =
        serde_json::from_str(text).context("Failed to parse descriptor JSON")?;

    let mut datasource = StaticDatasource::new(descriptor.name);
    for table in descriptor.tables {
        datasource = datasource.with_table(build_table(table)?);
    }
    Ok(datasource)
}

fn build_table(descriptor: TableDescriptor) -> Result<StaticValueTable> {
    let mut variables = Vec::with_capacity(descriptor.variables.len());
    for v in descriptor.variables {
        variables.push(build_variable(v, &descriptor.entity_type)?);
    }

    let mut builder = StaticValueTable::builder(&descriptor.name, &descriptor.entity_type)
        .timestamps(timestamps(descriptor.created, descriptor.updated)?);
    for variable in &variables {
        builder = builder.variable(variable.clone());
    }

    for entity in descriptor.entities {
        builder = builder
            .entity(&entity.id)
            .row_timestamps(&entity.id, timestamps(entity.created, entity.updated)?);
        for (name, json) in &entity.values {
            let variable = variables
                .iter()
                .find(|v| v.name() == name.as_str())
                .ok_or_else(|| Error::no_such_variable(&descriptor.name, name))?;
            builder = builder.value(&entity.id, name, json_to_value(json, variable)?);
        }
    }
    builder.build()
}

fn build_variable(descriptor: VariableDescriptor, entity_type: &str) -> Result<Variable> {
    let mut builder = Variable::builder(descriptor.name, descriptor.value_type, entity_type)
        .repeatable(descriptor.repeatable);
    if let Some(unit) = descriptor.unit {
        builder = builder.unit(unit);
    }
    if let Some(mime_type) = descriptor.mime_type {
        builder = builder.mime_type(mime_type);
    }
    if let Some(group) = descriptor.occurrence_group {
        builder = builder.occurrence_group(group);
    }
    if let Some(referenced) = descriptor.referenced_entity_type {
        builder = builder.referenced_entity_type(referenced);
    }
    for c in descriptor.categories {
        let mut category = Category::new(c.name).missing(c.missing);
        if let Some(code) = c.code {
            category = category.with_code(code);
        }
        for a in c.attributes {
            category = category.with_attribute(build_attribute(a)?);
        }
        builder = builder.category(category);
    }
    for a in descriptor.attributes {
        builder = builder.attribute(build_attribute(a)?);
    }
    Ok(builder.build())
}

fn build_attribute(descriptor: AttributeDescriptor) -> Result<Attribute> {
    let mut attribute = Attribute::new(descriptor.name, descriptor.value);
    if let Some(namespace) = descriptor.namespace {
        attribute = attribute.with_namespace(namespace);
    }
    if let Some(locale) = descriptor.locale {
        attribute = attribute.with_locale(locale.parse::<Locale>()?);
    }
    Ok(attribute)
}

fn timestamps(created: Option<String>, updated: Option<String>) -> Result<StaticTimestamps> {
    let instant = |text: Option<String>| match text {
        Some(text) => ValueType::DateTime.value_of_str(&text),
        None => Ok(ValueType::DateTime.null_value()),
    };
    Ok(StaticTimestamps::new(instant(created)?, instant(updated)?))
}

fn json_to_value(json: &JsonValue, variable: &Variable) -> Result<Value> {
    let value_type = variable.value_type();
    match json {
        JsonValue::Null => Ok(variable.null_value()),
        JsonValue::Array(items) => {
            let elements = items
                .iter()
                .map(|item| scalar(item, value_type))
                .collect::<Result<Vec<_>>>()?;
            value_type.sequence_of(elements)
        }
        other => {
            let value = scalar(other, value_type)?;
            if value.is_null() {
                Ok(variable.null_value())
            } else if variable.is_repeatable() {
                value_type.sequence_of(vec![value])
            } else {
                Ok(value)
            }
        }
    }
}

fn scalar(json: &JsonValue, value_type: ValueType) -> Result<Value> {
    match json {
        JsonValue::Null => Ok(value_type.null_value()),
        JsonValue::String(s) => value_type.value_of_str(s),
        JsonValue::Number(_) | JsonValue::Bool(_) => value_type.value_of_str(&json.to_string()),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::InvalidConfiguration(format!(
            "nested JSON is not a {} value: {}",
            value_type, json
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::model::{AttributeAware, Datasource, Timestamps, ValueTable, VariableEntity};

    const DESCRIPTOR: &str = r#"{
        "name": "study",
        "tables": [{
            "name": "visits",
            "entity_type": "Participant",
            "variables": [
                { "name": "age", "value_type": "integer", "unit": "year",
                  "attributes": [{ "name": "label", "value": "Age", "locale": "en" }],
                  "categories": [{ "name": "888", "missing": true }] },
                { "name": "tags", "value_type": "text", "repeatable": true },
                { "name": "seen", "value_type": "datetime" }
            ],
            "entities": [
                { "id": "p1", "created": "2020-01-01",
                  "values": { "age": 42, "tags": ["a", "b"], "seen": "2021-03-04 05:06:07" } },
                { "id": "p2", "values": { "age": "888", "tags": "solo" } }
            ]
        }]
    }"#;

    #[test]
    fn test_parse_descriptor() {
        let ds = parse_descriptor(DESCRIPTOR).unwrap();
        assert_eq!(ds.name(), "study");
        let visits = ds.value_table("visits").unwrap();
        assert_eq!(visits.entity_count(), 2);

        let age = visits.variable("age").unwrap();
        assert_eq!(age.unit(), Some("year"));
        assert_eq!(age.attribute_text("label").as_deref(), Some("Age"));

        let p1 = visits
            .value_set(&VariableEntity::new("Participant", "p1"))
            .unwrap();
        assert_eq!(visits.value(&age, &p1).unwrap(), Value::integer(42));
        assert_eq!(
            p1.timestamps().created().to_text().unwrap().as_deref(),
            Some("2020-01-01T00:00:00.000+0000")
        );
        let tags = visits.variable("tags").unwrap();
        assert_eq!(visits.value(&tags, &p1).unwrap().size(), 2);

        let p2 = visits
            .value_set(&VariableEntity::new("Participant", "p2"))
            .unwrap();
        let missing = visits.value(&age, &p2).unwrap();
        assert!(age.is_missing_value(&missing));
        assert_eq!(visits.value(&tags, &p2).unwrap().size(), 1);
    }

    #[test]
    fn test_bad_descriptors() {
        let unknown_variable = r#"{ "name": "s", "tables": [{ "name": "t", "entity_type": "P",
            "entities": [{ "id": "1", "values": { "ghost": 1 } }] }] }"#;
        assert!(matches!(
            parse_descriptor(unknown_variable),
            Err(Error::NoSuchVariable { .. })
        ));

        let bad_value = r#"{ "name": "s", "tables": [{ "name": "t", "entity_type": "P",
            "variables": [{ "name": "n", "value_type": "integer" }],
            "entities": [{ "id": "1", "values": { "n": "many" } }] }] }"#;
        assert!(matches!(
            parse_descriptor(bad_value),
            Err(Error::Conversion { .. })
        ));

        assert!(matches!(
            parse_descriptor("not json"),
            Err(Error::Backend(_))
        ));
    }

    #[test]
    fn test_load_descriptor_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DESCRIPTOR.as_bytes()).unwrap();
        let ds = load_descriptor(file.path()).unwrap();
        assert!(ds.has_value_table("visits"));

        let err = load_descriptor(Path::new("/definitely/not/here.json"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to read descriptor"));
    }
}
