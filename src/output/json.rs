//! JSON output format

use std::io::Write;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Native, Value, ValueTable, ValueType};

use super::OutputFormatter;

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonVariable {
    name: String,
    value_type: ValueType,
    repeatable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

#[derive(Serialize)]
struct JsonRow {
    entity: String,
    values: IndexMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct JsonTableOutput {
    table: String,
    entity_type: String,
    is_view: bool,
    variables: Vec<JsonVariable>,
    rows: Vec<JsonRow>,
}

fn value_to_json(value: &Value) -> Result<serde_json::Value> {
    if value.is_null() {
        return Ok(serde_json::Value::Null);
    }
    if let Some(elements) = value.as_sequence() {
        return elements
            .iter()
            .map(value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array);
    }
    let native = value.native()?;
    Ok(match native.as_deref() {
        None => serde_json::Value::Null,
        Some(Native::Integer(i)) => serde_json::json!(*i),
        Some(Native::Decimal(d)) => serde_json::json!(*d),
        Some(Native::Boolean(b)) => serde_json::Value::Bool(*b),
        Some(_) => serde_json::Value::String(value.to_text()?.unwrap_or_default()),
    })
}

impl OutputFormatter for JsonOutput {
    fn render(&self, table: &dyn ValueTable, writer: &mut dyn Write) -> Result<()> {
        let variables: Vec<_> = table.variables().collect();

        let mut rows = Vec::new();
        for value_set in table.value_sets() {
            let value_set = value_set.context("Failed to read row")?;
            let mut values = IndexMap::with_capacity(variables.len());
            for variable in &variables {
                let value = table.value(variable, &value_set)?;
                values.insert(variable.name().to_string(), value_to_json(&value)?);
            }
            rows.push(JsonRow {
                entity: value_set.entity().identifier().to_string(),
                values,
            });
        }

        let output = JsonTableOutput {
            table: table.name().to_string(),
            entity_type: table.entity_type().to_string(),
            is_view: table.is_view(),
            variables: variables
                .iter()
                .map(|v| JsonVariable {
                    name: v.name().to_string(),
                    value_type: v.value_type(),
                    repeatable: v.is_repeatable(),
                    unit: v.unit().map(str::to_string),
                })
                .collect(),
            rows,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
