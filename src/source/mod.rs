//! In-memory backend and its JSON descriptor loader

mod descriptor;

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::model::{
    Datasource, EntityIter, StaticTimestamps, Timestamps, Value, ValueSet, ValueTable, Variable,
    VariableEntity, VariableIter,
};

pub use self::descriptor::{load_descriptor, parse_descriptor};

struct Row {
    values: FxHashMap<String, Value>,
    timestamps: Arc<dyn Timestamps>,
}

/// A table whose variables and values are all held in memory
pub struct StaticValueTable {
    name: String,
    entity_type: String,
    datasource: Option<String>,
    variables: IndexMap<String, Arc<Variable>>,
    rows: IndexMap<VariableEntity, Row>,
    timestamps: Arc<dyn Timestamps>,
}

impl StaticValueTable {
    pub fn builder(
        name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> StaticValueTableBuilder {
        StaticValueTableBuilder {
            name: name.into(),
            entity_type: entity_type.into(),
            variables: Vec::new(),
            rows: IndexMap::new(),
            timestamps: StaticTimestamps::null(),
        }
    }

    fn row(&self, entity: &VariableEntity) -> Result<&Row> {
        self.rows
            .get(entity)
            .ok_or_else(|| Error::no_such_value_set(&self.name, entity))
    }
}

impl ValueTable for StaticValueTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn entities(&self) -> EntityIter<'_> {
        Box::new(self.rows.keys().cloned())
    }

    fn variables(&self) -> VariableIter<'_> {
        Box::new(self.variables.values().cloned())
    }

    fn has_value_set(&self, entity: &VariableEntity) -> bool {
        self.rows.contains_key(entity)
    }

    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet> {
        let row = self.row(entity)?;
        Ok(ValueSet::new(
            self.name.clone(),
            entity.clone(),
            Arc::clone(&row.timestamps),
        ))
    }

    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value> {
        let variable = self
            .variables
            .get(variable.name())
            .ok_or_else(|| Error::no_such_variable(&self.name, variable.name()))?;
        let row = self.row(value_set.entity())?;
        Ok(row
            .values
            .get(variable.name())
            .cloned()
            .unwrap_or_else(|| variable.null_value()))
    }

    fn timestamps(&self) -> Arc<dyn Timestamps> {
        Arc::clone(&self.timestamps)
    }

    fn datasource(&self) -> Option<&str> {
        self.datasource.as_deref()
    }

    fn entity_count(&self) -> usize {
        self.rows.len()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn variable(&self, name: &str) -> Result<Arc<Variable>> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::no_such_variable(&self.name, name))
    }
}

pub struct StaticValueTableBuilder {
    name: String,
    entity_type: String,
    variables: Vec<Variable>,
    rows: IndexMap<String, (FxHashMap<String, Value>, StaticTimestamps)>,
    timestamps: StaticTimestamps,
}

impl StaticValueTableBuilder {
    /// Declare a variable. It is re-homed to this table and, when it has no
    /// index yet, indexed by declaration order.
    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Declare a row with no values yet
    pub fn entity(mut self, identifier: impl Into<String>) -> Self {
        self.rows
            .entry(identifier.into())
            .or_insert_with(|| (FxHashMap::default(), StaticTimestamps::null()));
        self
    }

    pub fn value(mut self, identifier: impl Into<String>, variable: &str, value: Value) -> Self {
        self.rows
            .entry(identifier.into())
            .or_insert_with(|| (FxHashMap::default(), StaticTimestamps::null()))
            .0
            .insert(variable.to_string(), value);
        self
    }

    /// Creation and last update of one row
    pub fn row_timestamps(
        mut self,
        identifier: impl Into<String>,
        timestamps: StaticTimestamps,
    ) -> Self {
        self.rows
            .entry(identifier.into())
            .or_insert_with(|| (FxHashMap::default(), StaticTimestamps::null()))
            .1 = timestamps;
        self
    }

    /// Creation and last update of the table itself
    pub fn timestamps(mut self, timestamps: StaticTimestamps) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Every value must belong to a declared variable and match its type.
    /// A repeatable variable takes sequences, any other variable scalars;
    /// nulls of either shape are stored as the variable's own null.
    pub fn build(self) -> Result<StaticValueTable> {
        let mut variables: IndexMap<String, Arc<Variable>> = IndexMap::new();
        for (position, variable) in self.variables.into_iter().enumerate() {
            let mut builder = variable.to_builder().table(self.name.clone());
            if variable.index() == 0 {
                builder = builder.index(position + 1);
            }
            variables.insert(variable.name().to_string(), Arc::new(builder.build()));
        }

        let mut rows = IndexMap::with_capacity(self.rows.len());
        for (identifier, (mut values, timestamps)) in self.rows {
            for (name, value) in values.iter_mut() {
                let variable = variables
                    .get(name)
                    .ok_or_else(|| Error::no_such_variable(&self.name, name))?;
                check_value(&self.name, &identifier, variable, value)?;
                if value.is_null() {
                    *value = variable.null_value();
                }
            }
            let row = Row {
                values,
                timestamps: Arc::new(timestamps),
            };
            rows.insert(VariableEntity::new(self.entity_type.clone(), identifier), row);
        }

        Ok(StaticValueTable {
            name: self.name,
            entity_type: self.entity_type,
            datasource: None,
            variables,
            rows,
            timestamps: Arc::new(self.timestamps),
        })
    }
}

fn check_value(table: &str, identifier: &str, variable: &Variable, value: &Value) -> Result<()> {
    let problem = if value.value_type() != variable.value_type() {
        format!("a {} value", value.value_type())
    } else if !value.is_null() && value.is_sequence() != variable.is_repeatable() {
        if variable.is_repeatable() {
            "a scalar".to_string()
        } else {
            "a sequence".to_string()
        }
    } else {
        return Ok(());
    };
    Err(Error::InvalidConfiguration(format!(
        "table '{}', entity '{}': variable '{}' is {}{} but was given {}",
        table,
        identifier,
        variable.name(),
        if variable.is_repeatable() { "repeatable " } else { "" },
        variable.value_type(),
        problem
    )))
}

/// A datasource holding its tables in memory
pub struct StaticDatasource {
    name: String,
    tables: IndexMap<String, Arc<dyn ValueTable>>,
}

impl StaticDatasource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    /// Add a static table, attaching it to this datasource
    pub fn with_table(mut self, mut table: StaticValueTable) -> Self {
        table.datasource = Some(self.name.clone());
        self.tables.insert(table.name.clone(), Arc::new(table));
        self
    }

    /// Add any table, e.g. a view over another datasource's tables
    pub fn add_table(&mut self, table: Arc<dyn ValueTable>) {
        self.tables.insert(table.name().to_string(), table);
    }
}

impl Datasource for StaticDatasource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "static"
    }

    fn value_tables(&self) -> Vec<Arc<dyn ValueTable>> {
        self.tables.values().cloned().collect()
    }

    fn value_table(&self, name: &str) -> Result<Arc<dyn ValueTable>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchValueTable {
                datasource: self.name.clone(),
                name: name.to_string(),
            })
    }

    fn has_value_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    fn table() -> StaticValueTable {
        StaticValueTable::builder("visits", "Participant")
            .variable(Variable::builder("age", ValueType::Integer, "Participant").build())
            .variable(
                Variable::builder("tags", ValueType::Text, "Participant")
                    .repeatable(true)
                    .build(),
            )
            .value("p1", "age", Value::integer(42))
            .entity("p2")
            .row_timestamps(
                "p2",
                StaticTimestamps::new(
                    Value::from_millis(1000).unwrap(),
                    ValueType::DateTime.null_value(),
                ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_variables_are_rehomed_and_indexed() {
        let table = table();
        let tags = table.variable("tags").unwrap();
        assert_eq!(tags.table(), Some("visits"));
        assert_eq!(tags.index(), 2);
        assert!(matches!(
            table.variable("nope"),
            Err(Error::NoSuchVariable { .. })
        ));
    }

    #[test]
    fn test_values_and_missing_values() {
        let table = table();
        let p1 = table
            .value_set(&VariableEntity::new("Participant", "p1"))
            .unwrap();
        let p2 = table
            .value_set(&VariableEntity::new("Participant", "p2"))
            .unwrap();
        let age = table.variable("age").unwrap();
        let tags = table.variable("tags").unwrap();

        assert_eq!(table.value(&age, &p1).unwrap(), Value::integer(42));
        assert!(table.value(&age, &p2).unwrap().is_null());
        assert!(table.value(&tags, &p1).unwrap().is_sequence());
        assert_eq!(
            p2.timestamps().created(),
            Value::from_millis(1000).unwrap()
        );
        assert_eq!(table.entity_count(), 2);
    }

    #[test]
    fn test_absent_entity() {
        let table = table();
        let ghost = VariableEntity::new("Participant", "p9");
        assert!(!table.has_value_set(&ghost));
        assert!(matches!(
            table.value_set(&ghost),
            Err(Error::NoSuchValueSet { .. })
        ));
    }

    #[test]
    fn test_build_checks_values_against_variables() {
        let age = || Variable::builder("age", ValueType::Integer, "Participant").build();

        let undeclared = StaticValueTable::builder("visits", "Participant")
            .variable(age())
            .value("p1", "height", Value::decimal(1.8))
            .build();
        assert!(matches!(undeclared, Err(Error::NoSuchVariable { .. })));

        let wrong_type = StaticValueTable::builder("visits", "Participant")
            .variable(age())
            .value("p1", "age", Value::text("forty"))
            .build();
        assert!(matches!(wrong_type, Err(Error::InvalidConfiguration(_))));

        let scalar_in_repeatable = StaticValueTable::builder("visits", "Participant")
            .variable(
                Variable::builder("tags", ValueType::Text, "Participant")
                    .repeatable(true)
                    .build(),
            )
            .value("p1", "tags", Value::text("a"))
            .build();
        assert!(matches!(scalar_in_repeatable, Err(Error::InvalidConfiguration(_))));

        let sequence_in_scalar = StaticValueTable::builder("visits", "Participant")
            .variable(age())
            .value(
                "p1",
                "age",
                ValueType::Integer.sequence_of(vec![Value::integer(1)]).unwrap(),
            )
            .build();
        assert!(matches!(sequence_in_scalar, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_null_takes_the_variable_shape() {
        let table = StaticValueTable::builder("visits", "Participant")
            .variable(
                Variable::builder("tags", ValueType::Text, "Participant")
                    .repeatable(true)
                    .build(),
            )
            .value("p1", "tags", ValueType::Text.null_value())
            .build()
            .unwrap();
        let p1 = table
            .value_set(&VariableEntity::new("Participant", "p1"))
            .unwrap();
        let tags = table.variable("tags").unwrap();
        assert_eq!(table.value(&tags, &p1).unwrap(), ValueType::Text.null_sequence());
    }

    #[test]
    fn test_datasource_lookup() {
        let ds = StaticDatasource::new("study").with_table(table());
        assert_eq!(ds.kind(), "static");
        assert!(ds.has_value_table("visits"));
        assert_eq!(
            ds.value_table("visits").unwrap().datasource(),
            Some("study")
        );
        assert!(matches!(
            ds.value_table("labs"),
            Err(Error::NoSuchValueTable { .. })
        ));
    }
}
