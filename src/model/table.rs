//! Capability sets shared by physical and virtual tables

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::entity::VariableEntity;
use super::value::Value;
use super::value_type::ValueType;
use super::variable::Variable;

/// Creation and last-update instants, each a nullable datetime value
pub trait Timestamps: Send + Sync {
    fn created(&self) -> Value;

    fn last_update(&self) -> Value;
}

/// Timestamps known up front
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTimestamps {
    created: Value,
    last_update: Value,
}

impl StaticTimestamps {
    pub fn new(created: Value, last_update: Value) -> Self {
        Self {
            created,
            last_update,
        }
    }

    /// Both instants unknown
    pub fn null() -> Self {
        Self::new(
            ValueType::DateTime.null_value(),
            ValueType::DateTime.null_value(),
        )
    }
}

impl Default for StaticTimestamps {
    fn default() -> Self {
        Self::null()
    }
}

impl Timestamps for StaticTimestamps {
    fn created(&self) -> Value {
        self.created.clone()
    }

    fn last_update(&self) -> Value {
        self.last_update.clone()
    }
}

/// One row: an entity within one table
#[derive(Clone)]
pub struct ValueSet {
    table: String,
    entity: VariableEntity,
    timestamps: Arc<dyn Timestamps>,
    wrapped: Option<Arc<ValueSet>>,
}

impl ValueSet {
    pub fn new(
        table: impl Into<String>,
        entity: VariableEntity,
        timestamps: Arc<dyn Timestamps>,
    ) -> Self {
        Self {
            table: table.into(),
            entity,
            timestamps,
            wrapped: None,
        }
    }

    /// Re-home a row from an underlying table, keeping it reachable for delegation
    pub fn wrap(table: impl Into<String>, inner: ValueSet) -> Self {
        Self {
            table: table.into(),
            entity: inner.entity.clone(),
            timestamps: Arc::clone(&inner.timestamps),
            wrapped: Some(Arc::new(inner)),
        }
    }

    pub fn with_timestamps(mut self, timestamps: Arc<dyn Timestamps>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Name of the table this row was obtained from
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn entity(&self) -> &VariableEntity {
        &self.entity
    }

    pub fn timestamps(&self) -> &Arc<dyn Timestamps> {
        &self.timestamps
    }

    /// The underlying row this one was wrapped from, if any
    pub fn wrapped(&self) -> Option<&ValueSet> {
        self.wrapped.as_deref()
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSet")
            .field("table", &self.table)
            .field("entity", &self.entity)
            .field("wrapped", &self.wrapped)
            .finish()
    }
}

pub type EntityIter<'a> = Box<dyn Iterator<Item = VariableEntity> + 'a>;
pub type VariableIter<'a> = Box<dyn Iterator<Item = Arc<Variable>> + 'a>;
pub type ValueSetIter<'a> = Box<dyn Iterator<Item = Result<ValueSet>> + 'a>;

/// A named set of rows for one entity type, physical or virtual
pub trait ValueTable: Send + Sync {
    fn name(&self) -> &str;

    fn entity_type(&self) -> &str;

    /// Entities with a row in this table, pulled lazily
    fn entities(&self) -> EntityIter<'_>;

    fn variables(&self) -> VariableIter<'_>;

    fn has_value_set(&self, entity: &VariableEntity) -> bool;

    /// The row for `entity`, or `NoSuchValueSet` when it is not visible
    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet>;

    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value>;

    fn timestamps(&self) -> Arc<dyn Timestamps>;

    fn datasource(&self) -> Option<&str> {
        None
    }

    fn is_view(&self) -> bool {
        false
    }

    fn is_for_entity_type(&self, entity_type: &str) -> bool {
        self.entity_type() == entity_type
    }

    fn value_sets(&self) -> ValueSetIter<'_> {
        Box::new(self.entities().map(move |e| self.value_set(&e)))
    }

    fn entity_count(&self) -> usize {
        self.entities().count()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables().any(|v| v.name() == name)
    }

    fn variable(&self, name: &str) -> Result<Arc<Variable>> {
        self.variables()
            .find(|v| v.name() == name)
            .ok_or_else(|| Error::no_such_variable(self.name(), name))
    }
}

impl fmt::Debug for dyn ValueTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTable")
            .field("name", &self.name())
            .field("entity_type", &self.entity_type())
            .finish()
    }
}

/// A named collection of value tables
pub trait Datasource: Send + Sync {
    fn name(&self) -> &str;

    /// Backend kind, e.g. `static`
    fn kind(&self) -> &str;

    fn value_tables(&self) -> Vec<Arc<dyn ValueTable>>;

    fn value_table(&self, name: &str) -> Result<Arc<dyn ValueTable>> {
        self.value_tables()
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| Error::NoSuchValueTable {
                datasource: self.name().to_string(),
                name: name.to_string(),
            })
    }

    fn has_value_table(&self, name: &str) -> bool {
        self.value_tables().iter().any(|t| t.name() == name)
    }
}

/// Values of one variable
pub trait VariableValueSource: Send + Sync {
    fn variable(&self) -> Arc<Variable>;

    fn value_type(&self) -> ValueType {
        self.variable().value_type()
    }

    fn value(&self, value_set: &ValueSet) -> Result<Value>;

    /// Bulk access, when the source supports it
    fn as_vector_source(&self) -> Option<&dyn VectorSource> {
        None
    }
}

/// Bulk retrieval of one variable's values across many entities.
/// Yields one value per requested entity, in order; absent rows give null.
pub trait VectorSource: Send + Sync {
    fn values<'a>(
        &'a self,
        entities: &'a [VariableEntity],
    ) -> Box<dyn Iterator<Item = Result<Value>> + 'a>;
}

/// Value source reading one variable through any table
pub struct TableValueSource {
    table: Arc<dyn ValueTable>,
    variable: Arc<Variable>,
}

impl TableValueSource {
    pub fn new(table: Arc<dyn ValueTable>, variable_name: &str) -> Result<Self> {
        let variable = table.variable(variable_name)?;
        Ok(Self { table, variable })
    }

    pub fn table(&self) -> &Arc<dyn ValueTable> {
        &self.table
    }
}

impl VariableValueSource for TableValueSource {
    fn variable(&self) -> Arc<Variable> {
        Arc::clone(&self.variable)
    }

    fn value(&self, value_set: &ValueSet) -> Result<Value> {
        self.table.value(&self.variable, value_set)
    }

    fn as_vector_source(&self) -> Option<&dyn VectorSource> {
        Some(self)
    }
}

impl VectorSource for TableValueSource {
    fn values<'a>(
        &'a self,
        entities: &'a [VariableEntity],
    ) -> Box<dyn Iterator<Item = Result<Value>> + 'a> {
        Box::new(entities.iter().map(move |entity| {
            if !self.table.has_value_set(entity) {
                return Ok(self.variable.null_value());
            }
            let value_set = self.table.value_set(entity)?;
            self.table.value(&self.variable, &value_set)
        }))
    }
}
