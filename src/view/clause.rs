//! Column and row predicates used by views

use crate::error::Result;
use crate::filter::FilterChain;
use crate::model::{ValueSet, ValueTable, Variable};

/// Decides which source variables pass through a view
pub trait SelectClause: Send + Sync {
    fn select(&self, variable: &Variable) -> bool;
}

/// Decides which source rows are visible through a view
pub trait WhereClause: Send + Sync {
    /// `table` is the view's source table, for clauses that read values
    fn accepts(&self, value_set: &ValueSet, table: &dyn ValueTable) -> Result<bool>;
}

/// Lets everything through
#[derive(Debug, Clone, Copy, Default)]
pub struct AllClause;

/// Lets nothing through
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneClause;

impl SelectClause for AllClause {
    fn select(&self, _variable: &Variable) -> bool {
        true
    }
}

impl WhereClause for AllClause {
    fn accepts(&self, _value_set: &ValueSet, _table: &dyn ValueTable) -> Result<bool> {
        Ok(true)
    }
}

impl SelectClause for NoneClause {
    fn select(&self, _variable: &Variable) -> bool {
        false
    }
}

impl WhereClause for NoneClause {
    fn accepts(&self, _value_set: &ValueSet, _table: &dyn ValueTable) -> Result<bool> {
        Ok(false)
    }
}

impl<F> SelectClause for F
where
    F: Fn(&Variable) -> bool + Send + Sync,
{
    fn select(&self, variable: &Variable) -> bool {
        self(variable)
    }
}

impl<F> WhereClause for F
where
    F: Fn(&ValueSet) -> bool + Send + Sync,
{
    fn accepts(&self, value_set: &ValueSet, _table: &dyn ValueTable) -> Result<bool> {
        Ok(self(value_set))
    }
}

impl SelectClause for FilterChain<Variable> {
    fn select(&self, variable: &Variable) -> bool {
        self.accepts(variable)
    }
}

impl WhereClause for FilterChain<ValueSet> {
    fn accepts(&self, value_set: &ValueSet, _table: &dyn ValueTable) -> Result<bool> {
        Ok(FilterChain::accepts(self, value_set))
    }
}

/// Row clause reading the source row's values, e.g. `age >= 18`
pub struct ValueWhereClause<F> {
    predicate: F,
}

impl<F> ValueWhereClause<F>
where
    F: Fn(&ValueSet, &dyn ValueTable) -> Result<bool> + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> WhereClause for ValueWhereClause<F>
where
    F: Fn(&ValueSet, &dyn ValueTable) -> Result<bool> + Send + Sync,
{
    fn accepts(&self, value_set: &ValueSet, table: &dyn ValueTable) -> Result<bool> {
        (self.predicate)(value_set, table)
    }
}
