//! Virtual tables: views over one table and joins over several
//!
//! Both [`View`] and [`JoinTable`] implement [`ValueTable`], so they nest freely.

mod clause;
mod compose;
mod join;
mod timestamps;

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{
    merge_attributes, AttributeAware, EntityIter, TableValueSource, Timestamps, Value, ValueSet,
    ValueSetIter, ValueTable, Variable, VariableEntity, VariableIter, VariableValueSource,
};

pub use self::clause::{AllClause, NoneClause, SelectClause, ValueWhereClause, WhereClause};
pub use self::compose::compose;
pub use self::join::{JoinTable, JoinTableBuilder};
pub use self::timestamps::UnionTimestamps;

/// Computes the value of a derived variable for one row.
///
/// This is the hook for expression evaluators; closures taking a
/// [`DerivationContext`] implement it directly.
pub trait ValueDerivation: Send + Sync {
    fn derive(&self, context: &DerivationContext<'_>) -> Result<Value>;
}

impl<F> ValueDerivation for F
where
    F: Fn(&DerivationContext<'_>) -> Result<Value> + Send + Sync,
{
    fn derive(&self, context: &DerivationContext<'_>) -> Result<Value> {
        self(context)
    }
}

/// The row being derived, seen through the view
pub struct DerivationContext<'a> {
    view: &'a View,
    value_set: &'a ValueSet,
}

impl<'a> DerivationContext<'a> {
    pub fn value_set(&self) -> &ValueSet {
        self.value_set
    }

    pub fn entity(&self) -> &VariableEntity {
        self.value_set.entity()
    }

    /// Value of another variable for the same row. Variables of the view come
    /// first; source variables left out by the select clause are read from the
    /// source row.
    pub fn value(&self, name: &str) -> Result<Value> {
        if self.view.has_variable(name) {
            let variable = self.view.variable(name)?;
            return self.view.value(&variable, self.value_set);
        }
        self.source_value(name)
    }

    /// Value of a source variable, even when a derived variable shadows it
    pub fn source_value(&self, name: &str) -> Result<Value> {
        if !self.view.from.has_variable(name) {
            return Err(Error::no_such_variable(&self.view.name, name));
        }
        let variable = self.view.from.variable(name)?;
        self.view
            .from
            .value(&variable, self.view.source_row(self.value_set))
    }
}

struct Derived {
    variable: Arc<Variable>,
    derivation: Arc<dyn ValueDerivation>,
}

/// A virtual table selecting columns and rows of one source table, plus derived columns
pub struct View {
    name: String,
    from: Arc<dyn ValueTable>,
    where_clause: Box<dyn WhereClause>,
    /// Selected source variables not shadowed by a derived one
    passthrough: IndexMap<String, Arc<Variable>>,
    derived: IndexMap<String, Derived>,
}

impl View {
    pub fn builder(name: impl Into<String>, from: Arc<dyn ValueTable>) -> ViewBuilder {
        ViewBuilder {
            name: name.into(),
            from,
            select: Box::new(AllClause),
            where_clause: Box::new(AllClause),
            derived: Vec::new(),
        }
    }

    /// The wrapped table
    pub fn from_table(&self) -> &Arc<dyn ValueTable> {
        &self.from
    }

    pub fn is_derived(&self, name: &str) -> bool {
        self.derived.contains_key(name)
    }

    /// Value source for one of the view's variables
    pub fn variable_value_source(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<Arc<dyn VariableValueSource>> {
        let table: Arc<dyn ValueTable> = Arc::clone(self) as Arc<dyn ValueTable>;
        Ok(Arc::new(TableValueSource::new(table, name)?))
    }

    /// The source row for `entity` if it exists and the where clause accepts it
    fn visible_row(&self, entity: &VariableEntity) -> Result<Option<ValueSet>> {
        if !self.from.has_value_set(entity) {
            return Ok(None);
        }
        let row = self.from.value_set(entity)?;
        if self.where_clause.accepts(&row, self.from.as_ref())? {
            Ok(Some(row))
        } else {
            Ok(None)
        }
    }

    fn source_row<'v>(&self, value_set: &'v ValueSet) -> &'v ValueSet {
        match value_set.wrapped() {
            Some(inner) if value_set.table() == self.name => inner,
            _ => value_set,
        }
    }
}

impl ValueTable for View {
    fn name(&self) -> &str {
        &self.name
    }

    fn entity_type(&self) -> &str {
        self.from.entity_type()
    }

    fn entities(&self) -> EntityIter<'_> {
        Box::new(self.from.entities().filter(move |e| self.has_value_set(e)))
    }

    fn variables(&self) -> VariableIter<'_> {
        Box::new(
            self.passthrough
                .values()
                .cloned()
                .chain(self.derived.values().map(|d| Arc::clone(&d.variable))),
        )
    }

    fn has_value_set(&self, entity: &VariableEntity) -> bool {
        match self.visible_row(entity) {
            Ok(row) => row.is_some(),
            Err(e) => {
                warn!(view = %self.name, %entity, error = %e, "row check failed, hiding row");
                false
            }
        }
    }

    fn value_sets(&self) -> ValueSetIter<'_> {
        Box::new(
            self.from
                .entities()
                .filter_map(move |entity| match self.visible_row(&entity) {
                    Ok(Some(row)) => Some(Ok(ValueSet::wrap(self.name.clone(), row))),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }),
        )
    }

    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet> {
        self.visible_row(entity)?
            .map(|row| ValueSet::wrap(self.name.clone(), row))
            .ok_or_else(|| Error::no_such_value_set(&self.name, entity))
    }

    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value> {
        if let Some(derived) = self.derived.get(variable.name()) {
            let context = DerivationContext {
                view: self,
                value_set,
            };
            let value = derived.derivation.derive(&context)?;
            let value_type = derived.variable.value_type();
            return if value.value_type() == value_type {
                Ok(value)
            } else {
                value_type.convert(&value)
            };
        }
        let source = self
            .passthrough
            .get(variable.name())
            .ok_or_else(|| Error::no_such_variable(&self.name, variable.name()))?;
        self.from.value(source, self.source_row(value_set))
    }

    fn timestamps(&self) -> Arc<dyn Timestamps> {
        self.from.timestamps()
    }

    fn is_view(&self) -> bool {
        true
    }

    fn has_variable(&self, name: &str) -> bool {
        self.passthrough.contains_key(name) || self.derived.contains_key(name)
    }

    fn variable(&self, name: &str) -> Result<Arc<Variable>> {
        if let Some(derived) = self.derived.get(name) {
            return Ok(Arc::clone(&derived.variable));
        }
        self.passthrough
            .get(name)
            .cloned()
            .ok_or_else(|| Error::no_such_variable(&self.name, name))
    }
}

pub struct ViewBuilder {
    name: String,
    from: Arc<dyn ValueTable>,
    select: Box<dyn SelectClause>,
    where_clause: Box<dyn WhereClause>,
    derived: Vec<(Variable, Arc<dyn ValueDerivation>)>,
}

impl ViewBuilder {
    pub fn select<S: SelectClause + 'static>(mut self, clause: S) -> Self {
        self.select = Box::new(clause);
        self
    }

    pub fn where_clause<W: WhereClause + 'static>(mut self, clause: W) -> Self {
        self.where_clause = Box::new(clause);
        self
    }

    /// Add a derived variable computed by a closure. When it declares
    /// `same_as`, it inherits the referenced source variable's attributes,
    /// its own attributes winning.
    pub fn derive<F>(self, variable: Variable, derivation: F) -> Self
    where
        F: Fn(&DerivationContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.derive_with(variable, Arc::new(derivation))
    }

    /// Add a derived variable computed by an external evaluator
    pub fn derive_with(mut self, variable: Variable, derivation: Arc<dyn ValueDerivation>) -> Self {
        self.derived.push((variable, derivation));
        self
    }

    pub fn build(self) -> Result<View> {
        let entity_type = self.from.entity_type().to_string();

        let mut derived: IndexMap<String, Derived> = IndexMap::new();
        for (variable, derivation) in self.derived {
            if variable.entity_type() != entity_type {
                return Err(Error::InvalidConfiguration(format!(
                    "derived variable '{}' is for entity type '{}', view '{}' is for '{}'",
                    variable.name(),
                    variable.entity_type(),
                    self.name,
                    entity_type
                )));
            }
            if derived.contains_key(variable.name()) {
                return Err(Error::InvalidConfiguration(format!(
                    "variable '{}' is derived twice in view '{}'",
                    variable.name(),
                    self.name
                )));
            }
            let mut builder = variable.to_builder().table(self.name.clone());
            if let Some(same_as) = variable.same_as() {
                let referenced = self.from.variable(same_as).map_err(|_| {
                    Error::InvalidConfiguration(format!(
                        "derived variable '{}' refers to unknown variable '{}'",
                        variable.name(),
                        same_as
                    ))
                })?;
                builder = builder.attributes(merge_attributes(
                    referenced.attributes(),
                    variable.attributes(),
                ));
            }
            derived.insert(
                variable.name().to_string(),
                Derived {
                    variable: Arc::new(builder.build()),
                    derivation,
                },
            );
        }

        let mut passthrough = IndexMap::new();
        for variable in self.from.variables() {
            if !self.select.select(&variable) {
                continue;
            }
            if derived.contains_key(variable.name()) {
                debug!(
                    view = %self.name,
                    variable = variable.name(),
                    "source variable shadowed by a derived variable"
                );
                continue;
            }
            passthrough.insert(variable.name().to_string(), variable);
        }

        debug!(
            view = %self.name,
            from = self.from.name(),
            selected = passthrough.len(),
            derived = derived.len(),
            "built view"
        );
        Ok(View {
            name: self.name,
            from: self.from,
            where_clause: self.where_clause,
            passthrough,
            derived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterChain, FilterType, VariableNameFilter};
    use crate::model::{Attribute, ValueType};
    use crate::source::StaticValueTable;

    fn participants() -> Arc<dyn ValueTable> {
        Arc::new(
            StaticValueTable::builder("T", "Participant")
                .variable(
                    Variable::builder("Admin.Name", ValueType::Text, "Participant")
                        .attribute(Attribute::new("label", "Name"))
                        .attribute(Attribute::new("source", "admin"))
                        .build(),
                )
                .variable(Variable::builder("Other.X", ValueType::Integer, "Participant").build())
                .value("1234", "Admin.Name", Value::text("Ann"))
                .value("1234", "Other.X", Value::integer(3))
                .value("5678", "Admin.Name", Value::text("Bob"))
                .value("5678", "Other.X", Value::integer(4))
                .build()
                .unwrap(),
        )
    }

    fn entity(id: &str) -> VariableEntity {
        VariableEntity::new("Participant", id)
    }

    #[test]
    fn test_select_and_where() {
        let view = View::builder("admin", participants())
            .select(|v: &Variable| v.name().starts_with("Admin"))
            .where_clause(|vs: &ValueSet| vs.entity().identifier() != "1234")
            .build()
            .unwrap();

        let names: Vec<_> = view.variables().map(|v| v.name().to_string()).collect();
        assert_eq!(names, vec!["Admin.Name"]);
        let ids: Vec<_> = view.entities().map(|e| e.identifier().to_string()).collect();
        assert_eq!(ids, vec!["5678"]);
        assert!(!view.has_value_set(&entity("1234")));
        assert!(matches!(
            view.value_set(&entity("1234")),
            Err(Error::NoSuchValueSet { .. })
        ));
        assert!(view.is_view());
    }

    #[test]
    fn test_passthrough_value_delegates() {
        let view = View::builder("all", participants()).build().unwrap();
        let row = view.value_set(&entity("5678")).unwrap();
        assert_eq!(row.table(), "all");
        let name = view.variable("Admin.Name").unwrap();
        assert_eq!(view.value(&name, &row).unwrap(), Value::text("Bob"));

        let hidden = View::builder("none", participants())
            .select(NoneClause)
            .build()
            .unwrap();
        assert!(matches!(
            hidden.value(&name, &row),
            Err(Error::NoSuchVariable { .. })
        ));
    }

    #[test]
    fn test_filter_chain_as_select_clause() {
        let chain =
            FilterChain::new().with(VariableNameFilter::prefix(FilterType::Exclude, "Other"));
        let view = View::builder("v", participants()).select(chain).build().unwrap();
        assert!(view.has_variable("Admin.Name"));
        assert!(!view.has_variable("Other.X"));
    }

    #[test]
    fn test_derived_variable_reads_other_variables() {
        let doubled = Variable::builder("Other.X2", ValueType::Integer, "Participant").build();
        let view = View::builder("v", participants())
            .derive(doubled, |ctx| {
                let x = ctx.value("Other.X")?;
                Ok(x.as_integer()
                    .map(|i| Value::integer(i * 2))
                    .unwrap_or_else(|| ValueType::Integer.null_value()))
            })
            .build()
            .unwrap();

        let row = view.value_set(&entity("1234")).unwrap();
        let x2 = view.variable("Other.X2").unwrap();
        assert_eq!(x2.table(), Some("v"));
        assert_eq!(view.value(&x2, &row).unwrap(), Value::integer(6));
    }

    #[test]
    fn test_derived_variable_reads_unselected_source_variables() {
        let doubled = Variable::builder("X2", ValueType::Integer, "Participant").build();
        let view = View::builder("v", participants())
            .select(NoneClause)
            .derive(doubled, |ctx| {
                let x = ctx.value("Other.X")?.as_integer().unwrap_or_default();
                Ok(Value::integer(x * 2))
            })
            .build()
            .unwrap();

        assert!(!view.has_variable("Other.X"));
        let row = view.value_set(&entity("5678")).unwrap();
        let x2 = view.variable("X2").unwrap();
        assert_eq!(view.value(&x2, &row).unwrap(), Value::integer(8));

        let missing = View::builder("w", participants())
            .derive(
                Variable::builder("Z", ValueType::Text, "Participant").build(),
                |ctx| ctx.value("Nope"),
            )
            .build()
            .unwrap();
        let row = missing.value_set(&entity("5678")).unwrap();
        let z = missing.variable("Z").unwrap();
        assert!(matches!(
            missing.value(&z, &row),
            Err(Error::NoSuchVariable { .. })
        ));
    }

    #[test]
    fn test_derived_variable_reads_the_source_column_it_shadows() {
        let upper = Variable::builder("Admin.Name", ValueType::Text, "Participant").build();
        let view = View::builder("v", participants())
            .derive(upper, |ctx| {
                let name = ctx.source_value("Admin.Name")?;
                Ok(Value::text(name.as_text().unwrap_or_default().to_uppercase()))
            })
            .build()
            .unwrap();
        let row = view.value_set(&entity("1234")).unwrap();
        let name = view.variable("Admin.Name").unwrap();
        assert_eq!(view.value(&name, &row).unwrap(), Value::text("ANN"));
    }

    #[test]
    fn test_where_clause_errors_reach_the_caller() {
        // Reading a text column as an integer fails for every row
        let view = View::builder("v", participants())
            .where_clause(ValueWhereClause::new(|vs: &ValueSet, table: &dyn ValueTable| {
                let name = table.variable("Admin.Name")?;
                let number = ValueType::Integer.convert(&table.value(&name, vs)?)?;
                Ok(number.as_integer() == Some(1))
            }))
            .build()
            .unwrap();

        assert!(!view.has_value_set(&entity("1234")));
        assert!(matches!(
            view.value_set(&entity("1234")),
            Err(Error::Conversion { .. })
        ));
        let rows: Vec<_> = view.value_sets().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| matches!(r, Err(Error::Conversion { .. }))));
    }

    #[test]
    fn test_derived_value_is_converted_to_variable_type() {
        let label = Variable::builder("Label", ValueType::Text, "Participant").build();
        let view = View::builder("v", participants())
            .derive(label, |_| Ok(Value::integer(42)))
            .build()
            .unwrap();
        let row = view.value_set(&entity("5678")).unwrap();
        let value = view.value(&view.variable("Label").unwrap(), &row).unwrap();
        assert_eq!(value, Value::text("42"));
    }

    #[test]
    fn test_same_as_merges_attributes() {
        let derived = Variable::builder("Admin.Name", ValueType::Text, "Participant")
            .same_as("Admin.Name")
            .attribute(Attribute::new("label", "Full name"))
            .build();
        let view = View::builder("v", participants())
            .derive(derived, |ctx| {
                Ok(Value::text(ctx.value_set().entity().identifier()))
            })
            .build()
            .unwrap();

        let name = view.variable("Admin.Name").unwrap();
        assert_eq!(name.attribute_text("label").as_deref(), Some("Full name"));
        assert_eq!(name.attribute_text("source").as_deref(), Some("admin"));
        assert_eq!(view.variables().count(), 2);
        assert!(view.is_derived("Admin.Name"));

        let row = view.value_set(&entity("1234")).unwrap();
        assert_eq!(view.value(&name, &row).unwrap(), Value::text("1234"));
    }

    #[test]
    fn test_invalid_derivations() {
        let unknown_ref = Variable::builder("Y", ValueType::Text, "Participant")
            .same_as("Nope")
            .build();
        let err = View::builder("v", participants())
            .derive(unknown_ref, |_| Ok(Value::text("y")))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let wrong_entity = Variable::builder("Y", ValueType::Text, "Sample").build();
        assert!(View::builder("v", participants())
            .derive(wrong_entity, |_| Ok(Value::text("y")))
            .build()
            .is_err());

        let y = Variable::builder("Y", ValueType::Text, "Participant").build();
        assert!(View::builder("v", participants())
            .derive(y.clone(), |_| Ok(Value::text("y")))
            .derive(y, |_| Ok(Value::text("z")))
            .build()
            .is_err());
    }

    #[test]
    fn test_value_source_and_nesting() {
        let inner = View::builder("inner", participants())
            .where_clause(|vs: &ValueSet| vs.entity().identifier() != "1234")
            .build()
            .unwrap();
        let outer = Arc::new(
            View::builder("outer", Arc::new(inner))
                .select(|v: &Variable| v.name() == "Other.X")
                .build()
                .unwrap(),
        );

        let source = outer.variable_value_source("Other.X").unwrap();
        assert_eq!(source.value_type(), ValueType::Integer);
        let entities = vec![entity("1234"), entity("5678")];
        let values: Vec<_> = source
            .as_vector_source()
            .unwrap()
            .values(&entities)
            .collect::<Result<_>>()
            .unwrap();
        assert!(values[0].is_null());
        assert_eq!(values[1], Value::integer(4));
    }
}
