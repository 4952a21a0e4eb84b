//! Union of several tables sharing an entity type

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{
    EntityIter, Timestamps, Value, ValueSet, ValueTable, Variable, VariableEntity, VariableIter,
};

use super::timestamps::UnionTimestamps;

struct Member {
    table: Arc<dyn ValueTable>,
    inner: bool,
}

/// Virtual table over an ordered list of members.
///
/// Variables are resolved by name through the first member defining them;
/// same-named variables in later members are shadowed. Rows are the union of
/// the members' rows, restricted to entities held by every inner member.
pub struct JoinTable {
    name: String,
    entity_type: String,
    members: Vec<Member>,
    /// Variable name -> (winning variable, index of the owning member)
    variables: IndexMap<String, (Arc<Variable>, usize)>,
}

impl JoinTable {
    pub fn new(name: impl Into<String>, tables: Vec<Arc<dyn ValueTable>>) -> Result<Self> {
        tables
            .into_iter()
            .fold(JoinTable::builder(name), |builder, table| builder.member(table))
            .build()
    }

    pub fn builder(name: impl Into<String>) -> JoinTableBuilder {
        JoinTableBuilder {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &Arc<dyn ValueTable>> {
        self.members.iter().map(|m| &m.table)
    }

    fn in_inner_members(&self, entity: &VariableEntity) -> bool {
        self.members
            .iter()
            .filter(|m| m.inner)
            .all(|m| m.table.has_value_set(entity))
    }

    /// Member owning the variable named `name`
    fn owner(&self, name: &str) -> Result<(&Arc<Variable>, &Arc<dyn ValueTable>)> {
        self.variables
            .get(name)
            .map(|(variable, index)| (variable, &self.members[*index].table))
            .ok_or_else(|| Error::no_such_variable(&self.name, name))
    }
}

impl ValueTable for JoinTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn entities(&self) -> EntityIter<'_> {
        let mut seen = FxHashSet::default();
        Box::new(
            self.members
                .iter()
                .flat_map(|m| m.table.entities())
                .filter(move |e| seen.insert(e.clone()))
                .filter(move |e| self.in_inner_members(e)),
        )
    }

    fn variables(&self) -> VariableIter<'_> {
        Box::new(self.variables.values().map(|(v, _)| Arc::clone(v)))
    }

    fn has_value_set(&self, entity: &VariableEntity) -> bool {
        self.members.iter().any(|m| m.table.has_value_set(entity)) && self.in_inner_members(entity)
    }

    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet> {
        if !self.has_value_set(entity) {
            return Err(Error::no_such_value_set(&self.name, entity));
        }
        let mut sources: Vec<Arc<dyn Timestamps>> = Vec::new();
        for member in self.members.iter().filter(|m| m.table.has_value_set(entity)) {
            let value_set = member.table.value_set(entity)?;
            sources.push(Arc::clone(value_set.timestamps()));
        }
        Ok(ValueSet::new(
            self.name.clone(),
            entity.clone(),
            Arc::new(UnionTimestamps::new(sources)),
        ))
    }

    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value> {
        let (owned, table) = self.owner(variable.name())?;
        let entity = value_set.entity();
        if !table.has_value_set(entity) {
            return Ok(owned.null_value());
        }
        let row = table.value_set(entity)?;
        table.value(owned, &row)
    }

    fn timestamps(&self) -> Arc<dyn Timestamps> {
        Arc::new(UnionTimestamps::new(
            self.members.iter().map(|m| m.table.timestamps()).collect(),
        ))
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn variable(&self, name: &str) -> Result<Arc<Variable>> {
        self.owner(name).map(|(v, _)| Arc::clone(v))
    }
}

pub struct JoinTableBuilder {
    name: String,
    members: Vec<Member>,
}

impl JoinTableBuilder {
    pub fn member(mut self, table: Arc<dyn ValueTable>) -> Self {
        self.members.push(Member {
            table,
            inner: false,
        });
        self
    }

    /// A member every joined entity must be present in
    pub fn inner_member(mut self, table: Arc<dyn ValueTable>) -> Self {
        self.members.push(Member { table, inner: true });
        self
    }

    pub fn build(self) -> Result<JoinTable> {
        let entity_type = match self.members.first() {
            Some(first) => first.table.entity_type().to_string(),
            None => {
                return Err(Error::InvalidConfiguration(format!(
                    "join '{}' has no member tables",
                    self.name
                )))
            }
        };
        if let Some(odd) = self
            .members
            .iter()
            .find(|m| !m.table.is_for_entity_type(&entity_type))
        {
            return Err(Error::InvalidConfiguration(format!(
                "join '{}' mixes entity types '{}' and '{}' (table '{}')",
                self.name,
                entity_type,
                odd.table.entity_type(),
                odd.table.name()
            )));
        }

        let mut variables: IndexMap<String, (Arc<Variable>, usize)> = IndexMap::new();
        for (index, member) in self.members.iter().enumerate() {
            for variable in member.table.variables() {
                if let Some((_, owner)) = variables.get(variable.name()) {
                    debug!(
                        join = %self.name,
                        variable = variable.name(),
                        shadowed_in = member.table.name(),
                        resolved_by = self.members[*owner].table.name(),
                        "variable shadowed by an earlier member"
                    );
                    continue;
                }
                variables.insert(variable.name().to_string(), (variable, index));
            }
        }

        debug!(
            join = %self.name,
            members = self.members.len(),
            variables = variables.len(),
            "built join table"
        );
        Ok(JoinTable {
            name: self.name,
            entity_type,
            members: self.members,
            variables,
        })
    }
}
