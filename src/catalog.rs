//! Named datasources and `datasource.table[:variable]` references

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::model::{Datasource, TableValueSource, ValueTable, VariableValueSource};

/// A parsed `datasource.table` or `datasource.table:variable` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableReference {
    datasource: String,
    table: String,
    variable: Option<String>,
}

impl TableReference {
    pub fn new(datasource: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            datasource: datasource.into(),
            table: table.into(),
            variable: None,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }
}

impl FromStr for TableReference {
    type Err = Error;

    /// The datasource name ends at the first `.`; the variable starts after the first `:`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidConfiguration(format!("invalid table reference '{}'", s));
        let (datasource, rest) = s.split_once('.').ok_or_else(invalid)?;
        let (table, variable) = match rest.split_once(':') {
            Some((table, variable)) => (table, Some(variable)),
            None => (rest, None),
        };
        if datasource.is_empty() || table.is_empty() || variable.is_some_and(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self {
            datasource: datasource.to_string(),
            table: table.to_string(),
            variable: variable.map(str::to_string),
        })
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.datasource, self.table)?;
        if let Some(variable) = &self.variable {
            write!(f, ":{}", variable)?;
        }
        Ok(())
    }
}

/// Registry of datasources by name
#[derive(Default)]
pub struct Catalog {
    datasources: IndexMap<String, Arc<dyn Datasource>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a datasource; names must be unique
    pub fn register(&mut self, datasource: Arc<dyn Datasource>) -> Result<()> {
        let name = datasource.name().to_string();
        if self.datasources.contains_key(&name) {
            return Err(Error::InvalidConfiguration(format!(
                "datasource '{}' is already registered",
                name
            )));
        }
        self.datasources.insert(name, datasource);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Datasource>> {
        self.datasources.shift_remove(name)
    }

    pub fn has_datasource(&self, name: &str) -> bool {
        self.datasources.contains_key(name)
    }

    pub fn datasource(&self, name: &str) -> Result<Arc<dyn Datasource>> {
        self.datasources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchDatasource(name.to_string()))
    }

    pub fn datasources(&self) -> impl Iterator<Item = &Arc<dyn Datasource>> {
        self.datasources.values()
    }

    /// Table named by a `datasource.table` reference; a variable part is ignored
    pub fn value_table(&self, reference: &str) -> Result<Arc<dyn ValueTable>> {
        let reference: TableReference = reference.parse()?;
        self.table_for(&reference)
    }

    /// Value source for a `datasource.table:variable` reference
    pub fn variable_value_source(&self, reference: &str) -> Result<Arc<dyn VariableValueSource>> {
        let reference: TableReference = reference.parse()?;
        let variable = reference.variable().ok_or_else(|| {
            Error::InvalidConfiguration(format!("reference '{}' names no variable", reference))
        })?;
        let table = self.table_for(&reference)?;
        Ok(Arc::new(TableValueSource::new(table, variable)?))
    }

    fn table_for(&self, reference: &TableReference) -> Result<Arc<dyn ValueTable>> {
        self.datasource(reference.datasource())?
            .value_table(reference.table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Value, ValueType, Variable, VariableEntity};
    use crate::source::{StaticDatasource, StaticValueTable};

    fn catalog() -> Catalog {
        let visits = StaticValueTable::builder("visits", "Participant")
            .variable(Variable::builder("age", ValueType::Integer, "Participant").build())
            .value("p1", "age", Value::integer(42))
            .build()
            .unwrap();
        let mut catalog = Catalog::new();
        catalog
            .register(Arc::new(StaticDatasource::new("study").with_table(visits)))
            .unwrap();
        catalog
    }

    #[test]
    fn test_parse_references() {
        let plain: TableReference = "study.visits".parse().unwrap();
        assert_eq!(plain, TableReference::new("study", "visits"));

        let with_variable: TableReference = "study.visits:Admin.Name".parse().unwrap();
        assert_eq!(with_variable.table(), "visits");
        assert_eq!(with_variable.variable(), Some("Admin.Name"));
        assert_eq!(with_variable.to_string(), "study.visits:Admin.Name");

        for bad in ["visits", ".visits", "study.", "study.visits:"] {
            assert!(bad.parse::<TableReference>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_resolve_references() {
        let catalog = catalog();
        let table = catalog.value_table("study.visits").unwrap();
        assert_eq!(table.name(), "visits");

        let source = catalog.variable_value_source("study.visits:age").unwrap();
        let row = table
            .value_set(&VariableEntity::new("Participant", "p1"))
            .unwrap();
        assert_eq!(source.value(&row).unwrap(), Value::integer(42));

        assert!(matches!(
            catalog.value_table("other.visits"),
            Err(Error::NoSuchDatasource(_))
        ));
        assert!(matches!(
            catalog.variable_value_source("study.visits"),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            catalog.variable_value_source("study.visits:height"),
            Err(Error::NoSuchVariable { .. })
        ));
    }

    #[test]
    fn test_register_and_unregister() {
        let mut catalog = catalog();
        assert!(catalog
            .register(Arc::new(StaticDatasource::new("study")))
            .is_err());
        assert!(catalog.unregister("study").is_some());
        assert!(!catalog.has_datasource("study"));
        assert_eq!(catalog.datasources().count(), 0);
    }
}
