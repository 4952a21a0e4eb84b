//! Building a view from run configuration

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{EntityIdFilter, ExcludeAllFilter, FilterChain, FilterType, VariableNameFilter};
use crate::model::{Datasource, ValueSet, ValueTable, Variable};

use super::{JoinTable, View};

/// Resolve the configured tables of `datasource` and wrap them in a view.
///
/// A single table is viewed directly; several are joined first, in the
/// configured order. Variable patterns and excluded entities become the
/// view's select and where clauses.
pub fn compose(datasource: &dyn Datasource, config: &Config) -> Result<Arc<dyn ValueTable>> {
    if config.tables.is_empty() {
        return Err(Error::InvalidConfiguration(
            "no table to compose".to_string(),
        ));
    }
    if let Some(stray) = config
        .inner_tables
        .iter()
        .find(|name| !config.tables.contains(name))
    {
        return Err(Error::InvalidConfiguration(format!(
            "inner table '{}' is not one of the composed tables",
            stray
        )));
    }

    let base: Arc<dyn ValueTable> = if config.tables.len() == 1 && config.inner_tables.is_empty() {
        datasource.value_table(&config.tables[0])?
    } else {
        let mut builder = JoinTable::builder(config.tables.join("+"));
        for name in &config.tables {
            let table = datasource.value_table(name)?;
            builder = if config.inner_tables.contains(name) {
                builder.inner_member(table)
            } else {
                builder.member(table)
            };
        }
        Arc::new(builder.build()?)
    };

    let view_name = config
        .view_name
        .clone()
        .unwrap_or_else(|| base.name().to_string());
    debug!(datasource = datasource.name(), view = %view_name, "composing view");

    let view = View::builder(view_name, base)
        .select(variable_filters(config)?)
        .where_clause(entity_filters(config))
        .build()?;
    Ok(Arc::new(view))
}

fn variable_filters(config: &Config) -> Result<FilterChain<Variable>> {
    let mut chain = FilterChain::new();
    if let Some(pattern) = &config.select {
        chain = chain
            .with(ExcludeAllFilter::new())
            .with(VariableNameFilter::pattern(FilterType::Include, pattern)?);
    }
    if let Some(pattern) = &config.exclude {
        chain = chain.with(VariableNameFilter::pattern(FilterType::Exclude, pattern)?);
    }
    Ok(chain)
}

fn entity_filters(config: &Config) -> FilterChain<ValueSet> {
    if config.exclude_entities.is_empty() {
        return FilterChain::new();
    }
    FilterChain::new().with(EntityIdFilter::new(
        FilterType::Exclude,
        config.exclude_entities.iter().cloned(),
    ))
}
