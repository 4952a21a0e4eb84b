//! Filters over rows

use rustc_hash::FxHashSet;

use crate::model::ValueSet;

use super::{Filter, FilterType};

/// Matches rows whose entity identifier is in a fixed set
pub struct EntityIdFilter {
    filter_type: FilterType,
    identifiers: FxHashSet<String>,
}

impl EntityIdFilter {
    pub fn new<I, S>(filter_type: FilterType, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter_type,
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Filter<ValueSet> for EntityIdFilter {
    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn matches(&self, value_set: &ValueSet) -> Option<bool> {
        Some(self.identifiers.contains(value_set.entity().identifier()))
    }

    fn name(&self) -> &str {
        "entity-id"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::FilterChain;
    use crate::model::{StaticTimestamps, VariableEntity};

    fn row(id: &str) -> ValueSet {
        ValueSet::new(
            "visits",
            VariableEntity::new("Participant", id),
            Arc::new(StaticTimestamps::null()),
        )
    }

    #[test]
    fn test_excludes_listed_entities() {
        let chain = FilterChain::new().with(EntityIdFilter::new(FilterType::Exclude, ["p2", "p3"]));
        assert!(chain.accepts(&row("p1")));
        assert!(!chain.accepts(&row("p2")));
        assert!(!chain.accepts(&row("p3")));
    }
}
