//! Inclusion/exclusion filtering of variables and value sets
//!
//! A [`FilterChain`] folds an ordered list of filters over an item whose state
//! starts as [`FilterState::In`]:
//! * an exclude filter only runs while the item is in, and moves it out when it matches;
//! * an include filter only runs while the item is out, and moves it back in when it matches;
//! * a filter that cannot decide leaves the state untouched.

mod chain;
mod value_set;
mod variable;

use std::marker::PhantomData;

use tracing::warn;

pub use self::chain::{CompositeFilterChain, FilterChain};
pub use self::value_set::EntityIdFilter;
pub use self::variable::{VariableAttributeFilter, VariableNameFilter, VariableValueTypeFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    Exclude,
    Include,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterState {
    In,
    Out,
}

/// A predicate over items that moves them in or out of a result set
pub trait Filter<T>: Send + Sync {
    fn filter_type(&self) -> FilterType;

    /// `Some(true)` when the filter applies to the item, `None` when it cannot tell
    fn matches(&self, item: &T) -> Option<bool>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Next state after running one filter against an item in `state`
pub fn transition<T>(filter: &dyn Filter<T>, state: FilterState, item: &T) -> FilterState {
    let filter_type = filter.filter_type();
    match (filter_type, state) {
        (FilterType::Exclude, FilterState::Out) | (FilterType::Include, FilterState::In) => state,
        _ => match filter.matches(item) {
            Some(true) => match filter_type {
                FilterType::Exclude => FilterState::Out,
                FilterType::Include => FilterState::In,
            },
            Some(false) => state,
            None => {
                warn!(filter = filter.name(), "filter gave no verdict, skipping it");
                state
            }
        },
    }
}

/// An item travelling through a chain together with its current state
#[derive(Debug, Clone)]
pub struct StateEnvelope<T> {
    item: T,
    state: FilterState,
}

impl<T> StateEnvelope<T> {
    pub fn new(item: T) -> Self {
        Self {
            item,
            state: FilterState::In,
        }
    }

    /// Run one filter, yielding the envelope with its next state
    pub fn apply(self, filter: &dyn Filter<T>) -> Self {
        let state = transition(filter, self.state, &self.item);
        Self {
            item: self.item,
            state,
        }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn is_in(&self) -> bool {
        self.state == FilterState::In
    }

    /// The item if it ended up in, `None` if it was dropped
    pub fn into_item(self) -> Option<T> {
        match self.state {
            FilterState::In => Some(self.item),
            FilterState::Out => None,
        }
    }
}

/// Excludes everything; usually followed by include filters
pub struct ExcludeAllFilter<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T> ExcludeAllFilter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ExcludeAllFilter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Filter<T> for ExcludeAllFilter<T> {
    fn filter_type(&self) -> FilterType {
        FilterType::Exclude
    }

    fn matches(&self, _item: &T) -> Option<bool> {
        Some(true)
    }

    fn name(&self) -> &str {
        "exclude-all"
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> Option<bool> + Send + Sync>;

/// Filter backed by an arbitrary predicate, e.g. a scripted expression
pub struct PredicateFilter<T> {
    filter_type: FilterType,
    name: String,
    predicate: Predicate<T>,
}

impl<T> PredicateFilter<T> {
    pub fn new<F>(filter_type: FilterType, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> Option<bool> + Send + Sync + 'static,
    {
        Self {
            filter_type,
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn exclude<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> Option<bool> + Send + Sync + 'static,
    {
        Self::new(FilterType::Exclude, name, predicate)
    }

    pub fn include<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> Option<bool> + Send + Sync + 'static,
    {
        Self::new(FilterType::Include, name, predicate)
    }
}

impl<T> Filter<T> for PredicateFilter<T> {
    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn matches(&self, item: &T) -> Option<bool> {
        (self.predicate)(item)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
