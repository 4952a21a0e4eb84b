//! Ordered filter chains

use super::{Filter, FilterState, StateEnvelope};

/// An ordered list of filters folded over each item
pub struct FilterChain<T> {
    filters: Vec<Box<dyn Filter<T>>>,
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FilterChain<T> {
    /// An empty chain lets every item through
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Append a filter
    pub fn with<F: Filter<T> + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, filter: Box<dyn Filter<T>>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Final state of `item` after every filter has run
    pub fn state_of(&self, item: &T) -> FilterState {
        self.filters
            .iter()
            .fold(FilterState::In, |state, filter| {
                super::transition(filter.as_ref(), state, item)
            })
    }

    pub fn accepts(&self, item: &T) -> bool {
        self.state_of(item) == FilterState::In
    }

    /// The item back if it ends up in, `None` if it was dropped
    pub fn filter(&self, item: T) -> Option<T> {
        self.filters
            .iter()
            .fold(StateEnvelope::new(item), |envelope, filter| {
                envelope.apply(filter.as_ref())
            })
            .into_item()
    }

    /// Lazily keep the items the chain accepts
    pub fn filter_all<'a, I>(&'a self, items: I) -> impl Iterator<Item = T> + 'a
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        items.into_iter().filter_map(move |item| self.filter(item))
    }
}

/// Several chains run one after another; an item must survive all of them
pub struct CompositeFilterChain<T> {
    chains: Vec<FilterChain<T>>,
}

impl<T> Default for CompositeFilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompositeFilterChain<T> {
    pub fn new() -> Self {
        Self { chains: Vec::new() }
    }

    pub fn with(mut self, chain: FilterChain<T>) -> Self {
        self.chains.push(chain);
        self
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn accepts(&self, item: &T) -> bool {
        self.chains.iter().all(|chain| chain.accepts(item))
    }

    /// Stops at the first chain that drops the item
    pub fn filter(&self, item: T) -> Option<T> {
        self.chains
            .iter()
            .try_fold(item, |item, chain| chain.filter(item))
    }
}
