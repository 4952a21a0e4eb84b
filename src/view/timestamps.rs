//! Timestamps merged across several sources

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::{Timestamps, Value, ValueType};

/// Earliest creation and latest update across sources; null counts as no opinion
pub struct UnionTimestamps {
    sources: Vec<Arc<dyn Timestamps>>,
}

impl UnionTimestamps {
    pub fn new(sources: Vec<Arc<dyn Timestamps>>) -> Self {
        Self { sources }
    }

    fn pick<F>(&self, read: F, later: bool) -> Value
    where
        F: Fn(&dyn Timestamps) -> Value,
    {
        let mut best: Option<(DateTime<Utc>, Value)> = None;
        for source in &self.sources {
            let value = read(source.as_ref());
            let Some(instant) = value.as_date_time() else {
                continue;
            };
            let replace = match &best {
                None => true,
                Some((current, _)) if later => instant > *current,
                Some((current, _)) => instant < *current,
            };
            if replace {
                best = Some((instant, value));
            }
        }
        best.map(|(_, value)| value)
            .unwrap_or_else(|| ValueType::DateTime.null_value())
    }
}

impl Timestamps for UnionTimestamps {
    fn created(&self) -> Value {
        self.pick(|t| t.created(), false)
    }

    fn last_update(&self) -> Value {
        self.pick(|t| t.last_update(), true)
    }
}
