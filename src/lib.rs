//! datavirt - Typed values and virtual tables
//!
//! A closed set of value types with deterministic conversions, and table
//! wrappers (views, joins, filters) that compose any number of physical
//! tables into new tables without copying data.

pub mod catalog;
pub mod config;
pub mod convert;
pub mod error;
pub mod filter;
pub mod model;
pub mod output;
pub mod source;
pub mod view;

pub use catalog::Catalog;
pub use config::Config;
pub use error::{Error, Result};
pub use model::{Value, ValueTable, ValueType, Variable, VariableEntity};
pub use view::{JoinTable, View};
