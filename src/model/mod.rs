//! Typed value model and the table capability sets

mod entity;
mod table;
mod value;
mod value_type;
mod variable;

pub use entity::VariableEntity;
pub use table::{
    Datasource, EntityIter, StaticTimestamps, TableValueSource, Timestamps, ValueSet,
    ValueSetIter, ValueTable, VariableIter, VariableValueSource, VectorSource,
};
pub use value::{Value, ValueLoader};
pub use value_type::{Locale, Native, ValueType, DATETIME_FORMAT, DATE_FORMAT};
pub use variable::{
    merge_attributes, Attribute, AttributeAware, AttributeKey, Category, Variable,
    VariableBuilder,
};

pub(crate) use value_type::{parse_big_decimal, parse_decimal};
