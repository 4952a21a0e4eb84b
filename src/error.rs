//! Error kinds shared by the value model and the table wrappers

use thiserror::Error;

use crate::model::{ValueType, VariableEntity};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown value type: {0}")]
    UnknownValueType(String),

    #[error("Cannot convert {from} to {to}: {reason}")]
    Conversion {
        from: ValueType,
        to: ValueType,
        reason: String,
    },

    #[error("No such variable '{name}' in table '{table}'")]
    NoSuchVariable { table: String, name: String },

    #[error("No value set for {entity} in table '{table}'")]
    NoSuchValueSet {
        table: String,
        entity: VariableEntity,
    },

    #[error("No such value table '{name}' in datasource '{datasource}'")]
    NoSuchValueTable { datasource: String, name: String },

    #[error("No such datasource: {0}")]
    NoSuchDatasource(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Failures raised by a storage backend, wrapped at the boundary.
    #[error("Backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn conversion(from: ValueType, to: ValueType, reason: impl Into<String>) -> Self {
        Error::Conversion {
            from,
            to,
            reason: reason.into(),
        }
    }

    pub(crate) fn no_such_variable(table: &str, name: &str) -> Self {
        Error::NoSuchVariable {
            table: table.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn no_such_value_set(table: &str, entity: &VariableEntity) -> Self {
        Error::NoSuchValueSet {
            table: table.to_string(),
            entity: entity.clone(),
        }
    }
}
