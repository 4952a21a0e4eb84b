//! Configuration handling for datavirt

use std::path::PathBuf;

/// Output format for rendered tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// How to compose tables of a datasource into the table that gets shown
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Path to the datasource descriptor
    pub source: PathBuf,
    /// Tables to read; several tables are joined in this order
    pub tables: Vec<String>,
    /// Name of the resulting view (defaults to the table or join name)
    pub view_name: Option<String>,
    /// Only keep variables whose name matches this pattern
    pub select: Option<String>,
    /// Drop variables whose name matches this pattern
    pub exclude: Option<String>,
    /// Entity identifiers to hide
    pub exclude_entities: Vec<String>,
    /// Joined tables every entity must be present in
    pub inner_tables: Vec<String>,
    /// Output format
    pub output_format: OutputFormat,
}

impl Config {
    /// Create a new Config reading the given tables from a descriptor
    pub fn new(source: PathBuf, tables: Vec<String>) -> Self {
        Self {
            source,
            tables,
            ..Default::default()
        }
    }

    /// Set the resulting view name
    pub fn with_view_name(mut self, name: String) -> Self {
        self.view_name = Some(name);
        self
    }

    /// Set the variable name pattern to keep
    pub fn with_select(mut self, pattern: String) -> Self {
        self.select = Some(pattern);
        self
    }

    /// Set the variable name pattern to drop
    pub fn with_exclude(mut self, pattern: String) -> Self {
        self.exclude = Some(pattern);
        self
    }

    /// Set entity identifiers to hide
    pub fn with_exclude_entities(mut self, identifiers: Vec<String>) -> Self {
        self.exclude_entities = identifiers;
        self
    }

    /// Set the inner join members
    pub fn with_inner_tables(mut self, tables: Vec<String>) -> Self {
        self.inner_tables = tables;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}
