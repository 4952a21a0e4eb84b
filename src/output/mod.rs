//! Output formatting for value tables

mod json;
mod terminal;

use std::io::Write;

use anyhow::Result;

use crate::config::OutputFormat;
use crate::model::ValueTable;

pub use json::JsonOutput;
pub use terminal::TerminalOutput;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render every visible row of a table to a writer
    fn render(&self, table: &dyn ValueTable, writer: &mut dyn Write) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new()),
            OutputFormat::Json => Box::new(JsonOutput::new()),
        }
    }
}

/// Render a table to stdout
pub fn render_to_stdout(table: &dyn ValueTable, format: OutputFormat) -> Result<()> {
    let formatter = OutputFactory::create(format);
    let mut stdout = std::io::stdout();
    formatter.render(table, &mut stdout)
}
