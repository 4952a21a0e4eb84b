//! Plain terminal table output

use std::io::Write;

use anyhow::{Context, Result};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::model::ValueTable;

use super::OutputFormatter;

/// Terminal output: a summary line followed by one table row per entity
pub struct TerminalOutput {
    show_header: bool,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self { show_header: true }
    }

    /// Only the table, no summary line
    pub fn bare() -> Self {
        Self { show_header: false }
    }

    fn write_header(
        &self,
        table: &dyn ValueTable,
        rows: usize,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let kind = if table.is_view() { "view" } else { "table" };
        writeln!(
            writer,
            "{} '{}' ({}): {} entities, {} variables",
            kind,
            table.name(),
            table.entity_type(),
            rows,
            table.variables().count()
        )?;
        Ok(())
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(&self, table: &dyn ValueTable, writer: &mut dyn Write) -> Result<()> {
        let variables: Vec<_> = table.variables().collect();

        let mut builder = Builder::default();
        builder.push_record(
            std::iter::once("entity".to_string())
                .chain(variables.iter().map(|v| v.name().to_string())),
        );

        let mut rows = 0;
        for value_set in table.value_sets() {
            let value_set = value_set.context("Failed to read row")?;
            let mut record = vec![value_set.entity().identifier().to_string()];
            for variable in &variables {
                let value = table.value(variable, &value_set).with_context(|| {
                    format!(
                        "Failed to read '{}' for {}",
                        variable.name(),
                        value_set.entity()
                    )
                })?;
                record.push(value.to_text()?.unwrap_or_default());
            }
            builder.push_record(record);
            rows += 1;
        }

        if self.show_header {
            self.write_header(table, rows, writer)?;
        }
        if rows == 0 {
            writeln!(writer, "No rows.")?;
            return Ok(());
        }
        let mut display = builder.build();
        display.with(Style::modern());
        writeln!(writer, "{}", display)?;
        Ok(())
    }
}
