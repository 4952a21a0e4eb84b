//! datavirt - Inspect value types and compose virtual tables

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use datavirt::config::{Config, OutputFormat};
use datavirt::output::render_to_stdout;
use datavirt::source::load_descriptor;
use datavirt::view::compose;
use datavirt::ValueType;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Typed values and virtual tables over tabular datasources
#[derive(Parser, Debug)]
#[command(name = "datavirt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the value types
    Types,

    /// Convert a value from one type to another
    Convert {
        /// Value text, in the canonical form of the source type
        text: String,

        /// Target type
        #[arg(long, value_parser = parse_value_type)]
        to: ValueType,

        /// Source type
        #[arg(long, value_parser = parse_value_type, default_value = "text")]
        from: ValueType,
    },

    /// Show a table, or a view over several joined tables, of a datasource descriptor
    Show {
        /// Datasource descriptor (JSON)
        descriptor: PathBuf,

        /// Table(s) to show; several tables are joined in the given order
        #[arg(short, long = "table", required = true)]
        tables: Vec<String>,

        /// Name of the resulting view
        #[arg(long)]
        name: Option<String>,

        /// Only keep variables whose name matches this regular expression
        #[arg(long)]
        select: Option<String>,

        /// Drop variables whose name matches this regular expression
        #[arg(long)]
        exclude: Option<String>,

        /// Entity identifier(s) to hide (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_entity: Vec<String>,

        /// Joined table(s) every entity must be present in
        #[arg(long)]
        inner: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliOutputFormat,
    },
}

fn parse_value_type(s: &str) -> std::result::Result<ValueType, String> {
    ValueType::type_for(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Types => {
            for value_type in ValueType::all() {
                println!(
                    "{:<10} numeric={:<5} datetime={:<5} ordered={}",
                    value_type.name(),
                    value_type.is_numeric(),
                    value_type.is_date_time(),
                    value_type.is_comparable()
                );
            }
        }
        Command::Convert { text, to, from } => {
            let value = from
                .value_of_str(&text)
                .with_context(|| format!("Failed to read '{}' as {}", text, from))?;
            let converted = to
                .convert(&value)
                .with_context(|| format!("Failed to convert '{}' to {}", text, to))?;
            println!("{}", converted);
        }
        Command::Show {
            descriptor,
            tables,
            name,
            select,
            exclude,
            exclude_entity,
            inner,
            format,
        } => {
            let config = Config {
                source: descriptor,
                tables,
                view_name: name,
                select,
                exclude,
                exclude_entities: exclude_entity,
                inner_tables: inner,
                output_format: format.into(),
            };

            let datasource = load_descriptor(&config.source)
                .with_context(|| format!("Failed to load {}", config.source.display()))?;
            let table = compose(&datasource, &config).context("Failed to compose tables")?;
            render_to_stdout(table.as_ref(), config.output_format)?;
        }
    }

    Ok(())
}
