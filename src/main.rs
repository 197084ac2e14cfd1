use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use sqlite_csv_export::{export, Dialect, ExportConfig, Overrides};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Export a SQLite table or query result to CSV.
#[derive(Debug, Parser)]
#[command(name = "sqlite-csv-export", version, about)]
struct Cli {
    /// Config file (TOML, JSON or YAML) read before environment and flags
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short = 'd', long, value_hint = ValueHint::FilePath)]
    database: Option<PathBuf>,

    /// Export every row of this table
    #[arg(short = 't', long, conflicts_with = "query")]
    table: Option<String>,

    /// Export the result of this SQL statement
    #[arg(short = 'q', long)]
    query: Option<String>,

    /// Output CSV file, or `-` for stdout
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// CSV dialect: `excel` ends records with CRLF, `unix` with LF
    #[arg(long, value_enum)]
    dialect: Option<Dialect>,

    /// Text written for NULL values
    #[arg(long = "null", value_name = "STRING")]
    null_value: Option<String>,

    /// Omit the header record
    #[arg(long)]
    no_header: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            database: self.database.clone(),
            table: self.table.clone(),
            query: self.query.clone(),
            output: self.output.clone(),
            dialect: self.dialect,
            null_value: self.null_value.clone(),
            header: self.no_header.then_some(false),
        }
    }
}

fn main() {
    init_tracing();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ExportConfig::load(cli.config.as_deref(), cli.overrides())
        .context("invalid configuration")?;
    let summary = export(&config).with_context(|| {
        format!(
            "failed to export {} to {}",
            config.database.display(),
            config.output.display()
        )
    })?;
    info!(
        columns = summary.columns.len(),
        rows = summary.rows,
        output = %config.output.display(),
        "wrote csv"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
