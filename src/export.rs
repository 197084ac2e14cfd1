use std::io;
use std::path::Path;

use clap::ValueEnum;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rusqlite::Connection;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{ExportConfig, Output};
use crate::error::Result;
use crate::sqlite::{column_names, open_database, prepare, QuerySource, Value};

/// CSV dialect used for the output file.
///
/// Both dialects use a comma delimiter, `"` as the quote character, quote a
/// field only when it contains the delimiter, a quote or a line break, and
/// escape quotes by doubling them. They differ in the record terminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// CRLF terminated records
    #[default]
    Excel,
    /// LF terminated records
    Unix,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Excel => "excel",
            Dialect::Unix => "unix",
        }
    }

    fn writer_builder(&self) -> WriterBuilder {
        let terminator = match self {
            Dialect::Excel => Terminator::CRLF,
            Dialect::Unix => Terminator::Any(b'\n'),
        };
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(b',')
            .quote(b'"')
            .double_quote(true)
            .quote_style(QuoteStyle::Necessary)
            .terminator(terminator);
        builder
    }
}

/// How rows are written, independent of where they come from or go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub dialect: Dialect,
    /// Field text written for SQL NULL
    pub null_value: String,
    /// Whether the first record is the column header
    pub header: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Excel,
            null_value: String::new(),
            header: true,
        }
    }
}

/// Outcome of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Number of data records written, not counting the header
    pub rows: u64,
}

/// Run `source` against `conn` and write the result set as CSV to `writer`.
///
/// The writer is flushed before returning. Every data record has exactly as
/// many fields as the statement has columns.
pub fn export_to_writer<W: io::Write>(
    conn: &Connection,
    source: &QuerySource,
    options: &ExportOptions,
    writer: W,
) -> Result<ExportSummary> {
    let mut stmt = prepare(conn, source)?;
    let columns = column_names(&stmt);
    debug!(?columns, "result columns");

    let mut wtr = options.dialect.writer_builder().from_writer(writer);
    if options.header {
        wtr.write_record(&columns)?;
    }

    let mut rows = stmt.query([])?;
    let mut record: Vec<String> = Vec::with_capacity(columns.len());
    let mut count: u64 = 0;
    while let Some(row) = rows.next()? {
        record.clear();
        for idx in 0..columns.len() {
            let value = Value::from(row.get_ref(idx)?);
            record.push(value.render(&options.null_value).into_owned());
        }
        wtr.write_record(&record)?;
        count += 1;
    }
    wtr.flush()?;

    Ok(ExportSummary {
        columns,
        rows: count,
    })
}

/// Run the whole export described by `config`.
///
/// File output goes to a temporary file next to the destination and is
/// renamed into place only once every row has been written, so a failed
/// export never leaves a partial file behind.
pub fn export(config: &ExportConfig) -> Result<ExportSummary> {
    let source = config.source()?;
    let options = config.options();
    info!(database = %config.database.display(), output = %config.output.display(), "starting export");

    let conn = open_database(&config.database)?;
    let summary = match config.output_target() {
        Output::Stdout => {
            let stdout = io::stdout();
            export_to_writer(&conn, &source, &options, stdout.lock())?
        }
        Output::File(path) => write_atomically(&path, |file| {
            export_to_writer(&conn, &source, &options, file)
        })?,
    };

    info!(
        columns = summary.columns.len(),
        rows = summary.rows,
        "export finished"
    );
    Ok(summary)
}

fn write_atomically<T>(
    path: &Path,
    write: impl FnOnce(&mut NamedTempFile) -> Result<T>,
) -> Result<T> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let value = write(&mut tmp)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(path)?;
    debug!(path = %path.display(), "output persisted");
    Ok(value)
}
