use std::borrow::Cow;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Statement};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Core value types for SQLite cells
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Render the value as a CSV field. `null` stands in for SQL NULL.
    pub fn render<'a>(&'a self, null: &'a str) -> Cow<'a, str> {
        match self {
            Value::Null => Cow::Borrowed(null),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            // Debug keeps the fractional part on whole numbers ("2.0", not "2")
            Value::Real(f) => Cow::Owned(format!("{:?}", f)),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            Value::Blob(bytes) => Cow::Owned(hex::encode(bytes)),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// What to read: a whole table or an explicit statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    Table(String),
    Sql(String),
}

impl QuerySource {
    /// The SQL text executed for this source.
    pub fn statement(&self) -> String {
        match self {
            QuerySource::Table(name) => format!("SELECT * FROM {}", quote_identifier(name)),
            QuerySource::Sql(sql) => sql.clone(),
        }
    }
}

/// Quote an identifier for SQLite, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Open the database file read-only. The file is never created.
pub fn open_database(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|source| ExportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "opened database");
    Ok(conn)
}

/// Prepare the statement for `source`, rejecting anything that writes or
/// returns no columns.
pub fn prepare<'c>(conn: &'c Connection, source: &QuerySource) -> Result<Statement<'c>> {
    let sql = source.statement();
    debug!(%sql, "preparing statement");
    let stmt = conn.prepare(&sql)?;
    if !stmt.readonly() {
        return Err(ExportError::NotReadOnly(sql));
    }
    if stmt.column_count() == 0 {
        return Err(ExportError::NoColumns(sql));
    }
    Ok(stmt)
}

/// Column names as reported by statement metadata, in column order.
pub fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}
