use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ExportError, Result};
use crate::export::{Dialect, ExportOptions};
use crate::sqlite::QuerySource;

/// Environment variables with this prefix override file settings,
/// e.g. `SQLITE_EXPORT_DATABASE`.
pub const ENV_PREFIX: &str = "SQLITE_EXPORT";

/// Output path meaning standard output.
pub const STDOUT_PATH: &str = "-";

/// Everything needed to run one export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database: PathBuf,
    /// Table exported in full; exclusive with `query`
    #[serde(default)]
    pub table: Option<String>,
    /// SQL statement to run; exclusive with `table`
    #[serde(default)]
    pub query: Option<String>,
    /// Destination CSV file, or `-` for stdout
    #[serde(default)]
    pub output: PathBuf,
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub null_value: String,
    #[serde(default = "default_header")]
    pub header: bool,
}

fn default_header() -> bool {
    true
}

/// Where the CSV goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

/// Values given on the command line. They win over the environment and
/// the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub query: Option<String>,
    pub output: Option<PathBuf>,
    pub dialect: Option<Dialect>,
    pub null_value: Option<String>,
    pub header: Option<bool>,
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

impl ExportConfig {
    /// Layer defaults, the optional config file, `SQLITE_EXPORT_*`
    /// environment variables and `overrides`, then validate the result.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .set_default("dialect", Dialect::default().as_str())?
            .set_default("null_value", "")?
            .set_default("header", true)?;

        if let Some(path) = config_path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .ignore_empty(true),
            )
            .set_override_option("database", overrides.database.map(path_string))?
            .set_override_option("output", overrides.output.map(path_string))?
            .set_override_option("dialect", overrides.dialect.map(|d| d.as_str()))?
            .set_override_option("null_value", overrides.null_value)?
            .set_override_option("header", overrides.header)?
            .build()?;

        let mut cfg: ExportConfig = settings.try_deserialize()?;
        // A table or query from the command line replaces whichever source
        // the lower layers chose.
        if overrides.table.is_some() || overrides.query.is_some() {
            cfg.table = overrides.table;
            cfg.query = overrides.query;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check required fields and the table/query exclusivity.
    pub fn validate(&self) -> Result<()> {
        if self.database.as_os_str().is_empty() {
            return Err(ExportError::InvalidConfig(
                "missing database path".to_string(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ExportError::InvalidConfig("missing output path".to_string()));
        }
        self.source().map(|_| ())
    }

    /// The query to run, from either `table` or `query`.
    pub fn source(&self) -> Result<QuerySource> {
        match (&self.table, &self.query) {
            (Some(_), Some(_)) => Err(ExportError::InvalidConfig(
                "cannot specify both 'table' and 'query'".to_string(),
            )),
            (None, None) => Err(ExportError::InvalidConfig(
                "either 'table' or 'query' must be specified".to_string(),
            )),
            (Some(table), None) if table.trim().is_empty() => Err(ExportError::InvalidConfig(
                "empty table name".to_string(),
            )),
            (None, Some(query)) if query.trim().is_empty() => {
                Err(ExportError::InvalidConfig("empty query".to_string()))
            }
            (Some(table), None) => Ok(QuerySource::Table(table.clone())),
            (None, Some(query)) => Ok(QuerySource::Sql(query.clone())),
        }
    }

    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            dialect: self.dialect,
            null_value: self.null_value.clone(),
            header: self.header,
        }
    }

    pub fn output_target(&self) -> Output {
        if self.output.as_os_str() == STDOUT_PATH {
            Output::Stdout
        } else {
            Output::File(self.output.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base() -> ExportConfig {
        ExportConfig {
            database: PathBuf::from("data.db"),
            table: Some("people".to_string()),
            query: None,
            output: PathBuf::from("people.csv"),
            dialect: Dialect::Excel,
            null_value: String::new(),
            header: true,
        }
    }

    #[test]
    fn table_and_query_are_exclusive() {
        let mut cfg = base();
        assert_eq!(cfg.source().unwrap(), QuerySource::Table("people".into()));

        cfg.query = Some("SELECT 1".to_string());
        assert!(matches!(cfg.validate(), Err(ExportError::InvalidConfig(_))));

        cfg.table = None;
        assert_eq!(cfg.source().unwrap(), QuerySource::Sql("SELECT 1".into()));

        cfg.query = None;
        assert!(matches!(cfg.validate(), Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_blank_values() {
        let mut cfg = base();
        cfg.table = Some("  ".to_string());
        assert!(matches!(cfg.validate(), Err(ExportError::InvalidConfig(_))));

        let mut cfg = base();
        cfg.database = PathBuf::new();
        assert!(matches!(cfg.validate(), Err(ExportError::InvalidConfig(_))));

        let mut cfg = base();
        cfg.output = PathBuf::new();
        assert!(matches!(cfg.validate(), Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn dash_means_stdout() {
        let mut cfg = base();
        assert_eq!(cfg.output_target(), Output::File(PathBuf::from("people.csv")));
        cfg.output = PathBuf::from("-");
        assert_eq!(cfg.output_target(), Output::Stdout);
    }

    #[test]
    fn load_from_file_with_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "database = \"/tmp/source.db\"\ntable = \"people\"\noutput = \"/tmp/out.csv\"\ndialect = \"unix\"\nnull_value = \"NULL\""
        )
        .unwrap();

        let cfg = ExportConfig::load(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(cfg.database, PathBuf::from("/tmp/source.db"));
        assert_eq!(cfg.dialect, Dialect::Unix);
        assert_eq!(cfg.null_value, "NULL");
        assert!(cfg.header);

        let overrides = Overrides {
            output: Some(PathBuf::from("/tmp/other.csv")),
            dialect: Some(Dialect::Excel),
            header: Some(false),
            ..Overrides::default()
        };
        let cfg = ExportConfig::load(Some(file.path()), overrides).unwrap();
        assert_eq!(cfg.output, PathBuf::from("/tmp/other.csv"));
        assert_eq!(cfg.dialect, Dialect::Excel);
        assert!(!cfg.header);
        assert_eq!(cfg.table.as_deref(), Some("people"));
    }

    #[test]
    fn command_line_source_replaces_file_source() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "database = \"/tmp/source.db\"\nquery = \"SELECT 1\"\noutput = \"-\""
        )
        .unwrap();

        let overrides = Overrides {
            table: Some("people".to_string()),
            ..Overrides::default()
        };
        let cfg = ExportConfig::load(Some(file.path()), overrides).unwrap();
        assert_eq!(cfg.table.as_deref(), Some("people"));
        assert_eq!(cfg.query, None);
        assert_eq!(cfg.source().unwrap(), QuerySource::Table("people".into()));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let overrides = Overrides {
            database: Some(PathBuf::from("a.db")),
            query: Some("SELECT 1".to_string()),
            output: Some(PathBuf::from("-")),
            ..Overrides::default()
        };
        let cfg = ExportConfig::load(None, overrides).unwrap();
        assert_eq!(cfg.dialect, Dialect::Excel);
        assert_eq!(cfg.null_value, "");
        assert!(cfg.header);
        assert_eq!(cfg.output_target(), Output::Stdout);
    }
}
