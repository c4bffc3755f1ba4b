//! Command-line and environment configuration for the server binary.
//!
//! Every flag has a `FINDITNOW__*` environment fallback. An optional TOML
//! file supplies the remaining settings; flags and variables win over the
//! file where both set a value.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use finditnow_types::config::{ConfigError as InvalidConfig, FindItNowConfig};

/// FindItNow server.
#[derive(Debug, Parser)]
#[command(name = "finditnow-server", version, about, long_about = None)]
pub struct Cli {
    /// Optional maintenance subcommand. Without one the server starts.
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    #[command(flatten)]
    pub config: Config,
}

/// Maintenance subcommands that run instead of the server.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Inspect the configuration file format.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage access codes.
    Codes {
        #[command(subcommand)]
        action: CodesAction,
    },
}

/// `config` subcommand actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print an example TOML file with every default.
    Example,
    /// Print the JSON schema of the TOML file.
    Schema,
}

/// `codes` subcommand actions.
#[derive(Debug, Subcommand)]
pub enum CodesAction {
    /// Issue a new single-use access code.
    Issue {
        /// The code to issue.
        code: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
    /// JSON when stdout is not a terminal, text otherwise.
    #[default]
    Auto,
}

/// Process-level settings.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Address to serve HTTP on.
    #[arg(long = "listen", env = "FINDITNOW__LISTEN", default_value = "127.0.0.1:8080")]
    pub listen_addr: SocketAddr,

    /// Directory for the code table and the local catalog. Omit to run in memory.
    #[arg(long = "data", env = "FINDITNOW__DATA")]
    pub data_dir: Option<PathBuf>,

    /// Catalog object store URL (`memory://`, `file:///path`, `s3://bucket/prefix`).
    #[arg(long, env = "FINDITNOW__CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Log output format.
    #[arg(long, env = "FINDITNOW__LOG_FORMAT", value_enum, default_value_t = LogFormat::Auto)]
    pub log_format: LogFormat,

    /// TOML configuration file.
    #[arg(long = "config", env = "FINDITNOW__CONFIG")]
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Whether the listener only accepts loopback connections.
    pub fn is_localhost_only(&self) -> bool {
        self.listen_addr.ip().is_loopback()
    }

    /// Loads the TOML file, if any, and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it, or the merged result, is invalid.
    pub fn resolve(&self) -> Result<FindItNowConfig, ConfigError> {
        let mut config = match &self.config_file {
            Some(path) => load_file(path)?,
            None => FindItNowConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        if let Some(url) = &self.catalog_url {
            config.storage.catalog_url = Some(url.clone());
        }

        config.validate().map_err(ConfigError::Parse)?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<FindItNowConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    FindItNowConfig::from_toml_str(&contents).map_err(ConfigError::Parse)
}

/// Renders the JSON schema of [`FindItNowConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::Schema`] if the schema cannot be serialized.
pub fn config_schema() -> Result<String, ConfigError> {
    let schema = schemars::schema_for!(FindItNowConfig);
    serde_json::to_string_pretty(&schema).map_err(ConfigError::Schema)
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    Load(String),
    /// The configuration is malformed or out of range.
    Parse(InvalidConfig),
    /// The JSON schema could not be rendered.
    Schema(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "failed to load config: {}", msg),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::Schema(e) => write!(f, "failed to render config schema: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("finditnow-server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults_are_ephemeral_and_local() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_localhost_only());
        assert_eq!(cli.config.listen_addr.port(), 8080);

        let resolved = cli.config.resolve().unwrap();
        assert!(resolved.storage.is_ephemeral());
        assert_eq!(resolved.storage.resolved_catalog_url().unwrap(), "memory://");
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("finditnow.toml");
        std::fs::write(
            &file,
            "[storage]\ndata_dir = \"/srv/from-file\"\ncatalog_url = \"memory://\"\n\n[catalog]\nlist_page_size = 50\n",
        )
        .unwrap();

        let cli = parse(&[
            "--config",
            file.to_str().unwrap(),
            "--catalog-url",
            "s3://found-items",
        ]);
        let resolved = cli.config.resolve().unwrap();
        assert_eq!(resolved.storage.data_dir, Some(PathBuf::from("/srv/from-file")));
        assert_eq!(resolved.storage.resolved_catalog_url().unwrap(), "s3://found-items");
        assert_eq!(resolved.catalog.list_page_size, 50);
    }

    #[test]
    fn test_bad_catalog_url_rejected() {
        let cli = parse(&["--catalog-url", "ftp://nope"]);
        assert!(matches!(cli.config.resolve(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_config_file_is_load_error() {
        let cli = parse(&["--config", "/nonexistent/finditnow.toml"]);
        let err = cli.config.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
        assert!(err.to_string().starts_with("failed to load config"));
    }

    #[test]
    fn test_codes_issue_subcommand() {
        let cli = parse(&["--data", "/tmp/finditnow", "codes", "issue", "SPRING-24"]);
        match cli.command {
            Some(CliCommand::Codes { action: CodesAction::Issue { code } }) => {
                assert_eq!(code, "SPRING-24");
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_format_values() {
        assert_eq!(parse(&["--log-format", "json"]).config.log_format, LogFormat::Json);
        assert_eq!(parse(&[]).config.log_format, LogFormat::Auto);
        assert!(
            Cli::try_parse_from(["finditnow-server", "--log-format", "xml"]).is_err()
        );
    }

    #[test]
    fn test_schema_names_every_section() {
        let schema = config_schema().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert!(parsed.get("properties").is_some(), "schema has no properties: {schema}");
        for section in ["storage", "catalog", "validation", "http"] {
            assert!(schema.contains(section), "schema missing {section}");
        }
    }

    #[test]
    fn test_schema_failure_is_reported() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::Schema(source);
        assert!(err.to_string().starts_with("failed to render config schema"), "{err}");
    }
}
