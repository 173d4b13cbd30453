//! Configuration file support
//!
//! Settings are read from TOML and then overridden by command-line flags.
//! The merged [`Config`] is immutable once the server starts.
//!
//! Lookup order when no path is given:
//! 1. `./printdesk.toml`
//! 2. `<config dir>/printdesk/config.toml`
//! 3. built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::web::{DEFAULT_BIND, DEFAULT_PORT, DEFAULT_UPLOAD_LIMIT_MB};

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "printdesk.toml";

/// Extensions accepted for upload unless configured otherwise
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 8] =
    ["pdf", "txt", "png", "jpg", "jpeg", "gif", "doc", "docx"];

/// Placeholder printers returned when CUPS cannot be reached
pub const DEFAULT_FALLBACK_PRINTERS: [&str; 2] = ["dummy_printer_1", "dummy_printer_2"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Maximum request body in MB
    pub upload_limit_mb: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
        }
    }
}

/// File locations and upload policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub upload_dir: PathBuf,
    pub convert_dir: PathBuf,
    /// Upload metadata records; not served over HTTP
    pub index_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Entry page served for any path that is not a static asset
    pub index_file: PathBuf,
    pub allowed_extensions: Vec<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            convert_dir: PathBuf::from("converts"),
            index_dir: PathBuf::from("upload-index"),
            static_dir: PathBuf::from("static"),
            index_file: PathBuf::from("templates/index.html"),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// External conversion tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSection {
    pub program: String,
    /// Kill the converter after this many seconds (unset = wait forever)
    pub timeout_secs: Option<u64>,
}

impl Default for ConverterSection {
    fn default() -> Self {
        Self {
            program: "libreoffice".to_string(),
            timeout_secs: None,
        }
    }
}

/// Print service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintingSection {
    /// CUPS base URL
    pub url: String,
    /// requesting-user-name sent with every IPP request
    pub user: String,
    /// Returned by printer listing when CUPS is unreachable; empty = fail instead
    pub fallback_printers: Vec<String>,
}

impl Default for PrintingSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:631".to_string(),
            user: "printdesk".to_string(),
            fallback_printers: DEFAULT_FALLBACK_PRINTERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Cross-origin settings for the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSection {
    /// Empty = any origin
    pub allowed_origins: Vec<String>,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub converter: ConverterSection,
    pub printing: PrintingSection,
    pub cors: CorsSection,
}

/// Values given on the command line; `None` keeps the config file value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub upload_limit_mb: Option<usize>,
    pub upload_dir: Option<PathBuf>,
    pub convert_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub cups_url: Option<String>,
    pub disable_fallback_printers: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Config {
    /// Candidate config file locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("printdesk").join("config.toml"));
        }
        paths
    }

    /// Load the first config file found, or defaults if none exists
    ///
    /// A discovered file that fails to parse is skipped with a warning.
    pub fn load() -> Self {
        for path in Self::search_paths() {
            if !path.is_file() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => tracing::warn!("{}; using defaults", e),
            }
        }
        Self::default()
    }

    /// Load an explicit config file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config from TOML text
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply command-line overrides (CLI takes precedence)
    pub fn merge_with_cli(mut self, cli: &CliOverrides) -> Self {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(bind) = &cli.bind {
            self.server.bind = bind.clone();
        }
        if let Some(limit) = cli.upload_limit_mb {
            self.server.upload_limit_mb = limit;
        }
        if let Some(dir) = &cli.upload_dir {
            self.storage.upload_dir = dir.clone();
        }
        if let Some(dir) = &cli.convert_dir {
            self.storage.convert_dir = dir.clone();
        }
        if let Some(dir) = &cli.static_dir {
            self.storage.static_dir = dir.clone();
        }
        if let Some(url) = &cli.cups_url {
            self.printing.url = url.clone();
        }
        if cli.disable_fallback_printers {
            self.printing.fallback_printers.clear();
        }
        self
    }

    /// Upload limit in bytes; absurdly large values clamp to `usize::MAX`
    pub fn upload_limit_bytes(&self) -> usize {
        self.server.upload_limit_mb.saturating_mul(1024 * 1024)
    }

    /// Check a file extension (without the dot) against the allow list
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        self.storage
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}
