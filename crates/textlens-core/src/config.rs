// Configuration loading and parsing (config/textlens.toml plus the Gemini API
// key from the environment).

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// File name of the configuration file inside `config/` and `defaults/`.
pub const CONFIG_FILE_NAME: &str = "textlens.toml";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "analysis_result.txt";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("Google API key is missing: set the {var} environment variable")]
    MissingCredential { var: &'static str },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub export: ExportConfig,
    pub credentials: Credentials,
}

// ---------------------------------------------------------------------------
// textlens.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire textlens.toml file. Every
/// section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    llm: LlmConfig,
    #[serde(default)]
    export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_base: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
        }
    }
}

impl ExportConfig {
    /// Full path the export action writes to.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// The Gemini API key. `Debug` is redacted so the key never reaches the logs.
#[derive(Clone)]
pub struct Credentials {
    pub google_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a raw key value. Absent or blank keys are a
    /// fatal startup error.
    pub fn from_key(key: Option<String>) -> Result<Self, ConfigError> {
        match key {
            Some(key) if !key.trim().is_empty() => Ok(Self {
                google_api_key: key.trim().to_string(),
            }),
            _ => Err(ConfigError::MissingCredential { var: API_KEY_ENV }),
        }
    }

    /// Read the key from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_key(std::env::var(API_KEY_ENV).ok())
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/textlens.toml` relative to
/// `base_dir`, pairing it with the given API key.
///
/// A missing config file is not an error: every setting has a default. This
/// is the lower-level primitive; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path, api_key: Option<String>) -> Result<Config, ConfigError> {
    load_config_with(base_dir, Credentials::from_key(api_key)?)
}

fn load_config_with(base_dir: &Path, credentials: Credentials) -> Result<Config, ConfigError> {
    let config_path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let file = if config_path.exists() {
        let text = read_file(&config_path)?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: config_path.clone(),
            source: e,
        })?
    } else {
        ConfigFile::default()
    };

    let config = Config {
        server: file.server,
        llm: file.llm,
        export: file.export,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/textlens.toml` into `config/` if it isn't there yet.
/// Returns the path of the copied file, or `None` when nothing was copied.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let source = base_dir.join("defaults").join(CONFIG_FILE_NAME);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE_NAME);

    if !source.is_file() {
        return Ok(None);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read {}: {e}", source.display()),
            })?;
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Convenience wrapper: loads config relative to the current working
/// directory and takes the API key from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    let credentials = Credentials::from_env()?;
    ensure_config_file(&cwd)?;
    load_config_with(&cwd, credentials)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.server.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.max_upload_bytes".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.model".into(),
            message: "must not be empty".into(),
        });
    }

    let base = &config.llm.api_base;
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "llm.api_base".into(),
            message: format!("must be an http(s) URL, got {base:?}"),
        });
    }

    let name = &config.export.file_name;
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ConfigError::ValidationError {
            field: "export.file_name".into(),
            message: format!("must be a plain file name, got {name:?}"),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
