use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "guest_client.toml";
const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:3004";
const DEFAULT_STORAGE_PATH: &str = ".guest_state.json";
const DEFAULT_TIMEOUT_MS: u64 = 8000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub service_url: Url,
    pub storage_path: PathBuf,
    pub timeout: Duration,
}

// Optional TOML file; every key can be overridden from the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    service_url: Option<String>,
    storage_path: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, reason: String },
    Parse { path: PathBuf, reason: String },
    InvalidUrl(String),
    InvalidTimeout(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => {
                write!(f, "failed to read {}: {reason}", path.display())
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "failed to parse {}: {reason}", path.display())
            }
            ConfigError::InvalidUrl(value) => write!(f, "invalid generation service url: {value}"),
            ConfigError::InvalidTimeout(value) => write!(f, "invalid timeout (ms): {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ClientConfig {
    // Reads the config file named by GUEST_CLIENT_CONFIG (when present) and
    // applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("GUEST_CLIENT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let file = match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(ConfigError::Read {
                    path,
                    reason: err.to_string(),
                });
            }
        };

        Self::from_sources(&path, file.as_deref(), |key| env::var(key).ok())
    }

    pub fn from_sources<F>(path: &Path, file: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file {
            Some(raw) => toml::from_str(raw).map_err(|err| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?,
            None => FileConfig::default(),
        };
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let service_url = env("GENERATION_SERVICE_URL")
            .or(file.service_url)
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let service_url = Url::parse(service_url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or(ConfigError::InvalidUrl(service_url))?;

        let storage_path = env("GUEST_STORAGE_PATH")
            .or(file.storage_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));

        let timeout_ms = match env("GENERATION_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => file.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        };

        Ok(Self {
            service_url,
            storage_path,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}
