use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dotenvy::dotenv;
use klaviyo_client::{DEFAULT_BASE_URL, DEFAULT_REVISION, DEFAULT_TIMEOUT, MAX_PAGE_SIZE};
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::fetcher::DEFAULT_PAGE_SIZE;
use crate::types::SegmentConfig;

/// Sync configuration, built once at startup and passed by reference.
#[derive(Debug)]
pub struct Config {
    api_key: SecretBox<str>,
    pub segment: SegmentConfig,
    pub cache_file: PathBuf,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub api_base_url: String,
    pub api_revision: String,
}

/// Config file layout. Keys match the legacy `constants.json` format,
/// plus optional tuning knobs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct ConfigFile {
    api_key: Option<String>,
    segment_id: Option<String>,
    segment_name: Option<String>,
    cache_file: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
    api_base_url: Option<String>,
    api_revision: Option<String>,
}

/// Raw values before validation, whatever their source.
#[derive(Debug, Default)]
struct RawConfig {
    api_key: Option<String>,
    segment_id: Option<String>,
    segment_name: Option<String>,
    cache_file: Option<String>,
    page_size: Option<String>,
    request_timeout_secs: Option<String>,
    api_base_url: Option<String>,
    api_revision: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        RawConfig {
            api_key: file.api_key,
            segment_id: file.segment_id,
            segment_name: file.segment_name,
            cache_file: file.cache_file,
            page_size: file.page_size.map(|n| n.to_string()),
            request_timeout_secs: file.request_timeout_secs.map(|n| n.to_string()),
            api_base_url: file.api_base_url,
            api_revision: file.api_revision,
        }
        .validate()
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).cloned();
        RawConfig {
            api_key: get("KLAVIYO_API_KEY"),
            segment_id: get("KLAVIYO_SEGMENT_ID"),
            segment_name: get("KLAVIYO_SEGMENT_NAME"),
            cache_file: get("SEGMENT_CACHE_FILE"),
            page_size: get("KLAVIYO_PAGE_SIZE"),
            request_timeout_secs: get("KLAVIYO_REQUEST_TIMEOUT_SECS"),
            api_base_url: get("KLAVIYO_API_BASE_URL"),
            api_revision: get("KLAVIYO_API_REVISION"),
        }
        .validate()
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Override the page size, e.g. from the command line.
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, ConfigError> {
        self.page_size = validate_page_size(page_size)?;
        Ok(self)
    }
}

impl RawConfig {
    fn validate(self) -> Result<Config, ConfigError> {
        let api_key = required(self.api_key, "API_KEY")?;
        let segment_id = required(self.segment_id, "SEGMENT_ID")?;
        let segment_name = required(self.segment_name, "SEGMENT_NAME")?;
        let cache_file = required(self.cache_file, "CACHE_FILE")?;

        let page_size = match non_empty(self.page_size) {
            Some(raw) => {
                let n = raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                    field: "PAGE_SIZE",
                    reason: e.to_string(),
                })?;
                validate_page_size(n)?
            }
            None => DEFAULT_PAGE_SIZE,
        };

        let request_timeout = match non_empty(self.request_timeout_secs) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    field: "REQUEST_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        field: "REQUEST_TIMEOUT_SECS",
                        reason: "must be greater than zero".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        let api_base_url =
            non_empty(self.api_base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(api_base_url.starts_with("https://") || api_base_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "API_BASE_URL",
                reason: format!("not an http(s) URL: {}", api_base_url),
            });
        }

        Ok(Config {
            api_key: SecretBox::new(Box::from(api_key.as_str())),
            segment: SegmentConfig::new(segment_id, segment_name),
            cache_file: PathBuf::from(cache_file),
            page_size,
            request_timeout,
            api_base_url,
            api_revision: non_empty(self.api_revision)
                .unwrap_or_else(|| DEFAULT_REVISION.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    non_empty(value).ok_or(ConfigError::Missing(field))
}

fn validate_page_size(page_size: u32) -> Result<u32, ConfigError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Invalid {
            field: "PAGE_SIZE",
            reason: format!("must be between 1 and {}, got {}", MAX_PAGE_SIZE, page_size),
        });
    }
    Ok(page_size)
}
