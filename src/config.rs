//! One-time credential resolution.
//!
//! Resolution order: explicit argument, then environment variable, then the
//! config file at `~/.conjure/config.yaml`. Performed once at session
//! construction and passed down explicitly; no ambient credential state
//! exists afterwards.

use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::error::{Classification, Error, ErrorHint};
use crate::Result;

pub const API_KEY_ENV: &str = "CONJURE_API_KEY";
pub const API_URL_ENV: &str = "CONJURE_API_URL";

/// Already-resolved credentials handed to the transport.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

/// On-disk config file shape. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_key: Option<String>,
    base_url: Option<String>,
}

fn config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".conjure/config.yaml"))
}

fn load_config_file() -> ConfigFile {
    let Some(path) = config_path() else {
        return ConfigFile::default();
    };
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return ConfigFile::default();
    };
    match serde_yaml::from_str(&raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable config file");
            ConfigFile::default()
        }
    }
}

impl Credentials {
    /// Resolve credentials with the documented precedence.
    pub fn resolve(explicit_key: Option<String>, explicit_url: Option<String>) -> Result<Self> {
        let file = load_config_file();

        let api_key = explicit_key
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|s| !s.is_empty()))
            .or(file.api_key)
            .ok_or_else(|| {
                Error::api(
                    Classification::Authentication,
                    format!("API key required: pass one explicitly or set {API_KEY_ENV}"),
                    ErrorHint::new().with_field("api_key"),
                )
            })?;

        let base_url = explicit_url
            .or_else(|| std::env::var(API_URL_ENV).ok().filter(|s| !s.is_empty()))
            .or(file.base_url)
            .ok_or_else(|| {
                Error::Config(format!(
                    "base URL required: pass one explicitly or set {API_URL_ENV}"
                ))
            })?;

        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported base URL scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}
