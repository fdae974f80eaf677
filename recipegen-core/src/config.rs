use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{CoreResult, RecipeGenError};

fn default_path() -> String {
    "/api/generate".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointCfg {
    /// Scheme and authority of the completion endpoint, e.g. http://localhost:3000
    pub base_url: String,
    /// Path of the streaming generate route.
    #[serde(default = "default_path")]
    pub path: String,
    /// Name of the environment variable that holds a bearer token, if the endpoint wants one.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for EndpointCfg {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            path: default_path(),
            api_key_env: None,
        }
    }
}

impl EndpointCfg {
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }

    /// Resolve the bearer token. A configured variable that is unset is a validation error.
    pub fn api_key(&self) -> CoreResult<Option<SecretString>> {
        match &self.api_key_env {
            None => Ok(None),
            Some(var) => std::env::var(var)
                .map(|v| Some(SecretString::from(v)))
                .map_err(|_| {
                    RecipeGenError::Validation(format!("environment variable '{var}' is not set"))
                }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds (default 120000ms). Covers the whole stream.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            pool_max_idle_per_host: None,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_request_timeout_ms() -> u64 {
    120_000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointCfg,
    /// HTTP client configuration (timeouts, pooling). Missing → defaults.
    #[serde(default)]
    pub http: HttpCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(RecipeGenError::from)?;
        let s = std::str::from_utf8(&bytes).map_err(|e| RecipeGenError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str::<Self>(s).map_err(|e| RecipeGenError::Other(e.into()))?
            }
            Some("toml") => {
                toml::from_str::<Self>(s).map_err(|e| RecipeGenError::Other(e.into()))?
            }
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| RecipeGenError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s).map_err(|e| RecipeGenError::Other(e.into()))
                })?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let base = &self.endpoint.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RecipeGenError::Validation(format!(
                "endpoint.base_url must be an http(s) URL, got '{base}'"
            )));
        }
        if !self.endpoint.path.starts_with('/') {
            return Err(RecipeGenError::Validation(format!(
                "endpoint.path must start with '/', got '{}'",
                self.endpoint.path
            )));
        }
        Ok(())
    }
}
