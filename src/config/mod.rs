//! Evicta configuration.
//!
//! Configuration is read from `~/.evicta/config.json` (or an explicit path),
//! then individual fields can be overridden with `EVICTA_*` environment
//! variables. Every section falls back to its defaults when absent.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::cache::intent::DEFAULT_MAX_INTENT_PROMPT_CHARS;
use crate::error::{EvictaError, Result};
use crate::policy::DEFAULT_TTL_SECS;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub intent: IntentConfig,
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Entry store sizing and lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live entries. Values below 1 are treated as 1.
    pub max_entries: usize,
    /// Lifetime given to freshly generated responses.
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

/// Intent extraction guardrail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// When false, only exact hits are served.
    pub enabled: bool,
    /// Prompts longer than this (in characters) skip intent extraction.
    pub max_prompt_chars: usize,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_prompt_chars: DEFAULT_MAX_INTENT_PROMPT_CHARS,
        }
    }
}

/// Generative backend (Ollama-compatible `/api/generate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/generate".to_string(),
            model: "gemma:2b".to_string(),
            timeout_secs: 10,
        }
    }
}

/// HTTP front door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit logs as JSON lines instead of human-readable text.
    pub json: bool,
}

impl Config {
    /// `~/.evicta`, or `./.evicta` when no home directory is known.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".evicta")
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from `path` (or the default location), then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Self::path();
        let path = path.unwrap_or(&default_path);
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a JSON config file. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            EvictaError::Config(format!("invalid config at {}: {}", path.display(), e))
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Unparseable values
    /// are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "EVICTA_CACHE_MAX_ENTRIES", &mut self.cache.max_entries);
        override_parsed(
            &lookup,
            "EVICTA_CACHE_DEFAULT_TTL_SECS",
            &mut self.cache.default_ttl_secs,
        );
        override_bool(&lookup, "EVICTA_INTENT_ENABLED", &mut self.intent.enabled);
        override_parsed(
            &lookup,
            "EVICTA_INTENT_MAX_PROMPT_CHARS",
            &mut self.intent.max_prompt_chars,
        );
        if let Some(url) = lookup("EVICTA_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(model) = lookup("EVICTA_BACKEND_MODEL") {
            self.backend.model = model;
        }
        override_parsed(
            &lookup,
            "EVICTA_BACKEND_TIMEOUT_SECS",
            &mut self.backend.timeout_secs,
        );
        if let Some(bind) = lookup("EVICTA_SERVER_BIND") {
            self.server.bind = bind;
        }
        override_parsed(&lookup, "EVICTA_SERVER_PORT", &mut self.server.port);
        override_bool(&lookup, "EVICTA_LOG_JSON", &mut self.logging.json);
    }
}

fn override_parsed<F, T>(lookup: &F, name: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(var = name, value = %raw, "Ignoring unparseable environment override"),
    }
}

fn override_bool<F>(lookup: &F, name: &str, slot: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *slot = true,
        "0" | "false" | "no" | "off" => *slot = false,
        _ => warn!(var = name, value = %raw, "Ignoring unparseable environment override"),
    }
}
