// src/aggregate/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";
pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 12;

fn default_internship_priority() -> Vec<String> {
    vec!["rapid".into(), "jsearch".into(), "generated".into()]
}

fn default_event_priority() -> Vec<String> {
    vec!["eventbrite".into(), "ticketmaster".into(), "generated".into()]
}

/// Adapter priority order and HTTP timeouts, loaded from
/// `config/sources.toml`. Priority is fixed configuration: the
/// orchestrator tries adapters exactly in the listed order.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub internships: DomainSection,
    #[serde(default)]
    pub events: DomainSection,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainSection {
    pub priority: Vec<String>,
}

impl Default for DomainSection {
    fn default() -> Self {
        Self {
            priority: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "HttpSection::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "HttpSection::default_timeout")]
    pub timeout_secs: u64,
}

impl HttpSection {
    fn default_connect_timeout() -> u64 {
        DEFAULT_CONNECT_TIMEOUT_SECS
    }
    fn default_timeout() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            internships: DomainSection {
                priority: default_internship_priority(),
            },
            events: DomainSection {
                priority: default_event_priority(),
            },
            http: HttpSection::default(),
        }
    }
}

impl SourcesConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: SourcesConfig = toml::from_str(s).context("parsing sources config")?;
        if cfg.internships.priority.is_empty() {
            cfg.internships.priority = default_internship_priority();
        }
        if cfg.events.priority.is_empty() {
            cfg.events.priority = default_event_priority();
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sources config at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolution order: $SOURCES_CONFIG_PATH, then the default path,
    /// then built-in defaults when no file exists. A present-but-invalid
    /// file is an error; a missing one is not.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_CONFIG_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_SOURCES_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}
