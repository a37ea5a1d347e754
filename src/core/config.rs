//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::core::Project;

const DEFAULT_PORT: u16 = 4680;
const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_CURRENCY: &str = "USD";

/// QuickBom configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new entities
    pub author: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Currency label for cost output
    pub currency: Option<String>,

    /// HTTP API settings
    pub server: ServerSection,

    /// Logging settings
    pub log: LogSection,
}

/// `server:` section
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub address: Option<IpAddr>,
    pub port: Option<u16>,
}

/// `log:` section
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl Config {
    /// Load configuration from all sources, discovering the project from the
    /// current directory
    pub fn load() -> Self {
        Self::load_for(Project::discover().ok().as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (accessors below)

        // 2. Global user config (~/.config/qbom/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.qbom/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.qbom_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Parse a config document
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match Self::from_yaml_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qbom")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(author) = lookup("QBOM_AUTHOR") {
            self.author = Some(author);
        }
        if let Some(currency) = lookup("QBOM_CURRENCY") {
            self.currency = Some(currency);
        }
        if let Some(address) = lookup("QBOM_SERVER_ADDRESS").and_then(|v| v.parse().ok()) {
            self.server.address = Some(address);
        }
        if let Some(port) = lookup("QBOM_SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = Some(port);
        }
        if let Some(level) = lookup("QBOM_LOG_LEVEL") {
            self.log.level = Some(level);
        }
        if let Some(json) = lookup("QBOM_LOG_JSON") {
            self.log.json = Some(matches!(json.as_str(), "1" | "true" | "yes"));
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.currency.is_some() {
            self.currency = other.currency;
        }
        if other.server.address.is_some() {
            self.server.address = other.server.address;
        }
        if other.server.port.is_some() {
            self.server.port = other.server.port;
        }
        if other.log.level.is_some() {
            self.log.level = other.log.level;
        }
        if other.log.json.is_some() {
            self.log.json = other.log.json;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn server_address(&self) -> IpAddr {
        self.server
            .address
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    pub fn server_port(&self) -> u16 {
        self.server.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_json(&self) -> bool {
        self.log.json.unwrap_or(false)
    }
}
