//! Configuration file support (`.backmatter.toml`)
//!
//! Configuration files can be placed in:
//! - User home directory: `~/.backmatter.toml` (user defaults)
//! - Project directory: `./.backmatter.toml` (project defaults)
//! - Custom location via `--config` (replaces the project file)
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments
//! 2. `--config` file, else project config
//! 3. User config
//! 4. Built-in defaults

use anyhow::{Context, Result};
use backmatter_pipeline::resolver::{
    ResolverConfig, DEFAULT_API_BASE, DEFAULT_CACHE_CAPACITY, DEFAULT_TIMEOUT,
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = ".backmatter.toml";

pub const DEFAULT_LISTS_DIR: &str = "python-temp";
pub const DEFAULT_EDITIONS_DIR: &str = "editions";
pub const DEFAULT_PATTERN: &str = "L*.xml";
pub const DEFAULT_PARALLEL: usize = 4;
pub const DEFAULT_DOCUMENT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchSettings>,
}

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Directory holding the PMB list files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lists_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Per-request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<usize>,

    /// Never call the PMB API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,
}

/// `[batch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,

    /// Commit every N successful files (0 disables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_interval: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,

    /// Wall-clock limit per document in seconds (0 disables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_timeout_secs: Option<u64>,
}

impl ResolverSettings {
    /// Fields of `other` win where set.
    pub fn overlay(self, other: Self) -> Self {
        Self {
            lists_dir: other.lists_dir.or(self.lists_dir),
            api_base: other.api_base.or(self.api_base),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            cache_capacity: other.cache_capacity.or(self.cache_capacity),
            offline: other.offline.or(self.offline),
        }
    }

    /// Built-in defaults with every field set.
    pub fn defaults() -> Self {
        Self {
            lists_dir: Some(PathBuf::from(DEFAULT_LISTS_DIR)),
            api_base: Some(DEFAULT_API_BASE.to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT.as_secs()),
            cache_capacity: Some(DEFAULT_CACHE_CAPACITY),
            offline: Some(false),
        }
    }

    /// Resolver configuration with defaults for unset fields.
    pub fn to_resolver_config(&self) -> ResolverConfig {
        let settings = Self::defaults().overlay(self.clone());
        let defaults = ResolverConfig::default();
        ResolverConfig {
            lists_dir: settings.lists_dir.unwrap_or(defaults.lists_dir),
            api_base: settings.api_base.unwrap_or(defaults.api_base),
            timeout: settings
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            cache_capacity: settings.cache_capacity.unwrap_or(defaults.cache_capacity),
            offline: settings.offline.unwrap_or(defaults.offline),
        }
    }
}

impl BatchSettings {
    pub fn overlay(self, other: Self) -> Self {
        Self {
            dir: other.dir.or(self.dir),
            pattern: other.pattern.or(self.pattern),
            parallel: other.parallel.or(self.parallel),
            commit_interval: other.commit_interval.or(self.commit_interval),
            push: other.push.or(self.push),
            document_timeout_secs: other.document_timeout_secs.or(self.document_timeout_secs),
        }
    }

    pub fn defaults() -> Self {
        Self {
            dir: Some(PathBuf::from(DEFAULT_EDITIONS_DIR)),
            pattern: Some(DEFAULT_PATTERN.to_string()),
            parallel: Some(DEFAULT_PARALLEL),
            commit_interval: Some(0),
            push: Some(false),
            document_timeout_secs: Some(DEFAULT_DOCUMENT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            eprintln!(
                "{} Failed to parse config file: {}",
                "Error:".red().bold(),
                path.display()
            );
            eprintln!("{} {}", "Parse error:".yellow().bold(), e);
            eprintln!();
            eprintln!("{} Configuration file syntax:", "Help:".cyan().bold());
            eprintln!("  [resolver]");
            eprintln!("  lists_dir = \"python-temp\"");
            eprintln!("  offline = false");
            eprintln!("  [batch]");
            eprintln!("  parallel = 4");
            anyhow::anyhow!("Failed to parse config file: {e}")
        })
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Load an optional config file; failures are warnings.
    fn load_optional(path: &Path, label: &str) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Failed to load {label} config from {}: {}",
                    "Warning:".yellow().bold(),
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Discover and merge config files.
    ///
    /// An explicit `--config` file must load; user and project files are
    /// skipped with a warning when broken.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let user = Self::user_config_path().and_then(|p| Self::load_optional(&p, "user"));
        let project = match explicit {
            Some(path) => Some(Self::load_from_file(path)?),
            None => Self::load_optional(&Self::project_config_path(), "project"),
        };
        Ok(Self::merge(user, project))
    }

    /// CLI args > project config > user config > defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let mut merged = Self::default();
        for layer in [user_config, project_config].into_iter().flatten() {
            if let Some(resolver) = layer.resolver {
                merged.resolver = Some(merged.resolver.unwrap_or_default().overlay(resolver));
            }
            if let Some(batch) = layer.batch {
                merged.batch = Some(merged.batch.unwrap_or_default().overlay(batch));
            }
        }
        merged
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        self.resolver.clone().unwrap_or_default()
    }

    pub fn batch_settings(&self) -> BatchSettings {
        self.batch.clone().unwrap_or_default()
    }

    /// The merged configuration with defaults filled in.
    pub fn effective(&self) -> Self {
        Self {
            resolver: Some(ResolverSettings::defaults().overlay(self.resolver_settings())),
            batch: Some(BatchSettings::defaults().overlay(self.batch_settings())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_overrides_user_per_field() {
        let user: Config = toml::from_str(
            "[resolver]\nlists_dir = \"/data/pmb\"\noffline = true\n[batch]\nparallel = 2\n",
        )
        .unwrap();
        let project: Config = toml::from_str("[resolver]\noffline = false\n").unwrap();
        let merged = Config::merge(Some(user), Some(project));

        let resolver = merged.resolver_settings();
        assert_eq!(resolver.lists_dir, Some(PathBuf::from("/data/pmb")));
        assert_eq!(resolver.offline, Some(false));
        assert_eq!(merged.batch_settings().parallel, Some(2));
    }

    #[test]
    fn test_effective_fills_defaults() {
        let effective = Config::default().effective();
        let batch = effective.batch_settings();
        assert_eq!(batch.pattern.as_deref(), Some(DEFAULT_PATTERN));
        assert_eq!(batch.commit_interval, Some(0));
        let resolver = effective.resolver_settings().to_resolver_config();
        assert_eq!(resolver, ResolverConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config: Config = toml::from_str("[batch]\npattern = \"*.xml\"\nextra = 1\n").unwrap();
        assert_eq!(config.batch_settings().pattern.as_deref(), Some("*.xml"));
    }

    #[test]
    fn test_effective_round_trips_through_toml() {
        let effective = Config::default().effective();
        let text = toml::to_string_pretty(&effective).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, effective);
    }
}
