//! Garden configuration.
//!
//! Settings come from an optional `garden.toml`; command-line flags override
//! the file. Every key is optional:
//!
//! ```toml
//! source = "src/site/notes"   # Markdown notes directory
//! output = "dist"             # Generated site
//! publish_key = "dg-publish"  # Front matter flag; `false` hides a note
//! excerpt_length = 150        # Characters of body shown on note cards
//! latest_count = 6            # Note cards on the home page
//! revalidate_secs = 3600      # `serve`: age at which the note index is rebuilt
//!
//! [site]
//! title = "Digital Garden"
//! subtitle = "A curated collection of thoughts, notes, and explorations"
//! footer = "Keep growing!"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GardenConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub publish_key: String,
    pub excerpt_length: usize,
    pub latest_count: usize,
    pub revalidate_secs: u64,
    pub site: SiteConfig,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src/site/notes"),
            output: PathBuf::from("dist"),
            publish_key: "dg-publish".to_string(),
            excerpt_length: 150,
            latest_count: 6,
            revalidate_secs: 3600,
            site: SiteConfig::default(),
        }
    }
}

/// Text shown in the page chrome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub title: String,
    pub subtitle: String,
    pub footer: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Digital Garden".to_string(),
            subtitle: "A curated collection of thoughts, notes, and explorations".to_string(),
            footer: "Keep growing!".to_string(),
        }
    }
}

impl GardenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.excerpt_length == 0 {
            return Err(ConfigError::Validation(
                "excerpt_length must be greater than 0".into(),
            ));
        }
        if self.latest_count == 0 {
            return Err(ConfigError::Validation(
                "latest_count must be greater than 0".into(),
            ));
        }
        if self.revalidate_secs == 0 {
            return Err(ConfigError::Validation(
                "revalidate_secs must be greater than 0".into(),
            ));
        }
        if self.publish_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "publish_key must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn revalidate_after(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<GardenConfig, ConfigError> {
    if !path.exists() {
        debug!("no config at {}, using defaults", path.display());
        let config = GardenConfig::default();
        config.validate()?;
        return Ok(config);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<GardenConfig, ConfigError> {
    let config: GardenConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_the_garden_layout() {
        let config = GardenConfig::default();
        assert_eq!(config.source, PathBuf::from("src/site/notes"));
        assert_eq!(config.publish_key, "dg-publish");
        assert_eq!(config.excerpt_length, 150);
        assert_eq!(config.latest_count, 6);
        assert_eq!(config.revalidate_after(), Duration::from_secs(3600));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
latest_count = 3

[site]
title = "Notebook"
"#,
        )
        .unwrap();
        assert_eq!(config.latest_count, 3);
        assert_eq!(config.site.title, "Notebook");
        assert_eq!(config.site.footer, SiteConfig::default().footer);
        assert_eq!(config.output, PathBuf::from("dist"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("sourec = \"notes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn zero_values_fail_validation() {
        for toml in ["excerpt_length = 0", "latest_count = 0", "revalidate_secs = 0", "publish_key = \" \""] {
            let err = parse_config(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{toml}");
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("garden.toml")).unwrap();
        assert_eq!(config, GardenConfig::default());
    }

    #[test]
    fn file_on_disk_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("garden.toml");
        fs::write(&path, "source = \"vault\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.source, PathBuf::from("vault"));
    }
}
