//! XML configuration support.
//! - Loads defaults from config.xml (quick_xml).
//! - A missing file is not an error: built-in defaults apply.
//!
//! Example:
//! <config>
//!   <log_level>info</log_level>
//!   <log_file>/var/log/timefops.log</log_file>
//!   <format>%Y</format>
//!   <format>%m</format>
//!   <color>false</color>
//! </config>

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::paths::default_config_path;
use super::types::{Config, LogLevel};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(rename = "log_level")]
    log_level: Option<String>,
    #[serde(rename = "log_file")]
    log_file: Option<String>,
    /// Repeated element; each one is a bucket segment.
    #[serde(rename = "format", default)]
    formats: Vec<String>,
    #[serde(rename = "color", default, deserialize_with = "de_bool_trimmed_opt")]
    color: Option<bool>,
}

// Custom deserializer that trims surrounding whitespace for optional bool
fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }))
}

// Map XmlConfig -> Config
fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();

    if let Some(s) = parsed.log_level.as_deref()
        && let Some(level) = LogLevel::parse(s.trim())
    {
        cfg.log_level = level;
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }

    // Format components are kept verbatim; leading/trailing spaces can be meaningful
    // in strftime output, but empty elements are dropped.
    let formats: Vec<String> = parsed
        .formats
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .collect();
    if !formats.is_empty() {
        cfg.formats = formats;
    }

    if let Some(color) = parsed.color {
        cfg.color = color;
    }

    cfg
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    Ok(xml_to_config(parsed))
}

/// Load the config from `$TIMEFOPS_CONFIG` or the default location.
/// A missing file yields the built-in defaults; a malformed file is an error.
pub fn load_config() -> Result<Config> {
    let Some(path) = default_config_path() else {
        debug!("no config directory available; using defaults");
        return Ok(Config::default());
    };
    if !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(Config::default());
    }
    debug!(path = %path.display(), "loading config file");
    load_config_from_xml_path(&path)
}
