use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::theme::DEFAULT_THEME;

/// Name of the config file picked up from the input root.
pub const CONFIG_FILE_NAME: &str = "md2pdf.toml";

/// Run settings. Every key is optional in a config file; missing keys keep
/// their defaults and unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Theme used when none is given on the command line.
    pub theme: String,
    pub page: PageConfig,
    pub links: LinksConfig,
    pub toc: TocConfig,
    pub font: FontConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            page: PageConfig::default(),
            links: LinksConfig::default(),
            toc: TocConfig::default(),
            font: FontConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    /// Typst paper name, e.g. `a4` or `us-letter`.
    pub paper: String,
    /// Typst length applied to all four margins.
    pub margin: String,
    pub numbers: bool,
}

impl PageConfig {
    /// The margin if it is a plain length such as `2cm` or `0.75in`,
    /// otherwise `2cm` with a warning.
    pub fn margin_length(&self) -> &str {
        plain_length(&self.margin).unwrap_or_else(|| {
            tracing::warn!(margin = %self.margin, "invalid page margin, using 2cm");
            "2cm"
        })
    }
}

/// `s` if it is a number followed by `pt`, `mm`, `cm`, `in` or `em`. Both
/// Typst and CSS read these the same way.
fn plain_length(s: &str) -> Option<&str> {
    let s = s.trim();
    let unit_start = s.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (number, unit) = s.split_at(unit_start);
    let valid = number.parse::<f64>().is_ok() && matches!(unit, "pt" | "mm" | "cm" | "in" | "em");
    valid.then_some(s)
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            paper: "a4".to_string(),
            margin: "2cm".to_string(),
            numbers: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    pub underline: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { underline: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TocConfig {
    pub title: String,
    pub depth: u8,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            title: "Contents".to_string(),
            depth: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    /// Also search fonts installed on the system.
    pub system: bool,
}

impl Config {
    /// Parse `content`; keys it leaves out keep their defaults.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load `explicit` if given, else `md2pdf.toml` in `input_root` if it
    /// exists, else the defaults.
    pub fn discover(explicit: Option<&Path>, input_root: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local: PathBuf = input_root.join(CONFIG_FILE_NAME);
        if local.is_file() {
            tracing::debug!(path = %local.display(), "using config from input root");
            return Self::load(&local);
        }
        Ok(Self::default())
    }
}
