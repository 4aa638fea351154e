//! Error types for md2pdf.
//!
//! Setup failures ([`PathError`], [`UnknownThemeError`], [`ConfigError`],
//! [`BundledThemeError`]) are fatal and surface as [`Md2PdfError`] before any
//! file is converted. A [`ConversionError`] only ever concerns a single source
//! file; in a tree run it is stored in the per-file outcome and the run
//! carries on with the next file.

use std::path::PathBuf;
use thiserror::Error;

/// An input or output root that cannot be used.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path not found: '{path}'")]
    NotFound { path: PathBuf },

    #[error("not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// A theme name that is not in the registry.
#[derive(Debug, Error)]
#[error("unknown theme '{name}' (available: {})", available.join(", "))]
pub struct UnknownThemeError {
    pub name: String,
    pub available: Vec<String>,
}

/// A theme shipped with the crate that does not deserialize.
#[derive(Debug, Error)]
#[error("bundled theme '{file}' is invalid: {source}")]
pub struct BundledThemeError {
    pub file: &'static str,
    #[source]
    pub source: toml::de::Error,
}

/// Failure to load or parse a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to convert a single Markdown file.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("typst compilation failed: {detail}")]
    Compile { detail: String },

    #[error("PDF generation failed: {detail}")]
    Render { detail: String },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a run before any conversion starts, or that end a
/// single-document conversion.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    UnknownTheme(#[from] UnknownThemeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    BundledTheme(#[from] BundledThemeError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_lists_alternatives() {
        let err = UnknownThemeError {
            name: "solarized".into(),
            available: vec!["nord".into(), "dracula".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown theme 'solarized' (available: nord, dracula)"
        );
    }

    #[test]
    fn fatal_error_is_transparent() {
        let err: Md2PdfError = PathError::NotFound {
            path: PathBuf::from("notes"),
        }
        .into();
        assert_eq!(err.to_string(), "path not found: 'notes'");
    }
}
