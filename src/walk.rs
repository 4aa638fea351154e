//! Discovery of Markdown files and the mirrored output layout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::PathError;

/// A Markdown file found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// Path relative to the input root.
    pub relative: PathBuf,
}

impl SourceFile {
    /// Mirrored location of this file under `output_root`, with `extension`.
    pub fn output_path(&self, output_root: &Path, extension: &str) -> PathBuf {
        output_root.join(&self.relative).with_extension(extension)
    }

    /// File name without the `.md` extension.
    pub fn stem(&self) -> String {
        self.relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A validated input directory.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    pub fn open(root: &Path) -> Result<Self, PathError> {
        if !root.exists() {
            return Err(PathError::NotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(PathError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Markdown files under the root, depth first in file-name order.
    ///
    /// The walk is lazy. Entries that cannot be read come through as errors
    /// so the caller can decide whether to skip them.
    pub fn sources(&self) -> impl Iterator<Item = Result<SourceFile, PathError>> + '_ {
        // Hidden files and ignore files are not filters here; every .md counts
        WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|t| t.is_file());
                    if !is_file || !is_markdown(entry.path()) {
                        return None;
                    }
                    let relative = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();
                    Some(Ok(SourceFile {
                        path: entry.into_path(),
                        relative,
                    }))
                }
                Err(source) => Some(Err(PathError::Walk {
                    path: self.root.clone(),
                    source,
                })),
            })
    }

    /// Every readable source, logging and skipping the entries that fail.
    pub fn collect_sources(&self) -> Vec<SourceFile> {
        self.sources()
            .filter_map(|source| match source {
                Ok(source) => Some(source),
                Err(e) => {
                    tracing::warn!("skipping entry: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Create the output root if needed.
pub fn prepare_output_root(root: &Path) -> Result<(), PathError> {
    if root.exists() && !root.is_dir() {
        return Err(PathError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    fs::create_dir_all(root).map_err(|source| PathError::CreateDir {
        path: root.to_path_buf(),
        source,
    })
}

/// Create the directories leading up to `path`.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
