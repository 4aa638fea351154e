//! File and tree conversion.
//!
//! [`convert_tree`] is the whole run: resolve the theme, validate the roots,
//! then convert every Markdown file in turn. A file that fails is recorded in
//! the [`ConversionReport`] and the run moves on.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{ConversionError, Md2PdfError};
use crate::highlight::Highlighter;
use crate::theme::{Theme, ThemeRegistry};
use crate::typst::ImageResolver;
use crate::walk::{self, SourceFile, SourceTree};
use crate::{RenderContext, markdown_to_html_document, markdown_to_pdf_with};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Pdf,
    /// Standalone HTML with the theme's CSS embedded
    Html,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
        }
    }
}

/// Settings for a tree conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Theme name; `config.theme` is used when unset.
    pub theme: Option<String>,
    pub config: Config,
    pub format: OutputFormat,
}

/// Converts Markdown with one theme and configuration.
pub struct Converter<'a> {
    theme: &'a Theme,
    config: &'a Config,
    highlighter: &'a Highlighter,
    format: OutputFormat,
}

impl<'a> Converter<'a> {
    pub fn new(
        theme: &'a Theme,
        config: &'a Config,
        highlighter: &'a Highlighter,
        format: OutputFormat,
    ) -> Self {
        Self {
            theme,
            config,
            highlighter,
            format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render one Markdown document to the output format's bytes.
    ///
    /// `title` names the document when it has no level-1 heading.
    pub fn render(
        &self,
        markdown: &str,
        images: Option<&ImageResolver>,
        title: Option<&str>,
    ) -> Result<Vec<u8>, ConversionError> {
        let render = RenderContext {
            theme: self.theme,
            config: self.config,
            highlighter: self.highlighter,
            images,
            fallback_title: title,
        };
        match self.format {
            OutputFormat::Pdf => markdown_to_pdf_with(markdown, &render),
            OutputFormat::Html => Ok(markdown_to_html_document(markdown, &render).into_bytes()),
        }
    }

    /// Convert `source` and write the result to `output`, replacing any
    /// existing file. Images may be loaded from anywhere below `input_root`.
    pub fn convert_file(
        &self,
        source: &SourceFile,
        input_root: &Path,
        output: &Path,
    ) -> Result<(), ConversionError> {
        let markdown =
            fs::read_to_string(&source.path).map_err(|source_err| ConversionError::Read {
                path: source.path.clone(),
                source: source_err,
            })?;

        let dir = source.path.parent().unwrap_or(input_root);
        let images = ImageResolver::new(input_root, dir);
        let bytes = self.render(&markdown, images.as_ref(), Some(&source.stem()))?;

        let write_error = |source| ConversionError::Write {
            path: output.to_path_buf(),
            source,
        };
        walk::ensure_parent(output).map_err(write_error)?;
        fs::write(output, bytes).map_err(write_error)
    }
}

/// Result of converting one file.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: SourceFile,
    pub output: PathBuf,
    pub result: Result<(), ConversionError>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a tree conversion did, in walk order.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Name of the theme that was applied
    pub theme: String,
    pub outcomes: Vec<FileOutcome>,
}

impl ConversionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Hooks for following a tree conversion. All methods default to no-ops.
pub trait ConversionProgress {
    /// Called once, before the first file, when there is at least one file.
    fn on_start(&self, total: usize, theme: &Theme) {
        let _ = (total, theme);
    }

    fn on_file_start(&self, source: &SourceFile) {
        let _ = source;
    }

    fn on_file_done(&self, outcome: &FileOutcome) {
        let _ = outcome;
    }
}

/// Progress hooks that do nothing.
pub struct NoProgress;

impl ConversionProgress for NoProgress {}

/// Convert every Markdown file under `input_root` into a mirrored file under
/// `output_root`.
///
/// Fails before touching the output root when the theme is unknown or the
/// input root is unusable. Per-file failures end up in the report.
pub fn convert_tree(
    input_root: &Path,
    output_root: &Path,
    options: &ConvertOptions,
    progress: &dyn ConversionProgress,
) -> Result<ConversionReport, Md2PdfError> {
    let registry = ThemeRegistry::builtin()?;
    let theme = registry.get(options.theme.as_deref().unwrap_or(&options.config.theme))?;
    let tree = SourceTree::open(input_root)?;

    let sources = tree.collect_sources();
    let mut report = ConversionReport {
        theme: theme.name.clone(),
        outcomes: Vec::with_capacity(sources.len()),
    };
    if sources.is_empty() {
        tracing::warn!(input = %input_root.display(), "no Markdown files found");
        return Ok(report);
    }

    walk::prepare_output_root(output_root)?;

    tracing::info!(
        theme = %theme.name,
        files = sources.len(),
        output = %output_root.display(),
        "converting"
    );
    let highlighter = Highlighter::new();
    let converter = Converter::new(theme, &options.config, &highlighter, options.format);
    progress.on_start(sources.len(), theme);

    for source in sources {
        progress.on_file_start(&source);
        let output = source.output_path(output_root, options.format.extension());
        tracing::debug!(
            source = %source.relative.display(),
            output = %output.display(),
            "converting file"
        );

        let result = converter.convert_file(&source, tree.root(), &output);
        if let Err(ref e) = result {
            tracing::warn!(source = %source.relative.display(), "conversion failed: {e}");
        }

        let outcome = FileOutcome {
            source,
            output,
            result,
        };
        progress.on_file_done(&outcome);
        report.outcomes.push(outcome);
    }

    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed().count(),
        "conversion finished"
    );
    Ok(report)
}
