//! Convert trees of Markdown files into themed PDFs.
//!
//! Markdown is parsed into a small block model, written out as Typst markup
//! behind a theme preamble, and compiled to PDF in-process. The same themes
//! also drive a standalone HTML output.

mod block;
mod config;
mod convert;
mod error;
mod highlight;
mod html;
mod parser;
mod theme;
mod typst;
mod walk;

pub use block::{
    AdmonitionKind, Alignment, Block, Definition, Document, HeadingRef, List, ListItem, Span,
};
pub use config::{CONFIG_FILE_NAME, Config, FontConfig, LinksConfig, PageConfig, TocConfig};
pub use convert::{
    ConversionProgress, ConversionReport, ConvertOptions, Converter, FileOutcome, NoProgress,
    OutputFormat, convert_tree,
};
pub use error::{
    BundledThemeError, ConfigError, ConversionError, Md2PdfError, PathError, UnknownThemeError,
};
pub use highlight::{HighlightedLine, Highlighter, Token};
pub use html::{html_document, markdown_to_html, markdown_to_html_document};
pub use theme::{
    AdmonitionColors, Color, DEFAULT_THEME, FALLBACK_SYNTAX_THEME, Fonts, Palette, Theme,
    ThemeRegistry,
};
pub use typst::ImageResolver;
pub use walk::{SourceFile, SourceTree};

use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_pdf::PdfOptions;

/// Everything rendering needs besides the Markdown itself.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub theme: &'a Theme,
    pub config: &'a Config,
    pub highlighter: &'a Highlighter,
    /// Where local images come from; without one images show their alt text.
    pub images: Option<&'a ImageResolver>,
    /// Title when the document has no level-1 heading.
    pub fallback_title: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    pub fn new(theme: &'a Theme, config: &'a Config, highlighter: &'a Highlighter) -> Self {
        Self {
            theme,
            config,
            highlighter,
            images: None,
            fallback_title: None,
        }
    }
}

/// Parse markdown text into a document.
pub fn parse(markdown: &str) -> Document {
    parser::parse(markdown)
}

/// Convert markdown to Typst markup with the default theme and config.
pub fn markdown_to_typst(markdown: &str) -> Result<String, Md2PdfError> {
    let registry = ThemeRegistry::builtin()?;
    let theme = registry.resolve(None)?;
    let config = Config::default();
    let highlighter = Highlighter::new();
    let render = RenderContext::new(theme, &config, &highlighter);
    Ok(markdown_to_typst_with(markdown, &render))
}

/// Convert markdown to Typst markup.
pub fn markdown_to_typst_with(markdown: &str, render: &RenderContext) -> String {
    let doc = parse(markdown);
    typst::document_to_typst(&doc, render)
}

/// Convert markdown to PDF bytes with the default theme and config.
pub fn markdown_to_pdf(markdown: &str) -> Result<Vec<u8>, Md2PdfError> {
    let registry = ThemeRegistry::builtin()?;
    let theme = registry.resolve(None)?;
    let config = Config::default();
    let highlighter = Highlighter::new();
    let render = RenderContext::new(theme, &config, &highlighter);
    Ok(markdown_to_pdf_with(markdown, &render)?)
}

/// Convert markdown to PDF bytes.
pub fn markdown_to_pdf_with(
    markdown: &str,
    render: &RenderContext,
) -> Result<Vec<u8>, ConversionError> {
    use typst_library::layout::PagedDocument;

    let typst_content = markdown_to_typst_with(markdown, render);

    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(render.config.font.system);

    let mut builder = TypstEngine::builder()
        .main_file(typst_content)
        .search_fonts_with(font_options);
    if let Some(images) = render.images {
        builder = builder.with_file_system_resolver(images.root());
    }
    let engine = builder.build();

    let compiled = engine.compile();
    let doc: Result<PagedDocument, _> = compiled.output;
    for warning in &compiled.warnings {
        tracing::debug!("typst: {}", warning.message);
    }
    let doc = doc.map_err(|e| ConversionError::Compile {
        detail: format!("{:?}", e),
    })?;

    typst_pdf::pdf(&doc, &PdfOptions::default()).map_err(|diagnostics| ConversionError::Render {
        detail: diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    })
}
