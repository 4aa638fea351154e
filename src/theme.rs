//! Theme registry.
//!
//! A theme is a colour palette plus font choices, bundled as TOML under
//! `themes/`. Each palette renders to a Typst stylesheet for PDF output and to
//! CSS for HTML output, so both formats stay visually in step.

use std::fmt;

use serde::Deserialize;

use crate::error::{BundledThemeError, UnknownThemeError};

/// Theme used when none is requested.
pub const DEFAULT_THEME: &str = "professional_dark";

/// Highlighting style used when a theme names one the highlighter lacks.
pub const FALLBACK_SYNTAX_THEME: &str = "base16-ocean.dark";

static BUILTIN_THEMES: &[(&str, &str)] = &[
    ("professional_dark.toml", include_str!("../themes/professional_dark.toml")),
    ("dracula.toml", include_str!("../themes/dracula.toml")),
    ("minimal_light.toml", include_str!("../themes/minimal_light.toml")),
    ("nord.toml", include_str!("../themes/nord.toml")),
    ("github_dark.toml", include_str!("../themes/github_dark.toml")),
];

/// An sRGB colour written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Typst expression for this colour.
    pub fn typst(&self) -> String {
        format!("rgb(\"{self}\")")
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| format!("expected a colour like #1a2b3c, got '{value}'"))?;
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub heading: Color,
    pub accent: Color,
    pub link: Color,
    pub muted: Color,
    pub border: Color,
    pub code_background: Color,
    pub code_text: Color,
    pub table_header: Color,
}

/// Colours for the five admonition kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmonitionColors {
    pub note: Color,
    pub tip: Color,
    pub important: Color,
    pub warning: Color,
    pub caution: Color,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fonts {
    pub body: Vec<String>,
    pub heading: Vec<String>,
    pub mono: Vec<String>,
    /// Body text size in points.
    pub size: f32,
    /// Code text size in points.
    pub code_size: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Theme {
    pub name: String,
    pub description: String,
    /// Name of the syntect highlighting theme for code blocks.
    pub syntax: String,
    pub colors: Palette,
    pub admonitions: AdmonitionColors,
    pub fonts: Fonts,
}

impl Theme {
    /// Typst rules applying this theme. Emitted at the top of every document.
    pub fn typst_stylesheet(&self) -> String {
        let c = &self.colors;
        let f = &self.fonts;
        let mut out = String::new();

        out.push_str(&format!("#set page(fill: {})\n", c.background.typst()));
        out.push_str(&format!(
            "#set text(font: {}, size: {}pt, fill: {})\n",
            typst_font_list(&f.body),
            f.size,
            c.text.typst()
        ));
        out.push_str("#set par(linebreaks: \"optimized\")\n");
        out.push_str(&format!(
            "#show heading: set text(font: {}, fill: {})\n",
            typst_font_list(&f.heading),
            c.heading.typst()
        ));
        out.push_str(&format!(
            "#show heading.where(level: 1): it => {{ it; v(-0.4em); line(length: 100%, stroke: 0.8pt + {}) }}\n",
            c.accent.typst()
        ));
        out.push_str(&format!(
            "#show raw: set text(font: {}, size: {}pt)\n",
            typst_font_list(&f.mono),
            f.code_size
        ));
        out.push_str(&format!("#show link: set text(fill: {})\n", c.link.typst()));
        out.push_str(&format!(
            "#set table(stroke: 0.5pt + {}, inset: 6pt, fill: (x, y) => if y == 0 {{ {} }})\n",
            c.border.typst(),
            c.table_header.typst()
        ));
        out.push_str(&format!("#set line(stroke: 0.5pt + {})\n", c.border.typst()));
        out.push_str(&format!(
            "#show quote.where(block: true): it => block(stroke: (left: 2pt + {}), inset: (left: 10pt, y: 4pt), text(fill: {}, it.body))\n",
            c.border.typst(),
            c.muted.typst()
        ));
        out.push_str(&format!(
            "#set footnote.entry(separator: line(length: 30%, stroke: 0.5pt + {}))\n",
            c.border.typst()
        ));
        out.push_str(&format!(
            "#let md_inline_code(body) = box(fill: {}, inset: (x: 3pt, y: 0pt), outset: (y: 3pt), radius: 2pt, raw(body))\n",
            c.code_background.typst()
        ));
        out.push_str(&format!(
            "#let md_code_block(breakable: true, body) = block(fill: {}, inset: 10pt, radius: 4pt, width: 100%, breakable: breakable, text(fill: {}, body))\n",
            c.code_background.typst(),
            c.code_text.typst()
        ));
        out.push_str(
            "#let md_admonition(color, title, body) = block(fill: color.transparentize(85%), stroke: (left: 3pt + color), inset: 10pt, width: 100%)[\n  #text(weight: \"bold\", fill: color, title)\n\n  #body\n]\n",
        );
        out.push('\n');
        out
    }

    /// CSS applying this theme to a standalone HTML document.
    pub fn css(&self) -> String {
        let c = &self.colors;
        let f = &self.fonts;
        let a = &self.admonitions;
        let body_font = css_font_list(&f.body, "serif");
        let heading_font = css_font_list(&f.heading, "serif");
        let mono_font = css_font_list(&f.mono, "monospace");

        format!(
            r#"body {{ background: {bg}; color: {text}; font-family: {body_font}; font-size: {size}pt; line-height: 1.6; max-width: 50em; margin: 0 auto; padding: 2em; }}
h1, h2, h3, h4, h5, h6 {{ color: {heading}; font-family: {heading_font}; line-height: 1.25; }}
h1 {{ border-bottom: 1px solid {accent}; padding-bottom: 0.3em; }}
a {{ color: {link}; }}
code {{ font-family: {mono_font}; font-size: {code_size}pt; background: {code_bg}; padding: 0.1em 0.3em; border-radius: 3px; }}
pre.highlight {{ background: {code_bg}; color: {code_text}; padding: 10px; border-radius: 4px; overflow-x: auto; }}
pre.highlight code {{ background: none; padding: 0; }}
table {{ border-collapse: collapse; margin: 1em 0; }}
th, td {{ border: 1px solid {border}; padding: 6px; }}
th {{ background: {table_header}; }}
hr {{ border: 0; border-top: 1px solid {border}; }}
blockquote {{ border-left: 2px solid {border}; color: {muted}; margin-left: 0; padding-left: 10px; }}
blockquote.markdown-alert-note {{ border-left: 3px solid {note}; color: inherit; }}
blockquote.markdown-alert-tip {{ border-left: 3px solid {tip}; color: inherit; }}
blockquote.markdown-alert-important {{ border-left: 3px solid {important}; color: inherit; }}
blockquote.markdown-alert-warning {{ border-left: 3px solid {warning}; color: inherit; }}
blockquote.markdown-alert-caution {{ border-left: 3px solid {caution}; color: inherit; }}
.footnote-definition {{ font-size: 0.9em; color: {muted}; }}
nav.toc {{ border: 1px solid {border}; padding: 0.5em 1em; border-radius: 4px; }}
nav.toc ul {{ list-style: none; padding-left: 0; }}
nav.toc .toc-title {{ font-weight: bold; margin: 0.5em 0; }}
nav.toc li.toc-h2 {{ margin-left: 1em; }}
nav.toc li.toc-h3 {{ margin-left: 2em; }}
nav.toc li.toc-h4, nav.toc li.toc-h5, nav.toc li.toc-h6 {{ margin-left: 3em; }}
.hl-bold {{ font-weight: bold; }}
.hl-italic {{ font-style: italic; }}
.hl-underline {{ text-decoration: underline; }}
.page-break {{ page-break-after: always; break-after: page; }}
"#,
            bg = c.background,
            text = c.text,
            heading = c.heading,
            accent = c.accent,
            link = c.link,
            muted = c.muted,
            border = c.border,
            code_bg = c.code_background,
            code_text = c.code_text,
            table_header = c.table_header,
            note = a.note,
            tip = a.tip,
            important = a.important,
            warning = a.warning,
            caution = a.caution,
            size = f.size,
            code_size = f.code_size,
        )
    }
}

fn typst_font_list(fonts: &[String]) -> String {
    let quoted: Vec<String> = fonts.iter().map(|f| format!("\"{}\"", f)).collect();
    // trailing comma keeps a single font an array
    format!("({},)", quoted.join(", "))
}

fn css_font_list(fonts: &[String], generic: &str) -> String {
    let mut families: Vec<String> = fonts.iter().map(|f| format!("\"{}\"", f)).collect();
    families.push(generic.to_string());
    families.join(", ")
}

fn parse_bundled(file: &'static str, src: &str) -> Result<Theme, BundledThemeError> {
    toml::from_str(src).map_err(|source| BundledThemeError { file, source })
}

/// Immutable name → theme mapping, in registration order.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: Vec<Theme>,
}

impl ThemeRegistry {
    /// Registry of the themes bundled with the crate.
    pub fn builtin() -> Result<Self, BundledThemeError> {
        let themes = BUILTIN_THEMES
            .iter()
            .map(|&(file, src)| parse_bundled(file, src))
            .collect::<Result<_, _>>()?;
        Ok(Self { themes })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|t| t.name.as_str())
    }

    pub fn list(&self) -> &[Theme] {
        &self.themes
    }

    pub fn get(&self, name: &str) -> Result<&Theme, UnknownThemeError> {
        self.themes
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| UnknownThemeError {
                name: name.to_string(),
                available: self.names().map(String::from).collect(),
            })
    }

    /// Look up `name`, or the default theme when `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Theme, UnknownThemeError> {
        self.get(name.unwrap_or(DEFAULT_THEME))
    }
}
