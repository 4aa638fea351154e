//! Syntax highlighting for fenced code blocks.
//!
//! Highlighting goes through syntect's bundled syntaxes and themes. A code
//! block becomes a list of lines, each a run of coloured tokens, which the
//! Typst and HTML writers then render in their own markup.

use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme as SyntectTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::theme::{Color, FALLBACK_SYNTAX_THEME, Theme};

const PLAIN_TEXT: &str = "Plain Text";

/// A run of code sharing one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

pub type HighlightedLine = Vec<Token>;

pub struct Highlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl Highlighter {
    /// Load syntect's default syntaxes and themes. Do this once per run.
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    pub fn has_theme(&self, name: &str) -> bool {
        self.themes.themes.contains_key(name)
    }

    fn syntect_theme(&self, name: &str) -> Option<&SyntectTheme> {
        self.themes.themes.get(name).or_else(|| {
            tracing::debug!(theme = name, "unknown highlighting theme, using fallback");
            self.themes.themes.get(FALLBACK_SYNTAX_THEME)
        })
    }

    /// The grammar for an info string, or None for plain text.
    fn syntax(&self, language: Option<&str>) -> Option<&SyntaxReference> {
        // Info strings like "rust,ignore" or "python title=x" name the language first
        language
            .and_then(|lang| lang.split([',', ' ', '{']).next())
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .and_then(|lang| self.syntaxes.find_syntax_by_token(lang))
            .filter(|syntax| syntax.name != PLAIN_TEXT)
    }

    /// Highlight `code` as `language` with the theme's syntect colours.
    ///
    /// Code without a known grammar is set in the theme's plain code colour.
    pub fn highlight(
        &self,
        code: &str,
        language: Option<&str>,
        theme: &Theme,
    ) -> Vec<HighlightedLine> {
        let plain = theme.colors.code_text;
        let code = code.replace('\t', "    ");
        let (Some(syntax), Some(styles)) =
            (self.syntax(language), self.syntect_theme(&theme.syntax))
        else {
            return LinesWithEndings::from(&code)
                .map(|line| plain_line(line, plain))
                .collect();
        };

        let mut h = HighlightLines::new(syntax, styles);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(&code) {
            let tokens = match h.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => ranges
                    .into_iter()
                    .map(|(style, text)| Token {
                        text: text.trim_end_matches(['\n', '\r']).to_string(),
                        color: Color::new(
                            style.foreground.r,
                            style.foreground.g,
                            style.foreground.b,
                        ),
                        bold: style.font_style.intersects(FontStyle::BOLD),
                        italic: style.font_style.intersects(FontStyle::ITALIC),
                        underline: style.font_style.intersects(FontStyle::UNDERLINE),
                    })
                    .filter(|token| !token.text.is_empty())
                    .collect(),
                Err(e) => {
                    tracing::warn!("failed to highlight line: {e}");
                    plain_line(line, plain)
                }
            };
            lines.push(tokens);
        }

        lines
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// One unstyled token, or none for an empty line.
fn plain_line(line: &str, color: Color) -> HighlightedLine {
    let text = line.trim_end_matches(['\n', '\r']);
    if text.is_empty() {
        return Vec::new();
    }
    vec![Token {
        text: text.to_string(),
        color,
        bold: false,
        italic: false,
        underline: false,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeRegistry;

    fn line_text(line: &HighlightedLine) -> String {
        line.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn bundled_themes_have_highlighting() {
        let highlighter = Highlighter::new();
        assert!(highlighter.has_theme(FALLBACK_SYNTAX_THEME));
        for theme in ThemeRegistry::builtin().unwrap().list() {
            assert!(highlighter.has_theme(&theme.syntax), "{}", theme.syntax);
        }
    }

    fn registry() -> ThemeRegistry {
        ThemeRegistry::builtin().unwrap()
    }

    #[test]
    fn highlights_known_language() {
        let highlighter = Highlighter::new();
        let registry = registry();
        let theme = registry.get("minimal_light").unwrap();
        let lines = highlighter.highlight("fn main() {}\nlet x = 1;\n", Some("rust"), theme);
        assert_eq!(lines.len(), 2);
        assert_eq!(line_text(&lines[0]), "fn main() {}");
        // keywords and identifiers are coloured differently
        let colors: std::collections::HashSet<_> = lines[0].iter().map(|t| t.color).collect();
        assert!(colors.len() > 1);
    }

    #[test]
    fn unknown_syntect_theme_falls_back() {
        let highlighter = Highlighter::new();
        let mut theme = registry().get("nord").unwrap().clone();
        theme.syntax = "nope".to_string();
        let lines = highlighter.highlight("fn main() {}\n", Some("rust"), &theme);
        let colors: std::collections::HashSet<_> = lines[0].iter().map(|t| t.color).collect();
        assert!(colors.len() > 1);
    }

    #[test]
    fn unknown_language_uses_plain_code_colour() {
        let highlighter = Highlighter::new();
        let registry = registry();
        for theme in registry.list() {
            let lines = highlighter.highlight("just text", Some("no-such-lang"), theme);
            assert_eq!(lines.len(), 1);
            assert_eq!(line_text(&lines[0]), "just text");
            assert!(lines[0].iter().all(|t| t.color == theme.colors.code_text));
        }
    }

    #[test]
    fn expands_tabs_and_keeps_empty_lines() {
        let highlighter = Highlighter::new();
        let registry = registry();
        let theme = registry.get("dracula").unwrap();
        let lines = highlighter.highlight("a\n\n\tb\n", None, theme);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].is_empty());
        assert_eq!(line_text(&lines[2]), "    b");
        assert_eq!(lines[2][0].color, theme.colors.code_text);
    }

    #[test]
    fn info_string_language() {
        let highlighter = Highlighter::new();
        let name = |lang| highlighter.syntax(lang).map(|s| s.name.as_str());
        assert_eq!(name(Some("rust,ignore")), Some("Rust"));
        assert_eq!(name(Some("py")), Some("Python"));
        assert_eq!(name(Some("txt")), None);
        assert_eq!(name(None), None);
    }
}
