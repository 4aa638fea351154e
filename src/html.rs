//! Standalone HTML output.
//!
//! The Markdown event stream goes through pulldown-cmark's own HTML writer,
//! with three rewrites on the way: headings get the same ids the PDF uses,
//! fenced code is replaced by syntect-highlighted markup, and `[TOC]` /
//! page-break paragraphs become their rendered form.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Parser, Tag, TagEnd, html};

use crate::RenderContext;
use crate::block::{Block, Document};
use crate::highlight::Token;
use crate::parser;

/// Convert Markdown to an HTML fragment (no `<html>` wrapper).
pub fn markdown_to_html(markdown: &str, render: &RenderContext) -> String {
    let doc = parser::parse(markdown);
    render_fragment(markdown, &doc, render)
}

/// Convert Markdown to a complete themed HTML document.
pub fn markdown_to_html_document(markdown: &str, render: &RenderContext) -> String {
    let doc = parser::parse(markdown);
    let body = render_fragment(markdown, &doc, render);
    let title = doc.title().or(render.fallback_title).unwrap_or("Document");
    html_document(&body, title, render)
}

/// Wrap an HTML fragment in a document carrying the theme's CSS and the
/// configured page setup for printing.
pub fn html_document(body: &str, title: &str, render: &RenderContext) -> String {
    let page = &render.config.page;
    let mut css = format!(
        "@page {{ size: {}; margin: {}; background: {}; }}\n",
        css_page_size(&page.paper),
        page.margin_length(),
        render.theme.colors.background
    );
    css.push_str(&render.theme.css());
    if !render.config.links.underline {
        css.push_str("a { text-decoration: none; }\n");
    }
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
{css}</style>
</head>
<body>
{body}</body>
</html>
"#,
        title = html_escape::encode_text(title),
    )
}

/// CSS `size` for a Typst paper name; sizes CSS has no keyword for fall back
/// to `auto`.
fn css_page_size(paper: &str) -> &'static str {
    let paper = paper.trim().to_ascii_lowercase();
    match paper.strip_prefix("us-").unwrap_or(paper.as_str()) {
        "a3" => "A3",
        "a4" => "A4",
        "a5" => "A5",
        "iso-b4" | "b4" => "B4",
        "iso-b5" | "b5" => "B5",
        "letter" => "letter",
        "legal" => "legal",
        "ledger" => "ledger",
        _ => "auto",
    }
}

fn render_fragment(markdown: &str, doc: &Document, render: &RenderContext) -> String {
    let markdown = parser::strip_frontmatter(markdown);
    let events: Vec<Event> = Parser::new_ext(markdown, parser::options()).collect();
    let events = rewrite_events(&events, doc, render);

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn rewrite_events<'a>(
    events: &[Event<'a>],
    doc: &Document,
    render: &RenderContext,
) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    // Headings arrive in the same order the parser recorded them
    let mut headings = doc.headings.iter();
    let mut i = 0;

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::Paragraph) => {
                if let Some((len, block)) = marker_paragraph(&events[i..]) {
                    out.push(Event::Html(marker_html(&block, doc, render).into()));
                    i += len + 1;
                    continue;
                }
            }
            Event::Start(Tag::Heading {
                level,
                classes,
                attrs,
                ..
            }) => {
                out.push(Event::Start(Tag::Heading {
                    level: *level,
                    id: headings.next().map(|h| CowStr::from(h.id.clone())),
                    classes: classes.clone(),
                    attrs: attrs.clone(),
                }));
                i += 1;
                continue;
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.to_string()),
                    _ => None,
                };
                let mut code = String::new();
                i += 1;
                while let Some(event) = events.get(i) {
                    match event {
                        Event::Text(text) => code.push_str(text),
                        Event::End(TagEnd::CodeBlock) => break,
                        _ => {}
                    }
                    i += 1;
                }
                out.push(Event::Html(code_block_html(&code, language.as_deref(), render).into()));
                i += 1;
                continue;
            }
            _ => {}
        }
        out.push(events[i].clone());
        i += 1;
    }

    out
}

/// If `events` opens with a paragraph holding only marker text, the index of
/// its closing event and the block it stands for.
fn marker_paragraph(events: &[Event]) -> Option<(usize, Block)> {
    let mut text = String::new();
    for (offset, event) in events.iter().enumerate().skip(1) {
        match event {
            Event::Text(t) => text.push_str(t),
            Event::SoftBreak => text.push(' '),
            Event::End(TagEnd::Paragraph) => return parser::marker(&text).map(|b| (offset, b)),
            _ => return None,
        }
    }
    None
}

fn marker_html(block: &Block, doc: &Document, render: &RenderContext) -> String {
    match block {
        Block::TableOfContents => {
            let toc = &render.config.toc;
            let mut html = String::from("<nav class=\"toc\">\n");
            html.push_str(&format!(
                "<p class=\"toc-title\">{}</p>\n<ul>\n",
                html_escape::encode_text(&toc.title)
            ));
            for heading in doc.headings.iter().filter(|h| h.level <= toc.depth) {
                html.push_str(&format!(
                    "<li class=\"toc-h{}\"><a href=\"#{}\">{}</a></li>\n",
                    heading.level,
                    html_escape::encode_double_quoted_attribute(&heading.id),
                    html_escape::encode_text(&heading.text)
                ));
            }
            html.push_str("</ul>\n</nav>\n");
            html
        }
        _ => "<div class=\"page-break\"></div>\n".to_string(),
    }
}

fn code_block_html(code: &str, language: Option<&str>, render: &RenderContext) -> String {
    let lines = render.highlighter.highlight(code, language, render.theme);
    let mut html = String::from("<pre class=\"highlight\"><code>");
    for line in &lines {
        for token in line {
            token_html(token, &mut html);
        }
        html.push('\n');
    }
    html.push_str("</code></pre>\n");
    html
}

/// Inline colour so the markup survives without the stylesheet; font styles
/// go through classes.
fn token_html(token: &Token, html: &mut String) {
    let mut classes = Vec::new();
    if token.bold {
        classes.push("hl-bold");
    }
    if token.italic {
        classes.push("hl-italic");
    }
    if token.underline {
        classes.push("hl-underline");
    }
    let escaped = html_escape::encode_text(&token.text);
    if classes.is_empty() {
        html.push_str(&format!(
            r#"<span style="color: {}">{}</span>"#,
            token.color, escaped
        ));
    } else {
        html.push_str(&format!(
            r#"<span class="{}" style="color: {}">{}</span>"#,
            classes.join(" "),
            token.color,
            escaped
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Highlighter, ThemeRegistry};

    fn with_render<T>(config: &Config, f: impl FnOnce(&RenderContext) -> T) -> T {
        let registry = ThemeRegistry::builtin().unwrap();
        let highlighter = Highlighter::new();
        let theme = registry.resolve(Some("dracula")).unwrap();
        let render = RenderContext::new(theme, config, &highlighter);
        f(&render)
    }

    fn fragment(markdown: &str) -> String {
        with_render(&Config::default(), |render| markdown_to_html(markdown, render))
    }

    #[test]
    fn headings_get_slug_ids() {
        let html = fragment("# Intro\n\n## Intro\n\n## Custom {#mine}");
        assert!(html.contains("<h1 id=\"intro\">Intro</h1>"));
        assert!(html.contains("<h2 id=\"intro_1\">Intro</h2>"));
        assert!(html.contains("<h2 id=\"mine\">Custom</h2>"));
    }

    #[test]
    fn code_is_highlighted_inline() {
        let html = fragment("```rust\nlet x = 1 < 2;\n```");
        assert!(html.starts_with("<pre class=\"highlight\"><code><span"));
        assert!(html.contains("style=\"color: #"));
        assert!(html.contains("&lt;"));
        assert!(!html.contains("language-rust"));
    }

    #[test]
    fn toc_lists_headings_to_depth() {
        let html = fragment("[TOC]\n\n# One\n\n## Two\n\n#### Four");
        assert!(html.starts_with("<nav class=\"toc\">\n<p class=\"toc-title\">Contents</p>"));
        assert!(html.contains("<li class=\"toc-h1\"><a href=\"#one\">One</a></li>"));
        assert!(html.contains("<li class=\"toc-h2\"><a href=\"#two\">Two</a></li>"));
        assert!(!html.contains("href=\"#four\""));
    }

    #[test]
    fn page_break_marker() {
        let html = fragment("a\n\n---pagebreak---\n\nb");
        assert!(html.contains("<div class=\"page-break\"></div>"));
        assert!(!html.contains("pagebreak</p>"));
    }

    #[test]
    fn extensions_render() {
        let html = fragment(
            "> [!WARNING]\n> Hot\n\n| a |\n|---|\n| 1 |\n\n~~old~~ [^n]\n\n[^n]: note",
        );
        assert!(html.contains("<blockquote class=\"markdown-alert-warning\">"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
        assert!(html.contains("footnote-definition"));
    }

    #[test]
    fn frontmatter_is_stripped() {
        let html = fragment("---\ntitle: x\n---\n# Body");
        assert_eq!(html, "<h1 id=\"body\">Body</h1>\n");
    }

    #[test]
    fn document_wraps_fragment() {
        let html = with_render(&Config::default(), |render| {
            markdown_to_html_document("# Fish & Chips\n\ntext", render)
        });
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Fish &amp; Chips</title>"));
        assert!(html.contains("background: #282a36;"));
        assert!(html.contains("@page { size: A4; margin: 2cm; background: #282a36; }"));
        assert!(!html.contains("text-decoration: none"));
    }

    #[test]
    fn page_setup_follows_config() {
        let config = Config::from_toml(
            "[page]\npaper = \"us-letter\"\nmargin = \"0.75in\"\n",
            std::path::Path::new("x.toml"),
        )
        .unwrap();
        let html = with_render(&config, |render| markdown_to_html_document("text", render));
        assert!(html.contains("@page { size: letter; margin: 0.75in; background: #282a36; }"));
        assert_eq!(html.matches("@page").count(), 1);
        assert_eq!(css_page_size("a5"), "A5");
        assert_eq!(css_page_size("presentation-16-9"), "auto");
    }

    #[test]
    fn leading_markers_survive_frontmatter_check() {
        let html = fragment("---pagebreak---\n\nIntro paragraph.\n\n---\n\nAfter rule.\n");
        assert!(html.starts_with("<div class=\"page-break\"></div>"));
        assert!(html.contains("<p>Intro paragraph.</p>"));
        assert!(html.contains("<hr />"));

        let html = fragment("---\n\n# Title\n\nBody.\n\n---\n\nTail.\n");
        assert!(html.starts_with("<hr />"));
        assert!(html.contains("<h1 id=\"title\">Title</h1>"));
        assert!(html.contains("<p>Body.</p>"));
    }

    #[test]
    fn document_title_falls_back() {
        let config =
            Config::from_toml("[links]\nunderline = false\n", std::path::Path::new("x.toml"))
                .unwrap();
        let html = with_render(&config, |render| {
            let render = RenderContext {
                fallback_title: Some("notes"),
                ..*render
            };
            markdown_to_html_document("no heading", &render)
        });
        assert!(html.contains("<title>notes</title>"));
        assert!(html.contains("a { text-decoration: none; }"));
    }
}
