use std::path::{Path, PathBuf};

use crate::RenderContext;
use crate::block::{Alignment, Block, Definition, Document, List, Span};
use crate::highlight::Token;

/// Code blocks up to this many lines are kept on one page
const KEEP_TOGETHER_LINES: usize = 25;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Maps image URLs in a document to paths Typst can load.
///
/// Typst only reads files below its project root, so images are resolved
/// relative to the document's directory and then re-rooted at `root`.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    root: PathBuf,
    dir: PathBuf,
}

impl ImageResolver {
    /// `root` is the directory Typst may read from; `dir` holds the document.
    /// Returns None if either directory cannot be resolved.
    pub fn new(root: &Path, dir: &Path) -> Option<Self> {
        Some(Self {
            root: root.canonicalize().ok()?,
            dir: dir.canonicalize().ok()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root-relative Typst path for `url`, if it names a supported local image
    /// inside the root.
    pub fn resolve(&self, url: &str) -> Option<String> {
        if url.contains("://") || url.starts_with("data:") {
            return None;
        }
        let url = url.split(['?', '#']).next()?;
        let path = self.dir.join(url).canonicalize().ok()?;
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut out = String::new();
        for component in relative.components() {
            out.push('/');
            out.push_str(component.as_os_str().to_str()?);
        }
        Some(out)
    }
}

#[derive(Clone, Copy)]
struct Context<'a> {
    render: &'a RenderContext<'a>,
    doc: &'a Document,
    // Off inside footnote bodies so a footnote cannot reference itself
    footnotes: bool,
}

/// Convert a document to Typst markup
pub fn document_to_typst(doc: &Document, render: &RenderContext) -> String {
    let cx = Context {
        render,
        doc,
        footnotes: true,
    };
    let mut out = String::new();
    emit_preamble(cx, &mut out);
    emit_blocks(cx, &doc.blocks, &mut out);
    out
}

fn emit_preamble(cx: Context, out: &mut String) {
    let config = cx.render.config;

    if let Some(title) = cx.doc.title().or(cx.render.fallback_title) {
        out.push_str(&format!("#set document(title: {})\n", typst_string(title)));
    }

    let margin = config.page.margin_length();
    let numbering = if config.page.numbers { "\"1\"" } else { "none" };
    out.push_str(&format!(
        "#set page(paper: {}, margin: {}, numbering: {})\n",
        typst_string(&config.page.paper),
        margin,
        numbering
    ));

    out.push_str(&cx.render.theme.typst_stylesheet());
    if config.links.underline {
        out.push_str("#show link: underline\n\n");
    }
}

fn emit_blocks(cx: Context, blocks: &[Block], out: &mut String) {
    let mut i = 0;
    while i < blocks.len() {
        let block = &blocks[i];

        match block {
            Block::Heading { .. } => {
                // Keep heading with following content using a block that prevents breaks
                out.push_str("#block(breakable: false)[\n");
                emit_heading(cx, block, out);

                // Include the next paragraph if it exists (to keep heading with first content)
                if let Some(next @ Block::Paragraph { .. }) = blocks.get(i + 1) {
                    i += 1;
                    emit_block(cx, next, out);
                }
                out.push_str("]\n\n");
            }
            _ => {
                emit_block(cx, block, out);
            }
        }

        i += 1;
    }
}

fn emit_heading(cx: Context, block: &Block, out: &mut String) {
    if let Block::Heading { level, id, content } = block {
        for _ in 0..*level {
            out.push('=');
        }
        out.push(' ');
        spans_to_typst(cx, content, out);
        out.push_str(&format!(" <{id}>"));
        out.push('\n');
        out.push('\n');
    }
}

fn emit_block(cx: Context, block: &Block, out: &mut String) {
    match block {
        Block::Heading { .. } => {
            emit_heading(cx, block, out);
        }
        Block::Paragraph { content } => {
            if let Some(path) = standalone_image(cx, content) {
                out.push_str(&format!("#align(center, image({}))\n\n", typst_string(&path)));
            } else {
                spans_to_typst(cx, content, out);
                out.push('\n');
                out.push('\n');
            }
        }
        Block::CodeBlock { language, content } => {
            emit_code_block(cx, language.as_deref(), content, out);
        }
        Block::List(list) => {
            // Wrap list to keep together when small, allow breaks when large
            let item_count = count_list_items(list);
            if item_count <= 5 {
                out.push_str("#block(breakable: false)[\n");
                list_to_typst(cx, list, 0, out);
                out.push_str("]\n\n");
            } else {
                list_to_typst(cx, list, 0, out);
                out.push('\n');
            }
        }
        Block::Table {
            alignments,
            headers,
            rows,
        } => {
            // Keep tables together when possible
            out.push_str("#block(breakable: false)[\n");
            table_to_typst(cx, alignments, headers, rows, out);
            out.push_str("]\n\n");
        }
        Block::BlockQuote(inner) => {
            out.push_str("#quote(block: true)[\n");
            emit_blocks(cx, inner, out);
            out.push_str("]\n\n");
        }
        Block::Admonition { kind, blocks } => {
            let colors = &cx.render.theme.admonitions;
            let color = match kind {
                crate::AdmonitionKind::Note => colors.note,
                crate::AdmonitionKind::Tip => colors.tip,
                crate::AdmonitionKind::Important => colors.important,
                crate::AdmonitionKind::Warning => colors.warning,
                crate::AdmonitionKind::Caution => colors.caution,
            };
            out.push_str(&format!(
                "#md_admonition({}, {})[\n",
                color.typst(),
                typst_string(kind.title())
            ));
            emit_blocks(cx, blocks, out);
            out.push_str("]\n\n");
        }
        Block::DefinitionList(definitions) => {
            definitions_to_typst(cx, definitions, out);
        }
        Block::TableOfContents => {
            let toc = &cx.render.config.toc;
            out.push_str("#outline(title: [");
            escape_text(&toc.title, out);
            out.push_str(&format!("], depth: {})\n\n", toc.depth));
        }
        Block::Rule => {
            out.push_str("#line(length: 100%)\n\n");
        }
        Block::PageBreak => {
            out.push_str("#pagebreak(weak: true)\n\n");
        }
    }
}

/// The image path of a paragraph that holds nothing but one local image.
fn standalone_image(cx: Context, content: &[Span]) -> Option<String> {
    let mut visible = content
        .iter()
        .filter(|s| !matches!(s, Span::Text(t) if t.trim().is_empty()));
    match (visible.next(), visible.next()) {
        (Some(Span::Image { url, .. }), None) => cx.render.images?.resolve(url),
        _ => None,
    }
}

fn emit_code_block(cx: Context, language: Option<&str>, content: &str, out: &mut String) {
    let lines = cx
        .render
        .highlighter
        .highlight(content, language, cx.render.theme);
    let breakable = lines.len() > KEEP_TOGETHER_LINES;

    // Everything on one source line: newlines in markup would become spaces
    out.push_str(&format!("#md_code_block(breakable: {breakable})["));
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push_str("#linebreak();");
        }
        if line.is_empty() {
            out.push_str("#raw(\" \");");
        }
        for token in line {
            token_to_typst(token, out);
        }
    }
    out.push_str("]\n\n");
}

fn token_to_typst(token: &Token, out: &mut String) {
    let mut expr = format!(
        "text(fill: {}, raw({}))",
        token.color.typst(),
        typst_string(&token.text)
    );
    if token.bold {
        expr = format!("strong({expr})");
    }
    if token.italic {
        expr = format!("emph({expr})");
    }
    if token.underline {
        expr = format!("underline({expr})");
    }
    out.push('#');
    out.push_str(&expr);
    out.push(';');
}

fn count_list_items(list: &List) -> usize {
    let mut count = list.items.len();
    for item in &list.items {
        count += item.nested().map(count_list_items).sum::<usize>();
    }
    count
}

fn spans_to_typst(cx: Context, spans: &[Span], out: &mut String) {
    for span in spans {
        span_to_typst(cx, span, out);
    }
}

fn span_to_typst(cx: Context, span: &Span, out: &mut String) {
    match span {
        Span::Text(text) => escape_text(text, out),
        Span::Bold(inner) => wrap_spans(cx, "#strong[", inner, out),
        Span::Italic(inner) => wrap_spans(cx, "#emph[", inner, out),
        Span::Strikethrough(inner) => wrap_spans(cx, "#strike[", inner, out),
        Span::Code(text) => {
            out.push_str(&format!("#md_inline_code({});", typst_string(text)));
        }
        Span::Link { url, content } => {
            if let Some(anchor) = url.strip_prefix('#') {
                if cx.doc.has_heading(anchor) {
                    wrap_spans(cx, &format!("#link(<{anchor}>)["), content, out);
                } else {
                    // Dangling anchors would fail compilation
                    spans_to_typst(cx, content, out);
                }
            } else if content.is_empty() {
                out.push_str(&format!("#link({});", typst_string(url)));
            } else {
                wrap_spans(cx, &format!("#link({})[", typst_string(url)), content, out);
            }
        }
        Span::Image { alt, .. } => {
            if !alt.is_empty() {
                out.push_str("#emph[");
                escape_text(alt, out);
                out.push_str("];");
            }
        }
        Span::FootnoteRef(label) => match cx.doc.footnotes.get(label) {
            Some(body) if cx.footnotes => {
                let inner = Context {
                    footnotes: false,
                    ..cx
                };
                out.push_str("#footnote[");
                footnote_body(inner, body, out);
                out.push_str("];");
            }
            _ => escape_text(&format!("[^{label}]"), out),
        },
        Span::LineBreak => {
            out.push_str("#linebreak();");
        }
    }
}

/// A lone paragraph stays inline; anything longer is laid out as blocks.
fn footnote_body(cx: Context, body: &[Block], out: &mut String) {
    if let [Block::Paragraph { content }] = body {
        spans_to_typst(cx, content, out);
        return;
    }
    let mut blocks = String::new();
    emit_blocks(cx, body, &mut blocks);
    out.push_str(blocks.trim_end());
}

/// `open` is a call up to and including `[`; the semicolon ends the
/// expression so following text can't continue it.
fn wrap_spans(cx: Context, open: &str, inner: &[Span], out: &mut String) {
    out.push_str(open);
    spans_to_typst(cx, inner, out);
    out.push_str("];");
}

/// Escape special Typst characters
fn escape_text(text: &str, out: &mut String) {
    let mut leading_digits = true;
    let mut seen_digit = false;
    for ch in text.chars() {
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '~' | '/' | '-'
            | '+' | '=' | '"' => {
                out.push('\\');
                out.push(ch);
            }
            // "1." at the start of a line would open a numbered list
            '.' if leading_digits && seen_digit => {
                out.push_str("\\.");
            }
            _ => out.push(ch),
        }
        if ch.is_ascii_digit() {
            seen_digit = true;
        } else {
            leading_digits = false;
        }
    }
}

/// A Typst string literal
fn typst_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn list_to_typst(cx: Context, list: &List, indent: usize, out: &mut String) {
    let indent_str: String = "  ".repeat(indent);

    for (i, item) in list.items.iter().enumerate() {
        out.push_str(&indent_str);
        match list.start {
            // An explicit number on the first item sets where counting starts
            Some(start) if i == 0 => out.push_str(&format!("{start}.")),
            Some(_) => out.push('+'),
            None => out.push('-'),
        }
        out.push(' ');
        match item.checked {
            Some(true) => out.push_str("☑ "),
            Some(false) => out.push_str("☐ "),
            None => {}
        }
        spans_to_typst(cx, &item.content, out);
        out.push('\n');

        for block in &item.blocks {
            match block {
                Block::List(nested) => list_to_typst(cx, nested, indent + 1, out),
                _ => item_block_to_typst(cx, block, indent + 1, out),
            }
        }
    }
}

/// A block child of a list item, indented past the item's marker so Typst
/// keeps it inside the item.
fn item_block_to_typst(cx: Context, block: &Block, indent: usize, out: &mut String) {
    let mut markup = String::new();
    emit_block(cx, block, &mut markup);
    let indent_str = "  ".repeat(indent);
    out.push('\n');
    for line in markup.trim_end().lines() {
        if !line.is_empty() {
            out.push_str(&indent_str);
            out.push_str(line);
        }
        out.push('\n');
    }
    out.push('\n');
}

fn table_to_typst(
    cx: Context,
    alignments: &[Alignment],
    headers: &[Vec<Span>],
    rows: &[Vec<Vec<Span>>],
    out: &mut String,
) {
    let col_count = headers.len();
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    out.push_str(&format!("  columns: {},\n", col_count));

    if alignments.iter().any(|a| *a != Alignment::None) {
        let aligns: Vec<&str> = alignments
            .iter()
            .map(|a| match a {
                Alignment::None => "auto",
                Alignment::Left => "left",
                Alignment::Center => "center",
                Alignment::Right => "right",
            })
            .collect();
        out.push_str(&format!("  align: ({},),\n", aligns.join(", ")));
    }

    // Header cells (bold)
    out.push_str("  table.header(\n");
    for cell in headers {
        out.push_str("    [#strong[");
        spans_to_typst(cx, cell, out);
        out.push_str("]],\n");
    }
    out.push_str("  ),\n");

    // Data rows, padded or cut to the header width
    for row in rows {
        for col in 0..col_count {
            out.push_str("  [");
            if let Some(cell) = row.get(col) {
                spans_to_typst(cx, cell, out);
            }
            out.push_str("],\n");
        }
    }

    out.push_str(")\n");
}

fn definitions_to_typst(cx: Context, definitions: &[Definition], out: &mut String) {
    out.push_str("#terms(\n");
    for definition in definitions {
        out.push_str("  terms.item([");
        spans_to_typst(cx, &definition.term, out);
        out.push_str("], [");
        for (i, detail) in definition.details.iter().enumerate() {
            if i > 0 {
                out.push_str(" #parbreak() ");
            }
            spans_to_typst(cx, detail, out);
        }
        out.push_str("]),\n");
    }
    out.push_str(")\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Highlighter, ThemeRegistry, parse};
    use std::sync::OnceLock;

    fn highlighter() -> &'static Highlighter {
        static HIGHLIGHTER: OnceLock<Highlighter> = OnceLock::new();
        HIGHLIGHTER.get_or_init(Highlighter::new)
    }

    /// Body markup, without the preamble
    fn body(markdown: &str) -> String {
        let registry = ThemeRegistry::builtin().unwrap();
        let config = Config::default();
        let render = RenderContext::new(registry.resolve(None).unwrap(), &config, highlighter());
        let doc = parse(markdown);
        let cx = Context {
            render: &render,
            doc: &doc,
            footnotes: true,
        };
        let mut out = String::new();
        emit_blocks(cx, &doc.blocks, &mut out);
        out
    }

    fn full(markdown: &str, config: &Config) -> String {
        let registry = ThemeRegistry::builtin().unwrap();
        let theme = registry.resolve(Some("nord")).unwrap();
        let render = RenderContext::new(theme, config, highlighter());
        document_to_typst(&parse(markdown), &render)
    }

    #[test]
    fn heading() {
        assert_eq!(body("# Hello"), "#block(breakable: false)[\n= Hello <hello>\n\n]\n\n");
    }

    #[test]
    fn heading_with_following_content() {
        // Heading should be grouped with following paragraph
        let result = body("# Title\n\nSome text.");
        assert!(
            result.contains("#block(breakable: false)[\n= Title <title>\n\nSome text.\n\n]\n\n")
        );
    }

    #[test]
    fn paragraph() {
        assert_eq!(body("Hello world"), "Hello world\n\n");
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(body("**bold**"), "#strong[bold];\n\n");
        assert_eq!(body("*italic*"), "#emph[italic];\n\n");
        assert_eq!(body("***both***"), "#emph[#strong[both];];\n\n");
        assert_eq!(body("**in**word"), "#strong[in];word\n\n");
    }

    #[test]
    fn inline_code() {
        assert_eq!(body("`co\"de`"), "#md_inline_code(\"co\\\"de\");\n\n");
    }

    #[test]
    fn code_block() {
        let result = body("```rust\nlet x = 1;\n\nx\n```");
        assert!(result.starts_with("#md_code_block(breakable: false)[#"));
        assert!(result.contains("text(fill: rgb(\"#"));
        assert!(result.contains("raw(\"let\")"));
        // blank line kept as a visible raw space
        assert!(result.contains("#linebreak();#raw(\" \");#linebreak();"));
        assert!(result.ends_with("]\n\n"));
        assert_eq!(result.lines().count(), 2);
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            body("- one\n- two"),
            "#block(breakable: false)[\n- one\n- two\n]\n\n"
        );
    }

    #[test]
    fn ordered_list() {
        assert_eq!(
            body("1. one\n2. two"),
            "#block(breakable: false)[\n1. one\n+ two\n]\n\n"
        );
        assert_eq!(
            body("4. four\n5. five"),
            "#block(breakable: false)[\n4. four\n+ five\n]\n\n"
        );
    }

    #[test]
    fn nested_and_task_lists() {
        assert_eq!(
            body("- [x] done\n  - sub\n- [ ] todo"),
            "#block(breakable: false)[\n- ☑ done\n  - sub\n- ☐ todo\n]\n\n"
        );
    }

    #[test]
    fn list_item_blocks_render_inside_the_item() {
        let result = body("1. Install:\n\n   ```sh\n   cargo install x\n   ```\n\n2. Run it\n");
        assert!(result.starts_with("#block(breakable: false)[\n1. Install:\n\n  #md_code_block("));
        let code = result.find("#md_code_block(").unwrap();
        let next = result.find("+ Run it").unwrap();
        assert!(code < next);
        assert_eq!(result.matches("#md_code_block(").count(), 1);
    }

    #[test]
    fn list_item_paragraph_after_nested_list_stays_after_it() {
        let result = body("- a\n\n  - b\n\n  tail\n");
        let nested = result.find("  - b\n").unwrap();
        let tail = result.find("  tail\n").unwrap();
        assert!(nested < tail, "{result}");
    }

    #[test]
    fn hard_break() {
        assert_eq!(
            body("line one  \nline two"),
            "line one#linebreak();line two\n\n"
        );
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(body("a * b"), "a \\* b\n\n");
        assert_eq!(body("a # b"), "a \\# b\n\n");
        assert_eq!(body("a_b"), "a\\_b\n\n");
        assert_eq!(body("see http://x.org"), "see http:\\/\\/x.org\n\n");
        assert_eq!(body("1\\. not a list"), "1\\. not a list\n\n");
    }

    #[test]
    fn table() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |";
        let expected = "#block(breakable: false)[\n#table(\n  columns: 2,\n  table.header(\n    [#strong[A]],\n    [#strong[B]],\n  ),\n  [1],\n  [2],\n)\n]\n\n";
        assert_eq!(body(md), expected);
    }

    #[test]
    fn table_alignment() {
        let md = "| A | B |\n|:-:|---|\n| 1 | 2 |";
        assert!(body(md).contains("  align: (center, auto,),\n"));
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(body("---"), "#line(length: 100%)\n\n");
    }

    #[test]
    fn links() {
        assert_eq!(
            body("[docs](https://docs.rs)"),
            "#link(\"https://docs.rs\")[docs];\n\n"
        );
        let result = body("# Overview\n\n[Link to overview](#overview) [gone](#missing)");
        assert!(result.contains("#link(<overview>)[Link to overview]; gone"));
    }

    #[test]
    fn footnotes() {
        assert_eq!(
            body("Claim[^a].\n\n[^a]: Proof[^a]."),
            "Claim#footnote[Proof\\[^a\\].];.\n\n"
        );
        assert_eq!(body("Dangling[^x]"), "Dangling\\[^x\\]\n\n");
    }

    #[test]
    fn footnote_with_code_block() {
        let result = body("Note[^n].\n\n[^n]: Details:\n\n    ```rust\n    let x = 1;\n    ```\n");
        assert!(result.starts_with("Note#footnote[Details:\n\n#md_code_block(breakable: false)["));
        assert!(result.ends_with("]];.\n\n"), "{result}");
    }

    #[test]
    fn admonition() {
        let result = body("> [!TIP]\n> Use it.");
        assert!(result.starts_with("#md_admonition(rgb(\"#"));
        assert!(result.contains(", \"Tip\")[\nUse it.\n\n]\n\n"));
    }

    #[test]
    fn block_quote() {
        assert_eq!(body("> quoted"), "#quote(block: true)[\nquoted\n\n]\n\n");
    }

    #[test]
    fn definition_list() {
        assert_eq!(
            body("Rust\n: A language\n"),
            "#terms(\n  terms.item([Rust], [A language]),\n)\n\n"
        );
    }

    #[test]
    fn markers() {
        assert_eq!(
            body("[TOC]\n\n---pagebreak---"),
            "#outline(title: [Contents], depth: 3)\n\n#pagebreak(weak: true)\n\n"
        );
    }

    #[test]
    fn images_without_resolver_fall_back_to_alt() {
        assert_eq!(body("![diagram](d.png)"), "#emph[diagram];\n\n");
    }

    #[test]
    fn resolves_images_inside_root() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("docs/img")).unwrap();
        std::fs::write(root.path().join("docs/img/a.png"), b"png").unwrap();
        std::fs::write(root.path().join("notes.txt"), b"text").unwrap();

        let resolver = ImageResolver::new(root.path(), &root.path().join("docs")).unwrap();
        assert_eq!(resolver.resolve("img/a.png").as_deref(), Some("/docs/img/a.png"));
        assert_eq!(resolver.resolve("./img/a.png?raw=1").as_deref(), Some("/docs/img/a.png"));
        assert_eq!(resolver.resolve("img/missing.png"), None);
        assert_eq!(resolver.resolve("../notes.txt"), None);
        assert_eq!(resolver.resolve("https://example.com/a.png"), None);
    }

    #[test]
    fn preamble() {
        let result = full("# Report\n\nBody", &Config::default());
        assert!(result.starts_with("#set document(title: \"Report\")\n"));
        assert!(result.contains("#set page(paper: \"a4\", margin: 2cm, numbering: \"1\")\n"));
        assert!(result.contains("#set page(fill: rgb(\"#2e3440\"))"));
        assert!(result.contains("#show link: underline\n"));
    }

    #[test]
    fn preamble_follows_config() {
        let config = Config::from_toml(
            "[page]\nnumbers = false\nmargin = \"1in; #panic()\"\n[links]\nunderline = false\n",
            Path::new("md2pdf.toml"),
        )
        .unwrap();
        let result = full("Body", &config);
        assert!(!result.contains("#set document"));
        assert!(result.contains("margin: 2cm, numbering: none)"));
        assert!(!result.contains("#show link: underline"));
    }
}
