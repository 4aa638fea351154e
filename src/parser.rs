use std::collections::{BTreeMap, HashSet};

use pulldown_cmark::{
    BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

use crate::block::{
    AdmonitionKind, Alignment, Block, Definition, Document, HeadingRef, List, ListItem, Span,
};

const TOC_MARKER: &str = "[TOC]";
const PAGE_BREAK_MARKERS: [&str; 2] = ["---pagebreak---", "\u{2014}pagebreak\u{2014}"];

/// The Markdown extensions enabled for every document.
pub fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_GFM);
    options
}

/// Strip YAML frontmatter from the beginning of markdown content.
///
/// Front matter opens with a line that is exactly `---`, followed directly
/// by a non-blank line, and closes at the next line that is exactly `---`
/// or `...`. Anything else, such as a leading thematic break or a
/// `---pagebreak---` marker, is left alone.
pub(crate) fn strip_frontmatter(markdown: &str) -> &str {
    let mut lines = markdown.split_inclusive('\n');
    let Some(opening) = lines.next() else {
        return markdown;
    };
    if bare_line(opening) != "---" || !opening.ends_with('\n') {
        return markdown;
    }
    let mut offset = opening.len();
    for (i, line) in lines.enumerate() {
        offset += line.len();
        let line = bare_line(line);
        if i == 0 && line.trim().is_empty() {
            return markdown;
        }
        if line == "---" || line == "..." {
            return markdown[offset..].trim_start_matches(['\r', '\n']);
        }
    }
    markdown
}

fn bare_line(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// Anchor id for a heading: lowercase, alphanumerics kept, runs of
/// whitespace and `-` collapsed into a single `-`, everything else dropped.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}

/// Parse markdown text into a document
pub fn parse(markdown: &str) -> Document {
    let markdown = strip_frontmatter(markdown);
    let parser = Parser::new_ext(markdown, options());
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state, &mut blocks);
    }

    Document {
        blocks,
        footnotes: state.footnotes,
        headings: state.headings,
    }
}

#[derive(Default)]
struct ParseState {
    // Current inline content being built
    spans: Vec<Span>,
    // Stack for nested formatting (bold, italic, links, ...)
    format_stack: Vec<FormatKind>,
    // Nested span buffers for formatting
    span_stack: Vec<Vec<Span>>,

    // Current heading level and explicit id (if in a heading)
    heading: Option<(u8, Option<String>)>,
    headings: Vec<HeadingRef>,
    used_ids: HashSet<String>,

    // Code block state
    in_code_block: bool,
    code_language: Option<String>,
    code_content: String,

    // List state
    list_stack: Vec<ListBuilder>,

    // Table state
    in_table: bool,
    table_alignments: Vec<Alignment>,
    table_headers: Vec<Vec<Span>>,
    table_rows: Vec<Vec<Vec<Span>>>,
    current_row: Vec<Vec<Span>>,
    in_table_head: bool,

    // Block quotes, admonitions and footnote definitions
    containers: Vec<Container>,
    footnotes: BTreeMap<String, Vec<Block>>,

    // Definition list state
    definitions: Option<Vec<Definition>>,
    in_definition: bool,
    definition_spans: Vec<Span>,
}

enum FormatKind {
    Bold,
    Italic,
    Strikethrough,
    Link { url: String },
    Image { url: String },
}

struct ListBuilder {
    start: Option<u64>,
    items: Vec<ListItem>,
    current_item_spans: Vec<Span>,
    current_item_checked: Option<bool>,
    // Block children of the open item, nested lists included, in order
    current_item_blocks: Vec<Block>,
}

impl ListBuilder {
    /// Paragraph text joins the item's first line until a block child
    /// appears; after that it becomes a block of its own.
    fn push_paragraph(&mut self, content: Vec<Span>) {
        if self.current_item_blocks.is_empty() {
            if !self.current_item_spans.is_empty() {
                self.current_item_spans.push(Span::LineBreak);
            }
            self.current_item_spans.extend(content);
        } else {
            self.current_item_blocks.push(Block::Paragraph { content });
        }
    }
}

enum ContainerKind {
    Quote(Option<AdmonitionKind>),
    Footnote(String),
}

struct Container {
    kind: ContainerKind,
    blocks: Vec<Block>,
    // Lists open when the container started; deeper lists belong to it
    list_depth: usize,
}

impl ParseState {
    fn list_base(&self) -> usize {
        self.containers.last().map_or(0, |c| c.list_depth)
    }

    fn in_list(&self) -> bool {
        self.list_stack.len() > self.list_base()
    }

    fn open_container(&mut self, kind: ContainerKind) {
        let list_depth = self.list_stack.len();
        self.containers.push(Container {
            kind,
            blocks: Vec::new(),
            list_depth,
        });
    }

    fn unique_id(&mut self, base: String) -> String {
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };
        let mut id = base.clone();
        let mut n = 1;
        while self.used_ids.contains(&id) {
            id = format!("{base}_{n}");
            n += 1;
        }
        self.used_ids.insert(id.clone());
        id
    }

    fn open_span(&mut self, kind: FormatKind) {
        self.format_stack.push(kind);
        self.span_stack.push(std::mem::take(&mut self.spans));
    }

    fn close_span(&mut self) {
        let inner = std::mem::take(&mut self.spans);
        let (Some(kind), Some(mut parent)) = (self.format_stack.pop(), self.span_stack.pop()) else {
            return;
        };
        parent.push(match kind {
            FormatKind::Bold => Span::Bold(inner),
            FormatKind::Italic => Span::Italic(inner),
            FormatKind::Strikethrough => Span::Strikethrough(inner),
            FormatKind::Link { url } => Span::Link {
                url,
                content: inner,
            },
            FormatKind::Image { url } => Span::Image {
                url,
                alt: Span::plain_text(&inner),
            },
        });
        self.spans = parent;
    }
}

/// Push a finished block into the open list item, the innermost open
/// container, or the document.
fn emit(state: &mut ParseState, blocks: &mut Vec<Block>, block: Block) {
    if state.in_list() {
        flush_item_text(state);
        if let Some(list) = state.list_stack.last_mut() {
            list.current_item_blocks.push(block);
            return;
        }
    }
    match state.containers.last_mut() {
        Some(container) => container.blocks.push(block),
        None => blocks.push(block),
    }
}

/// Text of a tight list item arrives without a paragraph; hand it to the
/// item before a block child starts.
fn flush_item_text(state: &mut ParseState) {
    if !state.in_list() || state.spans.is_empty() {
        return;
    }
    let pending = std::mem::take(&mut state.spans);
    if let Some(list) = state.list_stack.last_mut() {
        list.push_paragraph(pending);
    }
}

/// A paragraph that is only a marker like `[TOC]`, if it is one.
fn marker_block(content: &[Span]) -> Option<Block> {
    if !content.iter().all(|s| matches!(s, Span::Text(_))) {
        return None;
    }
    marker(&Span::plain_text(content))
}

/// The block a marker paragraph's text stands for.
pub(crate) fn marker(text: &str) -> Option<Block> {
    let text = text.trim();
    if text == TOC_MARKER {
        Some(Block::TableOfContents)
    } else if PAGE_BREAK_MARKERS.contains(&text) {
        Some(Block::PageBreak)
    } else {
        None
    }
}

fn process_event(event: Event, state: &mut ParseState, blocks: &mut Vec<Block>) {
    match event {
        // Headings
        Event::Start(Tag::Heading { level, id, .. }) => {
            flush_item_text(state);
            state.heading = Some((heading_level_to_u8(level), id.map(|id| id.into_string())));
        }
        Event::End(TagEnd::Heading(_)) => {
            if let Some((level, explicit_id)) = state.heading.take() {
                let content = std::mem::take(&mut state.spans);
                let text = Span::plain_text(&content);
                let base = explicit_id
                    .map(|id| {
                        id.chars()
                            .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
                            .collect::<String>()
                    })
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| slugify(&text));
                let id = state.unique_id(base);
                state.headings.push(HeadingRef {
                    level,
                    id: id.clone(),
                    text: text.trim().to_string(),
                });
                emit(state, blocks, Block::Heading { level, id, content });
            }
        }

        // Paragraphs
        Event::Start(Tag::Paragraph) => {}
        Event::End(TagEnd::Paragraph) => {
            let content = std::mem::take(&mut state.spans);
            if content.is_empty() || state.in_table {
                return;
            }
            if state.in_definition {
                if !state.definition_spans.is_empty() {
                    state.definition_spans.push(Span::LineBreak);
                }
                state.definition_spans.extend(content);
            } else if state.in_list() {
                if let Some(list) = state.list_stack.last_mut() {
                    list.push_paragraph(content);
                }
            } else if let Some(marker) = marker_block(&content) {
                emit(state, blocks, marker);
            } else {
                emit(state, blocks, Block::Paragraph { content });
            }
        }

        // Text content
        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else {
                push_text(state, &text);
            }
        }

        // Inline code
        Event::Code(code) => {
            state.spans.push(Span::Code(code.into_string()));
        }

        // Only line breaks survive from raw HTML
        Event::InlineHtml(html) | Event::Html(html) => {
            let tag = html.trim().to_ascii_lowercase();
            if matches!(tag.as_str(), "<br>" | "<br/>" | "<br />") {
                state.spans.push(Span::LineBreak);
            }
        }

        // Inline formatting
        Event::Start(Tag::Strong) => state.open_span(FormatKind::Bold),
        Event::Start(Tag::Emphasis) => state.open_span(FormatKind::Italic),
        Event::Start(Tag::Strikethrough) => state.open_span(FormatKind::Strikethrough),
        Event::Start(Tag::Link { dest_url, .. }) => state.open_span(FormatKind::Link {
            url: dest_url.into_string(),
        }),
        Event::Start(Tag::Image { dest_url, .. }) => state.open_span(FormatKind::Image {
            url: dest_url.into_string(),
        }),
        Event::End(
            TagEnd::Strong
            | TagEnd::Emphasis
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image,
        ) => state.close_span(),

        // Footnotes
        Event::FootnoteReference(label) => {
            state.spans.push(Span::FootnoteRef(label.into_string()));
        }
        Event::Start(Tag::FootnoteDefinition(label)) => {
            state.open_container(ContainerKind::Footnote(label.into_string()));
        }
        Event::End(TagEnd::FootnoteDefinition) => {
            if let Some(Container {
                kind: ContainerKind::Footnote(label),
                blocks: inner,
                ..
            }) = state.containers.pop()
            {
                state.footnotes.insert(label, inner);
            }
        }

        // Block quotes and admonitions
        Event::Start(Tag::BlockQuote(kind)) => {
            flush_item_text(state);
            state.open_container(ContainerKind::Quote(kind.map(admonition_kind)));
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            if let Some(Container {
                kind: ContainerKind::Quote(kind),
                blocks: inner,
                ..
            }) = state.containers.pop()
            {
                let block = match kind {
                    Some(kind) => Block::Admonition {
                        kind,
                        blocks: inner,
                    },
                    None => Block::BlockQuote(inner),
                };
                emit(state, blocks, block);
            }
        }

        // Code blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            flush_item_text(state);
            state.in_code_block = true;
            state.code_language = match kind {
                CodeBlockKind::Fenced(lang) => {
                    let lang = lang.into_string();
                    if lang.is_empty() { None } else { Some(lang) }
                }
                CodeBlockKind::Indented => None,
            };
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            let content = std::mem::take(&mut state.code_content);
            let language = state.code_language.take();
            emit(state, blocks, Block::CodeBlock { language, content });
        }

        // Lists
        Event::Start(Tag::List(start)) => {
            flush_item_text(state);
            state.list_stack.push(ListBuilder {
                start,
                items: Vec::new(),
                current_item_spans: Vec::new(),
                current_item_checked: None,
                current_item_blocks: Vec::new(),
            });
        }
        Event::End(TagEnd::List(_)) => {
            if let Some(list_builder) = state.list_stack.pop() {
                let list = List {
                    start: list_builder.start,
                    items: list_builder.items,
                };
                // A parent list's open item takes it, if there is one
                emit(state, blocks, Block::List(list));
            }
        }

        Event::Start(Tag::Item) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_spans.clear();
                list.current_item_checked = None;
                list.current_item_blocks.clear();
            }
        }
        Event::End(TagEnd::Item) => {
            flush_item_text(state);
            if let Some(list) = state.list_stack.last_mut() {
                let content = std::mem::take(&mut list.current_item_spans);
                let checked = list.current_item_checked.take();
                let blocks = std::mem::take(&mut list.current_item_blocks);
                list.items.push(ListItem {
                    content,
                    checked,
                    blocks,
                });
            }
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_checked = Some(checked);
            }
        }

        // Definition lists
        Event::Start(Tag::DefinitionList) => {
            flush_item_text(state);
            state.definitions = Some(Vec::new());
        }
        Event::End(TagEnd::DefinitionList) => {
            if let Some(definitions) = state.definitions.take() {
                emit(state, blocks, Block::DefinitionList(definitions));
            }
        }
        Event::Start(Tag::DefinitionListTitle) => {
            state.spans.clear();
        }
        Event::End(TagEnd::DefinitionListTitle) => {
            let term = std::mem::take(&mut state.spans);
            if let Some(definitions) = state.definitions.as_mut() {
                definitions.push(Definition {
                    term,
                    details: Vec::new(),
                });
            }
        }
        Event::Start(Tag::DefinitionListDefinition) => {
            state.in_definition = true;
            state.spans.clear();
            state.definition_spans.clear();
        }
        Event::End(TagEnd::DefinitionListDefinition) => {
            state.in_definition = false;
            let mut detail = std::mem::take(&mut state.definition_spans);
            detail.extend(std::mem::take(&mut state.spans));
            if let Some(definition) = state.definitions.as_mut().and_then(|d| d.last_mut()) {
                definition.details.push(detail);
            }
        }

        // Tables
        Event::Start(Tag::Table(alignments)) => {
            flush_item_text(state);
            state.in_table = true;
            state.table_alignments = alignments.into_iter().map(alignment).collect();
            state.table_headers.clear();
            state.table_rows.clear();
        }
        Event::End(TagEnd::Table) => {
            state.in_table = false;
            let alignments = std::mem::take(&mut state.table_alignments);
            let headers = std::mem::take(&mut state.table_headers);
            let rows = std::mem::take(&mut state.table_rows);
            emit(
                state,
                blocks,
                Block::Table {
                    alignments,
                    headers,
                    rows,
                },
            );
        }

        Event::Start(Tag::TableHead) => {
            state.in_table_head = true;
            state.current_row.clear();
        }
        Event::End(TagEnd::TableHead) => {
            state.in_table_head = false;
            state.table_headers = std::mem::take(&mut state.current_row);
        }

        Event::Start(Tag::TableRow) => {
            state.current_row.clear();
        }
        Event::End(TagEnd::TableRow) => {
            if !state.in_table_head {
                let row = std::mem::take(&mut state.current_row);
                state.table_rows.push(row);
            }
        }

        Event::Start(Tag::TableCell) => {
            state.spans.clear();
        }
        Event::End(TagEnd::TableCell) => {
            let cell_content = std::mem::take(&mut state.spans);
            state.current_row.push(cell_content);
        }

        // Horizontal rule
        Event::Rule => {
            emit(state, blocks, Block::Rule);
        }

        // Soft/hard breaks
        Event::SoftBreak => {
            push_text(state, " ");
        }
        Event::HardBreak => {
            state.spans.push(Span::LineBreak);
        }

        // Ignore other events
        _ => {}
    }
}

/// Append to the previous text span so escapes like `1\.` stay one run
fn push_text(state: &mut ParseState, text: &str) {
    match state.spans.last_mut() {
        Some(Span::Text(last)) => last.push_str(text),
        _ => state.spans.push(Span::Text(text.to_string())),
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn admonition_kind(kind: BlockQuoteKind) -> AdmonitionKind {
    match kind {
        BlockQuoteKind::Note => AdmonitionKind::Note,
        BlockQuoteKind::Tip => AdmonitionKind::Tip,
        BlockQuoteKind::Important => AdmonitionKind::Important,
        BlockQuoteKind::Warning => AdmonitionKind::Warning,
        BlockQuoteKind::Caution => AdmonitionKind::Caution,
    }
}

fn alignment(alignment: pulldown_cmark::Alignment) -> Alignment {
    match alignment {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    #[test]
    fn strips_frontmatter() {
        assert_eq!(strip_frontmatter("---\ntitle: x\n---\n# Hi"), "# Hi");
        assert_eq!(strip_frontmatter("# Hi"), "# Hi");
        assert_eq!(strip_frontmatter("---\nunterminated"), "---\nunterminated");
        assert_eq!(strip_frontmatter("---\r\ntitle: x\r\n...\r\nBody"), "Body");
        assert_eq!(strip_frontmatter("---\ntitle: x\n----\nstill yaml\n---\nBody"), "Body");
    }

    #[test]
    fn leading_page_break_is_not_frontmatter() {
        let doc = parse("---pagebreak---\n\nIntro paragraph.\n\n---\n\nAfter rule.\n");
        assert_eq!(
            doc.blocks,
            vec![
                Block::PageBreak,
                Block::Paragraph {
                    content: vec![text("Intro paragraph.")]
                },
                Block::Rule,
                Block::Paragraph {
                    content: vec![text("After rule.")]
                },
            ]
        );
    }

    #[test]
    fn leading_rule_is_not_frontmatter() {
        let doc = parse("---\n\n# Title\n\nBody.\n\n---\n\nTail.\n");
        assert_eq!(doc.blocks[0], Block::Rule);
        assert_eq!(doc.title(), Some("Title"));
        assert_eq!(doc.blocks.len(), 5);
        assert_eq!(
            doc.blocks[4],
            Block::Paragraph {
                content: vec![text("Tail.")]
            }
        );
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Getting   Started - Quickly "), "getting-started-quickly");
        assert_eq!(slugify("snake_case id"), "snake_case-id");
        assert_eq!(slugify("Über Straße"), "über-straße");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn heading_ids_are_unique() {
        let doc = parse("# Intro\n\n## Intro\n\n## Custom {#setup}\n\n## ???");
        let ids: Vec<&str> = doc.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["intro", "intro_1", "setup", "section"]);
        assert_eq!(doc.title(), Some("Intro"));
        assert!(doc.has_heading("setup"));
    }

    #[test]
    fn markers() {
        let doc = parse("[TOC]\n\n---pagebreak---\n\nText");
        assert_eq!(doc.blocks[0], Block::TableOfContents);
        assert_eq!(doc.blocks[1], Block::PageBreak);
        assert!(matches!(doc.blocks[2], Block::Paragraph { .. }));
    }

    #[test]
    fn nested_list_attaches_to_parent_item() {
        let doc = parse("- a\n  - b\n- c");
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list, got {:?}", doc.blocks[0]);
        };
        assert!(!list.ordered());
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].content, vec![text("a")]);
        let nested: Vec<&List> = list.items[0].nested().collect();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].items[0].content, vec![text("b")]);
        assert!(list.items[1].blocks.is_empty());
    }

    #[test]
    fn code_block_stays_inside_its_list_item() {
        let doc = parse("1. Install:\n\n   ```sh\n   cargo install x\n   ```\n\n2. Run it\n");
        assert_eq!(doc.blocks.len(), 1, "{:?}", doc.blocks);
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list, got {:?}", doc.blocks[0]);
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].content, vec![text("Install:")]);
        assert_eq!(
            list.items[0].blocks,
            vec![Block::CodeBlock {
                language: Some("sh".into()),
                content: "cargo install x\n".into(),
            }]
        );
        assert_eq!(list.items[1].content, vec![text("Run it")]);
    }

    #[test]
    fn tight_item_keeps_text_before_its_blocks() {
        let doc = parse("- Steps:\n  ```\n  make\n  ```\n  Then rest.\n- Done\n");
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list, got {:?}", doc.blocks[0]);
        };
        assert_eq!(list.items[0].content, vec![text("Steps:")]);
        assert_eq!(
            list.items[0].blocks,
            vec![
                Block::CodeBlock {
                    language: None,
                    content: "make\n".into(),
                },
                Block::Paragraph {
                    content: vec![text("Then rest.")]
                },
            ]
        );
        assert_eq!(list.items[1].content, vec![text("Done")]);
    }

    #[test]
    fn quote_and_table_inside_list_item() {
        let doc = parse("- Before\n\n  > quoted\n\n  | a |\n  |---|\n  | 1 |\n\n- After\n");
        assert_eq!(doc.blocks.len(), 1, "{:?}", doc.blocks);
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list");
        };
        let blocks = &list.items[0].blocks;
        assert!(matches!(&blocks[0], Block::BlockQuote(inner) if inner.len() == 1));
        assert!(matches!(&blocks[1], Block::Table { rows, .. } if rows.len() == 1));
    }

    #[test]
    fn ordered_list_start() {
        let doc = parse("3. three\n4. four");
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.start, Some(3));
    }

    #[test]
    fn task_list() {
        let doc = parse("- [x] done\n- [ ] todo");
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.items[0].checked, Some(true));
        assert_eq!(list.items[1].checked, Some(false));
    }

    #[test]
    fn footnotes() {
        let doc = parse("Claim.[^1]\n\n[^1]: Source one.");
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph {
                content: vec![text("Claim."), Span::FootnoteRef("1".into())]
            }]
        );
        assert_eq!(
            doc.footnotes["1"],
            vec![Block::Paragraph {
                content: vec![text("Source one.")]
            }]
        );
    }

    #[test]
    fn footnote_keeps_every_block() {
        let doc = parse("Note[^n].\n\n[^n]: Details:\n\n    ```rust\n    let x = 1;\n    ```\n");
        assert_eq!(
            doc.footnotes["n"],
            vec![
                Block::Paragraph {
                    content: vec![text("Details:")]
                },
                Block::CodeBlock {
                    language: Some("rust".into()),
                    content: "let x = 1;\n".into(),
                },
            ]
        );
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn admonitions_and_quotes() {
        let doc = parse("> [!WARNING]\n> Careful.\n\n> Plain quote");
        assert_eq!(
            doc.blocks[0],
            Block::Admonition {
                kind: AdmonitionKind::Warning,
                blocks: vec![Block::Paragraph {
                    content: vec![text("Careful.")]
                }],
            }
        );
        assert!(matches!(&doc.blocks[1], Block::BlockQuote(inner) if inner.len() == 1));
    }

    #[test]
    fn definition_list() {
        let doc = parse("Term\n: First meaning\n");
        assert_eq!(
            doc.blocks,
            vec![Block::DefinitionList(vec![Definition {
                term: vec![text("Term")],
                details: vec![vec![text("First meaning")]],
            }])]
        );
    }

    #[test]
    fn table_alignment() {
        let doc = parse("| a | b | c |\n|:--|:-:|--:|\n| 1 | 2 | 3 |");
        let Block::Table {
            alignments,
            headers,
            rows,
        } = &doc.blocks[0]
        else {
            panic!("expected table");
        };
        assert_eq!(
            alignments,
            &[Alignment::Left, Alignment::Center, Alignment::Right]
        );
        assert_eq!(headers.len(), 3);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn links_and_images() {
        let doc = parse("[site](https://example.com) ![a cat](cat.png) ~~old~~");
        let Block::Paragraph { content } = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            content[0],
            Span::Link {
                url: "https://example.com".into(),
                content: vec![text("site")],
            }
        );
        assert_eq!(
            content[2],
            Span::Image {
                url: "cat.png".into(),
                alt: "a cat".into(),
            }
        );
        assert_eq!(content[4], Span::Strikethrough(vec![text("old")]));
    }

    #[test]
    fn html_line_breaks() {
        let doc = parse("one<br>two");
        let Block::Paragraph { content } = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(content.contains(&Span::LineBreak));
    }
}
