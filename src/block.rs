use std::collections::BTreeMap;

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    Text(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Strikethrough(Vec<Span>),
    Code(String),
    Link { url: String, content: Vec<Span> },
    Image { url: String, alt: String },
    /// Reference to a footnote definition by label
    FootnoteRef(String),
    LineBreak,
}

impl Span {
    /// The text a reader would see, with all formatting dropped.
    pub fn plain_text(spans: &[Span]) -> String {
        let mut out = String::new();
        for span in spans {
            match span {
                Span::Text(text) | Span::Code(text) => out.push_str(text),
                Span::Bold(inner) | Span::Italic(inner) | Span::Strikethrough(inner) => {
                    out.push_str(&Span::plain_text(inner))
                }
                Span::Link { content, .. } => out.push_str(&Span::plain_text(content)),
                Span::Image { alt, .. } => out.push_str(alt),
                Span::FootnoteRef(_) => {}
                Span::LineBreak => out.push(' '),
            }
        }
        out
    }
}

/// A single list item: its first line of text, then any block children
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Span>,
    /// For task lists: None = not a task, Some(false) = unchecked, Some(true) = checked
    pub checked: Option<bool>,
    /// Code blocks, tables, quotes, later paragraphs and nested lists, in order
    pub blocks: Vec<Block>,
}

impl ListItem {
    /// Lists nested directly under this item.
    pub fn nested(&self) -> impl Iterator<Item = &List> {
        self.blocks.iter().filter_map(|block| match block {
            Block::List(list) => Some(list),
            _ => None,
        })
    }
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// First number of an ordered list; None for bullet lists
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

impl List {
    pub fn ordered(&self) -> bool {
        self.start.is_some()
    }
}

/// Column alignment in a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

/// GitHub-style admonition kinds (`> [!NOTE]` and friends)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionKind {
    pub fn title(self) -> &'static str {
        match self {
            AdmonitionKind::Note => "Note",
            AdmonitionKind::Tip => "Tip",
            AdmonitionKind::Important => "Important",
            AdmonitionKind::Warning => "Warning",
            AdmonitionKind::Caution => "Caution",
        }
    }
}

/// One term of a definition list with its definitions
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub term: Vec<Span>,
    pub details: Vec<Vec<Span>>,
}

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        /// Anchor id, explicit (`{#id}`) or derived from the heading text
        id: String,
        content: Vec<Span>,
    },
    Paragraph {
        content: Vec<Span>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    List(List),
    Table {
        alignments: Vec<Alignment>,
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    BlockQuote(Vec<Block>),
    Admonition {
        kind: AdmonitionKind,
        blocks: Vec<Block>,
    },
    DefinitionList(Vec<Definition>),
    TableOfContents,
    Rule,
    PageBreak,
}

/// Entry in the document outline
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingRef {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// A parsed Markdown document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
    /// Footnote definitions by label
    pub footnotes: BTreeMap<String, Vec<Block>>,
    /// Every heading in document order, including nested ones
    pub headings: Vec<HeadingRef>,
}

impl Document {
    /// Text of the first level-1 heading.
    pub fn title(&self) -> Option<&str> {
        self.headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.as_str())
    }

    pub fn has_heading(&self, id: &str) -> bool {
        self.headings.iter().any(|h| h.id == id)
    }
}
