use crate::error::Issue;

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Code(String),
    Link { label: String, href: String },
    Image { alt: String, src: String },
    Mention(String),
    Hashtag(String),
    Number { literal: String, kind: NumberKind },
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// `12%`, `3.5%`
    Percent,
    /// `10k`, `2.5M`, `1b`
    Magnitude,
    Plain,
}

/// A single list item. `checked` is only set for task list items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub content: Vec<Span>,
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered { start: u64 },
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

/// Block-level elements of a rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Span>,
    },
    Paragraph {
        content: Vec<Span>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    Blockquote {
        content: Vec<Span>,
    },
    List(List),
    Table {
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Rule,
    Image {
        alt: String,
        src: String,
    },
}

/// A parsed message: its blocks plus whatever had to be recovered from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub issues: Vec<Issue>,
}

impl Document {
    /// Flatten the document to plain text, one line per heading, paragraph
    /// line, list item or table row.
    pub fn plain_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { content, .. }
                | Block::Paragraph { content }
                | Block::Blockquote { content } => {
                    lines.extend(spans_text(content).lines().map(str::to_string));
                }
                Block::CodeBlock { content, .. } => {
                    lines.extend(content.lines().map(str::to_string));
                }
                Block::List(list) => {
                    for item in &list.items {
                        lines.push(spans_text(&item.content));
                    }
                }
                Block::Table { headers, rows } => {
                    lines.push(row_text(headers));
                    for row in rows {
                        lines.push(row_text(row));
                    }
                }
                Block::Rule => {}
                Block::Image { alt, .. } => {
                    if !alt.is_empty() {
                        lines.push(alt.clone());
                    }
                }
            }
        }
        lines.join("\n")
    }
}

fn row_text(cells: &[Vec<Span>]) -> String {
    cells
        .iter()
        .map(|cell| spans_text(cell))
        .collect::<Vec<_>>()
        .join("\t")
}

fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(span_text).collect()
}

fn span_text(span: &Span) -> String {
    match span {
        Span::Text(t) | Span::Code(t) => t.clone(),
        Span::Bold(inner) | Span::Italic(inner) => spans_text(inner),
        Span::Link { label, .. } => label.clone(),
        Span::Image { alt, .. } => alt.clone(),
        Span::Mention(name) => format!("@{name}"),
        Span::Hashtag(name) => format!("#{name}"),
        Span::Number { literal, .. } => literal.clone(),
        Span::LineBreak => "\n".to_string(),
    }
}
