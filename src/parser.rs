use crate::block::{Block, Document, List, ListItem, ListKind, Span};
use crate::config::Config;
use crate::error::{Issue, Issues};
use crate::fence::{self, FenceTable, Fenced, Line, SENTINEL};
use crate::inline::{InlineResolver, bracket_target};
use crate::safety::is_safe_url;

/// Normalize line endings and remove anything that could pass for a
/// placeholder token.
fn normalize(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(SENTINEL, "\u{FFFD}")
}

/// Parse raw message text into a document.
pub fn parse(raw: &str, config: &Config) -> Document {
    let mut issues = Issues::default();
    let normalized = normalize(raw);
    let (lines, fences) = fence::protect(&normalized, &mut issues);

    let mut parser = BlockParser {
        lines: &lines,
        fences: &fences,
        inline: InlineResolver::new(&fences, &config.inline),
        issues: &mut issues,
        pos: 0,
    };
    let blocks = parser.blocks();

    Document {
        blocks,
        issues: issues.into_vec(),
    }
}

/// What a single line looks like, in rule priority order.
enum LineKind<'a> {
    Blank,
    Fence {
        language: Option<&'a str>,
        content: &'a str,
    },
    Rule,
    Heading { level: u8, text: &'a str },
    Quote(&'a str),
    Task { checked: bool, text: &'a str },
    Bullet(&'a str),
    Numbered { number: u64, text: &'a str },
    Row,
    Image { alt: &'a str, src: &'a str },
    Text,
}

fn classify<'a>(line: &'a str, fences: &'a FenceTable) -> LineKind<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if let Some(Fenced::Block { language, content }) = fences.block_on_line(trimmed) {
        return LineKind::Fence {
            language: language.as_deref(),
            content,
        };
    }
    if matches!(trimmed, "---" | "***" | "___") {
        return LineKind::Rule;
    }

    let start = line.trim_start();
    for (level, marker) in [(3, "### "), (2, "## "), (1, "# ")] {
        if let Some(text) = start.strip_prefix(marker) {
            return LineKind::Heading { level, text };
        }
    }
    if let Some(text) = start.strip_prefix("> ") {
        return LineKind::Quote(text);
    }
    if trimmed == ">" {
        return LineKind::Quote("");
    }
    for (marker, checked) in [("- [ ] ", false), ("- [x] ", true), ("- [X] ", true)] {
        if let Some(text) = start.strip_prefix(marker) {
            return LineKind::Task { checked, text };
        }
    }
    for marker in ["- ", "* ", "+ "] {
        if let Some(text) = start.strip_prefix(marker) {
            return LineKind::Bullet(text);
        }
    }
    if let Some((number, text)) = numbered(start) {
        return LineKind::Numbered { number, text };
    }
    if is_table_row(trimmed) {
        return LineKind::Row;
    }
    if let Some((alt, src)) = image_only(trimmed) {
        return LineKind::Image { alt, src };
    }
    LineKind::Text
}

fn numbered(line: &str) -> Option<(u64, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let text = line[digits..].strip_prefix(". ")?;
    let number = line[..digits].parse().ok()?;
    Some((number, text))
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// `|---|:--:|` style separator below a header row.
fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.contains('|') {
        return false;
    }
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').all(|cell| {
        let cell = cell.trim();
        cell.contains('-') && cell.chars().all(|c| c == '-' || c == ':')
    })
}

fn split_row(trimmed: &str) -> Vec<&str> {
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn image_only(trimmed: &str) -> Option<(&str, &str)> {
    let rest = trimmed.strip_prefix('!')?;
    let target = bracket_target(rest, 0)?;
    (target.len == rest.len()).then_some((target.label, target.url))
}

fn same_list(a: &LineKind, b: &LineKind) -> bool {
    matches!(
        (a, b),
        (LineKind::Task { .. }, LineKind::Task { .. })
            | (LineKind::Bullet(_), LineKind::Bullet(_))
            | (LineKind::Numbered { .. }, LineKind::Numbered { .. })
    )
}

struct BlockParser<'a> {
    lines: &'a [Line],
    fences: &'a FenceTable,
    inline: InlineResolver<'a>,
    issues: &'a mut Issues,
    pos: usize,
}

impl<'a> BlockParser<'a> {
    fn kind_at(&self, pos: usize) -> Option<LineKind<'a>> {
        let lines: &'a [Line] = self.lines;
        lines.get(pos).map(|line| classify(&line.text, self.fences))
    }

    fn text_at(&self, pos: usize) -> &'a str {
        let lines: &'a [Line] = self.lines;
        &lines[pos].text
    }

    /// A table starts at a row immediately followed by a separator row.
    fn table_starts_at(&self, pos: usize) -> bool {
        self.lines
            .get(pos + 1)
            .is_some_and(|next| is_separator_row(&next.text))
    }

    fn blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(kind) = self.kind_at(self.pos) {
            let number = self.lines[self.pos].number;
            match kind {
                LineKind::Blank => self.pos += 1,
                LineKind::Fence { language, content } => {
                    blocks.push(Block::CodeBlock {
                        language: language.map(str::to_string),
                        content: content.to_string(),
                    });
                    self.pos += 1;
                }
                LineKind::Rule => {
                    blocks.push(Block::Rule);
                    self.pos += 1;
                }
                LineKind::Heading { level, text } => {
                    if text.trim().is_empty() {
                        self.issues.push(Issue::MalformedMarkup {
                            line: number,
                            construct: "heading",
                        });
                        blocks.push(self.paragraph());
                    } else {
                        let content = self.inline.resolve(text.trim(), self.issues);
                        blocks.push(Block::Heading { level, content });
                        self.pos += 1;
                    }
                }
                LineKind::Quote(_) => blocks.push(self.blockquote()),
                LineKind::Task { .. } | LineKind::Bullet(_) | LineKind::Numbered { .. } => {
                    blocks.push(self.list(kind));
                }
                LineKind::Row => {
                    if self.table_starts_at(self.pos) {
                        blocks.push(self.table());
                    } else {
                        self.issues.push(Issue::MalformedMarkup {
                            line: number,
                            construct: "table",
                        });
                        blocks.push(self.paragraph());
                    }
                }
                LineKind::Image { alt, src } => {
                    self.pos += 1;
                    let alt = self.fences.restore_source(alt);
                    let src = self.fences.restore_source(src);
                    if !is_safe_url(&src) {
                        self.issues.push(Issue::UnsafeUrl { url: src.clone() });
                    }
                    blocks.push(Block::Image { alt, src });
                }
                LineKind::Text => blocks.push(self.paragraph()),
            }
        }
        blocks
    }

    /// Lines up to a blank line or a line that starts another block. The
    /// first line is always taken, whatever it looks like.
    fn paragraph(&mut self) -> Block {
        let start = self.pos;
        self.pos += 1;
        while let Some(kind) = self.kind_at(self.pos) {
            let continues = match kind {
                LineKind::Text => true,
                LineKind::Row => !self.table_starts_at(self.pos),
                _ => false,
            };
            if !continues {
                break;
            }
            self.pos += 1;
        }

        let lines: &'a [Line] = self.lines;
        let content = self
            .inline
            .resolve_lines(lines[start..self.pos].iter().map(|l| l.text.as_str()), self.issues);
        Block::Paragraph { content }
    }

    fn blockquote(&mut self) -> Block {
        let mut texts = Vec::new();
        while let Some(LineKind::Quote(text)) = self.kind_at(self.pos) {
            texts.push(text);
            self.pos += 1;
        }
        let content = self.inline.resolve_lines(texts, self.issues);
        Block::Blockquote { content }
    }

    fn list(&mut self, first: LineKind<'a>) -> Block {
        let kind = match first {
            LineKind::Task { .. } => ListKind::Task,
            LineKind::Numbered { number, .. } => ListKind::Ordered { start: number },
            _ => ListKind::Unordered,
        };

        let mut items = Vec::new();
        while let Some(line) = self.kind_at(self.pos) {
            if !same_list(&first, &line) {
                break;
            }
            let (text, checked) = match line {
                LineKind::Task { checked, text } => (text, Some(checked)),
                LineKind::Bullet(text) | LineKind::Numbered { text, .. } => (text, None),
                _ => break,
            };
            let content = self.inline.resolve(text.trim(), self.issues);
            items.push(ListItem { content, checked });
            self.pos += 1;
        }

        Block::List(List { kind, items })
    }

    fn table(&mut self) -> Block {
        let headers: Vec<Vec<Span>> = split_row(self.text_at(self.pos).trim())
            .into_iter()
            .map(|cell| self.inline.resolve(cell, self.issues))
            .collect();
        // header and separator
        self.pos += 2;

        let mut rows = Vec::new();
        while self.lines.get(self.pos).is_some_and(|l| is_table_row(l.text.trim())) {
            let mut cells: Vec<Vec<Span>> = split_row(self.text_at(self.pos).trim())
                .into_iter()
                .map(|cell| self.inline.resolve(cell, self.issues))
                .collect();
            cells.resize(headers.len(), Vec::new());
            rows.push(cells);
            self.pos += 1;
        }

        Block::Table { headers, rows }
    }
}
