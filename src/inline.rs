//! Inline resolution. Rules run in a fixed order and each one only looks at
//! `Text` spans left over by the rules before it, so a span produced by an
//! earlier rule is never re-read by a later one.

use crate::block::{NumberKind, Span};
use crate::config::InlineConfig;
use crate::error::{Issue, Issues};
use crate::fence::{FenceTable, Fenced, Piece};
use crate::safety::is_safe_url;

pub(crate) struct InlineResolver<'a> {
    fences: &'a FenceTable,
    config: &'a InlineConfig,
}

impl<'a> InlineResolver<'a> {
    pub(crate) fn new(fences: &'a FenceTable, config: &'a InlineConfig) -> Self {
        Self { fences, config }
    }

    /// Resolve one line of block text.
    pub(crate) fn resolve(&self, text: &str, issues: &mut Issues) -> Vec<Span> {
        let mut spans = vec![Span::Text(text.to_string())];
        spans = each_text(spans, &mut |t: &str| emphasis(t, Emphasis::Bold));
        spans = each_text(spans, &mut |t: &str| emphasis(t, Emphasis::Italic));
        spans = each_text(spans, &mut |t: &str| self.code(t));
        spans = each_text(spans, &mut |t: &str| links(t, issues));
        spans = each_text(spans, &mut |t: &str| images(t, issues));
        if self.config.mentions {
            spans = each_text(spans, &mut |t: &str| sigil(t, '@', Span::Mention));
        }
        if self.config.hashtags {
            spans = each_text(spans, &mut |t: &str| sigil(t, '#', Span::Hashtag));
        }
        if self.config.numbers {
            spans = each_text(spans, &mut |t: &str| numbers(t));
        }
        spans
    }

    /// Resolve consecutive lines of one block, separated by line breaks.
    pub(crate) fn resolve_lines<'l, I>(&self, lines: I, issues: &mut Issues) -> Vec<Span>
    where
        I: IntoIterator<Item = &'l str>,
    {
        let mut spans = Vec::new();
        for (i, line) in lines.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::LineBreak);
            }
            spans.extend(self.resolve(line, issues));
        }
        spans
    }

    fn code(&self, text: &str) -> Vec<Span> {
        let mut out = Vec::new();
        for piece in self.fences.pieces(text) {
            match piece {
                Piece::Text(t) => push_text(&mut out, t),
                Piece::Fenced(Fenced::Inline { code, .. }) => out.push(Span::Code(code.clone())),
                Piece::Fenced(Fenced::Block { content, .. }) => push_text(&mut out, content),
            }
        }
        out
    }
}

/// Apply `f` to every `Text` span, descending into bold and italic children.
fn each_text<F>(spans: Vec<Span>, f: &mut F) -> Vec<Span>
where
    F: FnMut(&str) -> Vec<Span>,
{
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Text(text) => out.extend(f(&text)),
            Span::Bold(children) => out.push(Span::Bold(each_text(children, f))),
            Span::Italic(children) => out.push(Span::Italic(each_text(children, f))),
            other => out.push(other),
        }
    }
    out
}

fn push_text(out: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Span::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Span::Text(text.to_string()));
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Bold,
    Italic,
}

impl Emphasis {
    fn marker(self) -> &'static str {
        match self {
            Emphasis::Bold => "**",
            Emphasis::Italic => "*",
        }
    }

    fn wrap(self, children: Vec<Span>) -> Span {
        match self {
            Emphasis::Bold => Span::Bold(children),
            Emphasis::Italic => Span::Italic(children),
        }
    }
}

fn emphasis(text: &str, kind: Emphasis) -> Vec<Span> {
    let marker = kind.marker();
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find(marker) {
        let open = search + found;
        let inner = open + marker.len();
        if !opens(text, inner, kind) {
            search = open + 1;
            continue;
        }
        // Closers usable by a later opener are a subset of this one's, so a
        // miss here means no emphasis remains in the text.
        let Some(close) = closing(text, inner, kind) else {
            break;
        };
        push_text(&mut out, &text[cursor..open]);
        out.push(kind.wrap(vec![Span::Text(text[inner..close].to_string())]));
        cursor = close + marker.len();
        search = cursor;
    }
    push_text(&mut out, &text[cursor..]);
    out
}

fn opens(text: &str, inner: usize, kind: Emphasis) -> bool {
    match text[inner..].chars().next() {
        None => false,
        Some(c) if c.is_whitespace() => false,
        Some('*') => kind == Emphasis::Bold,
        Some(_) => true,
    }
}

fn closing(text: &str, inner: usize, kind: Emphasis) -> Option<usize> {
    let marker = kind.marker();
    let mut from = inner + text[inner..].chars().next()?.len_utf8();
    while let Some(found) = text[from..].find(marker) {
        let at = from + found;
        let after_space = text[..at].chars().next_back().is_some_and(char::is_whitespace);
        // `***` closes bold at its last two stars
        let run_continues =
            kind == Emphasis::Bold && text[at + marker.len()..].starts_with('*');
        if !after_space && !run_continues {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// `[label](url)` parsed from a `[`.
pub(crate) struct Target<'a> {
    pub label: &'a str,
    pub url: &'a str,
    /// Bytes from the `[` through the closing `)`.
    pub len: usize,
}

pub(crate) fn bracket_target(text: &str, open: usize) -> Option<Target<'_>> {
    let rest = text[open..].strip_prefix('[')?;
    let close = rest.find([']', '['])?;
    if !rest[close..].starts_with(']') {
        return None;
    }
    let label = &rest[..close];
    let after = rest[close + 1..].strip_prefix('(')?;

    let mut depth = 0usize;
    for (i, c) in after.char_indices() {
        match c {
            ')' if depth == 0 => {
                if i == 0 {
                    return None;
                }
                return Some(Target {
                    label: label.trim(),
                    url: &after[..i],
                    len: close + i + 4,
                });
            }
            ')' => depth -= 1,
            '(' => depth += 1,
            // a destination never spans another bracket, which keeps every
            // scan short of the next `[`
            '[' | ']' => return None,
            c if c.is_whitespace() => return None,
            _ => {}
        }
    }
    None
}

fn links(text: &str, issues: &mut Issues) -> Vec<Span> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find('[') {
        let open = search + found;
        search = open + 1;
        if text[..open].ends_with('!') {
            continue;
        }
        let Some(target) = bracket_target(text, open) else {
            continue;
        };
        if !is_safe_url(target.url) {
            issues.push(Issue::UnsafeUrl {
                url: target.url.to_string(),
            });
        }
        let label = if target.label.is_empty() {
            target.url
        } else {
            target.label
        };
        push_text(&mut out, &text[cursor..open]);
        out.push(Span::Link {
            label: label.to_string(),
            href: target.url.to_string(),
        });
        cursor = open + target.len;
        search = cursor;
    }
    push_text(&mut out, &text[cursor..]);
    out
}

fn images(text: &str, issues: &mut Issues) -> Vec<Span> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find("![") {
        let bang = search + found;
        search = bang + 1;
        let Some(target) = bracket_target(text, bang + 1) else {
            continue;
        };
        if !is_safe_url(target.url) {
            issues.push(Issue::UnsafeUrl {
                url: target.url.to_string(),
            });
        }
        push_text(&mut out, &text[cursor..bang]);
        out.push(Span::Image {
            alt: target.label.to_string(),
            src: target.url.to_string(),
        });
        cursor = bang + 1 + target.len;
        search = cursor;
    }
    push_text(&mut out, &text[cursor..]);
    out
}

/// `@name` and `#name`. No word-boundary check: `user@host` mentions `host`.
fn sigil(text: &str, sigil: char, make: fn(String) -> Span) -> Vec<Span> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find(sigil) {
        let at = search + found;
        let start = at + sigil.len_utf8();
        search = start;
        let len = text[start..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        if len == 0 {
            continue;
        }
        push_text(&mut out, &text[cursor..at]);
        out.push(make(text[start..start + len].to_string()));
        cursor = start + len;
        search = cursor;
    }
    push_text(&mut out, &text[cursor..]);
    out
}

fn numbers(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut i = 0;

    while i < bytes.len() {
        let boundary = i == 0 || !is_word_byte(bytes[i - 1]);
        if !bytes[i].is_ascii_digit() || !boundary {
            i += 1;
            continue;
        }
        match number_at(bytes, i) {
            Some((end, kind)) => {
                push_text(&mut out, &text[cursor..i]);
                out.push(Span::Number {
                    literal: text[i..end].to_string(),
                    kind,
                });
                cursor = end;
                i = end;
            }
            None => {
                while i < bytes.len() && (is_word_byte(bytes[i]) || bytes[i] == b',') {
                    i += 1;
                }
            }
        }
    }
    push_text(&mut out, &text[cursor..]);
    out
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn digits_end(bytes: &[u8], start: usize) -> usize {
    start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Whether the token would run on into a longer word or number.
fn continues(bytes: &[u8], at: usize) -> bool {
    match bytes.get(at) {
        Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => true,
        Some(b'.' | b',') => bytes.get(at + 1).is_some_and(u8::is_ascii_digit),
        _ => false,
    }
}

fn number_at(bytes: &[u8], start: usize) -> Option<(usize, NumberKind)> {
    let mut end = digits_end(bytes, start);
    // 1,000,000
    while bytes.get(end) == Some(&b',') && digits_end(bytes, end + 1) == end + 4 {
        end += 4;
    }
    if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end = digits_end(bytes, end + 1);
    }

    match bytes.get(end) {
        Some(b'%') => return Some((end + 1, NumberKind::Percent)),
        Some(b'k' | b'K' | b'm' | b'M' | b'b' | b'B') if !continues(bytes, end + 1) => {
            return Some((end + 1, NumberKind::Magnitude));
        }
        _ => {}
    }
    if continues(bytes, end) {
        None
    } else {
        Some((end, NumberKind::Plain))
    }
}
