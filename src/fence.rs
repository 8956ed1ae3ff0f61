//! Verbatim regions are swapped for placeholder tokens before any markup
//! rule runs, so nothing inside a code fence or an inline code span is ever
//! read as markup.

use crate::error::{Issue, Issues};

/// Delimits placeholder tokens. A Unicode noncharacter, replaced wherever it
/// occurs in the input before fencing, so tokens never collide with content.
pub(crate) const SENTINEL: char = '\u{FDD0}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fenced {
    Block {
        language: Option<String>,
        content: String,
    },
    Inline {
        code: String,
        /// The span as written, backticks included.
        source: String,
    },
}

/// Placeholder token → verbatim text, alive for one render call.
#[derive(Debug, Default)]
pub(crate) struct FenceTable {
    entries: Vec<Fenced>,
}

/// A piece of text after splitting out placeholder tokens.
pub(crate) enum Piece<'t, 'f> {
    Text(&'t str),
    Fenced(&'f Fenced),
}

/// A line of protected text with its 1-based line number in the input.
#[derive(Debug)]
pub(crate) struct Line {
    pub number: usize,
    pub text: String,
}

impl FenceTable {
    fn insert(&mut self, fenced: Fenced) -> String {
        let index = self.entries.len();
        self.entries.push(fenced);
        format!("{SENTINEL}{index}{SENTINEL}")
    }

    /// The fenced block whose token makes up the whole line, if any.
    pub(crate) fn block_on_line(&self, line: &str) -> Option<&Fenced> {
        match self.pieces(line.trim()).as_slice() {
            [Piece::Fenced(fenced)] if matches!(fenced, Fenced::Block { .. }) => Some(*fenced),
            _ => None,
        }
    }

    /// Split text into literal runs and the fenced entries their tokens
    /// stand for.
    pub(crate) fn pieces<'t>(&self, text: &'t str) -> Vec<Piece<'t, '_>> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(SENTINEL) {
            let after = &rest[start + SENTINEL.len_utf8()..];
            let Some(len) = after.find(SENTINEL) else {
                break;
            };
            let entry = after[..len]
                .parse::<usize>()
                .ok()
                .and_then(|index| self.entries.get(index));
            let Some(entry) = entry else {
                break;
            };
            if start > 0 {
                pieces.push(Piece::Text(&rest[..start]));
            }
            pieces.push(Piece::Fenced(entry));
            rest = &after[len + SENTINEL.len_utf8()..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest));
        }
        pieces
    }

    /// Put the original source text back in place of every token.
    pub(crate) fn restore_source(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for piece in self.pieces(text) {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Fenced(Fenced::Inline { source, .. }) => out.push_str(source),
                Piece::Fenced(Fenced::Block { content, .. }) => out.push_str(content),
            }
        }
        out
    }
}

/// Replace fenced code blocks, then inline code spans, with tokens.
///
/// Each fenced block collapses to a single line holding its token. Line
/// numbers of the remaining lines still refer to the input.
pub(crate) fn protect(input: &str, issues: &mut Issues) -> (Vec<Line>, FenceTable) {
    let mut table = FenceTable::default();
    let mut out = Vec::new();
    let mut lines = input.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let number = index + 1;
        if let Some((run, info)) = fence_opening(line) {
            let language = language_hint(info);
            let mut content: Vec<&str> = Vec::new();
            let mut closed = false;
            for (_, inner) in lines.by_ref() {
                if closes_fence(inner, run) {
                    closed = true;
                    break;
                }
                content.push(inner);
            }
            if !closed {
                issues.push(Issue::UnterminatedFence { line: number });
            }
            let token = table.insert(Fenced::Block {
                language,
                content: content.join("\n"),
            });
            out.push(Line {
                number,
                text: token,
            });
            continue;
        }

        let mut text = String::with_capacity(line.len());
        protect_inline(line, &mut table, &mut text);
        out.push(Line { number, text });
    }

    (out, table)
}

/// Backtick run length and info string of an opening fence line.
pub(crate) fn fence_opening(line: &str) -> Option<(usize, &str)> {
    let start = line.trim_start();
    let run = run_length(start.as_bytes(), 0);
    if run < 3 {
        return None;
    }
    let info = &start[run..];
    // ```a``` on one line is inline code, not a fence
    if info.contains("```") {
        return None;
    }
    Some((run, info.trim()))
}

/// A line of only backticks, at least as many as the opening fence.
pub(crate) fn closes_fence(line: &str, run: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= run && trimmed.bytes().all(|b| b == b'`')
}

fn language_hint(info: &str) -> Option<String> {
    let word = info.split_whitespace().next()?;
    let valid = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'));
    valid.then(|| word.to_string())
}

/// Replace backtick code spans on one line. An opening run of N backticks
/// closes at the next run of exactly N.
fn protect_inline(line: &str, table: &mut FenceTable, out: &mut String) {
    let bytes = line.as_bytes();
    // Run lengths with no closer left on the line; later runs of the same
    // length cannot close either.
    let mut unmatched: Vec<usize> = Vec::new();
    let mut cursor = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = run_length(bytes, i);
        let open_end = i + run;
        if !unmatched.contains(&run) {
            if let Some(close) = closing_run(bytes, open_end, run) {
                out.push_str(&line[cursor..i]);
                let token = table.insert(Fenced::Inline {
                    code: trim_padding(&line[open_end..close]).to_string(),
                    source: line[i..close + run].to_string(),
                });
                out.push_str(&token);
                i = close + run;
                cursor = i;
                continue;
            }
            unmatched.push(run);
        }
        i = open_end;
    }
    out.push_str(&line[cursor..]);
}

fn run_length(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|&&b| b == b'`').count()
}

fn closing_run(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let len = run_length(bytes, j);
            if len == run {
                return Some(j);
            }
            j += len;
        } else {
            j += 1;
        }
    }
    None
}

/// `` ` a ` `` holds `a`; a span of only spaces is kept as is.
fn trim_padding(code: &str) -> &str {
    if code.len() >= 2 && code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty() {
        &code[1..code.len() - 1]
    } else {
        code
    }
}
