mod block;
mod config;
mod error;
mod extract;
mod fence;
mod html;
mod inline;
mod json;
mod parser;
mod safety;

pub use block::{Block, Document, List, ListItem, ListKind, NumberKind, Span};
pub use config::{Config, ExtractConfig, InlineConfig, LinksConfig};
pub use error::{Error, Issue};
pub use extract::{ExtractionResult, Section};

use std::panic;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use error::Issues;

fn default_config() -> &'static Config {
    static DEFAULT: OnceLock<Config> = OnceLock::new();
    DEFAULT.get_or_init(Config::compiled_default)
}

/// Parse message text into a document using default config.
pub fn parse(raw: &str) -> Document {
    parser::parse(raw, default_config())
}

/// Parse message text into a document with custom config.
pub fn parse_with_config(raw: &str, config: &Config) -> Document {
    parser::parse(raw, config)
}

/// HTML for a message plus the issues recovered from along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub issues: Vec<Issue>,
}

/// Render message text to an HTML fragment using default config.
pub fn render(raw: &str) -> String {
    render_with_config(raw, default_config())
}

/// Render message text to an HTML fragment with custom config.
pub fn render_with_config(raw: &str, config: &Config) -> String {
    render_report(raw, config).html
}

/// Render and report recovered issues. Never fails: if rendering itself
/// breaks, the whole input comes back escaped in a single paragraph.
#[tracing::instrument(level = "debug", skip_all, fields(len = raw.len()))]
pub fn render_report(raw: &str, config: &Config) -> Rendered {
    render_guarded(raw, config, render_document)
}

fn render_document(raw: &str, config: &Config) -> Rendered {
    let doc = parser::parse(raw, config);
    let html = html::document_to_html(&doc, config);
    Rendered {
        html,
        issues: doc.issues,
    }
}

fn render_guarded(raw: &str, config: &Config, render: fn(&str, &Config) -> Rendered) -> Rendered {
    if raw.trim().is_empty() {
        return Rendered::default();
    }

    panic::catch_unwind(|| render(raw, config)).unwrap_or_else(|_| {
        tracing::error!("rendering failed, falling back to escaped text");
        Rendered {
            html: html::escaped_paragraph(raw),
            issues: Vec::new(),
        }
    })
}

/// The first JSON object found in the text, if any.
pub fn extract_json(raw: &str) -> Option<Map<String, Value>> {
    let mut issues = Issues::default();
    json::extract_json(raw, &mut issues)
}

/// Named sections using default config.
pub fn extract_sections(raw: &str) -> ExtractionResult {
    extract::extract_sections(raw, &default_config().extract)
}

/// Named sections with custom config.
pub fn extract_sections_with_config(raw: &str, config: &Config) -> ExtractionResult {
    extract::extract_sections(raw, &config.extract)
}

/// Sections and the first JSON object, together.
pub fn extract(raw: &str, config: &Config) -> ExtractionResult {
    let mut result = extract::extract_sections(raw, &config.extract);
    result.json = extract_json(raw);
    result
}
