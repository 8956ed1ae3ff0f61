//! Named sections ("## Suggestions" followed by a list, ...) pulled out of
//! free-form text.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ExtractConfig;
use crate::fence::{closes_fence, fence_opening};

/// A captured section: a list when every line is a list item, otherwise
/// the section's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section {
    Items(Vec<String>),
    Narrative(String),
}

/// Structured data recovered from one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub sections: BTreeMap<String, Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Map<String, Value>>,
}

impl ExtractionResult {
    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.get(key)
    }

    /// Items of a list section. A narrative section has none.
    pub fn items(&self, key: &str) -> Option<&[String]> {
        match self.sections.get(key)? {
            Section::Items(items) => Some(items),
            Section::Narrative(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.json.is_none()
    }
}

/// A section title the extractor looks for.
struct Wanted {
    normalized: String,
    key: String,
}

fn wanted(config: &ExtractConfig) -> Vec<Wanted> {
    config
        .sections
        .iter()
        .map(|title| Wanted {
            normalized: normalize_title(title),
            key: camel_case(title),
        })
        .collect()
}

/// Lowercase with everything but letters and digits removed, so
/// `**Action  Items:**` and `action-items` compare equal.
fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `Action Items` → `actionItems`
fn camel_case(title: &str) -> String {
    let mut key = String::new();
    for (i, word) in title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                key.extend(first.to_lowercase());
            } else {
                key.extend(first.to_uppercase());
            }
            key.extend(chars.flat_map(char::to_lowercase));
        }
    }
    key
}

/// `#`-style heading: level, title, and whether a space follows the `#`s.
fn heading(line: &str) -> Option<(usize, &str, bool)> {
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    let title = rest.trim();
    let spaced = rest.starts_with(char::is_whitespace);
    (!title.is_empty()).then_some((level, title, spaced))
}

/// The text of a list item line without its marker.
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let rest = ["- ", "* ", "+ ", "• "]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .or_else(|| {
            let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return None;
            }
            let after = &trimmed[digits..];
            after.strip_prefix(". ").or_else(|| after.strip_prefix(") "))
        })?;
    let rest = ["[ ] ", "[x] ", "[X] "]
        .iter()
        .find_map(|checkbox| rest.strip_prefix(checkbox))
        .unwrap_or(rest);
    Some(rest.trim())
}

struct Capture<'a> {
    key: String,
    level: usize,
    lines: Vec<&'a str>,
}

impl Capture<'_> {
    fn finish(self) -> Option<(String, Section)> {
        let content: Vec<&str> = self
            .lines
            .iter()
            .copied()
            .filter(|line| !line.trim().is_empty())
            .collect();
        if content.is_empty() {
            return None;
        }

        let items: Option<Vec<String>> = content
            .iter()
            .map(|line| list_item(line).map(str::to_string))
            .collect();
        let section = match items {
            Some(items) => Section::Items(items),
            None => Section::Narrative(self.lines.join("\n").trim().to_string()),
        };
        Some((self.key, section))
    }
}

fn store(capture: Capture, result: &mut ExtractionResult) {
    if let Some((key, section)) = capture.finish() {
        result.sections.entry(key).or_insert(section);
    }
}

/// Capture each wanted section up to the next heading of the same or a
/// higher level. The first occurrence of a section wins.
pub(crate) fn extract_sections(raw: &str, config: &ExtractConfig) -> ExtractionResult {
    let wanted = wanted(config);
    let mut result = ExtractionResult::default();
    let mut current: Option<Capture> = None;
    // backtick run of the open fence, if any
    let mut fence: Option<usize> = None;

    for line in raw.lines() {
        let in_fence = fence.is_some();
        match fence {
            Some(run) if closes_fence(line, run) => fence = None,
            Some(_) => {}
            None => fence = fence_opening(line).map(|(run, _)| run),
        }
        let found = if in_fence || fence.is_some() {
            None
        } else {
            heading(line)
        };
        let matched = found.and_then(|(_, title, _)| {
            let title = normalize_title(title);
            wanted.iter().find(|w| w.normalized == title)
        });
        // `#tag` at the start of a line is only a heading when it names a
        // section
        let accepted = found.filter(|&(_, _, spaced)| spaced || matched.is_some());
        let Some((level, _, _)) = accepted else {
            if let Some(capture) = current.as_mut() {
                capture.lines.push(line);
            }
            continue;
        };

        if current.as_ref().is_some_and(|c| level <= c.level) {
            if let Some(capture) = current.take() {
                store(capture, &mut result);
            }
        }
        match current.as_mut() {
            // a deeper heading inside the open section
            Some(capture) => capture.lines.push(line),
            None => {
                current = matched.map(|w| Capture {
                    key: w.key.clone(),
                    level,
                    lines: Vec::new(),
                });
            }
        }
    }
    if let Some(capture) = current.take() {
        store(capture, &mut result);
    }

    tracing::debug!(sections = result.sections.len(), "extracted sections");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(raw: &str) -> ExtractionResult {
        extract_sections(raw, &ExtractConfig::default())
    }

    fn items(list: &[&str]) -> Section {
        Section::Items(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn list_and_narrative_sections() {
        let result = sections("## Suggestions\n- do X\n- do Y\n## Metrics\nAll good");
        assert_eq!(result.get("suggestions"), Some(&items(&["do X", "do Y"])));
        assert_eq!(
            result.get("metrics"),
            Some(&Section::Narrative("All good".to_string()))
        );
        assert_eq!(result.sections.len(), 2);
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let result = sections("## Suggestions\n- do X\n- do Y\n## Metrics\nAll good");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"suggestions": ["do X", "do Y"], "metrics": "All good"})
        );
    }

    #[test]
    fn headings_are_case_and_spacing_tolerant() {
        let result = sections("#ACTION  items:\n1. call Bo\n2) email Al\n\n* [x] rest");
        assert_eq!(
            result.get("actionItems"),
            Some(&items(&["call Bo", "email Al", "rest"]))
        );
    }

    #[test]
    fn hashtag_lines_do_not_end_a_section() {
        let result = sections("# Summary
Shipped.
#launch went well
# Notes
x");
        assert_eq!(
            result.get("summary"),
            Some(&Section::Narrative("Shipped.\n#launch went well".to_string()))
        );
    }

    #[test]
    fn section_ends_at_same_or_higher_heading() {
        let result = sections(
            "# Report\n## Recommendations\nKeep going.\n### Detail\nMore.\n## Other\nignored\n# Metrics\n- 5%",
        );
        assert_eq!(
            result.get("recommendations"),
            Some(&Section::Narrative("Keep going.\n### Detail\nMore.".to_string()))
        );
        assert_eq!(result.items("metrics"), Some(&["5%".to_string()][..]));
    }

    #[test]
    fn mixed_lines_are_narrative() {
        let result = sections("## Insights\nTraffic rose.\n- mostly mobile");
        assert_eq!(
            result.get("insights"),
            Some(&Section::Narrative("Traffic rose.\n- mostly mobile".to_string()))
        );
        assert_eq!(result.items("insights"), None);
    }

    #[test]
    fn absent_and_empty_sections_are_omitted() {
        let result = sections("Hello there\n## Suggestions\n\n## Notes\n- a");
        assert!(result.is_empty());
    }

    #[test]
    fn first_occurrence_wins() {
        let result = sections("## Summary\nfirst\n## Summary\nsecond");
        assert_eq!(
            result.get("summary"),
            Some(&Section::Narrative("first".to_string()))
        );
    }

    #[test]
    fn headings_inside_code_fences_are_ignored() {
        let result = sections("## Next Steps\n```sh\n# Metrics\nmake\n```\n- deploy");
        assert_eq!(
            result.get("nextSteps"),
            Some(&Section::Narrative("```sh\n# Metrics\nmake\n```\n- deploy".to_string()))
        );
        assert_eq!(result.get("metrics"), None);
    }

    #[test]
    fn short_fence_inside_long_fence_does_not_close_it() {
        let result = sections("## Summary\n````\n```\n# Metrics\n- x\n```\n````\ndone");
        assert_eq!(result.get("metrics"), None);
        assert_eq!(
            result.get("summary"),
            Some(&Section::Narrative(
                "````\n```\n# Metrics\n- x\n```\n````\ndone".to_string()
            ))
        );
    }

    #[test]
    fn custom_section_titles() {
        let config = ExtractConfig {
            sections: vec!["Risk Factors".to_string()],
        };
        let result = extract_sections("## **Risk factors**\n- churn", &config);
        assert_eq!(result.get("riskFactors"), Some(&items(&["churn"])));
    }

    #[test]
    fn camel_case_keys() {
        assert_eq!(camel_case("Action Items"), "actionItems");
        assert_eq!(camel_case("next-steps"), "nextSteps");
        assert_eq!(camel_case("Metrics"), "metrics");
    }
}
