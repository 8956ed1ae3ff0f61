use serde_json::{Map, Value};

use crate::error::{Issue, Issues};

/// Find a JSON object in free-form text.
///
/// # Attempts
/// 1. The whole trimmed input
/// 2. The first balanced `{...}` substring
/// 3. That substring after removing trailing commas and collapsing raw
///    newlines and tabs
///
/// Each attempt is all-or-nothing; partially parsed data is never returned.
pub(crate) fn extract_json(raw: &str, issues: &mut Issues) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Ok(object) = parse_object(trimmed) {
        return Some(object);
    }

    let reason = match balanced_object(trimmed) {
        Some(candidate) => {
            match parse_object(candidate).or_else(|_| parse_object(&repair(candidate))) {
                Ok(object) => return Some(object),
                Err(e) => e,
            }
        }
        None => "no balanced object found".to_string(),
    };

    issues.push(Issue::JsonParseFailure { reason });
    None
}

fn parse_object(candidate: &str) -> Result<Map<String, Value>, String> {
    serde_json::from_str(candidate).map_err(|e| e.to_string())
}

/// The first `{...}` whose braces balance, ignoring braces inside strings.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop commas directly before `}` or `]` and collapse runs of raw
/// newlines and tabs to a single space.
fn repair(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len());
    let mut in_string = false;
    let mut escape_next = false;
    let mut in_break = false;

    for (i, c) in candidate.char_indices() {
        if matches!(c, '\n' | '\r' | '\t') {
            if !in_break {
                out.push(' ');
            }
            in_break = true;
            continue;
        }
        in_break = false;

        if escape_next {
            escape_next = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = candidate[i + 1..].trim_start().chars().next();
                if matches!(next, Some('}' | ']')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(raw: &str) -> Option<Value> {
        let mut issues = Issues::default();
        extract_json(raw, &mut issues).map(Value::Object)
    }

    #[test]
    fn strict_object() {
        assert_eq!(extract(" {\"a\": 1} "), Some(json!({"a": 1})));
    }

    #[test]
    fn trailing_comma_is_repaired() {
        assert_eq!(extract("{\"a\":1,}"), Some(json!({"a": 1})));
        assert_eq!(
            extract("{\"list\": [1, 2, ], \"b\": {\"c\": true,},}"),
            Some(json!({"list": [1, 2], "b": {"c": true}}))
        );
    }

    #[test]
    fn object_inside_prose_and_fences() {
        let raw = "Sure! Here is the data:\n```json\n{\"title\": \"Plan {v2}\", \"n\": 3}\n```\nLet me know.";
        assert_eq!(extract(raw), Some(json!({"title": "Plan {v2}", "n": 3})));
    }

    #[test]
    fn raw_newlines_in_strings_are_collapsed() {
        let raw = "{\"text\": \"line one\n\tline two\"}";
        assert_eq!(extract(raw), Some(json!({"text": "line one line two"})));
    }

    #[test]
    fn escaped_quotes_do_not_confuse_braces() {
        let raw = "x {\"a\": \"say \\\"}\\\" now\"} y";
        assert_eq!(extract(raw), Some(json!({"a": "say \"}\" now"})));
    }

    #[test]
    fn commas_inside_strings_are_kept() {
        assert_eq!(
            extract("{\"a\": \"x,}\", \"b\": 2,}"),
            Some(json!({"a": "x,}", "b": 2}))
        );
    }

    #[test]
    fn not_json() {
        assert_eq!(extract("not json at all"), None);
        assert_eq!(extract("{unbalanced"), None);
        assert_eq!(extract("{'single': quotes}"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn only_objects_count() {
        assert_eq!(extract("[1, 2, 3]"), None);
        assert_eq!(extract("42"), None);
    }

    #[test]
    fn failure_is_reported() {
        let mut issues = Issues::default();
        assert!(extract_json("nothing here", &mut issues).is_none());
        let issues = issues.into_vec();
        assert_eq!(
            issues,
            vec![Issue::JsonParseFailure {
                reason: "no balanced object found".to_string()
            }]
        );
    }
}
