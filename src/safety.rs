//! Escaping and URL checks shared by the parser and the serializer.

/// Escape text for HTML element content or a double-quoted attribute value.
pub(crate) fn escape_html(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

/// Whether a link or image target may be emitted as a live attribute.
///
/// Only `http`, `https` and scheme-less (relative) targets pass. Whitespace
/// and control characters are ignored when looking for the scheme, since
/// browsers skip them too (`java\tscript:`).
pub(crate) fn is_safe_url(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return false;
    }
    match scheme(&cleaned) {
        Some(scheme) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => true,
    }
}

fn scheme(url: &str) -> Option<&str> {
    let end = url.find([':', '/', '?', '#'])?;
    if url[end..].starts_with(':') {
        Some(&url[..end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(text: &str) -> String {
        let mut out = String::new();
        escape_html(text, &mut out);
        out
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escaped("<img src=x onerror=\"a\">&'"),
            "&lt;img src=x onerror=&quot;a&quot;&gt;&amp;&#39;"
        );
        assert_eq!(escaped("plain text"), "plain text");
    }

    #[test]
    fn allows_web_and_relative_urls() {
        assert!(is_safe_url("https://example.com/a?b=c"));
        assert!(is_safe_url("HTTP://example.com"));
        assert!(is_safe_url("/docs/page"));
        assert!(is_safe_url("page.html#top"));
        assert!(is_safe_url("//cdn.example.com/x.png"));
        assert!(is_safe_url("?q=a:b"));
    }

    #[test]
    fn rejects_script_and_data_urls() {
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("JavaScript:alert(1)"));
        assert!(!is_safe_url("java\tscript:alert(1)"));
        assert!(!is_safe_url(" javascript:alert(1)"));
        assert!(!is_safe_url("data:text/html;base64,xx"));
        assert!(!is_safe_url("vbscript:x"));
        assert!(!is_safe_url("mailto:a@b.c"));
        assert!(!is_safe_url(":nothing"));
        assert!(!is_safe_url(""));
    }
}
