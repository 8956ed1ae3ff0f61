use crate::block::{Block, Document, List, ListKind, NumberKind, Span};
use crate::config::Config;
use crate::safety::{escape_html, is_safe_url};

/// Convert a document to an HTML fragment. All text is escaped here and
/// nowhere else.
pub fn document_to_html(doc: &Document, config: &Config) -> String {
    let mut out = String::new();
    for (i, block) in doc.blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        emit_block(block, config, &mut out);
    }
    out
}

/// Everything escaped into one paragraph; the output of last resort.
pub fn escaped_paragraph(raw: &str) -> String {
    let mut out = String::from("<p>");
    escape_html(raw.trim(), &mut out);
    out.push_str("</p>");
    out
}

fn emit_block(block: &Block, config: &Config, out: &mut String) {
    match block {
        Block::Heading { level, content } => {
            let level = (*level).clamp(1, 3);
            out.push_str(&format!("<h{level} class=\"heading-{level}\">"));
            spans_to_html(content, config, out);
            out.push_str(&format!("</h{level}>"));
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            spans_to_html(content, config, out);
            out.push_str("</p>");
        }
        Block::CodeBlock { language, content } => {
            match language {
                Some(lang) => {
                    out.push_str("<pre><code class=\"language-");
                    escape_html(lang, out);
                    out.push_str("\">");
                }
                None => out.push_str("<pre><code>"),
            }
            escape_html(content, out);
            out.push_str("</code></pre>");
        }
        Block::Blockquote { content } => {
            out.push_str("<blockquote>");
            spans_to_html(content, config, out);
            out.push_str("</blockquote>");
        }
        Block::List(list) => list_to_html(list, config, out),
        Block::Table { headers, rows } => table_to_html(headers, rows, config, out),
        Block::Rule => out.push_str("<hr>"),
        Block::Image { alt, src } => {
            if is_safe_url(src) {
                image_to_html(alt, src, out);
            } else {
                out.push_str("<p>");
                literal_target("![", alt, src, out);
                out.push_str("</p>");
            }
        }
    }
}

fn list_to_html(list: &List, config: &Config, out: &mut String) {
    let close = match list.kind {
        ListKind::Unordered => {
            out.push_str("<ul>");
            "</ul>"
        }
        ListKind::Ordered { start: 1 } => {
            out.push_str("<ol>");
            "</ol>"
        }
        ListKind::Ordered { start } => {
            out.push_str(&format!("<ol start=\"{start}\">"));
            "</ol>"
        }
        ListKind::Task => {
            out.push_str("<ul class=\"task-list\">");
            "</ul>"
        }
    };

    for item in &list.items {
        match item.checked {
            Some(true) => {
                out.push_str("<li class=\"task-item\"><input type=\"checkbox\" disabled checked> ")
            }
            Some(false) => out.push_str("<li class=\"task-item\"><input type=\"checkbox\" disabled> "),
            None => out.push_str("<li>"),
        }
        spans_to_html(&item.content, config, out);
        out.push_str("</li>");
    }
    out.push_str(close);
}

fn table_to_html(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], config: &Config, out: &mut String) {
    out.push_str("<table><thead><tr>");
    for cell in headers {
        out.push_str("<th>");
        spans_to_html(cell, config, out);
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            spans_to_html(cell, config, out);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn image_to_html(alt: &str, src: &str, out: &mut String) {
    out.push_str("<img alt=\"");
    escape_html(alt, out);
    out.push_str("\" src=\"");
    escape_html(src, out);
    out.push_str("\">");
}

/// An unsafe link or image, written back out the way it was typed.
fn literal_target(open: &str, label: &str, url: &str, out: &mut String) {
    escape_html(open, out);
    escape_html(label, out);
    out.push_str("](");
    escape_html(url, out);
    out.push(')');
}

fn spans_to_html(spans: &[Span], config: &Config, out: &mut String) {
    for span in spans {
        span_to_html(span, config, out);
    }
}

fn span_to_html(span: &Span, config: &Config, out: &mut String) {
    match span {
        Span::Text(text) => escape_html(text, out),
        Span::Bold(inner) => {
            out.push_str("<strong>");
            spans_to_html(inner, config, out);
            out.push_str("</strong>");
        }
        Span::Italic(inner) => {
            out.push_str("<em>");
            spans_to_html(inner, config, out);
            out.push_str("</em>");
        }
        Span::Code(code) => {
            out.push_str("<code>");
            escape_html(code, out);
            out.push_str("</code>");
        }
        Span::Link { label, href } => {
            if !is_safe_url(href) {
                literal_target("[", label, href, out);
                return;
            }
            out.push_str("<a href=\"");
            escape_html(href, out);
            if config.links.new_tab {
                out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer");
            }
            out.push_str("\">");
            escape_html(label, out);
            out.push_str("</a>");
        }
        Span::Image { alt, src } => {
            if is_safe_url(src) {
                image_to_html(alt, src, out);
            } else {
                literal_target("![", alt, src, out);
            }
        }
        Span::Mention(name) => {
            out.push_str("<span class=\"mention\">@");
            escape_html(name, out);
            out.push_str("</span>");
        }
        Span::Hashtag(name) => {
            out.push_str("<span class=\"hashtag\">#");
            escape_html(name, out);
            out.push_str("</span>");
        }
        Span::Number { literal, kind } => {
            let class = match kind {
                NumberKind::Percent => "number number-percent",
                NumberKind::Magnitude => "number number-magnitude",
                NumberKind::Plain => "number",
            };
            out.push_str(&format!("<span class=\"{class}\">"));
            escape_html(literal, out);
            out.push_str("</span>");
        }
        Span::LineBreak => out.push_str("<br>"),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::{render, render_with_config};

    fn escaped(text: &str) -> String {
        let mut out = String::new();
        crate::safety::escape_html(text, &mut out);
        out
    }

    #[test]
    fn plain_text_is_one_escaped_paragraph() {
        for input in ["hello world", "Tom & Jerry <tag> \"quotes\" it's", "  spaced  out  ", "ünïcödé text"] {
            assert_eq!(render(input), format!("<p>{}</p>", escaped(input)));
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(render(""), "");
        assert_eq!(render("  \n\t\n "), "");
    }

    #[test]
    fn heading() {
        assert_eq!(render("# Hello"), "<h1 class=\"heading-1\">Hello</h1>");
        assert_eq!(render("## Two"), "<h2 class=\"heading-2\">Two</h2>");
        assert_eq!(render("### Three"), "<h3 class=\"heading-3\">Three</h3>");
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(render("**bold**"), "<p><strong>bold</strong></p>");
        assert_eq!(render("*italic*"), "<p><em>italic</em></p>");
        assert_eq!(
            render("**a*b*c**"),
            "<p><strong>a<em>b</em>c</strong></p>"
        );
    }

    #[test]
    fn inline_code() {
        assert_eq!(render("`code`"), "<p><code>code</code></p>");
        assert_eq!(
            render("`**x** [a](b) @me #tag 50%`"),
            "<p><code>**x** [a](b) @me #tag 50%</code></p>"
        );
    }

    #[test]
    fn code_block() {
        assert_eq!(
            render("```rust\nlet x = 1;\n```"),
            "<pre><code class=\"language-rust\">let x = 1;</code></pre>"
        );
    }

    #[test]
    fn fenced_content_is_verbatim() {
        let body = "**bold** # heading [x](y) <b>&</b>\n- item\n| a |";
        let html = render(&format!("```\n{body}\n```"));
        assert_eq!(html, format!("<pre><code>{}</code></pre>", escaped(body)));
        assert!(!html.contains("<strong>"));
        assert!(!html.contains("<a "));
        assert!(!html.contains("<li>"));
    }

    #[test]
    fn nested_fence_stays_inside_longer_fence() {
        assert_eq!(
            render("````md\n```rust\nlet x = 1;\n```\n````"),
            "<pre><code class=\"language-md\">```rust\nlet x = 1;\n```</code></pre>"
        );
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        assert_eq!(
            render("Look:\n```js\nconst a = `x`;\n# still code"),
            "<p>Look:</p>\n<pre><code class=\"language-js\">const a = `x`;\n# still code</code></pre>"
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            render("- a\n- b\n- c"),
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn ordered_list() {
        assert_eq!(render("1. one\n2. two"), "<ol><li>one</li><li>two</li></ol>");
        assert_eq!(render("3. three\n4. four"), "<ol start=\"3\"><li>three</li><li>four</li></ol>");
    }

    #[test]
    fn task_list() {
        assert_eq!(
            render("- [ ] todo\n- [x] done"),
            "<ul class=\"task-list\">\
             <li class=\"task-item\"><input type=\"checkbox\" disabled> todo</li>\
             <li class=\"task-item\"><input type=\"checkbox\" disabled checked> done</li>\
             </ul>"
        );
    }

    #[test]
    fn table() {
        let md = "| A | B |\n|---|---|\n| 1 | x |";
        assert_eq!(
            render(md),
            "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td><span class=\"number\">1</span></td><td>x</td></tr></tbody></table>"
        );
    }

    #[test]
    fn malformed_table_is_paragraph() {
        assert_eq!(render("| A | B |"), "<p>| A | B |</p>");
    }

    #[test]
    fn blockquote_and_rule() {
        assert_eq!(
            render("> quoted\n> more\n\n---"),
            "<blockquote>quoted<br>more</blockquote>\n<hr>"
        );
    }

    #[test]
    fn paragraph_lines_break() {
        assert_eq!(render("line one\nline two"), "<p>line one<br>line two</p>");
        assert_eq!(render("one\n\ntwo"), "<p>one</p>\n<p>two</p>");
    }

    #[test]
    fn image_block() {
        assert_eq!(
            render("![a \"chart\"](https://x.com/c.png)"),
            "<img alt=\"a &quot;chart&quot;\" src=\"https://x.com/c.png\">"
        );
    }

    #[test]
    fn javascript_link_is_not_live() {
        let html = render("[click](javascript:alert(1))");
        assert_eq!(html, "<p>[click](javascript:alert(1))</p>");
        assert!(!html.contains("<a"));
    }

    #[test]
    fn data_image_is_not_live() {
        let html = render("![x](data:image/svg+xml;base64,PHN2Zz4=)");
        assert!(!html.contains("<img"));
        let html = render("see ![x](javascript:alert(1)) here");
        assert!(!html.contains("<img"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render("<img src=x onerror=alert(1)>");
        assert!(!html.contains("<img"));
        assert_eq!(html, "<p>&lt;img src=x onerror=alert(<span class=\"number\">1</span>)&gt;</p>");

        let html = render("<script>alert('x')</script>");
        assert!(!html.contains("<script"));
    }

    #[test]
    fn link_attributes() {
        assert_eq!(
            render("[site](https://x.com/?a=1&b=\"2\")"),
            "<p><a href=\"https://x.com/?a=1&amp;b=&quot;2&quot;\" target=\"_blank\" rel=\"noopener noreferrer\">site</a></p>"
        );

        let mut config = Config::default();
        config.links.new_tab = false;
        assert_eq!(
            render_with_config("[docs](/docs)", &config),
            "<p><a href=\"/docs\">docs</a></p>"
        );
    }

    #[test]
    fn mentions_hashtags_numbers() {
        assert_eq!(
            render("@ana hit 120% of #q3 target, 2.5k users"),
            "<p><span class=\"mention\">@ana</span> hit \
             <span class=\"number number-percent\">120%</span> of \
             <span class=\"hashtag\">#q3</span> target, \
             <span class=\"number number-magnitude\">2.5k</span> users</p>"
        );
    }

    #[test]
    fn hashtag_and_mention_boundaries() {
        assert_eq!(
            render("see #3 now"),
            "<p>see <span class=\"hashtag\">#3</span> now</p>"
        );
        assert_eq!(
            render("user@host"),
            "<p>user<span class=\"mention\">@host</span></p>"
        );
    }

    #[test]
    fn end_to_end_message() {
        let html = render(
            "# Title\n\nSome **bold** and *italic* text with a [link](https://x.com) and `code`.",
        );
        assert_eq!(
            html,
            "<h1 class=\"heading-1\">Title</h1>\n\
             <p>Some <strong>bold</strong> and <em>italic</em> text with a \
             <a href=\"https://x.com\" target=\"_blank\" rel=\"noopener noreferrer\">link</a> \
             and <code>code</code>.</p>"
        );

        let order: Vec<usize> = ["<h1", "<strong>", "<em>", "<a href=\"https://x.com\"", "<code>"]
            .iter()
            .map(|tag| html.find(tag).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(!html.contains('*'));
        assert!(!html.contains('`'));
    }

    #[test]
    fn unclosed_link_runs_render_in_linear_time() {
        use std::time::{Duration, Instant};

        for unit in ["[a](", "![a]("] {
            let input = unit.repeat(10_000);
            let start = Instant::now();
            let html = render(&input);
            let elapsed = start.elapsed();
            assert_eq!(html, format!("<p>{input}</p>"));
            // quadratic rescanning takes several seconds at this size
            assert!(elapsed < Duration::from_secs(1), "{unit:?} took {elapsed:?}");
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = "## Plan\n- **ship** it @team\n- check 40% #kpi\n\n```\n*raw*\n```";
        assert_eq!(render(input), render(input));
    }
}
