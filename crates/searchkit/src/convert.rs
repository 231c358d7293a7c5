//! Readable text extraction from fetched markup

use scraper::{ElementRef, Html, Node};

/// Elements whose entire subtree is dropped
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "template", "nav", "header", "footer",
];

/// Elements that start or end a line of text
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "br",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "tr",
    "ul",
    "ol",
    "table",
    "section",
    "article",
    "main",
    "aside",
    "blockquote",
    "pre",
    "hr",
    "dt",
    "dd",
    "figcaption",
];

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let trimmed = body.trim_start();
    let head: String = trimmed.chars().take(16).collect::<String>().to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Check if content type indicates binary content
pub fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Convert HTML to readable plain text
///
/// Parses the document into a DOM, drops non-content subtrees (scripts,
/// styles, navigation, page header and footer), breaks lines at block
/// elements and collapses the remaining whitespace. Character references
/// are decoded by the parser.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut output = String::with_capacity(html.len() / 2);
    collect_text(document.root_element(), &mut output);
    clean_whitespace(&output)
}

fn collect_text(element: ElementRef<'_>, output: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => output.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if name == "br" {
                    output.push('\n');
                } else if BLOCK_TAGS.contains(&name) {
                    output.push('\n');
                    collect_text(child_ref, output);
                    output.push('\n');
                } else {
                    if matches!(name, "td" | "th") {
                        output.push(' ');
                    }
                    collect_text(child_ref, output);
                }
            }
            _ => {}
        }
    }
}

/// Clean whitespace: collapse runs, trim, keep max 2 newlines
pub fn clean_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            if result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

/// Take a window of `max_length` chars starting at char offset `start`
///
/// Slices on char boundaries so the result is always valid UTF-8.
pub fn char_window(text: &str, start: usize, max_length: usize) -> &str {
    let mut indices = text.char_indices().map(|(i, _)| i);
    let begin = match indices.nth(start) {
        Some(i) => i,
        None => return "",
    };
    let end = text[begin..]
        .char_indices()
        .nth(max_length)
        .map(|(i, _)| begin + i)
        .unwrap_or(text.len());
    &text[begin..end]
}
