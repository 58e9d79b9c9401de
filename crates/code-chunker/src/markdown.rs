use once_cell::sync::Lazy;
use regex::Regex;

static ATX_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S.*$").expect("valid ATX header regex"));

/// A header-delimited section of a Markdown document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownSection<'a> {
    /// Header text without the leading `#` markers
    pub title: &'a str,
    /// Trimmed text between this header and the next one
    pub body: &'a str,
}

/// Split Markdown into sections at ATX headers (`#` through `######`).
///
/// Text before the first header is discarded, as are sections whose body is
/// blank.
#[must_use]
pub fn split_sections(content: &str) -> Vec<MarkdownSection<'_>> {
    let headers: Vec<_> = ATX_HEADER.find_iter(content).collect();
    let mut sections = Vec::with_capacity(headers.len());

    for (i, header) in headers.iter().enumerate() {
        let body_end = headers
            .get(i + 1)
            .map_or(content.len(), |next| next.start());
        let body = content[header.end()..body_end].trim();
        if body.is_empty() {
            continue;
        }
        let title = header.as_str().trim_start_matches('#').trim();
        sections.push(MarkdownSection { title, body });
    }

    sections
}
