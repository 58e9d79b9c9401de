//! Brace-depth segmenter for JavaScript sources.
//!
//! The scanner is a small tagged-state machine: a brace depth counter plus a
//! [`ScanMode`] saying whether the cursor sits in code, a string literal, a
//! line comment or a block comment. Braces and semicolons only count in code
//! mode, so `"{"`, `` `${x}` ``, `// }` and `/* ; */` never move a boundary.
//!
//! Boundaries are cut at the outermost block only:
//! - `{` that brings the depth to 1 closes the chunk (the `{` included);
//! - `}` that brings the depth back to 1 closes the chunk (the `}` included);
//! - `;` at depth 1 closes the chunk.
//!
//! `/*` is consumed as a pair, so the `*` of an opener never doubles as the
//! start of `*/`: `/*/` opens a block comment and leaves it open, as in
//! JavaScript itself.
//!
//! Anything left at end of input becomes the last chunk. Unbalanced input is
//! not an error; [`Segments::report`] tells the caller how the scan ended.

use std::iter::{FusedIterator, Peekable};
use std::str::CharIndices;

/// Quote character that opened a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Single,
    Backtick,
}

impl Quote {
    const fn from_char(c: char) -> Option<Self> {
        match c {
            '"' => Some(Self::Double),
            '\'' => Some(Self::Single),
            '`' => Some(Self::Backtick),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
            Self::Backtick => '`',
        }
    }
}

/// Lexical context of the scanner cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanMode {
    #[default]
    Code,
    String(Quote),
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    depth: isize,
    mode: ScanMode,
    /// Consecutive backslashes immediately before the current character.
    backslashes: usize,
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Brace depth at end of input (negative after stray `}`)
    pub final_depth: isize,
    /// Mode at end of input
    pub final_mode: ScanMode,
}

impl ScanReport {
    /// String literal or block comment still open at end of input.
    ///
    /// A line comment on the last line needs no newline to end, so it does not count.
    #[must_use]
    pub const fn unterminated(&self) -> Option<ScanMode> {
        match self.final_mode {
            ScanMode::String(_) | ScanMode::BlockComment => Some(self.final_mode),
            ScanMode::Code | ScanMode::LineComment => None,
        }
    }

    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.final_depth == 0 && self.unterminated().is_none()
    }
}

/// Lazy iterator over the trimmed, non-empty chunks of one source text.
///
/// Holds no state beyond the text it borrows, so calling [`segment`] again
/// restarts the scan from scratch.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    state: ScanState,
    chunk_start: usize,
    flushed: bool,
}

/// Segment `source` into top-level chunks
#[must_use]
pub fn segment(source: &str) -> Segments<'_> {
    Segments {
        source,
        chars: source.char_indices().peekable(),
        state: ScanState::default(),
        chunk_start: 0,
        flushed: false,
    }
}

/// Segment `source` eagerly and report how the scan ended
#[must_use]
pub fn segment_with_report(source: &str) -> (Vec<&str>, ScanReport) {
    let mut segments = segment(source);
    let chunks: Vec<&str> = segments.by_ref().collect();
    (chunks, segments.report())
}

impl<'a> Segments<'a> {
    /// State of the scan so far; final once the iterator is exhausted.
    #[must_use]
    pub const fn report(&self) -> ScanReport {
        ScanReport {
            final_depth: self.state.depth,
            final_mode: self.state.mode,
        }
    }

    fn next_is(&mut self, expected: char) -> bool {
        self.chars.peek().is_some_and(|&(_, c)| c == expected)
    }

    /// Consume the look-ahead character as part of a two-character token.
    fn consume_pair(&mut self) {
        self.chars.next();
        self.state.backslashes = 0;
    }

    /// Advance over one character; returns the end offset of a finished chunk.
    fn step(&mut self, offset: usize, c: char) -> Option<usize> {
        let escaped = self.state.backslashes % 2 == 1;
        self.state.backslashes = if c == '\\' {
            self.state.backslashes + 1
        } else {
            0
        };

        match self.state.mode {
            ScanMode::String(quote) => {
                if c == quote.as_char() && !escaped {
                    self.state.mode = ScanMode::Code;
                }
                None
            }
            ScanMode::LineComment => {
                if c == '\n' {
                    self.state.mode = ScanMode::Code;
                }
                None
            }
            ScanMode::BlockComment => {
                if c == '*' && self.next_is('/') {
                    self.consume_pair();
                    self.state.mode = ScanMode::Code;
                }
                None
            }
            ScanMode::Code => self.step_code(c, offset + c.len_utf8()),
        }
    }

    fn step_code(&mut self, c: char, end: usize) -> Option<usize> {
        if let Some(quote) = Quote::from_char(c) {
            self.state.mode = ScanMode::String(quote);
            return None;
        }

        match c {
            '/' if self.next_is('/') => {
                self.consume_pair();
                self.state.mode = ScanMode::LineComment;
                None
            }
            '/' if self.next_is('*') => {
                self.consume_pair();
                self.state.mode = ScanMode::BlockComment;
                None
            }
            '{' => {
                self.state.depth += 1;
                (self.state.depth == 1).then_some(end)
            }
            '}' => {
                self.state.depth -= 1;
                (self.state.depth == 1).then_some(end)
            }
            ';' if self.state.depth == 1 => Some(end),
            _ => None,
        }
    }

    fn take_until(&mut self, end: usize) -> Option<&'a str> {
        let source: &'a str = self.source;
        let text = source[self.chunk_start..end].trim();
        self.chunk_start = end;
        (!text.is_empty()).then_some(text)
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((offset, c)) = self.chars.next() {
            if let Some(end) = self.step(offset, c) {
                if let Some(chunk) = self.take_until(end) {
                    return Some(chunk);
                }
            }
        }

        if self.flushed {
            return None;
        }
        self.flushed = true;
        self.take_until(self.source.len())
    }
}

impl FusedIterator for Segments<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn chunks(source: &str) -> Vec<&str> {
        segment(source).collect()
    }

    #[test]
    fn class_members_become_separate_chunks() {
        let code = "class X {\n  foo() { return 1; }\n  bar() { return 2; }\n}";
        let (out, report) = segment_with_report(code);

        assert_eq!(
            out,
            vec![
                "class X {",
                "foo() { return 1; }",
                "bar() { return 2; }",
                "}"
            ]
        );
        assert!(report.is_balanced());
    }

    #[test]
    fn semicolons_split_only_at_depth_one() {
        let code = "const a = 1;\nclass Q {\n  static size = 3;\n  cell() { let x = 1; return x; }\n}\nexport default Q;";
        assert_eq!(
            chunks(code),
            vec![
                "const a = 1;\nclass Q {",
                "static size = 3;",
                "cell() { let x = 1; return x; }",
                "}\nexport default Q;"
            ]
        );
    }

    #[test]
    fn nested_bodies_stay_whole() {
        let code = "class A {\n  m() {\n    if (x) { y(); }\n    return { a: 1 };\n  }\n}";
        assert_eq!(
            chunks(code),
            vec![
                "class A {",
                "m() {\n    if (x) { y(); }\n    return { a: 1 };\n  }",
                "}"
            ]
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let code = "class S {\n  a() { return \"{ not a brace }\"; }\n  b() { return 'x;}'; }\n}";
        assert_eq!(
            chunks(code),
            vec![
                "class S {",
                "a() { return \"{ not a brace }\"; }",
                "b() { return 'x;}'; }",
                "}"
            ]
        );
    }

    #[test]
    fn template_literals_are_strings() {
        let code = "class T {\n  t() { return `template { literal }`; }\n}";
        assert_eq!(
            chunks(code),
            vec!["class T {", "t() { return `template { literal }`; }", "}"]
        );
    }

    #[test]
    fn comments_hide_braces_and_semicolons() {
        let code = "// comment { ignored }\nclass C {\n  /* block { ignored } ; */\n  x = 1; // trailing ; }\n}";
        assert_eq!(
            chunks(code),
            vec![
                "// comment { ignored }\nclass C {",
                "/* block { ignored } ; */\n  x = 1;",
                "// trailing ; }\n}"
            ]
        );
    }

    #[test]
    fn jsdoc_stays_attached_to_its_method() {
        let code = "class Q {\n  /**\n   * Fills a cell; returns this.\n   */\n  fill(row, col) { return this; }\n}";
        assert_eq!(
            chunks(code),
            vec![
                "class Q {",
                "/**\n   * Fills a cell; returns this.\n   */\n  fill(row, col) { return this; }",
                "}"
            ]
        );
    }

    #[test]
    fn escaped_quote_keeps_string_open() {
        let code = r#"class E { a = "a \" b { c"; b = 2; }"#;
        assert_eq!(
            chunks(code),
            vec!["class E {", r#"a = "a \" b { c";"#, "b = 2;", "}"]
        );
    }

    #[test]
    fn even_backslash_run_closes_string() {
        // "a\\" is a complete string: the backslash escapes the other backslash.
        let code = r#"class E { a = "a\\"; b = 2; }"#;
        let (out, report) = segment_with_report(code);
        assert_eq!(out, vec!["class E {", r#"a = "a\\";"#, "b = 2;", "}"]);
        assert!(report.is_balanced());
    }

    #[test]
    fn other_quote_kinds_do_not_close_string() {
        let code = r#"class E { a = "it's {"; }"#;
        assert_eq!(chunks(code), vec!["class E {", r#"a = "it's {";"#, "}"]);
    }

    #[test]
    fn block_comment_opener_is_not_reused_as_closer() {
        let code = "class B { /*/ ; { */ x = 1; }";
        let (out, report) = segment_with_report(code);
        assert_eq!(out, vec!["class B {", "/*/ ; { */ x = 1;", "}"]);
        assert!(report.is_balanced());
    }

    #[test]
    fn unterminated_string_reports_and_flushes() {
        let code = "class U {\n  a = \"oops { ;\n}";
        let (out, report) = segment_with_report(code);
        assert_eq!(out, vec!["class U {", "a = \"oops { ;\n}"]);
        assert_eq!(report.final_depth, 1);
        assert_eq!(report.unterminated(), Some(ScanMode::String(Quote::Double)));
        assert!(!report.is_balanced());
    }

    #[test]
    fn slash_star_slash_leaves_block_comment_open() {
        let (out, report) = segment_with_report("class B { /*/ x = 1; }");
        assert_eq!(out, vec!["class B {", "/*/ x = 1; }"]);
        assert_eq!(report.final_mode, ScanMode::BlockComment);
        assert_eq!(report.final_depth, 1);
    }

    #[test]
    fn unterminated_block_comment_reports() {
        let (_, report) = segment_with_report("x(); /* never closed {");
        assert_eq!(report.unterminated(), Some(ScanMode::BlockComment));
        assert_eq!(report.final_depth, 0);
    }

    #[test]
    fn trailing_line_comment_is_not_unterminated() {
        let (out, report) = segment_with_report("run(); // done");
        assert_eq!(out, vec!["run(); // done"]);
        assert!(report.is_balanced());
    }

    #[test]
    fn stray_closing_braces_do_not_fail() {
        let (out, report) = segment_with_report("} } a; {");
        assert_eq!(out, vec!["} } a; {"]);
        assert_eq!(report.final_depth, -1);
    }

    #[test]
    fn object_literal_at_top_level_opens_a_chunk() {
        let code = "const cfg = { a: 1, b: { c: 2 } };";
        assert_eq!(chunks(code), vec!["const cfg = {", "a: 1, b: { c: 2 }", "};"]);
    }

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        assert!(chunks("").is_empty());
        assert!(chunks(" \n\t ").is_empty());
        assert!(chunks("class A {\n\n}").iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let code = "class Ü {\n  ñ() { return \"→{\"; }\n}";
        assert_eq!(
            chunks(code),
            vec!["class Ü {", "ñ() { return \"→{\"; }", "}"]
        );
    }

    #[test]
    fn rescanning_restarts_from_scratch() {
        let code = "class R {\n  a() {}\n}";
        let first: Vec<&str> = segment(code).collect();
        let second: Vec<&str> = segment(code).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn iterator_is_fused() {
        let mut it = segment("a;");
        assert_eq!(it.next(), Some("a;"));
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    proptest! {
        #[test]
        fn chunks_preserve_non_whitespace_order(source in "[a-z{};\"'`/*\\\\ \n]{0,80}") {
            let joined: String = segment(&source).collect::<Vec<_>>().concat();
            prop_assert_eq!(non_whitespace(&joined), non_whitespace(&source));
        }

        #[test]
        fn chunks_are_trimmed_and_non_empty(source in "[a-z{};\"/* \n]{0,80}") {
            for chunk in segment(&source) {
                prop_assert!(!chunk.is_empty());
                prop_assert_eq!(chunk, chunk.trim());
            }
        }

        #[test]
        fn quoted_payload_never_splits(payload in "[a-z{};/* ]{0,20}") {
            let code = format!("class P {{ a = \"{payload}\"; }}");
            let out: Vec<&str> = segment(&code).collect();
            let expected = format!("a = \"{payload}\";");
            prop_assert_eq!(out, vec!["class P {", expected.as_str(), "}"]);
        }

        #[test]
        fn block_commented_payload_never_splits(payload in "[a-z{}; ]{0,20}") {
            let code = format!("class P {{ /*{payload}*/ b = 1; }}");
            let (out, report) = segment_with_report(&code);
            let expected = format!("/*{payload}*/ b = 1;");
            prop_assert_eq!(out, vec!["class P {", expected.as_str(), "}"]);
            prop_assert!(report.is_balanced());
        }
    }
}
