//! Line-oriented tokenizer for the table tag grammar.
//!
//! The grammar is fixed: `<"図表ネーム">` captions, `<"表...">` table starts,
//! `<"行...">` row separators and `<"G...">` cells. Any other non-blank line
//! continues the caption or cell right before it, or becomes free text.

use std::iter::{Enumerate, Peekable};
use std::str::Lines;

use regex::Regex;

use crate::cell::{CellParser, RawCell, strip_inline_tags};
use crate::warning::{ParseWarning, WarningCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Caption(String),
    TableStart(String),
    RowBreak,
    Cell(RawCell),
    PlainText(String),
}

/// A token with the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAt {
    pub line: usize,
    pub token: Token,
}

enum LineKind<'a> {
    Blank,
    Caption(&'a str),
    TableStart(&'a str),
    RowBreak,
    Cell { tag: &'a str, content: &'a str },
    Plain(&'a str),
}

struct MarkerPatterns {
    caption: Regex,
    table_start: Regex,
    row: Regex,
    cell: Regex,
}

impl MarkerPatterns {
    fn new() -> Self {
        Self {
            caption: Regex::new(r#"^<"図表ネーム">(.*)$"#).expect("hardcoded caption regex is valid"),
            table_start: Regex::new(r#"^<"(表[^"]*)">$"#)
                .expect("hardcoded table start regex is valid"),
            row: Regex::new(r#"^<"行[^"]*">$"#).expect("hardcoded row regex is valid"),
            cell: Regex::new(r#"^<"(G[^"]*)">(.*)$"#).expect("hardcoded cell regex is valid"),
        }
    }

    fn classify<'a>(&self, raw: &'a str) -> LineKind<'a> {
        let line = raw.trim();
        if line.is_empty() {
            return LineKind::Blank;
        }

        if let Some(capture) = self.caption.captures(line) {
            return LineKind::Caption(capture.get(1).map_or("", |value| value.as_str()));
        }
        if let Some(capture) = self.table_start.captures(line) {
            return LineKind::TableStart(capture.get(1).map_or("", |value| value.as_str()));
        }
        if self.row.is_match(line) {
            return LineKind::RowBreak;
        }
        if let Some(capture) = self.cell.captures(line) {
            return LineKind::Cell {
                tag: capture.get(1).map_or("", |value| value.as_str()),
                content: capture.get(2).map_or("", |value| value.as_str()),
            };
        }

        LineKind::Plain(line)
    }
}

pub struct Tokenizer<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    markers: MarkerPatterns,
    cells: CellParser,
    warnings: Vec<ParseWarning>,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate().peekable(),
            markers: MarkerPatterns::new(),
            cells: CellParser::new(),
            warnings: Vec::new(),
        }
    }

    /// Diagnostics recorded for the tokens yielded so far.
    pub fn take_warnings(&mut self) -> Vec<ParseWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Consumes the plain lines that directly follow an open caption or cell.
    fn continuation(&mut self) -> Vec<&'a str> {
        let mut extra = Vec::new();
        while let Some(&(_, raw)) = self.lines.peek() {
            let LineKind::Plain(text) = self.markers.classify(raw) else {
                break;
            };
            extra.push(text);
            self.lines.next();
        }
        extra
    }
}

fn append_continuation(text: &mut String, extra: &[&str]) {
    for piece in extra {
        let piece = strip_inline_tags(piece);
        if piece.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&piece);
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = TokenAt;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, raw) = self.lines.next()?;
            let line = index + 1;

            let token = match self.markers.classify(raw) {
                LineKind::Blank => continue,
                LineKind::Caption(text) => {
                    let mut caption = strip_inline_tags(text);
                    let extra = self.continuation();
                    append_continuation(&mut caption, &extra);
                    Token::Caption(caption)
                }
                LineKind::TableStart(id) => Token::TableStart(id.to_string()),
                LineKind::RowBreak => Token::RowBreak,
                LineKind::Cell { tag, content } => {
                    let (mut cell, issues) = self.cells.parse(tag, content);
                    for issue in issues {
                        self.warnings.push(
                            ParseWarning::new(
                                WarningCode::MalformedAttribute,
                                format!(
                                    "cell attribute {}='{}' is not usable; falling back to 1",
                                    issue.attribute, issue.value
                                ),
                            )
                            .with_line(line),
                        );
                    }
                    let extra = self.continuation();
                    append_continuation(&mut cell.text, &extra);
                    Token::Cell(cell)
                }
                LineKind::Plain(text) => Token::PlainText(text.to_string()),
            };

            return Some(TokenAt { line, token });
        }
    }
}
