use once_cell::sync::Lazy;
use regex::Regex;

/// Tag fragment used by the source documents to shade header cells.
pub(crate) const HEADER_SHADING_MARKER: &str = "こ色";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    pub text: String,
    pub rowspan: usize,
    pub colspan: usize,
    pub is_header: bool,
}

impl RawCell {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rowspan: 1,
            colspan: 1,
            is_header: false,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    #[must_use]
    pub fn with_span(mut self, rowspan: usize, colspan: usize) -> Self {
        self.rowspan = rowspan.max(1);
        self.colspan = colspan.max(1);
        self
    }

    #[must_use]
    pub fn header(mut self) -> Self {
        self.is_header = true;
        self
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An attribute value the cell parser could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeIssue {
    pub attribute: &'static str,
    pub value: String,
}

static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("hardcoded inline tag regex is valid"));

/// Replaces `<KG>` with ` / `, drops every other `<...>` tag and collapses whitespace.
#[must_use]
pub fn strip_inline_tags(text: &str) -> String {
    let replaced = text.replace("<KG>", " / ");
    INLINE_TAG
        .replace_all(&replaced, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_span_value(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|value| *value >= 1)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) struct CellParser {
    span_code: Regex,
    span_shape: Regex,
    keyed: Regex,
}

impl CellParser {
    pub(crate) fn new() -> Self {
        Self {
            span_code: Regex::new(r"＝[CT](\d+)_[CT](\d+)")
                .expect("hardcoded span code regex is valid"),
            span_shape: Regex::new(r"＝[CT][^_\s]*_[CT]\S*")
                .expect("hardcoded span shape regex is valid"),
            keyed: Regex::new(r"(?i)(rowspan|colspan|header)\s*=\s*([^\s,;_]*)")
                .expect("hardcoded cell attribute regex is valid"),
        }
    }

    /// Builds a cell from the attribute part of a `G...` tag and the text after it.
    pub(crate) fn parse(&self, tag: &str, content: &str) -> (RawCell, Vec<AttributeIssue>) {
        let mut cell = RawCell::new(strip_inline_tags(content));
        let mut issues = Vec::new();

        if let Some(capture) = self.span_code.captures(tag) {
            match (parse_span_value(&capture[1]), parse_span_value(&capture[2])) {
                (Some(rowspan), Some(colspan)) => {
                    cell.rowspan = rowspan;
                    cell.colspan = colspan;
                }
                (rowspan, colspan) => {
                    cell.rowspan = rowspan.unwrap_or(1);
                    cell.colspan = colspan.unwrap_or(1);
                    issues.push(AttributeIssue {
                        attribute: "span",
                        value: capture[0].to_string(),
                    });
                }
            }
        } else if let Some(fragment) = self.span_shape.find(tag) {
            issues.push(AttributeIssue {
                attribute: "span",
                value: fragment.as_str().to_string(),
            });
        }

        if tag.contains(HEADER_SHADING_MARKER) {
            cell.is_header = true;
        }

        for capture in self.keyed.captures_iter(tag) {
            let value = &capture[2];
            match capture[1].to_ascii_lowercase().as_str() {
                "rowspan" => match parse_span_value(value) {
                    Some(rowspan) => cell.rowspan = rowspan,
                    None => {
                        cell.rowspan = 1;
                        issues.push(AttributeIssue {
                            attribute: "rowspan",
                            value: value.to_string(),
                        });
                    }
                },
                "colspan" => match parse_span_value(value) {
                    Some(colspan) => cell.colspan = colspan,
                    None => {
                        cell.colspan = 1;
                        issues.push(AttributeIssue {
                            attribute: "colspan",
                            value: value.to_string(),
                        });
                    }
                },
                _ => match parse_flag(value) {
                    Some(flag) => cell.is_header = flag,
                    None => issues.push(AttributeIssue {
                        attribute: "header",
                        value: value.to_string(),
                    }),
                },
            }
        }

        (cell, issues)
    }
}
