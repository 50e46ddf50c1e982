use std::fmt;
use std::str::FromStr;

use crate::error::TableError;

pub const DEFAULT_CONCAT_SEPARATOR: &str = " / ";
pub const DEFAULT_CLASSIFICATION_KEY: &str = "分類";

/// How a logical column that covers several source cells picks its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePolicy {
    FirstNonEmpty,
    LastNonEmpty,
    Concat,
}

impl ValuePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstNonEmpty => "first_nonempty",
            Self::LastNonEmpty => "last_nonempty",
            Self::Concat => "concat",
        }
    }
}

impl fmt::Display for ValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValuePolicy {
    type Err = TableError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_nonempty" => Ok(Self::FirstNonEmpty),
            "last_nonempty" => Ok(Self::LastNonEmpty),
            "concat" => Ok(Self::Concat),
            _ => Err(TableError::UnknownValuePolicy(value.to_string())),
        }
    }
}

/// Where column key derivation starts on the header path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// Join every label of the path, outermost first.
    FullPath,
    /// Start from the deepest label and add shallower labels only on collision.
    Leaf,
}

impl FromStr for KeyStyle {
    type Err = TableError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full-path" | "full" => Ok(Self::FullPath),
            "leaf" => Ok(Self::Leaf),
            _ => Err(TableError::UnknownKeyStyle(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Manual header depth; `None` runs the heuristic.
    pub header_depth: Option<usize>,
    pub value_policy: ValuePolicy,
    pub concat_separator: String,
    pub add_classification: bool,
    pub classification_key: String,
    /// Grid column inspected by the classification extractor.
    pub classification_column: usize,
    pub keep_dividers: bool,
    /// Toggles both vertical and horizontal merging.
    pub merge_tables: bool,
    pub key_style: KeyStyle,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            header_depth: None,
            value_policy: ValuePolicy::Concat,
            concat_separator: DEFAULT_CONCAT_SEPARATOR.to_string(),
            add_classification: false,
            classification_key: DEFAULT_CLASSIFICATION_KEY.to_string(),
            classification_column: 0,
            keep_dividers: false,
            merge_tables: true,
            key_style: KeyStyle::FullPath,
        }
    }
}

impl ParseOptions {
    /// Rejects configurations that must never reach the tokenizer.
    pub fn validate(&self) -> Result<(), TableError> {
        if let Some(depth) = self.header_depth.filter(|depth| *depth < 1) {
            return Err(TableError::InvalidHeaderDepth(depth));
        }

        if self.add_classification && self.classification_key.trim().is_empty() {
            return Err(TableError::InvalidOption(
                "classification key cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
