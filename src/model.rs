use std::ops::Range;

use indexmap::IndexMap;

use crate::grid::Grid;

/// One table as it appeared in the source, before any merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub id: String,
    pub name: String,
    pub caption: Option<String>,
    pub grid: Grid,
    pub source_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Data,
    Classification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Header labels, outermost first.
    pub path: Vec<String>,
    pub key: String,
    pub kind: ColumnKind,
}

impl Column {
    #[must_use]
    pub fn data(path: Vec<String>, key: impl Into<String>) -> Self {
        Self {
            path,
            key: key.into(),
            kind: ColumnKind::Data,
        }
    }
}

/// A logical column and the grid columns it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub column: Column,
    pub span: Range<usize>,
}

/// A raw table after header analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub raw: RawTable,
    pub header_depth: usize,
    pub columns: Vec<ColumnLayout>,
}

impl TableLayout {
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|layout| layout.column.key.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    /// Grid row the values were read from, within the first fragment.
    pub source_row: usize,
    pub values: IndexMap<String, String>,
    /// Per column, in column order: the value came from a span opened in an earlier row.
    pub inherited: Vec<bool>,
    pub divider: bool,
}

impl DataRow {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|value| value.trim().is_empty())
    }
}

/// The finalized table handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalTable {
    pub id: String,
    pub name: String,
    pub caption: Option<String>,
    pub header_depth: usize,
    pub columns: Vec<Column>,
    pub rows: Vec<DataRow>,
    /// Ids of the raw tables merged into this one, in source order.
    pub sources: Vec<String>,
}

impl LogicalTable {
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.key.as_str()).collect()
    }

    #[must_use]
    pub fn classification(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.kind == ColumnKind::Classification)
    }

    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|column| column.kind == ColumnKind::Data)
    }
}
