mod assemble;
mod cell;
mod classify;
mod error;
mod fill;
mod grid;
mod header;
mod input;
mod keys;
mod merge;
mod model;
mod options;
pub mod render;
mod token;
mod warning;

use std::path::Path;

use tracing::debug;

use crate::assemble::assemble_tables;
use crate::header::analyze_table;
use crate::input::read_input;
use crate::merge::{concat_group, group_vertical, merge_horizontal};
use crate::render::grid::{GridStyle, write_grid_csv};
use crate::render::json::{JsonLayout, to_json_string};

pub use assemble::sanitize_name;
pub use cell::{RawCell, strip_inline_tags};
pub use error::TableError;
pub use fill::{FilledValue, extract_value};
pub use grid::{Grid, GridBuilder, GridRow, Position, Slot, SpanRect};
pub use header::{DepthDecision, HeaderStrategy, HeuristicDepth, ManualDepth, build_columns};
pub use input::decode_input;
pub use keys::{KeyAllocator, derive_keys};
pub use model::{Column, ColumnKind, ColumnLayout, DataRow, LogicalTable, RawTable, TableLayout};
pub use options::{
    DEFAULT_CLASSIFICATION_KEY, DEFAULT_CONCAT_SEPARATOR, KeyStyle, ParseOptions, ValuePolicy,
};
pub use token::{Token, TokenAt, Tokenizer};
pub use warning::{ParseWarning, WarningCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub tables: Vec<LogicalTable>,
    pub warnings: Vec<ParseWarning>,
}

impl ParseReport {
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|table| table.rows.len()).sum()
    }
}

/// Rebuilds every table in a tag stream.
pub fn parse_tables(text: &str, options: &ParseOptions) -> Result<ParseReport, TableError> {
    options.validate()?;

    let mut warnings = Vec::new();
    let raw_tables = assemble_tables(text, options, &mut warnings);
    let layouts = raw_tables
        .into_iter()
        .map(|raw| analyze_table(raw, options, &mut warnings))
        .collect::<Vec<_>>();

    let groups = group_vertical(layouts, options, &mut warnings);
    let tables = groups
        .into_iter()
        .map(|group| concat_group(group, options))
        .collect::<Vec<_>>();
    let tables = merge_horizontal(tables, options, &mut warnings);

    debug!(
        tables = tables.len(),
        warnings = warnings.len(),
        "parsed tag stream"
    );
    Ok(ParseReport { tables, warnings })
}

pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<ParseReport, TableError> {
    options.validate()?;
    let text = decode_input(bytes)?;
    parse_tables(&text, options)
}

pub fn convert_to_json(
    input: &Path,
    output: &Path,
    options: &ParseOptions,
    layout: JsonLayout,
) -> Result<ParseReport, TableError> {
    options.validate()?;
    let text = read_input(input)?;
    let report = parse_tables(&text, options)?;
    let json = to_json_string(&report.tables, layout)?;
    std::fs::write(output, json)?;
    Ok(report)
}

pub fn convert_to_grid(
    input: &Path,
    output: &Path,
    options: &ParseOptions,
    style: GridStyle,
    delimiter: u8,
) -> Result<ParseReport, TableError> {
    options.validate()?;
    let text = read_input(input)?;
    let report = parse_tables(&text, options)?;
    write_grid_csv(output, &report.tables, style, delimiter)?;
    Ok(report)
}
