use std::ops::Range;

use indexmap::IndexMap;
use tracing::debug;

use crate::grid::{Grid, Position};
use crate::model::{DataRow, TableLayout};
use crate::options::{ParseOptions, ValuePolicy};

/// A data value and whether it came from a span opened in an earlier row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledValue {
    pub text: String,
    pub inherited: bool,
}

/// Reads the value of `row` across grid columns `cols`.
///
/// Covered positions resolve to their origin and each origin is read once,
/// so a span never repeats its own text.
#[must_use]
pub fn extract_value(
    grid: &Grid,
    row: usize,
    cols: Range<usize>,
    policy: ValuePolicy,
    separator: &str,
) -> FilledValue {
    let mut origins: Vec<Position> = Vec::new();
    for origin in cols.filter_map(|col| grid.origin(row, col)) {
        if !origins.contains(&origin) {
            origins.push(origin);
        }
    }

    let inherited = !origins.is_empty() && origins.iter().all(|origin| origin.row < row);
    let values = origins
        .iter()
        .map(|origin| grid.label(origin.row, origin.col))
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>();

    let text = match policy {
        ValuePolicy::FirstNonEmpty => values.first().copied().unwrap_or_default().to_string(),
        ValuePolicy::LastNonEmpty => values.last().copied().unwrap_or_default().to_string(),
        ValuePolicy::Concat => values.join(separator),
    };

    FilledValue { text, inherited }
}

/// Turns the data region of one table into rows keyed by column.
#[must_use]
pub fn materialize_rows(layout: &TableLayout, options: &ParseOptions) -> Vec<DataRow> {
    let grid = &layout.raw.grid;
    let mut rows = Vec::new();
    let mut dropped = 0_usize;

    for row in layout.header_depth..grid.height() {
        let divider = grid.is_divider(row);
        let mut values = IndexMap::with_capacity(layout.columns.len());
        let mut inherited = Vec::with_capacity(layout.columns.len());

        for column in &layout.columns {
            let value = if divider {
                FilledValue {
                    text: String::new(),
                    inherited: false,
                }
            } else {
                extract_value(
                    grid,
                    row,
                    column.span.clone(),
                    options.value_policy,
                    &options.concat_separator,
                )
            };
            values.insert(column.column.key.clone(), value.text);
            inherited.push(value.inherited);
        }

        let data_row = DataRow {
            source_row: row,
            values,
            inherited,
            divider,
        };
        if !options.keep_dividers && data_row.is_blank() {
            dropped += 1;
            continue;
        }
        rows.push(data_row);
    }

    if dropped > 0 {
        debug!(table = %layout.raw.id, dropped, "dropped blank data rows");
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::{extract_value, materialize_rows};
    use crate::cell::RawCell;
    use crate::grid::{Grid, GridBuilder};
    use crate::header::build_columns;
    use crate::model::{RawTable, TableLayout};
    use crate::options::{KeyStyle, ParseOptions, ValuePolicy};

    fn grid(rows: Vec<Vec<RawCell>>) -> Grid {
        let mut builder = GridBuilder::new("t");
        for row in rows {
            if row.is_empty() {
                builder.push_divider(None);
            } else {
                builder.push_row(row, None);
            }
        }
        builder.finish().0
    }

    fn layout(grid: Grid, depth: usize) -> TableLayout {
        let columns = build_columns(&grid, depth, KeyStyle::FullPath);
        TableLayout {
            raw: RawTable {
                id: "表t".to_string(),
                name: "表t".to_string(),
                caption: None,
                grid,
                source_index: 0,
            },
            header_depth: depth,
            columns,
        }
    }

    #[test]
    fn policies_pick_from_distinct_spanned_values() {
        let grid = grid(vec![
            vec![RawCell::new("h").with_span(1, 3)],
            vec![RawCell::new("a"), RawCell::new(""), RawCell::new("c")],
        ]);

        let first = extract_value(&grid, 1, 0..3, ValuePolicy::FirstNonEmpty, "/");
        let last = extract_value(&grid, 1, 0..3, ValuePolicy::LastNonEmpty, "/");
        let concat = extract_value(&grid, 1, 0..3, ValuePolicy::Concat, "/");
        assert_eq!(first.text, "a");
        assert_eq!(last.text, "c");
        assert_eq!(concat.text, "a/c");
    }

    #[test]
    fn spanned_value_is_not_repeated() {
        let grid = grid(vec![
            vec![RawCell::new("h").with_span(1, 2)],
            vec![RawCell::new("X").with_span(2, 2)],
            vec![],
        ]);

        let own = extract_value(&grid, 1, 0..2, ValuePolicy::Concat, "/");
        assert_eq!(own.text, "X");
        assert!(!own.inherited);

        let covered = extract_value(&grid, 2, 0..2, ValuePolicy::Concat, "/");
        assert_eq!(covered.text, "X");
        assert!(covered.inherited);
    }

    #[test]
    fn blank_rows_follow_divider_policy() {
        let table = layout(
            grid(vec![
                vec![RawCell::new("A"), RawCell::new("B")],
                vec![RawCell::new("1"), RawCell::new("2")],
                vec![],
                vec![RawCell::new(""), RawCell::new("")],
                vec![RawCell::new("3"), RawCell::new("4")],
            ]),
            1,
        );

        let dropped = materialize_rows(&table, &ParseOptions::default());
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[1].get("A"), Some("3"));

        let kept = materialize_rows(
            &table,
            &ParseOptions {
                keep_dividers: true,
                ..ParseOptions::default()
            },
        );
        assert_eq!(kept.len(), 4);
        assert!(kept[1].divider);
        assert_eq!(kept[1].get("B"), Some(""));
        assert!(!kept[2].divider);
        assert!(kept[2].is_blank());
    }
}
