use std::collections::HashSet;

use tracing::debug;

use crate::classify::attach_classification;
use crate::fill::materialize_rows;
use crate::keys::KeyAllocator;
use crate::model::{Column, ColumnKind, LogicalTable, TableLayout};
use crate::options::ParseOptions;
use crate::warning::{ParseWarning, WarningCode};

/// Groups consecutive layouts whose column keys match exactly.
pub(crate) fn group_vertical(
    layouts: Vec<TableLayout>,
    options: &ParseOptions,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<Vec<TableLayout>> {
    let mut groups: Vec<Vec<TableLayout>> = Vec::new();

    for layout in layouts {
        if !options.merge_tables {
            groups.push(vec![layout]);
            continue;
        }

        let Some(last) = groups.last().and_then(|group| group.last()) else {
            groups.push(vec![layout]);
            continue;
        };

        let previous = last.keys();
        let current = layout.keys();
        if !current.is_empty() && previous == current {
            debug!(
                table = %layout.raw.id,
                into = %last.raw.id,
                "continuation table merged vertically"
            );
            if let Some(group) = groups.last_mut() {
                group.push(layout);
            }
            continue;
        }

        if !current.is_empty() && previous.len() == current.len() {
            warnings.push(
                ParseWarning::new(
                    WarningCode::MergeShapeMismatch,
                    format!(
                        "table has the same width as '{}' but different column keys; kept separate",
                        last.raw.id
                    ),
                )
                .with_table_id(layout.raw.id.clone()),
            );
        }
        groups.push(vec![layout]);
    }

    groups
}

/// Materializes one vertical group into a logical table, rows in source order.
pub(crate) fn concat_group(group: Vec<TableLayout>, options: &ParseOptions) -> LogicalTable {
    let mut columns: Vec<Column> = group
        .first()
        .map(|layout| {
            layout
                .columns
                .iter()
                .map(|column| column.column.clone())
                .collect()
        })
        .unwrap_or_default();

    let mut rows = Vec::new();
    let mut classification = None;
    for layout in &group {
        let mut fragment = materialize_rows(layout, options);
        if options.add_classification && !layout.columns.is_empty() {
            let column = attach_classification(layout, &mut fragment, options);
            classification.get_or_insert(column);
        }
        rows.extend(fragment);
    }
    if let Some(column) = classification {
        columns.insert(0, column);
    }

    let first = group.first();
    LogicalTable {
        id: first.map(|layout| layout.raw.id.clone()).unwrap_or_default(),
        name: first.map(|layout| layout.raw.name.clone()).unwrap_or_default(),
        caption: first.and_then(|layout| layout.raw.caption.clone()),
        header_depth: first.map_or(0, |layout| layout.header_depth),
        columns,
        rows,
        sources: group.iter().map(|layout| layout.raw.id.clone()).collect(),
    }
}

fn header_labels(table: &LogicalTable) -> HashSet<&str> {
    table
        .data_columns()
        .flat_map(|column| column.path.iter().map(String::as_str))
        .collect()
}

fn is_side_by_side(left: &LogicalTable, right: &LogicalTable) -> bool {
    if left.name != right.name
        || left.header_depth != right.header_depth
        || left.data_columns().next().is_none()
        || right.data_columns().next().is_none()
    {
        return false;
    }

    let left_labels = header_labels(left);
    header_labels(right).is_disjoint(&left_labels)
}

/// Appends `right`'s columns to `left`, pairing rows by position.
fn zip_tables(mut left: LogicalTable, right: LogicalTable, options: &ParseOptions) -> LogicalTable {
    let mut keys = KeyAllocator::with_reserved(options.key_style, left.keys());
    let left_classification = left.classification().map(|column| column.key.clone());
    let right_classification = right.classification().map(|column| column.key.clone());

    let mut appended: Vec<(usize, String, String)> = Vec::new();
    for (index, column) in right.columns.iter().enumerate() {
        if column.kind != ColumnKind::Data {
            continue;
        }
        let key = if keys.reserve(&column.key) {
            column.key.clone()
        } else {
            keys.allocate(&column.path)
        };
        appended.push((index, column.key.clone(), key.clone()));
        left.columns.push(Column::data(column.path.clone(), key));
    }

    for (row, other) in left.rows.iter_mut().zip(right.rows) {
        for (index, old_key, new_key) in &appended {
            let value = other.values.get(old_key).cloned().unwrap_or_default();
            row.values.insert(new_key.clone(), value);
            row.inherited
                .push(other.inherited.get(*index).copied().unwrap_or(false));
        }

        if let (Some(left_key), Some(right_key)) = (&left_classification, &right_classification) {
            let blank = row.get(left_key).is_some_and(|value| value.trim().is_empty());
            let label = other.get(right_key).filter(|label| !label.trim().is_empty());
            if let (true, Some(label)) = (blank, label) {
                row.values.insert(left_key.clone(), label.to_string());
            }
        }

        row.divider = row.divider && other.divider;
    }

    left.sources.extend(right.sources);
    left
}

/// Reassembles tables that were split into side-by-side fragments.
///
/// Rows are paired by position only; fragments are never matched by content.
pub(crate) fn merge_horizontal(
    tables: Vec<LogicalTable>,
    options: &ParseOptions,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<LogicalTable> {
    if !options.merge_tables {
        return tables;
    }

    let mut merged: Vec<LogicalTable> = Vec::with_capacity(tables.len());
    for table in tables {
        let Some(last) = merged.last() else {
            merged.push(table);
            continue;
        };

        if !is_side_by_side(last, &table) {
            merged.push(table);
            continue;
        }

        if last.rows.len() != table.rows.len() {
            warnings.push(
                ParseWarning::new(
                    WarningCode::MergeRowCountMismatch,
                    format!(
                        "fragment has {} row(s) but '{}' has {}; kept separate",
                        table.rows.len(),
                        last.id,
                        last.rows.len()
                    ),
                )
                .with_table_id(table.id.clone()),
            );
            merged.push(table);
            continue;
        }

        if let Some(left) = merged.pop() {
            debug!(table = %table.id, into = %left.id, "fragment merged horizontally");
            merged.push(zip_tables(left, table, options));
        }
    }

    merged
}
