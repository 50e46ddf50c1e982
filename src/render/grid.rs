use std::collections::HashSet;
use std::io;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::assemble::sanitize_name;
use crate::error::TableError;
use crate::model::LogicalTable;

const SHEET_NAME_LIMIT: usize = 31;
const FALLBACK_SHEET_NAME: &str = "Sheet";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GridStyle {
    /// Every row carries its full values.
    #[default]
    Flattened,
    /// Values continued from a vertical span are left blank, as in the source layout.
    Restored,
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// One unique, spreadsheet-safe name per table.
#[must_use]
pub fn sheet_names(tables: &[LogicalTable]) -> Vec<String> {
    let mut used = HashSet::new();
    tables
        .iter()
        .map(|table| {
            let mut base = truncate_chars(&sanitize_name(&table.name), SHEET_NAME_LIMIT);
            if base.is_empty() {
                base = FALLBACK_SHEET_NAME.to_string();
            }
            if used.insert(base.clone()) {
                return base;
            }

            let mut suffix = 2_usize;
            loop {
                let tail = format!("_{suffix}");
                let head = truncate_chars(&base, SHEET_NAME_LIMIT - tail.chars().count());
                let candidate = format!("{head}{tail}");
                if used.insert(candidate.clone()) {
                    return candidate;
                }
                suffix += 1;
            }
        })
        .collect()
}

/// Header records where a label is written only where its run of equal
/// path prefixes starts, so the rows read like merged header cells.
fn header_records(table: &LogicalTable) -> Vec<Vec<String>> {
    let depth = table
        .columns
        .iter()
        .map(|column| column.path.len())
        .max()
        .unwrap_or(0);

    (0..depth)
        .map(|level| {
            table
                .columns
                .iter()
                .enumerate()
                .map(|(index, column)| {
                    let Some(label) = column.path.get(level) else {
                        return String::new();
                    };
                    let continues = index
                        .checked_sub(1)
                        .and_then(|previous| table.columns.get(previous))
                        .is_some_and(|previous| {
                            previous.path.len() > level
                                && previous.path[..=level] == column.path[..=level]
                        });
                    if continues {
                        String::new()
                    } else {
                        label.clone()
                    }
                })
                .collect()
        })
        .collect()
}

fn write_blocks<W: io::Write>(
    writer: &mut Writer<W>,
    tables: &[LogicalTable],
    style: GridStyle,
) -> Result<(), TableError> {
    for (table, sheet) in tables.iter().zip(sheet_names(tables)) {
        writer.write_record([sheet.as_str()])?;
        for record in header_records(table) {
            writer.write_record(&record)?;
        }

        for row in &table.rows {
            let record = table.columns.iter().enumerate().map(|(index, column)| {
                let inherited = row.inherited.get(index).copied().unwrap_or(false);
                if style == GridStyle::Restored && inherited {
                    ""
                } else {
                    row.get(&column.key).unwrap_or_default()
                }
            });
            writer.write_record(record)?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_grid_csv(
    path: &Path,
    tables: &[LogicalTable],
    style: GridStyle,
    delimiter: u8,
) -> Result<(), TableError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    write_blocks(&mut writer, tables, style)
}

pub fn grid_to_string(
    tables: &[LogicalTable],
    style: GridStyle,
    delimiter: u8,
) -> Result<String, TableError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::<u8>::new());
    write_blocks(&mut writer, tables, style)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| TableError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| TableError::InvalidOption(format!("invalid utf-8 grid output: {error}")))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{GridStyle, grid_to_string, sheet_names};
    use crate::model::{Column, DataRow, LogicalTable};

    fn table(name: &str) -> LogicalTable {
        let row = |values: [&str; 3], inherited: Vec<bool>| DataRow {
            source_row: 2,
            values: ["区分", "A_B", "A_C"]
                .iter()
                .zip(values)
                .map(|(key, value)| ((*key).to_string(), value.to_string()))
                .collect::<IndexMap<_, _>>(),
            inherited,
            divider: false,
        };
        LogicalTable {
            id: "表1".to_string(),
            name: name.to_string(),
            caption: None,
            header_depth: 2,
            columns: vec![
                Column::data(vec!["区分".to_string()], "区分"),
                Column::data(vec!["A".to_string(), "B".to_string()], "A_B"),
                Column::data(vec!["A".to_string(), "C".to_string()], "A_C"),
            ],
            rows: vec![
                row(["X", "1", "2"], vec![false, false, false]),
                row(["X", "3", "4"], vec![true, false, false]),
            ],
            sources: vec!["表1".to_string()],
        }
    }

    #[test]
    fn writes_merged_looking_headers_and_restores_spans() {
        let csv = grid_to_string(&[table("表1")], GridStyle::Restored, b',').expect("writes");
        assert_eq!(csv, "表1\n区分,A,\n,B,C\nX,1,2\n,3,4\n");
    }

    #[test]
    fn flattened_style_repeats_inherited_values() {
        let csv = grid_to_string(&[table("表1")], GridStyle::Flattened, b';').expect("writes");
        assert!(csv.ends_with("X;1;2\nX;3;4\n"));
    }

    #[test]
    fn sheet_names_are_sanitized_truncated_and_unique() {
        let long = "表".repeat(40);
        let names = sheet_names(&[table(&long), table(&long), table("a/b"), table("")]);

        assert_eq!(names[0].chars().count(), 31);
        assert_eq!(names[1].chars().count(), 31);
        assert!(names[1].ends_with("_2"));
        assert_eq!(names[2], "a b");
        assert_eq!(names[3], "Sheet");
    }
}
