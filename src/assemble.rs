use tracing::{debug, trace};

use crate::cell::RawCell;
use crate::grid::GridBuilder;
use crate::model::RawTable;
use crate::options::ParseOptions;
use crate::token::{Token, Tokenizer};
use crate::warning::{ParseWarning, WarningCode};

/// Captions containing this name a table; otherwise the table id is used.
const TABLE_NAME_CUE: char = '表';

/// Makes a table name safe to use as a sheet name.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            ':' => '：',
            '\\' | '/' | '*' | '?' | '[' | ']' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn table_name(id: &str, caption: Option<&str>) -> String {
    let name = caption
        .filter(|caption| caption.contains(TABLE_NAME_CUE))
        .unwrap_or(id);
    sanitize_name(name)
}

struct OpenTable {
    id: String,
    name: String,
    caption: Option<String>,
    builder: GridBuilder,
    cells: Vec<RawCell>,
    row_line: Option<usize>,
}

impl OpenTable {
    fn new(id: String, caption: Option<String>) -> Self {
        Self {
            name: table_name(&id, caption.as_deref()),
            builder: GridBuilder::new(id.clone()),
            id,
            caption,
            cells: Vec::new(),
            row_line: None,
        }
    }

    fn push_cell(&mut self, cell: RawCell, line: usize) {
        self.row_line.get_or_insert(line);
        self.cells.push(cell);
    }

    fn flush_row(&mut self, line: usize, keep_dividers: bool) {
        if self.cells.is_empty() {
            if keep_dividers && self.builder.row_count() > 0 {
                self.builder.push_divider(Some(line));
            }
            return;
        }

        let cells = std::mem::take(&mut self.cells);
        let row_line = self.row_line.take();
        self.builder.push_row(cells, row_line);
    }

    fn close(mut self, source_index: usize, warnings: &mut Vec<ParseWarning>) -> RawTable {
        if !self.cells.is_empty() {
            let cells = std::mem::take(&mut self.cells);
            self.builder.push_row(cells, self.row_line.take());
        }

        let (grid, grid_warnings) = self.builder.finish();
        warnings.extend(grid_warnings);
        if grid.is_empty() {
            warnings.push(
                ParseWarning::new(WarningCode::EmptyTable, "table has no rows")
                    .with_table_id(self.id.clone()),
            );
        }
        debug!(
            table = %self.id,
            rows = grid.height(),
            width = grid.width(),
            "assembled table"
        );

        RawTable {
            id: self.id,
            name: self.name,
            caption: self.caption,
            grid,
            source_index,
        }
    }
}

/// Splits the tag stream into raw tables, in document order.
pub(crate) fn assemble_tables(
    text: &str,
    options: &ParseOptions,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<RawTable> {
    let mut tokenizer = Tokenizer::new(text);
    let mut tables = Vec::new();
    let mut caption: Option<String> = None;
    let mut open: Option<OpenTable> = None;

    while let Some(item) = tokenizer.next() {
        match item.token {
            Token::Caption(text) => caption = Some(text),
            Token::TableStart(id) => {
                if let Some(table) = open.take() {
                    tables.push(table.close(tables.len(), warnings));
                }
                open = Some(OpenTable::new(id, caption.clone()));
            }
            Token::RowBreak => {
                if let Some(table) = open.as_mut() {
                    table.flush_row(item.line, options.keep_dividers);
                }
            }
            Token::Cell(cell) => match open.as_mut() {
                Some(table) => table.push_cell(cell, item.line),
                None => warnings.push(
                    ParseWarning::new(
                        WarningCode::CellOutsideTable,
                        "cell appears before any table start; skipped",
                    )
                    .with_line(item.line),
                ),
            },
            Token::PlainText(text) => trace!(line = item.line, %text, "ignoring free text"),
        }
        warnings.extend(tokenizer.take_warnings());
    }

    if let Some(table) = open.take() {
        tables.push(table.close(tables.len(), warnings));
    }
    if tables.is_empty() {
        warnings.push(ParseWarning::new(
            WarningCode::NoTablesDetected,
            "no table start markers were found in the input",
        ));
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::{assemble_tables, sanitize_name};
    use crate::options::ParseOptions;
    use crate::warning::WarningCode;

    #[test]
    fn names_tables_from_captions_that_mention_a_table() {
        let text = "<\"図表ネーム\">表1 主な薬剤\n<\"表1\">\n<\"G\">a\n<\"行\">\n\
                    <\"図表ネーム\">図2 経過\n<\"表2\">\n<\"G\">b\n<\"行\">\n";
        let mut warnings = Vec::new();
        let tables = assemble_tables(text, &ParseOptions::default(), &mut warnings);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "表1 主な薬剤");
        assert_eq!(tables[0].caption.as_deref(), Some("表1 主な薬剤"));
        assert_eq!(tables[1].name, "表2");
        assert_eq!(tables[1].source_index, 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn sanitizes_sheet_hostile_characters() {
        assert_eq!(sanitize_name("表1: A/B [注]"), "表1： A B  注");
    }

    #[test]
    fn empty_rows_become_dividers_only_when_kept() {
        let text = "<\"表1\">\n<\"行\">\n<\"G\">A\n<\"行\">\n<\"行\">\n<\"G\">1\n<\"行\">\n";
        let mut warnings = Vec::new();

        let dropped = assemble_tables(text, &ParseOptions::default(), &mut warnings);
        assert_eq!(dropped[0].grid.height(), 2);

        let options = ParseOptions {
            keep_dividers: true,
            ..ParseOptions::default()
        };
        let kept = assemble_tables(text, &options, &mut warnings);
        assert_eq!(kept[0].grid.height(), 3);
        assert!(kept[0].grid.is_divider(1));
        assert!(!kept[0].grid.is_divider(0));
    }

    #[test]
    fn reports_stray_cells_and_empty_tables() {
        let text = "<\"G\">stray\n<\"表1\">\n<\"表2\">\n<\"G\">x\n";
        let mut warnings = Vec::new();
        let tables = assemble_tables(text, &ParseOptions::default(), &mut warnings);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].grid.height(), 1);
        let codes = warnings.iter().map(|warning| warning.code).collect::<Vec<_>>();
        assert_eq!(codes, vec![WarningCode::CellOutsideTable, WarningCode::EmptyTable]);
        assert_eq!(warnings[0].line, Some(1));
        assert_eq!(warnings[1].table_id.as_deref(), Some("表1"));
    }

    #[test]
    fn input_without_tables_is_reported() {
        let mut warnings = Vec::new();
        let tables = assemble_tables("本文のみ\n", &ParseOptions::default(), &mut warnings);
        assert!(tables.is_empty());
        assert_eq!(warnings[0].code, WarningCode::NoTablesDetected);
    }
}
