use crate::model::LogicalTable;

const TABLE_PREFIX: char = '表';

fn table_marker(id: &str) -> String {
    let id = id.replace('"', "");
    if id.starts_with(TABLE_PREFIX) {
        id
    } else {
        format!("{TABLE_PREFIX}{id}")
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for cell in cells {
        out.push_str(&format!("<\"G\">{}\n", single_line(cell)));
    }
    out.push_str("<\"行\">\n");
}

/// Writes tables back as a tag stream with one header row of column keys.
#[must_use]
pub fn to_tag_text(tables: &[LogicalTable]) -> String {
    let mut out = String::new();
    for table in tables {
        let caption = table.caption.as_deref().unwrap_or(&table.name);
        out.push_str(&format!("<\"図表ネーム\">{}\n", single_line(caption)));
        out.push_str(&format!("<\"{}\">\n", table_marker(&table.id)));

        push_row(&mut out, table.columns.iter().map(|column| column.key.as_str()));
        for row in &table.rows {
            push_row(
                &mut out,
                table
                    .columns
                    .iter()
                    .map(|column| row.get(&column.key).unwrap_or_default()),
            );
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::to_tag_text;
    use crate::model::{Column, DataRow, LogicalTable};

    #[test]
    fn writes_caption_marker_and_rows() {
        let table = LogicalTable {
            id: "1".to_string(),
            name: "1".to_string(),
            caption: None,
            header_depth: 1,
            columns: vec![Column::data(vec!["名前".to_string()], "名前")],
            rows: vec![DataRow {
                source_row: 1,
                values: IndexMap::from([("名前".to_string(), "a  b".to_string())]),
                inherited: vec![false],
                divider: false,
            }],
            sources: vec!["1".to_string()],
        };

        assert_eq!(
            to_tag_text(&[table]),
            "<\"図表ネーム\">1\n<\"表1\">\n<\"G\">名前\n<\"行\">\n<\"G\">a b\n<\"行\">\n\n"
        );
    }
}
