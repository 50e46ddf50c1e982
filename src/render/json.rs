use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TableError;
use crate::model::{Column, ColumnKind, DataRow, LogicalTable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonLayout {
    /// One object per row, keyed by column key.
    #[default]
    Flat,
    /// Rows nested by header path, grouped by classification when present.
    Nested,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonDocument {
    pub tables: Vec<JsonTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonTable {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub header_depth: usize,
    pub columns: Vec<JsonColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<JsonGroup>>,
    /// Raw table ids, written only when several were merged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonColumn {
    pub path: Vec<String>,
    pub key: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub classification: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonGroup {
    pub label: String,
    pub rows: Vec<Map<String, Value>>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

fn json_column(column: &Column) -> JsonColumn {
    JsonColumn {
        path: column.path.clone(),
        key: column.key.clone(),
        classification: column.kind == ColumnKind::Classification,
    }
}

fn flat_row(table: &LogicalTable, row: &DataRow) -> Map<String, Value> {
    table
        .columns
        .iter()
        .map(|column| {
            let value = row.get(&column.key).unwrap_or_default();
            (column.key.clone(), Value::String(value.to_string()))
        })
        .collect()
}

/// Places `value` under its header path. Returns false when the path clashes
/// with a value already written.
fn insert_path(object: &mut Map<String, Value>, path: &[String], value: &str) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };

    let mut current = object;
    for label in parents {
        let entry = current
            .entry(label.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(next) = entry else {
            return false;
        };
        current = next;
    }

    if current.contains_key(leaf) {
        return false;
    }
    current.insert(leaf.clone(), Value::String(value.to_string()));
    true
}

fn nested_row(table: &LogicalTable, row: &DataRow) -> Map<String, Value> {
    let mut object = Map::new();
    for column in table.data_columns() {
        let value = row.get(&column.key).unwrap_or_default();
        if !insert_path(&mut object, &column.path, value) {
            debug!(table = %table.id, key = %column.key, "header path clashes; written under its key");
            object
                .entry(column.key.clone())
                .or_insert_with(|| Value::String(value.to_string()));
        }
    }
    object
}

fn nested_groups(table: &LogicalTable, classification: &Column) -> Vec<JsonGroup> {
    let mut groups: Vec<JsonGroup> = Vec::new();
    for row in &table.rows {
        let label = row.get(&classification.key).unwrap_or_default();
        let object = nested_row(table, row);
        match groups.last_mut() {
            Some(group) if group.label == label => group.rows.push(object),
            _ => groups.push(JsonGroup {
                label: label.to_string(),
                rows: vec![object],
            }),
        }
    }
    groups
}

fn json_table(table: &LogicalTable, layout: JsonLayout) -> JsonTable {
    let sources = if table.sources.len() > 1 {
        table.sources.clone()
    } else {
        Vec::new()
    };
    let mut json = JsonTable {
        id: table.id.clone(),
        name: table.name.clone(),
        caption: table.caption.clone(),
        header_depth: table.header_depth,
        columns: Vec::new(),
        rows: None,
        groups: None,
        sources,
    };

    match layout {
        JsonLayout::Flat => {
            json.columns = table.columns.iter().map(json_column).collect();
            json.rows = Some(table.rows.iter().map(|row| flat_row(table, row)).collect());
        }
        JsonLayout::Nested => {
            json.columns = table.data_columns().map(json_column).collect();
            match table.classification() {
                Some(classification) => json.groups = Some(nested_groups(table, classification)),
                None => {
                    json.rows = Some(table.rows.iter().map(|row| nested_row(table, row)).collect());
                }
            }
        }
    }
    json
}

#[must_use]
pub fn to_json_document(tables: &[LogicalTable], layout: JsonLayout) -> JsonDocument {
    JsonDocument {
        tables: tables.iter().map(|table| json_table(table, layout)).collect(),
    }
}

pub fn to_json_string(tables: &[LogicalTable], layout: JsonLayout) -> Result<String, TableError> {
    let document = to_json_document(tables, layout);
    Ok(serde_json::to_string_pretty(&document)?)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn table_from_json(table: JsonTable) -> Result<LogicalTable, TableError> {
    let Some(json_rows) = table.rows else {
        return Err(TableError::InvalidOption(format!(
            "table '{}' has no flat rows; nested JSON cannot be read back",
            table.id
        )));
    };

    let columns = table
        .columns
        .into_iter()
        .map(|column| Column {
            path: column.path,
            key: column.key,
            kind: if column.classification {
                ColumnKind::Classification
            } else {
                ColumnKind::Data
            },
        })
        .collect::<Vec<_>>();

    let rows = json_rows
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let values = columns
                .iter()
                .map(|column| {
                    let value = object.get(&column.key).map(value_text).unwrap_or_default();
                    (column.key.clone(), value)
                })
                .collect::<IndexMap<_, _>>();
            DataRow {
                source_row: table.header_depth + index,
                values,
                inherited: vec![false; columns.len()],
                divider: false,
            }
        })
        .collect();

    let sources = if table.sources.is_empty() {
        vec![table.id.clone()]
    } else {
        table.sources
    };

    Ok(LogicalTable {
        id: table.id,
        name: table.name,
        caption: table.caption,
        header_depth: table.header_depth,
        columns,
        rows,
        sources,
    })
}

/// Reads flat-layout JSON back into logical tables.
pub fn read_flat(json: &str) -> Result<Vec<LogicalTable>, TableError> {
    let document: JsonDocument = serde_json::from_str(json)?;
    document.tables.into_iter().map(table_from_json).collect()
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::json;

    use super::{JsonLayout, read_flat, to_json_document, to_json_string};
    use crate::TableError;
    use crate::model::{Column, ColumnKind, DataRow, LogicalTable};

    fn path(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| (*label).to_string()).collect()
    }

    fn row(values: &[(&str, &str)]) -> DataRow {
        DataRow {
            source_row: 2,
            values: values
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect::<IndexMap<_, _>>(),
            inherited: vec![false; values.len()],
            divider: false,
        }
    }

    fn sample() -> LogicalTable {
        LogicalTable {
            id: "表1".to_string(),
            name: "表1 脂質".to_string(),
            caption: Some("表1 脂質".to_string()),
            header_depth: 2,
            columns: vec![
                Column {
                    path: path(&["分類"]),
                    key: "分類".to_string(),
                    kind: ColumnKind::Classification,
                },
                Column::data(path(&["薬剤"]), "薬剤"),
                Column::data(path(&["用量", "最小"]), "用量_最小"),
            ],
            rows: vec![
                row(&[("分類", "スタチン"), ("薬剤", "a"), ("用量_最小", "1")]),
                row(&[("分類", "スタチン"), ("薬剤", "b"), ("用量_最小", "2")]),
                row(&[("分類", ""), ("薬剤", "c"), ("用量_最小", "3")]),
            ],
            sources: vec!["表1".to_string()],
        }
    }

    #[test]
    fn flat_layout_keeps_column_order() {
        let document = to_json_document(&[sample()], JsonLayout::Flat);
        let value = serde_json::to_value(&document).expect("serializes");

        assert_eq!(
            value["tables"][0]["columns"][2],
            json!({"path": ["用量", "最小"], "key": "用量_最小"})
        );
        assert_eq!(value["tables"][0]["columns"][0]["classification"], json!(true));
        assert_eq!(
            value["tables"][0]["rows"][0],
            json!({"分類": "スタチン", "薬剤": "a", "用量_最小": "1"})
        );
        let keys = value["tables"][0]["rows"][0]
            .as_object()
            .map(|object| object.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(keys, vec!["分類", "薬剤", "用量_最小"]);
        assert!(value["tables"][0].get("sources").is_none());
    }

    #[test]
    fn nested_layout_groups_by_classification() {
        let document = to_json_document(&[sample()], JsonLayout::Nested);
        let value = serde_json::to_value(&document).expect("serializes");
        let table = &value["tables"][0];

        assert!(table.get("rows").is_none());
        assert_eq!(table["columns"].as_array().map(Vec::len), Some(2));
        assert_eq!(table["groups"][0]["label"], json!("スタチン"));
        assert_eq!(
            table["groups"][0]["rows"][1],
            json!({"薬剤": "b", "用量": {"最小": "2"}})
        );
        assert_eq!(table["groups"][1]["label"], json!(""));
    }

    #[test]
    fn flat_json_reads_back() {
        let json = to_json_string(&[sample()], JsonLayout::Flat).expect("serializes");
        let tables = read_flat(&json).expect("reads back");

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, sample().columns);
        assert_eq!(tables[0].rows[1].get("薬剤"), Some("b"));
        assert_eq!(tables[0].sources, vec!["表1"]);
    }

    #[test]
    fn nested_json_is_not_read_back() {
        let json = to_json_string(&[sample()], JsonLayout::Nested).expect("serializes");
        let error = read_flat(&json).expect_err("nested rows are rejected");
        assert!(matches!(error, TableError::InvalidOption(_)));
    }
}
