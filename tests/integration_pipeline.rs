mod common;

use std::process::Command;

use common::{TagText, write_fixture};
use encoding_rs::SHIFT_JIS;
use serde_json::Value;
use tagtable::render::grid::GridStyle;
use tagtable::render::json::JsonLayout;
use tagtable::{ParseOptions, WarningCode, convert_to_grid, convert_to_json};
use tempfile::tempdir;

fn lipid_document() -> String {
    TagText::new()
        .caption("表1 脂質異常症治療薬")
        .table("表1")
        .row(&["区分", "薬剤", "用量"])
        .spanned(2, 1, "スタチン")
        .row(&["アトルバスタチン", "10"])
        .row(&["ロスバスタチン", "5"])
        .row(&["その他", "エゼチミブ", "10"])
        .build()
}

fn options() -> ParseOptions {
    ParseOptions {
        header_depth: Some(1),
        add_classification: true,
        ..ParseOptions::default()
    }
}

#[test]
fn converts_tag_text_to_flat_json() {
    let dir = tempdir().expect("tempdir should be created");
    let input = write_fixture(dir.path(), "lipid.txt", lipid_document().as_bytes());
    let output = dir.path().join("lipid.json");

    let report = convert_to_json(&input, &output, &options(), JsonLayout::Flat)
        .expect("conversion should succeed");

    let json: Value = serde_json::from_str(
        &std::fs::read_to_string(&output).expect("JSON should be readable"),
    )
    .expect("output should be JSON");
    let table = &json["tables"][0];
    assert_eq!(table["name"], "表1 脂質異常症治療薬");
    assert_eq!(table["rows"][1]["分類"], "スタチン");
    assert_eq!(table["rows"][1]["区分"], "スタチン");
    assert_eq!(table["rows"][2]["分類"], "");
    assert_eq!(report.table_count(), 1);
    assert_eq!(report.row_count(), 3);
}

#[test]
fn nested_json_groups_rows() {
    let dir = tempdir().expect("tempdir should be created");
    let input = write_fixture(dir.path(), "lipid.txt", lipid_document().as_bytes());
    let output = dir.path().join("nested.json");

    convert_to_json(&input, &output, &options(), JsonLayout::Nested)
        .expect("conversion should succeed");

    let json: Value = serde_json::from_str(
        &std::fs::read_to_string(&output).expect("JSON should be readable"),
    )
    .expect("output should be JSON");
    let groups = json["tables"][0]["groups"]
        .as_array()
        .expect("groups should be written");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["label"], "スタチン");
    assert_eq!(groups[0]["rows"].as_array().map(Vec::len), Some(2));
    assert_eq!(groups[1]["rows"][0]["薬剤"], "エゼチミブ");
}

#[test]
fn converts_shift_jis_input_to_restored_grid() {
    let dir = tempdir().expect("tempdir should be created");
    let document = lipid_document();
    let (encoded, _, unmappable) = SHIFT_JIS.encode(&document);
    assert!(!unmappable);
    let input = write_fixture(dir.path(), "lipid_sjis.txt", &encoded);
    let output = dir.path().join("lipid.csv");

    let report = convert_to_grid(&input, &output, &options(), GridStyle::Restored, b',')
        .expect("conversion should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert!(
        csv.starts_with("表1 脂質異常症治療薬\n分類,区分,薬剤,用量\n"),
        "unexpected CSV output: {csv:?}, report: {report:?}"
    );
    assert!(
        csv.contains("\n,,ロスバスタチン,5\n"),
        "unexpected CSV output: {csv:?}, report: {report:?}"
    );
}

#[test]
fn reports_input_without_tables() {
    let dir = tempdir().expect("tempdir should be created");
    let input = write_fixture(dir.path(), "empty.txt", "本文だけの文書\n".as_bytes());
    let output = dir.path().join("empty.json");

    let report = convert_to_json(&input, &output, &ParseOptions::default(), JsonLayout::Flat)
        .expect("conversion should succeed");

    assert_eq!(report.table_count(), 0);
    assert!(
        report
            .warnings
            .iter()
            .any(|warning| warning.code == WarningCode::NoTablesDetected)
    );
}

#[test]
fn cli_exit_codes_follow_outcome() {
    let dir = tempdir().expect("tempdir should be created");
    let input = write_fixture(dir.path(), "lipid.txt", lipid_document().as_bytes());
    let empty = write_fixture(dir.path(), "empty.txt", b"no tables here\n");
    let output = dir.path().join("out.json");
    let binary = env!("CARGO_BIN_EXE_tagtable");

    let status = Command::new(binary)
        .arg("json")
        .arg(&input)
        .arg(&output)
        .args(["--header-depth", "1", "--add-classification"])
        .status()
        .expect("binary should run");
    assert_eq!(status.code(), Some(0));
    assert!(output.exists());

    let status = Command::new(binary)
        .arg("grid")
        .arg(&empty)
        .arg(dir.path().join("empty.csv"))
        .status()
        .expect("binary should run");
    assert_eq!(status.code(), Some(2));

    let status = Command::new(binary)
        .arg("json")
        .arg(&input)
        .arg(&output)
        .args(["--header-depth", "0"])
        .status()
        .expect("binary should run");
    assert_eq!(status.code(), Some(1));
}
