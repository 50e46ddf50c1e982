#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Builds tag-stream fixtures line by line.
#[derive(Debug, Default)]
pub struct TagText {
    text: String,
}

impl TagText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caption(mut self, caption: &str) -> Self {
        writeln!(self.text, "<\"図表ネーム\">{caption}")
            .expect("writing to a String cannot fail");
        self
    }

    pub fn table(mut self, id: &str) -> Self {
        writeln!(self.text, "<\"{id}\">").expect("writing to a String cannot fail");
        self
    }

    pub fn cell(mut self, text: &str) -> Self {
        writeln!(self.text, "<\"G\">{text}").expect("writing to a String cannot fail");
        self
    }

    pub fn spanned(mut self, rowspan: usize, colspan: usize, text: &str) -> Self {
        writeln!(self.text, "<\"G＝C{rowspan}_C{colspan}\">{text}")
            .expect("writing to a String cannot fail");
        self
    }

    pub fn end_row(mut self) -> Self {
        self.text.push_str("<\"行\">\n");
        self
    }

    pub fn row(self, cells: &[&str]) -> Self {
        cells
            .iter()
            .fold(self, |fixture, cell| fixture.cell(cell))
            .end_row()
    }

    pub fn line(mut self, line: &str) -> Self {
        self.text.push_str(line);
        self.text.push('\n');
        self
    }

    pub fn build(self) -> String {
        self.text
    }
}

pub fn write_fixture(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture should be written");
    path
}
