#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    MalformedAttribute,
    SpanClamped,
    RowOverflow,
    CellOutsideTable,
    EmptyTable,
    HeaderDepthClamped,
    HeaderInferenceFallback,
    MergeShapeMismatch,
    MergeRowCountMismatch,
    NoTablesDetected,
}

/// A recovered condition. Parsing continued past it, but the output may
/// differ from what the source intended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub code: WarningCode,
    pub message: String,
    pub table_id: Option<String>,
    pub line: Option<usize>,
    pub row: Option<usize>,
}

impl ParseWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            table_id: None,
            line: None,
            row: None,
        }
    }

    #[must_use]
    pub fn with_table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}
