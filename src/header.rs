use tracing::debug;

use crate::grid::Grid;
use crate::keys::KeyAllocator;
use crate::model::{Column, ColumnLayout, RawTable, TableLayout};
use crate::options::{KeyStyle, ParseOptions};
use crate::warning::{ParseWarning, WarningCode};

/// A row whose first own cell mentions this belongs to the header as well.
const CLASSIFICATION_HEADER_CUE: &str = "分類";

const DEFAULT_HEADER_CUES: &[&str] = &[
    "項目", "区分", "分類", "種類", "名称", "単位", "item", "category", "type", "name", "unit",
];

/// The header depth chosen for one grid, plus an optional note for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthDecision {
    pub depth: usize,
    pub note: Option<(WarningCode, String)>,
}

impl DepthDecision {
    fn plain(depth: usize) -> Self {
        Self { depth, note: None }
    }
}

pub trait HeaderStrategy {
    fn header_depth(&self, grid: &Grid) -> DepthDecision;
}

/// Uses the configured depth, clamped to the grid height.
#[derive(Debug, Clone, Copy)]
pub struct ManualDepth(pub usize);

impl HeaderStrategy for ManualDepth {
    fn header_depth(&self, grid: &Grid) -> DepthDecision {
        let height = grid.height();
        if height == 0 || self.0 <= height {
            return DepthDecision::plain(self.0.min(height));
        }

        DepthDecision {
            depth: height,
            note: Some((
                WarningCode::HeaderDepthClamped,
                format!(
                    "header depth {} exceeds the {height} row(s) of the table; clamped",
                    self.0
                ),
            )),
        }
    }
}

fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim().replace(',', "");
    trimmed.parse::<f64>().is_ok()
}

fn compact(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Votes rows into the header while most of their own cells look like labels.
#[derive(Debug, Clone)]
pub struct HeuristicDepth {
    cues: Vec<String>,
}

impl Default for HeuristicDepth {
    fn default() -> Self {
        Self::with_cues(DEFAULT_HEADER_CUES.iter().copied())
    }
}

impl HeuristicDepth {
    #[must_use]
    pub fn with_cues<I, S>(cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cues: cues.into_iter().map(Into::into).collect(),
        }
    }

    fn matches_cue(&self, text: &str) -> bool {
        let text = compact(text).to_lowercase();
        self.cues.iter().any(|cue| text == cue.to_lowercase())
    }

    fn is_header_row(&self, grid: &Grid, row: usize) -> bool {
        let mut cells = 0_usize;
        let mut votes = 0_usize;
        for (_, cell) in grid.own_cells(row).filter(|(_, cell)| !cell.is_blank()) {
            cells += 1;
            if !is_numeric(&cell.text) && (cell.is_header || self.matches_cue(&cell.text)) {
                votes += 1;
            }
        }
        cells > 0 && votes * 2 > cells
    }
}

impl HeaderStrategy for HeuristicDepth {
    fn header_depth(&self, grid: &Grid) -> DepthDecision {
        let height = grid.height();
        if height == 0 {
            return DepthDecision::plain(0);
        }

        let first_row_span = grid
            .own_cells(0)
            .map(|(_, cell)| cell.rowspan)
            .max()
            .unwrap_or(1);
        let voted = (0..height - 1)
            .take_while(|row| self.is_header_row(grid, *row))
            .count();

        let mut depth = first_row_span.max(voted).clamp(1, height);
        if depth < height
            && grid
                .own_cells(depth)
                .next()
                .is_some_and(|(_, cell)| compact(&cell.text).contains(CLASSIFICATION_HEADER_CUE))
        {
            depth += 1;
        }

        let note = (!self.is_header_row(grid, 0)).then(|| {
            (
                WarningCode::HeaderInferenceFallback,
                format!("no header markers in the first row; header depth {depth} inferred from spans"),
            )
        });
        DepthDecision { depth, note }
    }
}

#[must_use]
pub fn strategy_for(options: &ParseOptions) -> Box<dyn HeaderStrategy> {
    match options.header_depth {
        Some(depth) => Box::new(ManualDepth(depth)),
        None => Box::new(HeuristicDepth::default()),
    }
}

/// Labels of one grid column from the top of the header down, without blanks or repeats.
fn header_path(grid: &Grid, col: usize, depth: usize) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    for row in 0..depth {
        let label = grid.label(row, col).trim();
        if label.is_empty() || path.last().is_some_and(|last| last == label) {
            continue;
        }
        path.push(label.to_string());
    }

    if path.is_empty() {
        path.push(format!("col{}", col + 1));
    }
    path
}

/// Builds logical columns; neighbouring grid columns with the same path share one column.
#[must_use]
pub fn build_columns(grid: &Grid, depth: usize, style: KeyStyle) -> Vec<ColumnLayout> {
    if depth == 0 || grid.width() == 0 {
        return Vec::new();
    }

    let mut groups: Vec<(Vec<String>, usize, usize)> = Vec::new();
    for col in 0..grid.width() {
        let path = header_path(grid, col, depth);
        match groups.last_mut() {
            Some((last, _, end)) if *last == path => *end = col + 1,
            _ => groups.push((path, col, col + 1)),
        }
    }

    let mut keys = KeyAllocator::new(style);
    groups
        .into_iter()
        .map(|(path, start, end)| {
            let key = keys.allocate(&path);
            ColumnLayout {
                column: Column::data(path, key),
                span: start..end,
            }
        })
        .collect()
}

pub(crate) fn analyze_table(
    raw: RawTable,
    options: &ParseOptions,
    warnings: &mut Vec<ParseWarning>,
) -> TableLayout {
    let decision = strategy_for(options).header_depth(&raw.grid);
    if let Some((code, message)) = decision.note {
        warnings.push(ParseWarning::new(code, message).with_table_id(raw.id.clone()));
    }

    let columns = build_columns(&raw.grid, decision.depth, options.key_style);
    debug!(
        table = %raw.id,
        header_depth = decision.depth,
        columns = columns.len(),
        "analyzed table header"
    );

    TableLayout {
        header_depth: decision.depth,
        columns,
        raw,
    }
}
