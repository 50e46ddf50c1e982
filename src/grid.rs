//! Span-resolving occupancy grid.
//!
//! Every position of a finished [`Grid`] is a [`Slot`]: either the origin
//! cell of a span (`Filled`) or a back-reference to that origin (`Covered`).
//! Covered slots never own data, so a span is stored exactly once.

use std::collections::BTreeSet;

use tracing::warn;

use crate::cell::RawCell;
use crate::warning::{ParseWarning, WarningCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Filled { cell: RawCell, origin: Position },
    Covered { origin: Position },
}

impl Slot {
    #[must_use]
    pub fn origin(&self) -> Position {
        match self {
            Self::Filled { origin, .. } | Self::Covered { origin } => *origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub slots: Vec<Slot>,
    /// The source row carried no cells.
    pub divider: bool,
    /// Trailing columns filled with empty cells because the source row ran short.
    pub padded: usize,
    /// 1-based source line where the row started.
    pub line: Option<usize>,
}

/// An origin cell together with its effective (clamped) rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanRect {
    pub origin: Position,
    pub rowspan: usize,
    pub colspan: usize,
}

impl SpanRect {
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        (self.origin.row..self.origin.row + self.rowspan).contains(&position.row)
            && (self.origin.col..self.origin.col + self.colspan).contains(&position.col)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<GridRow>,
    width: usize,
}

impl Grid {
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<&GridRow> {
        self.rows.get(row)
    }

    #[must_use]
    pub fn slot(&self, row: usize, col: usize) -> Option<&Slot> {
        self.rows.get(row).and_then(|grid_row| grid_row.slots.get(col))
    }

    #[must_use]
    pub fn origin(&self, row: usize, col: usize) -> Option<Position> {
        self.slot(row, col).map(Slot::origin)
    }

    /// The cell owning `(row, col)`, following covered slots back to their origin.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&RawCell> {
        let origin = self.origin(row, col)?;
        match self.slot(origin.row, origin.col)? {
            Slot::Filled { cell, .. } => Some(cell),
            Slot::Covered { .. } => None,
        }
    }

    /// Literal text shown at `(row, col)` once spans are filled in.
    #[must_use]
    pub fn label(&self, row: usize, col: usize) -> &str {
        self.cell(row, col).map_or("", |cell| cell.text.as_str())
    }

    #[must_use]
    pub fn is_divider(&self, row: usize) -> bool {
        self.rows.get(row).is_some_and(|grid_row| grid_row.divider)
    }

    /// Cells that own their slot in `row`, left to right.
    pub fn own_cells(&self, row: usize) -> impl Iterator<Item = (usize, &RawCell)> {
        self.rows
            .get(row)
            .map(|grid_row| grid_row.slots.as_slice())
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter_map(move |(col, slot)| match slot {
                Slot::Filled { cell, origin } if *origin == Position::new(row, col) => {
                    Some((col, cell))
                }
                _ => None,
            })
    }

    /// All origin rectangles in row-major order, including 1x1 cells.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRect> {
        let mut spans = Vec::new();
        for (row, grid_row) in self.rows.iter().enumerate() {
            for (col, slot) in grid_row.slots.iter().enumerate() {
                match slot {
                    Slot::Filled { cell, origin } if *origin == Position::new(row, col) => {
                        spans.push(SpanRect {
                            origin: *origin,
                            rowspan: cell.rowspan,
                            colspan: cell.colspan,
                        });
                    }
                    _ => {}
                }
            }
        }
        spans
    }
}

/// Widest grid the builder lays out. Cells starting past it are dropped.
pub const MAX_TABLE_WIDTH: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Coverage {
    origin: Position,
    remaining: usize,
}

#[derive(Debug)]
enum PendingRow {
    Cells { cells: Vec<RawCell>, line: Option<usize> },
    Divider { line: Option<usize> },
}

/// Free columns from `from` up to `limit`, stopping at the first covered one.
fn free_run(covered: impl Fn(usize) -> bool, from: usize, limit: usize) -> usize {
    (from..limit).take_while(|col| !covered(*col)).count()
}

/// Widest extent any row reaches once pending rowspans are accounted for.
fn measure_width(rows: &[PendingRow]) -> usize {
    let mut remaining: Vec<usize> = Vec::new();
    let mut width = 0;

    for row in rows {
        if let PendingRow::Cells { cells, .. } = row {
            let covered = remaining.clone();
            let is_covered = |col: usize| covered.get(col).is_some_and(|left| *left > 0);
            let mut cursor = 0;
            for cell in cells {
                while cursor < MAX_TABLE_WIDTH && is_covered(cursor) {
                    cursor += 1;
                }
                if cursor >= MAX_TABLE_WIDTH {
                    break;
                }
                let colspan = cell
                    .colspan
                    .max(1)
                    .min(free_run(is_covered, cursor, MAX_TABLE_WIDTH));
                let end = cursor + colspan;
                if remaining.len() < end {
                    remaining.resize(end, 0);
                }
                for left in &mut remaining[cursor..end] {
                    *left = cell.rowspan.max(1);
                }
                width = width.max(end);
                cursor = end;
            }
        }
        for left in &mut remaining {
            *left = left.saturating_sub(1);
        }
    }
    width
}

/// Builds one table's grid.
///
/// Rows are buffered until [`GridBuilder::finish`], which sizes the grid to
/// the widest row and pads the rest. Clamps are reported as warnings.
pub struct GridBuilder {
    table_id: String,
    pending: Vec<PendingRow>,
    rows: Vec<GridRow>,
    coverage: Vec<Option<Coverage>>,
    warnings: Vec<ParseWarning>,
}

impl GridBuilder {
    #[must_use]
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            pending: Vec::new(),
            rows: Vec::new(),
            coverage: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.pending.len()
    }

    fn warn(&mut self, code: WarningCode, message: String, row: usize, line: Option<usize>) {
        warn!(table = %self.table_id, row, "{message}");
        let mut warning = ParseWarning::new(code, message)
            .with_table_id(self.table_id.clone())
            .with_row(row);
        if let Some(line) = line {
            warning = warning.with_line(line);
        }
        self.warnings.push(warning);
    }

    /// Queues a source row. Rows without cells before the first real row are skipped.
    pub fn push_row(&mut self, cells: Vec<RawCell>, line: Option<usize>) {
        if cells.is_empty() && self.pending.is_empty() {
            return;
        }
        self.pending.push(PendingRow::Cells { cells, line });
    }

    /// Queues a source row that carried no cells. Pending spans still cover it.
    pub fn push_divider(&mut self, line: Option<usize>) {
        if self.pending.is_empty() {
            return;
        }
        self.pending.push(PendingRow::Divider { line });
    }

    fn place_row(&mut self, cells: Vec<RawCell>, line: Option<usize>, width: usize) {
        let row = self.rows.len();
        let mut slots: Vec<Option<Slot>> = self
            .coverage
            .iter()
            .map(|coverage| coverage.map(|coverage| Slot::Covered { origin: coverage.origin }))
            .collect();

        let mut cursor = 0;
        let total = cells.len();
        for (index, mut cell) in cells.into_iter().enumerate() {
            cell.rowspan = cell.rowspan.max(1);
            cell.colspan = cell.colspan.max(1);
            while cursor < width && slots[cursor].is_some() {
                cursor += 1;
            }
            if cursor >= width {
                let dropped = total - index;
                self.warn(
                    WarningCode::RowOverflow,
                    format!("row exceeds the table width of {width}; dropped {dropped} cell(s)"),
                    row,
                    line,
                );
                break;
            }

            let free = free_run(|col| slots[col].is_some(), cursor, width);
            if cell.colspan > free {
                self.warn(
                    WarningCode::SpanClamped,
                    format!(
                        "colspan {} at column {} clamped to {free}",
                        cell.colspan,
                        cursor + 1
                    ),
                    row,
                    line,
                );
                cell.colspan = free;
            }

            let origin = Position::new(row, cursor);
            let colspan = cell.colspan;
            // Counts the current row too; `finish_row` decrements it right away.
            let remaining = cell.rowspan;
            for slot in &mut slots[cursor + 1..cursor + colspan] {
                *slot = Some(Slot::Covered { origin });
            }
            if remaining > 1 {
                for coverage in &mut self.coverage[cursor..cursor + colspan] {
                    *coverage = Some(Coverage { origin, remaining });
                }
            }
            slots[cursor] = Some(Slot::Filled { cell, origin });
            cursor += colspan;
        }

        self.finish_row(row, slots, false, line);
    }

    fn place_divider(&mut self, line: Option<usize>) {
        let row = self.rows.len();
        let slots = self
            .coverage
            .iter()
            .map(|coverage| coverage.map(|coverage| Slot::Covered { origin: coverage.origin }))
            .collect();
        self.finish_row(row, slots, true, line);
    }

    fn finish_row(
        &mut self,
        row: usize,
        slots: Vec<Option<Slot>>,
        divider: bool,
        line: Option<usize>,
    ) {
        let mut padded = 0;
        let slots = slots
            .into_iter()
            .enumerate()
            .map(|(col, slot)| {
                slot.unwrap_or_else(|| {
                    padded += 1;
                    Slot::Filled {
                        cell: RawCell::empty(),
                        origin: Position::new(row, col),
                    }
                })
            })
            .collect();

        for entry in &mut self.coverage {
            if let Some(coverage) = entry {
                coverage.remaining -= 1;
                if coverage.remaining == 0 {
                    *entry = None;
                }
            }
        }

        self.rows.push(GridRow {
            slots,
            divider,
            padded: if divider { 0 } else { padded },
            line,
        });
    }

    /// Lays out the queued rows, clamps rowspans that ran past the last row
    /// and returns the grid.
    pub fn finish(mut self) -> (Grid, Vec<ParseWarning>) {
        let pending = std::mem::take(&mut self.pending);
        let width = measure_width(&pending);
        if width == 0 {
            return (Grid::default(), self.warnings);
        }
        self.coverage = vec![None; width];
        for row in pending {
            match row {
                PendingRow::Cells { cells, line } => self.place_row(cells, line, width),
                PendingRow::Divider { line } => self.place_divider(line),
            }
        }

        let overrun: BTreeSet<Position> = self
            .coverage
            .iter()
            .flatten()
            .map(|coverage| coverage.origin)
            .collect();

        let height = self.rows.len();
        for origin in overrun {
            let effective = height - origin.row;
            let line = self.rows[origin.row].line;
            let declared = match &mut self.rows[origin.row].slots[origin.col] {
                Slot::Filled { cell, .. } => {
                    let declared = cell.rowspan;
                    cell.rowspan = effective;
                    declared
                }
                Slot::Covered { .. } => continue,
            };
            self.warn(
                WarningCode::SpanClamped,
                format!(
                    "rowspan {declared} at column {} runs past the last row; clamped to {effective}",
                    origin.col + 1
                ),
                origin.row,
                line,
            );
        }

        let grid = Grid {
            width,
            rows: self.rows,
        };
        (grid, self.warnings)
    }
}
