use tracing::debug;

use crate::keys::KeyAllocator;
use crate::model::{Column, ColumnKind, DataRow, TableLayout};
use crate::options::ParseOptions;

/// Classification label for grid row `row`: the text of a vertical span in
/// `col` that starts inside the data region, plus whether it started earlier.
fn classification_for(layout: &TableLayout, row: usize, col: usize) -> (String, bool) {
    let grid = &layout.raw.grid;
    let (Some(origin), Some(cell)) = (grid.origin(row, col), grid.cell(row, col)) else {
        return (String::new(), false);
    };

    if cell.rowspan > 1 && origin.row >= layout.header_depth {
        (cell.text.clone(), origin.row < row)
    } else {
        (String::new(), false)
    }
}

/// Prepends the classification column to `rows` and returns its definition.
///
/// Every row receives a value; rows outside any vertical span get `""`.
pub(crate) fn attach_classification(
    layout: &TableLayout,
    rows: &mut [DataRow],
    options: &ParseOptions,
) -> Column {
    let mut keys = KeyAllocator::with_reserved(options.key_style, layout.keys());
    let key = keys.allocate(std::slice::from_ref(&options.classification_key));
    let col = options.classification_column;

    if col >= layout.raw.grid.width() {
        debug!(
            table = %layout.raw.id,
            column = col,
            "classification column is outside the grid"
        );
    }

    for row in rows.iter_mut() {
        let (label, inherited) = if row.divider {
            (String::new(), false)
        } else {
            classification_for(layout, row.source_row, col)
        };
        row.values.shift_insert(0, key.clone(), label);
        row.inherited.insert(0, inherited);
    }

    Column {
        path: vec![key.clone()],
        key,
        kind: ColumnKind::Classification,
    }
}
