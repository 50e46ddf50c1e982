//! Output formats built from finished [`LogicalTable`](crate::LogicalTable)s.

pub mod grid;
pub mod json;
pub mod tags;
