//! Entity × group matrix built from summary rows, and its tabular export.

mod export;
mod natural;
mod table;

pub use export::{ExportRow, ExportTable, MISSING_CELL, UTF8_BOM};
pub use natural::{SortOrder, natural_cmp};
pub use table::{ColumnLabeler, PivotCell, PivotColumn, PivotEntity, PivotKey, PivotTable};
