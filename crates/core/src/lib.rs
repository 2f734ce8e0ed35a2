#![forbid(unsafe_code)]

pub mod error;
pub mod flatten;
pub mod model;
pub mod pivot;
pub mod report;
pub mod time;

pub use error::ExportError;
pub use flatten::{EntityRows, ExclusionRule, flatten_entity};
pub use pivot::{ColumnLabeler, ExportTable, PivotTable, SortOrder, natural_cmp};
pub use report::{EntityFailure, ReportSnapshot};
pub use time::Clock;
