#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    CacheEntry, FailureRecord, InMemoryReportRepository, ReportRepository, StorageError,
};
