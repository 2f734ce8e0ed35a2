#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod fan_out;
pub mod lms;
pub mod report_service;

pub use progress_core::Clock;

pub use config::{ApiConfig, ApiLayout, ConcurrencyLimit, ReportConfig};
pub use error::{ConfigError, EntityFetchError, FetchError, MalformedResponseError, ReportError};
pub use fan_out::{FanOut, fan_out};
pub use lms::{HttpTransport, InMemoryTransport, LmsTransport, Page, PageRequest};
pub use report_service::{CollectionState, ReportPayload, ReportService, ReportView};
