//! Shared error types for the services crate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use progress_core::ExportError;
use progress_core::model::EntityId;
use storage::StorageError;

/// Response could not be interpreted; continuing would silently truncate data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedResponseError {
    #[error("link header has a next relation without an <url> target: {0}")]
    LinkHeader(String),
    #[error("next cursor points outside the API base: {0}")]
    ForeignCursor(String),
    #[error("response body is not the expected shape: {0}")]
    Body(#[from] serde_json::Error),
}

/// A single remote request failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("remote request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Malformed(#[from] MalformedResponseError),
}

/// One entity's secondary fetch failed. Never fatal to a report run.
#[derive(Debug, Error)]
#[error("groups fetch for entity {entity_id} ({display_name}) failed: {source}")]
pub struct EntityFetchError {
    pub entity_id: EntityId,
    pub display_name: String,
    #[source]
    pub source: FetchError,
}

/// Errors emitted by `ReportService`.
///
/// Cloneable so that every caller awaiting the same in-flight run receives the
/// same failure.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("roster fetch failed: {0}")]
    Roster(#[source] Arc<FetchError>),
    #[error("last report run failed at {failed_at}: {reason}")]
    Failed {
        reason: String,
        failed_at: DateTime<Utc>,
    },
    #[error("report task did not finish: {0}")]
    Aborted(String),
    #[error(transparent)]
    Storage(Arc<StorageError>),
    #[error(transparent)]
    Export(Arc<ExportError>),
    #[error("view serialization failed: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),
    #[error("in-flight run registry poisoned: {0}")]
    Poisoned(String),
}

impl ReportError {
    /// True for failures of the primary collection fetch.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, ReportError::Roster(_))
    }

    /// True when the error replays a failure recorded by an earlier run.
    #[must_use]
    pub fn is_recorded_failure(&self) -> bool {
        matches!(self, ReportError::Failed { .. })
    }
}

impl From<StorageError> for ReportError {
    fn from(err: StorageError) -> Self {
        ReportError::Storage(Arc::new(err))
    }
}

impl From<ExportError> for ReportError {
    fn from(err: ExportError) -> Self {
        ReportError::Export(Arc::new(err))
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Serialize(Arc::new(err))
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid {var} value: {value}")]
    Invalid { var: &'static str, value: String },
}
