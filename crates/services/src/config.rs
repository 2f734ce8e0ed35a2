use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use progress_core::model::{CollectionId, EntityId};
use progress_core::pivot::ColumnLabeler;
use progress_core::ExclusionRule;

use crate::error::ConfigError;
use crate::lms::PageRequest;

/// Upper bound on concurrent per-entity fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimit(NonZeroUsize);

impl ConcurrencyLimit {
    pub const DEFAULT: usize = 8;

    /// Returns `None` for zero.
    #[must_use]
    pub fn new(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self)
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Where the platform lives and how to authenticate against it.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub platform_url: String,
    pub token: String,
    pub request_timeout: Option<Duration>,
}

impl ApiConfig {
    #[must_use]
    pub fn new(platform_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            platform_url: platform_url.into(),
            token: token.into(),
            request_timeout: None,
        }
    }

    /// REST root every request path is relative to.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/api/v1", self.platform_url.trim_end_matches('/'))
    }
}

/// Resource paths and query parameters of the remote API.
///
/// `{collection}` in a path template is replaced by the collection id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiLayout {
    pub roster_path: String,
    pub roster_filters: Vec<(String, String)>,
    pub groups_path: String,
    pub groups_include: Vec<String>,
    pub entity_param: String,
    pub details_path: String,
}

impl Default for ApiLayout {
    fn default() -> Self {
        Self {
            roster_path: "/courses/{collection}/enrollments".into(),
            roster_filters: vec![
                ("type[]".into(), "StudentEnrollment".into()),
                ("state[]".into(), "active".into()),
            ],
            groups_path: "/courses/{collection}/modules".into(),
            groups_include: vec!["items".into(), "content_details".into()],
            entity_param: "student_id".into(),
            details_path: "/courses/{collection}".into(),
        }
    }
}

impl ApiLayout {
    fn resolve(template: &str, collection: &CollectionId) -> String {
        template.replace("{collection}", collection.as_str())
    }

    #[must_use]
    pub fn roster_request(&self, collection: &CollectionId) -> PageRequest {
        PageRequest::first_page(
            Self::resolve(&self.roster_path, collection),
            self.roster_filters.clone(),
        )
    }

    #[must_use]
    pub fn groups_request(&self, collection: &CollectionId, entity: &EntityId) -> PageRequest {
        let params = self
            .groups_include
            .iter()
            .map(|include| ("include[]".to_owned(), include.clone()))
            .chain([(self.entity_param.clone(), entity.to_string())])
            .collect();
        PageRequest::first_page(Self::resolve(&self.groups_path, collection), params)
    }

    #[must_use]
    pub fn details_request(&self, collection: &CollectionId) -> PageRequest {
        PageRequest::single(Self::resolve(&self.details_path, collection))
    }
}

/// Everything a `ReportService` needs besides its collaborators.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub api: ApiConfig,
    pub layout: ApiLayout,
    pub concurrency: ConcurrencyLimit,
    pub exclusion: ExclusionRule,
    pub labeler: ColumnLabeler,
}

impl ReportConfig {
    pub const PLATFORM_URL_VAR: &'static str = "PROGRESS_PLATFORM_URL";
    pub const TOKEN_VAR: &'static str = "PROGRESS_API_TOKEN";
    pub const CONCURRENCY_VAR: &'static str = "PROGRESS_CONCURRENCY";
    pub const EXCLUDED_GROUPS_VAR: &'static str = "PROGRESS_EXCLUDED_GROUPS";
    pub const COLUMN_PREFIX_VAR: &'static str = "PROGRESS_COLUMN_PREFIX";
    pub const TIMEOUT_VAR: &'static str = "PROGRESS_REQUEST_TIMEOUT_SECS";

    #[must_use]
    pub fn new(api: ApiConfig) -> Self {
        Self {
            api,
            layout: ApiLayout::default(),
            concurrency: ConcurrencyLimit::default(),
            exclusion: ExclusionRule::default(),
            labeler: ColumnLabeler::default(),
        }
    }

    /// Read configuration from `PROGRESS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ReportConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let platform_url =
            read(Self::PLATFORM_URL_VAR).ok_or(ConfigError::Missing(Self::PLATFORM_URL_VAR))?;
        let token = read(Self::TOKEN_VAR).ok_or(ConfigError::Missing(Self::TOKEN_VAR))?;
        let mut config = Self::new(ApiConfig::new(platform_url, token));

        if let Some(raw) = read(Self::CONCURRENCY_VAR) {
            config.concurrency = raw
                .parse::<usize>()
                .ok()
                .and_then(ConcurrencyLimit::new)
                .ok_or(ConfigError::Invalid {
                    var: Self::CONCURRENCY_VAR,
                    value: raw,
                })?;
        }
        if let Some(raw) = read(Self::TIMEOUT_VAR) {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: Self::TIMEOUT_VAR,
                value: raw.clone(),
            })?;
            config.api.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = read(Self::EXCLUDED_GROUPS_VAR) {
            config.exclusion =
                ExclusionRule::new(raw.split('|').map(str::trim).filter(|name| !name.is_empty()));
        }
        if let Some(prefix) = read(Self::COLUMN_PREFIX_VAR) {
            config.labeler = ColumnLabeler::new(prefix);
        }

        Ok(config)
    }
}
