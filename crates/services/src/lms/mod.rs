//! Access to the learning platform's REST API.

mod http;
mod link;
mod memory;
mod paginate;
pub(crate) mod wire;

use async_trait::async_trait;

use crate::error::{FetchError, MalformedResponseError};

pub use http::HttpTransport;
pub use link::parse_next_link;
pub use memory::InMemoryTransport;
pub use paginate::{collect_all, paginate};

/// Page size requested on the first page of every paginated listing.
pub const PAGE_SIZE: u32 = 100;

/// One immutable request: a path relative to the API base plus query pairs.
///
/// Cursor requests carry their query inside `path` exactly as the server sent
/// it, and no extra parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    path: String,
    params: Vec<(String, String)>,
}

impl PageRequest {
    /// First page of a listing: filters plus `per_page`.
    #[must_use]
    pub fn first_page(path: impl Into<String>, mut params: Vec<(String, String)>) -> Self {
        params.push(("per_page".to_owned(), PAGE_SIZE.to_string()));
        Self {
            path: path.into(),
            params,
        }
    }

    /// Non-paginated request.
    #[must_use]
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Turn a `rel="next"` URL into a request relative to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedResponseError::ForeignCursor` when the URL is absolute
    /// but not under `base_url`.
    pub fn from_cursor(base_url: &str, next: &str) -> Result<Self, MalformedResponseError> {
        let base = base_url.trim_end_matches('/');
        let relative = match next.strip_prefix(base) {
            Some(rest) if rest.is_empty() || rest.starts_with(['/', '?']) => rest,
            _ if next.starts_with('/') => next,
            _ => return Err(MalformedResponseError::ForeignCursor(next.to_owned())),
        };
        Ok(Self::single(relative))
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Path and query as one string, parameters unencoded.
    #[must_use]
    pub fn relative_url(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.path)
    }
}

/// Raw successful response: JSON body and the `link` header, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub body: Vec<u8>,
    pub link: Option<String>,
}

/// Request layer under the paginator.
#[async_trait]
pub trait LmsTransport: Send + Sync {
    /// Absolute API root that relative request paths are appended to.
    fn base_url(&self) -> &str;

    /// Perform one GET.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-success responses and
    /// `FetchError::Http` for transport failures.
    async fn get(&self, request: &PageRequest) -> Result<Page, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://lms.test/api/v1";

    #[test]
    fn first_page_appends_page_size() {
        let request = PageRequest::first_page(
            "/courses/1/enrollments",
            vec![("type[]".into(), "StudentEnrollment".into())],
        );
        assert_eq!(
            request.relative_url(),
            "/courses/1/enrollments?type[]=StudentEnrollment&per_page=100"
        );
    }

    #[test]
    fn cursor_strips_base_and_keeps_query_verbatim() {
        let request = PageRequest::from_cursor(
            BASE,
            "https://lms.test/api/v1/courses/1/enrollments?page=2&per_page=100&type%5B%5D=StudentEnrollment",
        )
        .unwrap();
        assert_eq!(
            request.path(),
            "/courses/1/enrollments?page=2&per_page=100&type%5B%5D=StudentEnrollment"
        );
        assert!(request.params().is_empty());
    }

    #[test]
    fn relative_cursor_is_accepted() {
        let request = PageRequest::from_cursor(BASE, "/courses/1/modules?page=3").unwrap();
        assert_eq!(request.relative_url(), "/courses/1/modules?page=3");
    }

    #[test]
    fn foreign_cursor_is_rejected() {
        let err = PageRequest::from_cursor(BASE, "https://other.test/api/v1/courses?page=2")
            .unwrap_err();
        assert!(matches!(err, MalformedResponseError::ForeignCursor(_)));

        let err = PageRequest::from_cursor(BASE, "https://lms.test/api/v10/courses").unwrap_err();
        assert!(matches!(err, MalformedResponseError::ForeignCursor(_)));
    }
}
