use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{LmsTransport, Page, PageRequest};
use crate::error::FetchError;

#[derive(Clone)]
enum Route {
    Page(Page),
    Status(StatusCode, String),
}

/// Canned-response transport for tests and offline prototyping.
///
/// Routes are keyed by [`PageRequest::relative_url`]. Unknown routes answer
/// `404 Not Found`.
#[derive(Clone)]
pub struct InMemoryTransport {
    base_url: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            routes: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve `body` at `url`, linking to `next` (relative) when given.
    #[must_use]
    pub fn with_page(self, url: &str, body: serde_json::Value, next: Option<&str>) -> Self {
        let link = next.map(|next| format!(r#"<{}{next}>; rel="next""#, self.base_url));
        let page = Page {
            body: body.to_string().into_bytes(),
            link,
        };
        self.insert(url, Route::Page(page));
        self
    }

    /// Serve a raw page, for link headers the helper above cannot express.
    #[must_use]
    pub fn with_raw_page(self, url: &str, page: Page) -> Self {
        self.insert(url, Route::Page(page));
        self
    }

    /// Answer `url` with a non-success status.
    #[must_use]
    pub fn with_status(self, url: &str, status: StatusCode, body: &str) -> Self {
        self.insert(url, Route::Status(status, body.to_owned()));
        self
    }

    /// Relative URLs requested so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn insert(&self, url: &str, route: Route) {
        if let Ok(mut guard) = self.routes.lock() {
            guard.insert(url.to_owned(), route);
        }
    }
}

#[async_trait]
impl LmsTransport for InMemoryTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, request: &PageRequest) -> Result<Page, FetchError> {
        let url = request.relative_url();
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(url.clone());
        }
        let route = self
            .routes
            .lock()
            .ok()
            .and_then(|guard| guard.get(&url).cloned());

        match route {
            Some(Route::Page(page)) => Ok(page),
            Some(Route::Status(status, body)) => Err(FetchError::Status { status, body }),
            None => Err(FetchError::Status {
                status: StatusCode::NOT_FOUND,
                body: format!("no route for {url}"),
            }),
        }
    }
}
