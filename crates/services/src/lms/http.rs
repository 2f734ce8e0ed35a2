use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::LINK;
use tracing::debug;

use super::{LmsTransport, Page, PageRequest};
use crate::config::ApiConfig;
use crate::error::{FetchError, MalformedResponseError};

/// `reqwest`-backed transport with bearer authentication.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    #[must_use]
    pub fn with_client(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url(),
            token: config.token.clone(),
            timeout: config.request_timeout,
        }
    }
}

#[async_trait]
impl LmsTransport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, request: &PageRequest) -> Result<Page, FetchError> {
        let url = format!("{}{}", self.base_url, request.path());
        let mut builder = self.client.get(url).bearer_auth(&self.token);
        if !request.params().is_empty() {
            builder = builder.query(request.params());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(status = %status, error = %err, "could not read error body");
                    String::new()
                }
            };
            return Err(FetchError::Status { status, body });
        }

        let link = response
            .headers()
            .get(LINK)
            .map(|value| {
                value
                    .to_str()
                    .map(str::to_owned)
                    .map_err(|_| MalformedResponseError::LinkHeader(format!("{value:?}")))
            })
            .transpose()?;
        let body = response.bytes().await?.to_vec();

        Ok(Page { body, link })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves one response, then closes the connection.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0_u8; 2048];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn error_status_carries_the_body() {
        let url = serve_once(
            "HTTP/1.1 403 Forbidden\r\ncontent-length: 14\r\nconnection: close\r\n\r\nnot authorized",
        )
        .await;
        let transport = HttpTransport::new(&ApiConfig::new(url, "token"));

        let err = transport.get(&PageRequest::single("/courses/1")).await.unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "not authorized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreadable_error_body_still_reports_the_status() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 64\r\nconnection: close\r\n\r\ncut",
        )
        .await;
        let transport = HttpTransport::new(&ApiConfig::new(url, "token"));

        let err = transport.get(&PageRequest::single("/courses/1")).await.unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
