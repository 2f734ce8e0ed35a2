use futures::stream::{self, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{LmsTransport, PageRequest, parse_next_link};
use crate::error::{FetchError, MalformedResponseError};

/// Every item of a paginated listing, page by page, following `rel="next"`.
///
/// Nothing is requested until the stream is polled; calling again starts over
/// from `first`. The stream ends after the first error.
pub fn paginate<'a, T>(
    transport: &'a dyn LmsTransport,
    first: PageRequest,
) -> impl Stream<Item = Result<T, FetchError>> + Send + 'a
where
    T: DeserializeOwned + Send + 'a,
{
    stream::try_unfold((Some(first), 0_usize), move |(next, page_no)| async move {
        let Some(request) = next else {
            return Ok(None);
        };
        let (items, next) = fetch_page::<T>(transport, &request, page_no).await?;
        let items = stream::iter(items.into_iter().map(Ok::<T, FetchError>));
        Ok::<_, FetchError>(Some((items, (next, page_no + 1))))
    })
    .try_flatten()
}

async fn fetch_page<T: DeserializeOwned>(
    transport: &dyn LmsTransport,
    request: &PageRequest,
    page_no: usize,
) -> Result<(Vec<T>, Option<PageRequest>), FetchError> {
    let page = transport.get(request).await?;
    let items: Vec<T> = serde_json::from_slice(&page.body).map_err(MalformedResponseError::Body)?;
    let next = match page.link.as_deref() {
        Some(header) => parse_next_link(header)?
            .map(|url| PageRequest::from_cursor(transport.base_url(), &url))
            .transpose()?,
        None => None,
    };
    debug!(
        path = request.path(),
        page = page_no,
        items = items.len(),
        has_next = next.is_some(),
        "page fetched"
    );
    Ok((items, next))
}

/// Drain [`paginate`] into one vector, in page order then in-page order.
///
/// # Errors
///
/// Returns the first `FetchError` raised by any page.
pub async fn collect_all<T>(
    transport: &dyn LmsTransport,
    first: PageRequest,
) -> Result<Vec<T>, FetchError>
where
    T: DeserializeOwned + Send + 'static,
{
    paginate(transport, first).try_collect().await
}
