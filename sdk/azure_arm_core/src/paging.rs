//! Paged listings over ARM collection responses.
//!
//! ARM list operations return pages of the form
//! `{"value": [...], "nextLink": "https://..."}` where `nextLink` is an
//! absolute URL to GET for the next page. [`Pager`] walks that chain: the
//! first request uses the operation path (which carries its `api-version`),
//! continuations follow `nextLink` verbatim.
//!
//! # Examples
//!
//! ```rust,no_run
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_core::paging::Pager;
//! use futures::StreamExt;
//! # use serde::Deserialize;
//! # #[derive(Deserialize)]
//! # struct Automation { name: Option<String> }
//!
//! # async fn example(client: ArmClient) -> Result<(), Box<dyn std::error::Error>> {
//! let mut pager: Pager<Automation> = Pager::new(
//!     client,
//!     "/subscriptions/sub1/providers/Microsoft.Security/automations?api-version=2023-12-01-preview",
//! );
//!
//! // Page at a time:
//! while let Some(page) = pager.next_page().await {
//!     let page = page?;
//!     println!("{} items", page.value.len());
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::ArmClient;
use crate::error::ArmResult;
use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;

/// One page of an ARM list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// The items on this page. A page with no `value` array is empty.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,

    /// Absolute URL of the next page, if any.
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            next_link: None,
        }
    }
}

/// What the pager fetches next.
enum Continuation {
    /// The operation path of the first page.
    Path(String),
    /// The absolute `nextLink` of a follow-up page.
    NextLink(String),
}

/// Walks the pages of an ARM list operation.
///
/// A fetch error is yielded once and exhausts the pager; a poisoned
/// continuation is never retried silently.
pub struct Pager<T> {
    client: ArmClient,
    next: Option<Continuation>,
    _items: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Pager<T> {
    /// Create a pager for the list operation at `path`.
    ///
    /// The path must include its `api-version` query parameter, exactly as
    /// the service clients format it.
    pub fn new(client: ArmClient, path: impl Into<String>) -> Self {
        Self {
            client,
            next: Some(Continuation::Path(path.into())),
            _items: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Option<ArmResult<Page<T>>> {
        let target = self.next.take()?;

        let result: ArmResult<Page<T>> = async {
            let response = match &target {
                Continuation::Path(path) => self.client.get(path).await?,
                Continuation::NextLink(url) => self.client.get_absolute(url).await?,
            };
            let page = response.json::<Page<T>>().await?;
            Ok(page)
        }
        .await;

        if let Ok(page) = &result {
            self.next = page.next_link.clone().map(Continuation::NextLink);
            tracing::trace!(
                items = page.value.len(),
                has_more = self.next.is_some(),
                "fetched page"
            );
        }

        Some(result)
    }

    /// Flatten the pages into a stream of items.
    ///
    /// Page fetch errors appear as `Err` items; the stream ends after the
    /// last page (or after an error).
    pub fn into_stream(self) -> BoxStream<'static, ArmResult<T>>
    where
        T: Send + 'static,
    {
        stream::unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Some((page, pager))
        })
        .flat_map(|page| match page {
            Ok(page) => stream::iter(page.value.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(e) => stream::iter(vec![Err(e)]),
        })
        .boxed()
    }
}
