//! Page-at-a-time listing of a dataset's tables.

use crate::{
    client::{ApiRequest, Client, Method},
    errors::{DatasetError, DatasetResult},
    models::{reference::DatasetReference, table::Table},
};
use futures::{Stream, TryStreamExt, stream};
use serde_json::Value;
use tracing::debug;

/// One page of a table listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub tables: Vec<Table>,
    pub next_page_token: Option<String>,
}

impl IntoIterator for Page {
    type Item = Table;
    type IntoIter = std::vec::IntoIter<Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

/// Forward-only cursor over `GET .../datasets/{id}/tables`.
///
/// Each call to [`next_page`](Self::next_page) makes one request. After a
/// page is consumed, [`next_page_token`](Self::next_page_token) holds the
/// token to resume from; a listing can be picked up later by passing it to
/// `Dataset::list_tables`.
#[derive(Debug)]
pub struct TableIterator {
    client: Client,
    dataset: DatasetReference,
    max_results: Option<u32>,
    next_page_token: Option<String>,
    started: bool,
    page_number: usize,
    num_results: usize,
}

impl TableIterator {
    pub(crate) fn new(
        client: Client,
        dataset: DatasetReference,
        max_results: Option<u32>,
        page_token: Option<String>,
    ) -> Self {
        Self {
            client,
            dataset,
            max_results,
            next_page_token: page_token,
            started: false,
            page_number: 0,
            num_results: 0,
        }
    }

    /// The dataset being listed.
    pub fn dataset(&self) -> &DatasetReference {
        &self.dataset
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    /// Pages fetched so far.
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Tables returned so far.
    pub fn num_results(&self) -> usize {
        self.num_results
    }

    fn has_next_page(&self) -> bool {
        !self.started || self.next_page_token.is_some()
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> DatasetResult<Option<Page>> {
        if !self.has_next_page() {
            return Ok(None);
        }

        let mut request = ApiRequest::new(Method::Get, format!("{}/tables", self.dataset.path()));
        if let Some(max_results) = self.max_results {
            request = request.with_query("maxResults", max_results);
        }
        if let Some(token) = &self.next_page_token {
            request = request.with_query("pageToken", token);
        }
        debug!(path = %request.path, page = self.page_number, "listing tables");

        let response = self.client.execute(request).await?;
        let tables = match response.get("tables").and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .map(|item| Table::from_api_repr(item, &self.dataset))
                .collect::<DatasetResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        let next_page_token = response
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.started = true;
        self.page_number += 1;
        self.num_results += tables.len();
        self.next_page_token = next_page_token.clone();

        Ok(Some(Page {
            tables,
            next_page_token,
        }))
    }

    /// Flatten the remaining pages into a stream of tables.
    pub fn into_stream(self) -> impl Stream<Item = DatasetResult<Table>> {
        stream::try_unfold(self, |mut pages| async move {
            let page = pages.next_page().await?;
            Ok::<_, DatasetError>(page.map(|page| (page, pages)))
        })
        .map_ok(|page| stream::iter(page.tables.into_iter().map(Ok::<_, DatasetError>)))
        .try_flatten()
    }
}
