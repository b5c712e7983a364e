//! Dataset lifecycle against the service: create, exists, reload, patch,
//! update, delete and table listing.
//!
//! Every operation issues exactly one request. The `*_with` forms send it
//! through another client; the plain forms use the dataset's own. On success
//! the local fields are replaced from the response as a whole.

use crate::{
    client::{ApiRequest, Client, Method},
    errors::{DatasetError, DatasetResult},
    models::{dataset::Dataset, patch::DatasetPatch},
    services::pagination::TableIterator,
};
use serde_json::Value;
use tracing::debug;

impl Dataset {
    /// POST `/projects/{project}/datasets`
    pub async fn create(&mut self) -> DatasetResult<()> {
        let client = self.client().clone();
        self.create_with(&client).await
    }

    pub async fn create_with(&mut self, client: &Client) -> DatasetResult<()> {
        let path = format!("/projects/{}/datasets", self.project());
        debug!(%path, dataset_id = self.dataset_id(), "creating dataset");
        let request = ApiRequest::new(Method::Post, path).with_body(self.to_api_repr()?);
        let resource = client.execute(request).await?;
        self.set_properties(&resource)
    }

    /// GET with `fields=id`. A NotFound answer means `false`; every other
    /// error is returned.
    pub async fn exists(&self) -> DatasetResult<bool> {
        self.exists_with(self.client()).await
    }

    pub async fn exists_with(&self, client: &Client) -> DatasetResult<bool> {
        let request = ApiRequest::new(Method::Get, self.path()).with_query("fields", "id");
        match client.execute(request).await {
            Ok(_) => Ok(true),
            Err(DatasetError::NotFound(msg)) => {
                debug!(path = %self.path(), "dataset missing: {}", msg);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// GET the dataset and refresh every field.
    pub async fn reload(&mut self) -> DatasetResult<()> {
        let client = self.client().clone();
        self.reload_with(&client).await
    }

    pub async fn reload_with(&mut self, client: &Client) -> DatasetResult<()> {
        let path = self.path();
        debug!(%path, "reloading dataset");
        let resource = client.execute(ApiRequest::new(Method::Get, path)).await?;
        self.set_properties(&resource)
    }

    /// PATCH only the fields named in `patch`.
    ///
    /// The overrides are applied to a staged copy and sent. Local state is
    /// replaced from the response only once the request succeeds.
    pub async fn patch(&mut self, patch: &DatasetPatch) -> DatasetResult<()> {
        let client = self.client().clone();
        self.patch_with(&client, patch).await
    }

    pub async fn patch_with(&mut self, client: &Client, patch: &DatasetPatch) -> DatasetResult<()> {
        let mut staged = self.clone();
        patch.apply(&mut staged);
        let path = staged.path();
        debug!(%path, "patching dataset");
        let request = ApiRequest::new(Method::Patch, path).with_body(patch.to_api_repr());
        let resource = client.execute(request).await?;
        staged.set_properties(&resource)?;
        *self = staged;
        Ok(())
    }

    /// PATCH from untyped overrides (see [`DatasetPatch::from_json`]).
    ///
    /// Invalid overrides fail with `InvalidArgument` before any request.
    pub async fn patch_json(&mut self, overrides: &Value) -> DatasetResult<()> {
        let patch = DatasetPatch::from_json(overrides)?;
        self.patch(&patch).await
    }

    /// PUT the full local representation.
    pub async fn update(&mut self) -> DatasetResult<()> {
        let client = self.client().clone();
        self.update_with(&client).await
    }

    pub async fn update_with(&mut self, client: &Client) -> DatasetResult<()> {
        let path = self.path();
        debug!(%path, "updating dataset");
        let request = ApiRequest::new(Method::Put, path).with_body(self.to_api_repr()?);
        let resource = client.execute(request).await?;
        self.set_properties(&resource)
    }

    /// DELETE the dataset. Local fields are left as they were.
    pub async fn delete(&self) -> DatasetResult<()> {
        self.delete_with(self.client()).await
    }

    pub async fn delete_with(&self, client: &Client) -> DatasetResult<()> {
        let path = self.path();
        debug!(%path, "deleting dataset");
        client.execute(ApiRequest::new(Method::Delete, path)).await?;
        Ok(())
    }

    /// Page through the dataset's tables. No request is made until the first
    /// page is pulled.
    ///
    /// `max_results` falls back to the client's configured page size.
    pub fn list_tables(&self, max_results: Option<u32>, page_token: Option<String>) -> TableIterator {
        self.list_tables_with(self.client(), max_results, page_token)
    }

    pub fn list_tables_with(
        &self,
        client: &Client,
        max_results: Option<u32>,
        page_token: Option<String>,
    ) -> TableIterator {
        TableIterator::new(
            client.clone(),
            self.reference(),
            max_results.or(client.page_size()),
            page_token,
        )
    }
}
