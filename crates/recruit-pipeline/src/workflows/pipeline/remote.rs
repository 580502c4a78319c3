//! HTTP client for a remote candidate store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::catalog::WorkflowAction;
use super::domain::{Candidate, CandidateId, PerformerId, Position};
use super::store::{
    ActionPerformer, ActionReceipt, CandidatePatch, CandidateStore, PositionDirectory,
    StoreError, StoreFilter,
};
use crate::config::StoreConfig;

/// Candidate store, action authority and position directory reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCandidateStore {
    client: Client,
    base_url: Url,
}

impl HttpCandidateStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| StoreError::Unavailable(format!("invalid store url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Unavailable(format!(
                "store url {base_url} cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// `None` when no remote store is configured.
    pub fn from_config(config: &StoreConfig) -> Result<Option<Self>, StoreError> {
        config
            .base_url
            .as_deref()
            .map(|url| Self::new(url, config.timeout))
            .transpose()
    }

    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(%method, %url, "candidate store request");
        self.client.request(method, url)
    }

    fn list_request(&self, filter: &StoreFilter) -> RequestBuilder {
        self.request(Method::GET, &["candidates"]).query(filter)
    }

    fn update_request(&self, id: &CandidateId, patch: &CandidatePatch) -> RequestBuilder {
        self.request(Method::PATCH, &["candidates", &id.0])
            .json(patch)
    }

    fn action_request(
        &self,
        id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> RequestBuilder {
        let body = json!({ "performerId": performer, "note": note });
        self.request(
            Method::POST,
            &["candidates", &id.0, "actions", action.as_str()],
        )
        .json(&body)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| StoreError::Unavailable(format!("malformed store response: {err}")))
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_status(status, &body))
    }
}

pub(crate) fn error_from_status(status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound;
    }

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            ["error", "message"]
                .into_iter()
                .find_map(|key| payload.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed.to_string()
            }
        });

    if status.is_client_error() {
        StoreError::Rejected { message }
    } else {
        StoreError::Unavailable(message)
    }
}

#[async_trait]
impl CandidateStore for HttpCandidateStore {
    async fn list(&self, filter: &StoreFilter) -> Result<Vec<Candidate>, StoreError> {
        Self::send(self.list_request(filter)).await
    }

    async fn get(&self, id: &CandidateId) -> Result<Candidate, StoreError> {
        Self::send(self.request(Method::GET, &["candidates", &id.0])).await
    }

    async fn update(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        Self::send(self.update_request(id, &patch)).await
    }

    async fn delete(&self, id: &CandidateId) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &["candidates", &id.0])
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl ActionPerformer for HttpCandidateStore {
    async fn perform_action(
        &self,
        id: &CandidateId,
        action: WorkflowAction,
        performer: &PerformerId,
        note: &str,
    ) -> Result<ActionReceipt, StoreError> {
        Self::send(self.action_request(id, action, performer, note)).await
    }
}

#[async_trait]
impl PositionDirectory for HttpCandidateStore {
    async fn positions(&self) -> Result<Vec<Position>, StoreError> {
        Self::send(self.request(Method::GET, &["positions"])).await
    }
}
