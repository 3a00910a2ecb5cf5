//! Time entry endpoints.

use reqwest::Method;
use serde_json::json;

use super::client::{ApiClient, FetchOptions};
use super::types::{MessageResponse, StatusResponse, TimeSession};
use crate::error::Result;

const STATUS_ENDPOINT: &str = "/api/time/status";

#[derive(Clone)]
pub struct TimeEntryApi {
  client: ApiClient,
}

impl TimeEntryApi {
  pub(crate) fn new(client: ApiClient) -> Self {
    Self { client }
  }

  /// The user's running (active or paused) session, if any.
  pub async fn status(&self, force_refresh: bool) -> Result<Option<TimeSession>> {
    let options = FetchOptions::cached(self.client.ttl().session_status()).refresh(force_refresh);
    let response: StatusResponse = self
      .client
      .fetch(Method::GET, STATUS_ENDPOINT, None, options)
      .await?;
    Ok(response.into_session())
  }

  pub async fn start(&self, category_id: Option<u64>) -> Result<TimeSession> {
    let body = category_id.map(|id| json!({ "category_id": id }));
    self
      .mutate("/api/time/start", body.as_ref())
      .await
  }

  pub async fn pause(&self, entry_id: u64) -> Result<TimeSession> {
    self
      .mutate("/api/time/pause", Some(&json!({ "entry_id": entry_id })))
      .await
  }

  pub async fn resume(&self, entry_id: u64) -> Result<TimeSession> {
    self
      .mutate("/api/time/resume", Some(&json!({ "entry_id": entry_id })))
      .await
  }

  pub async fn stop(&self, entry_id: u64) -> Result<TimeSession> {
    self
      .mutate("/api/time/stop", Some(&json!({ "entry_id": entry_id })))
      .await
  }

  pub async fn delete(&self, entry_id: u64) -> Result<String> {
    let response: MessageResponse = self
      .mutate("/api/time/delete", Some(&json!({ "entry_id": entry_id })))
      .await?;
    Ok(response.message)
  }

  /// POST and drop the cached status, whatever the outcome.
  async fn mutate<T: serde::de::DeserializeOwned>(
    &self,
    endpoint: &str,
    body: Option<&serde_json::Value>,
  ) -> Result<T> {
    let result = self
      .client
      .fetch(Method::POST, endpoint, body, FetchOptions::uncached())
      .await;
    self.client.invalidate(STATUS_ENDPOINT);
    result
  }
}
