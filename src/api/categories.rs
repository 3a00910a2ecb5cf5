//! Category endpoints. Every mutation drops all cached `/api/categories` responses.

use reqwest::Method;
use serde_json::json;

use super::client::{ApiClient, FetchOptions};
use super::types::{Category, MessageResponse};
use crate::error::Result;
use crate::validation;

const CATEGORIES_ENDPOINT: &str = "/api/categories";

#[derive(Clone)]
pub struct CategoryApi {
  client: ApiClient,
}

impl CategoryApi {
  pub(crate) fn new(client: ApiClient) -> Self {
    Self { client }
  }

  pub async fn list(&self, force_refresh: bool) -> Result<Vec<Category>> {
    let options = FetchOptions::cached(self.client.ttl().categories()).refresh(force_refresh);
    let categories: Option<Vec<Category>> = self
      .client
      .fetch(Method::GET, CATEGORIES_ENDPOINT, None, options)
      .await?;
    Ok(categories.unwrap_or_default())
  }

  pub async fn create(&self, name: &str, color: &str) -> Result<Category> {
    validation::category(name, color)?;
    let category = self
      .client
      .fetch(
        Method::POST,
        "/api/categories/create",
        Some(&json!({ "name": name.trim(), "color": color })),
        FetchOptions::uncached(),
      )
      .await?;
    self.client.invalidate(CATEGORIES_ENDPOINT);
    Ok(category)
  }

  pub async fn update(&self, id: u64, name: &str, color: &str) -> Result<Category> {
    validation::category(name, color)?;
    let category = self
      .client
      .fetch(
        Method::POST,
        "/api/categories/update",
        Some(&json!({ "id": id, "name": name.trim(), "color": color })),
        FetchOptions::uncached(),
      )
      .await?;
    self.client.invalidate(CATEGORIES_ENDPOINT);
    Ok(category)
  }

  pub async fn delete(&self, id: u64) -> Result<String> {
    let response: MessageResponse = self
      .client
      .fetch(
        Method::POST,
        "/api/categories/delete",
        Some(&json!({ "id": id })),
        FetchOptions::uncached(),
      )
      .await?;
    self.client.invalidate(CATEGORIES_ENDPOINT);
    Ok(response.message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::signed_in_client;
  use crate::error::ClientError;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn categories_json() -> serde_json::Value {
    json!([
      {"id": 1, "user_id": 1, "name": "Work", "color": "#ff0000"},
      {"id": 2, "user_id": 1, "name": "Study", "color": "#00ff00"}
    ])
  }

  #[tokio::test]
  async fn test_list_hits_cache_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/categories"))
      .respond_with(ResponseTemplate::new(200).set_body_json(categories_json()))
      .expect(1)
      .mount(&server)
      .await;

    let api = signed_in_client(&server).categories();
    let first = api.list(false).await.unwrap();
    let second = api.list(false).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(first[0].color_hex, "#ff0000");
  }

  #[tokio::test]
  async fn test_create_invalidates_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/categories"))
      .respond_with(ResponseTemplate::new(200).set_body_json(categories_json()))
      .expect(2)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/api/categories/create"))
      .and(body_json(json!({"name": "Reading", "color": "#0000ff"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(
        json!({"id": 3, "user_id": 1, "name": "Reading", "color": "#0000ff"}),
      ))
      .expect(1)
      .mount(&server)
      .await;

    let api = signed_in_client(&server).categories();
    api.list(false).await.unwrap();

    let created = api.create(" Reading ", "#0000ff").await.unwrap();
    assert_eq!(created.id, 3);

    // Fresh network call after invalidation
    api.list(false).await.unwrap();
  }

  #[tokio::test]
  async fn test_null_list_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/categories"))
      .respond_with(ResponseTemplate::new(200).set_body_string("null"))
      .mount(&server)
      .await;

    let api = signed_in_client(&server).categories();
    assert!(api.list(false).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_invalid_color_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let api = signed_in_client(&server).categories();
    let err = api.create("Work", "red").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
  }
}
