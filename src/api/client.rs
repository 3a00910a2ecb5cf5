//! HTTP client for the time tracker service with transparent response caching.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::auth::AuthApi;
use super::categories::CategoryApi;
use super::stats::StatsApi;
use super::time::TimeEntryApi;
use crate::cache::{CacheTtl, ResponseCache};
use crate::credentials::AuthManager;
use crate::error::{ClientError, Result};

/// Per-request caching behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
  /// Serve GETs from the cache and store successful GET responses
  pub use_cache: bool,
  /// Lifetime of a stored response; `None` keeps it until invalidated
  pub cache_ttl: Option<Duration>,
  /// Skip the cache lookup but still store the fresh response
  pub force_refresh: bool,
}

impl FetchOptions {
  pub fn uncached() -> Self {
    Self::default()
  }

  pub fn cached(ttl: Duration) -> Self {
    Self {
      use_cache: true,
      cache_ttl: Some(ttl),
      force_refresh: false,
    }
  }

  pub fn refresh(mut self, force_refresh: bool) -> Self {
    self.force_refresh = force_refresh;
    self
  }
}

/// API client shared by the tracker, the CLI and every view.
///
/// Clones share the HTTP connection pool, the auth manager and the cache.
#[derive(Clone)]
pub struct ApiClient {
  inner: Arc<ClientInner>,
}

struct ClientInner {
  http: reqwest::Client,
  base_url: Url,
  timeout: Duration,
  auth: Arc<AuthManager>,
  cache: Arc<ResponseCache>,
  ttl: CacheTtl,
}

impl ApiClient {
  pub fn new(
    base_url: &str,
    timeout: Duration,
    auth: Arc<AuthManager>,
    cache: Arc<ResponseCache>,
    ttl: CacheTtl,
  ) -> Result<Self> {
    let mut base_url = Url::parse(base_url)
      .map_err(|e| ClientError::Config(format!("invalid server url '{}': {}", base_url, e)))?;
    if !base_url.path().ends_with('/') {
      base_url.set_path(&format!("{}/", base_url.path()));
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .user_agent(format!("punch/{}", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      inner: Arc::new(ClientInner {
        http,
        base_url,
        timeout,
        auth,
        cache,
        ttl,
      }),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.inner.base_url
  }

  pub fn auth_manager(&self) -> &Arc<AuthManager> {
    &self.inner.auth
  }

  pub fn ttl(&self) -> &CacheTtl {
    &self.inner.ttl
  }

  pub fn auth(&self) -> AuthApi {
    AuthApi::new(self.clone())
  }

  pub fn time(&self) -> TimeEntryApi {
    TimeEntryApi::new(self.clone())
  }

  pub fn categories(&self) -> CategoryApi {
    CategoryApi::new(self.clone())
  }

  pub fn stats(&self) -> StatsApi {
    StatsApi::new(self.clone())
  }

  /// Two requests share a cache entry iff method, endpoint and body match.
  fn cache_key(method: &Method, endpoint: &str, body: Option<&Value>) -> String {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    format!("{}:{}:{}", method, endpoint, body)
  }

  fn url(&self, endpoint: &str) -> Result<Url> {
    self
      .inner
      .base_url
      .join(endpoint.trim_start_matches('/'))
      .map_err(|e| ClientError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))
  }

  /// Authenticated request with optional caching of GET responses.
  pub(crate) async fn fetch<T: DeserializeOwned>(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<&Value>,
    options: FetchOptions,
  ) -> Result<T> {
    let cacheable = options.use_cache && method == Method::GET;
    let key = Self::cache_key(&method, endpoint, body);

    if cacheable && !options.force_refresh {
      if let Some(cached) = self.inner.cache.get(&key) {
        tracing::debug!(endpoint, "cache hit");
        return Ok(serde_json::from_value(cached)?);
      }
    }

    let Some(token) = self.inner.auth.token() else {
      tracing::warn!(endpoint, "request without credentials");
      self.inner.auth.handle_auth_error();
      return Err(ClientError::AuthRequired);
    };

    tracing::debug!(%method, endpoint, "request");
    let mut request = self
      .inner
      .http
      .request(method, self.url(endpoint)?)
      .header(AUTHORIZATION, format!("Bearer {}", token))
      .timeout(self.inner.timeout);
    if let Some(body) = body {
      request = request.json(body);
    }
    let response = request.send().await?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      tracing::warn!(endpoint, status = status.as_u16(), "authorization rejected");
      self.inner.auth.handle_auth_error();
      return Err(ClientError::AuthRequired);
    }
    if !status.is_success() {
      let err = Self::extract_error(response).await;
      tracing::warn!(endpoint, status = status.as_u16(), error = %err, "request failed");
      return Err(err);
    }

    let value = Self::read_json(response).await?;
    // Only bodies that decode are worth caching
    let decoded = serde_json::from_value(value.clone())?;
    if cacheable {
      tracing::debug!(endpoint, "caching response");
      self.inner.cache.set(key, value, options.cache_ttl);
    }
    Ok(decoded)
  }

  /// Unauthenticated POST used by sign-in and registration.
  pub(crate) async fn post_public<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    body: &Value,
  ) -> Result<T> {
    tracing::debug!(endpoint, "public request");
    let response = self
      .inner
      .http
      .post(self.url(endpoint)?)
      .json(body)
      .timeout(self.inner.timeout)
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(Self::extract_error(response).await);
    }
    Ok(serde_json::from_value(Self::read_json(response).await?)?)
  }

  /// Remove every cached response whose key contains `endpoint`.
  pub fn invalidate(&self, endpoint: &str) {
    self.inner.cache.clear(Some(endpoint));
  }

  async fn read_json(response: Response) -> Result<Value> {
    let text = response.text().await?;
    if text.trim().is_empty() {
      return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(&text)?)
  }

  async fn extract_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    ClientError::Api {
      status,
      message: error_message(status, &text),
    }
  }
}

/// The server's `message` (or `error`) field, the raw body, or a generic fallback.
fn error_message(status: u16, body: &str) -> String {
  if let Ok(value) = serde_json::from_str::<Value>(body) {
    let field = value
      .get("message")
      .or_else(|| value.get("error"))
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|m| !m.is_empty());
    if let Some(message) = field {
      return message.to_string();
    }
  }

  let trimmed = body.trim();
  if trimmed.is_empty() || trimmed.starts_with('{') {
    format!("API error: {}", status)
  } else {
    trimmed.to_string()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::credentials::{CredentialStore, Credentials};
  use crate::api::types::User;
  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  /// Client against `server` with an in-memory sign-in.
  pub(crate) fn signed_in_client(server: &MockServer) -> ApiClient {
    let client = anonymous_client(server);
    client
      .auth_manager()
      .sign_in(
        Credentials {
          token: "test-token".to_string(),
          user: User {
            id: 1,
            email: "test@example.com".to_string(),
            name: None,
          },
        },
        false,
      )
      .unwrap();
    client
  }

  pub(crate) fn anonymous_client(server: &MockServer) -> ApiClient {
    let cache = Arc::new(ResponseCache::new());
    let auth = Arc::new(AuthManager::new(CredentialStore::memory_only(), cache.clone()).unwrap());
    ApiClient::new(
      &server.uri(),
      Duration::from_secs(5),
      auth,
      cache,
      CacheTtl::default(),
    )
    .unwrap()
  }

  #[test]
  fn test_error_message_fallbacks() {
    assert_eq!(error_message(400, r#"{"message":"bad input"}"#), "bad input");
    assert_eq!(error_message(400, r#"{"error":"nope"}"#), "nope");
    assert_eq!(error_message(409, "entry exists\n"), "entry exists");
    assert_eq!(error_message(500, ""), "API error: 500");
    assert_eq!(error_message(500, "{}"), "API error: 500");
  }

  #[test]
  fn test_cache_key_components() {
    let body = json!({"entry_id": 1});
    assert_eq!(
      ApiClient::cache_key(&Method::GET, "/api/categories", None),
      "GET:/api/categories:"
    );
    assert_eq!(
      ApiClient::cache_key(&Method::POST, "/api/time/pause", Some(&body)),
      r#"POST:/api/time/pause:{"entry_id":1}"#
    );
  }

  #[test]
  fn test_base_url_keeps_path_prefix() {
    let cache = Arc::new(ResponseCache::new());
    let auth = Arc::new(AuthManager::new(CredentialStore::memory_only(), cache.clone()).unwrap());
    let client = ApiClient::new(
      "http://example.com/tracker",
      Duration::from_secs(1),
      auth,
      cache,
      CacheTtl::default(),
    )
    .unwrap();

    assert_eq!(
      client.url("/api/time/status").unwrap().as_str(),
      "http://example.com/tracker/api/time/status"
    );
  }

  #[tokio::test]
  async fn test_fetch_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/time/status"))
      .and(header("authorization", "Bearer test-token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "no_active_entry"})))
      .expect(1)
      .mount(&server)
      .await;

    let client = signed_in_client(&server);
    let value: Value = client
      .fetch(Method::GET, "/api/time/status", None, FetchOptions::uncached())
      .await
      .unwrap();
    assert_eq!(value["status"], "no_active_entry");
  }

  #[tokio::test]
  async fn test_unauthorized_forces_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/categories"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let client = signed_in_client(&server);
    let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let fired_clone = fired.clone();
    client.auth_manager().on_auth_required(move || {
      fired_clone.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    let err = client
      .fetch::<Value>(Method::GET, "/api/categories", None, FetchOptions::uncached())
      .await
      .unwrap_err();
    assert!(err.is_auth_required());
    assert!(!client.auth_manager().is_authenticated());
    assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
  }

  #[tokio::test]
  async fn test_forbidden_clears_session_and_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/categories"))
      .respond_with(ResponseTemplate::new(403))
      .mount(&server)
      .await;

    let client = signed_in_client(&server);
    client
      .inner
      .cache
      .set("GET:/api/time/status:", json!({"status": "no_active_entry"}), None);

    let err = client
      .fetch::<Value>(Method::GET, "/api/categories", None, FetchOptions::uncached())
      .await
      .unwrap_err();
    assert!(err.is_auth_required());
    assert!(!client.auth_manager().is_authenticated());
    assert!(client.inner.cache.is_empty());
  }

  #[tokio::test]
  async fn test_missing_token_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let client = anonymous_client(&server);
    let err = client
      .fetch::<Value>(Method::GET, "/api/categories", None, FetchOptions::uncached())
      .await
      .unwrap_err();
    assert!(err.is_auth_required());
  }

  #[tokio::test]
  async fn test_api_error_uses_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/time/start"))
      .respond_with(ResponseTemplate::new(409).set_body_string("active entry exists\n"))
      .mount(&server)
      .await;

    let client = signed_in_client(&server);
    let err = client
      .fetch::<Value>(Method::POST, "/api/time/start", None, FetchOptions::uncached())
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.to_string(), "active entry exists");
    assert!(client.auth_manager().is_authenticated());
  }

  #[tokio::test]
  async fn test_force_refresh_bypasses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/categories"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .expect(2)
      .mount(&server)
      .await;

    let client = signed_in_client(&server);
    let options = FetchOptions::cached(Duration::from_secs(60));
    let _: Value = client
      .fetch(Method::GET, "/api/categories", None, options)
      .await
      .unwrap();
    let _: Value = client
      .fetch(Method::GET, "/api/categories", None, options.refresh(true))
      .await
      .unwrap();
  }
}
