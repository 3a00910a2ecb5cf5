use color_eyre::Result;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::credentials::{AuthManager, CredentialStore};

/// Shared handles for one run: the signed-in state and the API client, both
/// over one response cache. Cloning is cheap.
#[derive(Clone)]
pub struct AppContext {
  pub auth: Arc<AuthManager>,
  pub api: ApiClient,
  /// Default for the "remember me" choice on sign-in
  pub remember_me: bool,
}

impl AppContext {
  pub fn new(config: &Config, store: CredentialStore) -> Result<Self> {
    let cache = Arc::new(ResponseCache::new());
    let auth = Arc::new(AuthManager::new(store, cache.clone())?);
    let api = ApiClient::new(
      &config.server.url,
      config.server.timeout(),
      auth.clone(),
      cache,
      config.cache,
    )?;

    tracing::info!(server = %api.base_url(), signed_in = auth.is_authenticated(), "client ready");

    Ok(Self {
      auth,
      api,
      remember_me: config.remember_me,
    })
  }

  pub fn user_label(&self) -> Option<String> {
    self
      .auth
      .current_user()
      .map(|u| u.name.filter(|n| !n.is_empty()).unwrap_or(u.email))
  }
}
