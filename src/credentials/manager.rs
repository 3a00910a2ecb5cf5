use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::store::{CredentialStore, Credentials};
use crate::api::types::User;
use crate::cache::ResponseCache;
use crate::error::Result;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Owns the signed-in state for one application run.
///
/// The shell registers an explicit auth-required callback instead of
/// listening for a global event; logout clears the stored credentials and
/// the whole response cache.
pub struct AuthManager {
  current: RwLock<Option<Credentials>>,
  store: CredentialStore,
  cache: Arc<ResponseCache>,
  listeners: Mutex<Vec<Callback>>,
  on_auth_required: Mutex<Option<Callback>>,
}

impl AuthManager {
  /// Create a manager, restoring durable credentials if any were saved.
  pub fn new(store: CredentialStore, cache: Arc<ResponseCache>) -> Result<Self> {
    let current = store.load()?;
    if let Some(credentials) = &current {
      tracing::info!(user = %credentials.user.email, "restored saved credentials");
    }

    Ok(Self {
      current: RwLock::new(current),
      store,
      cache,
      listeners: Mutex::new(Vec::new()),
      on_auth_required: Mutex::new(None),
    })
  }

  pub fn token(&self) -> Option<String> {
    self.read().as_ref().map(|c| c.token.clone())
  }

  pub fn current_user(&self) -> Option<User> {
    self.read().as_ref().map(|c| c.user.clone())
  }

  pub fn is_authenticated(&self) -> bool {
    self.read().is_some()
  }

  /// Adopt new credentials. With `remember` they are also written to disk;
  /// otherwise any previously saved file is removed so they end with the process.
  pub fn sign_in(&self, credentials: Credentials, remember: bool) -> Result<()> {
    if remember {
      self.store.save(&credentials)?;
    } else {
      self.store.remove()?;
    }
    tracing::info!(user = %credentials.user.email, remember, "signed in");
    *self.write() = Some(credentials);
    self.notify();
    Ok(())
  }

  /// Forget the credentials everywhere and drop every cached response.
  pub fn logout(&self) {
    *self.write() = None;
    if let Err(e) = self.store.remove() {
      tracing::warn!(error = %e, "failed to remove saved credentials");
    }
    self.cache.clear(None);
    tracing::info!("signed out");
    self.notify();
  }

  /// Called on a missing token or a 401/403: log out, then tell the shell.
  pub fn handle_auth_error(&self) {
    self.logout();
    let callback = self
      .on_auth_required
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    if let Some(callback) = callback {
      callback();
    }
  }

  /// Register the shell's reaction to an expired or missing sign-in.
  pub fn on_auth_required(&self, callback: impl Fn() + Send + Sync + 'static) {
    *self
      .on_auth_required
      .lock()
      .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
  }

  /// Observe every sign-in and sign-out.
  pub fn add_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
    self
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Arc::new(listener));
  }

  fn notify(&self) {
    let listeners = self
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    for listener in listeners {
      listener();
    }
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Credentials>> {
    self.current.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Credentials>> {
    self.current.write().unwrap_or_else(PoisonError::into_inner)
  }
}

impl std::fmt::Debug for AuthManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AuthManager")
      .field("user", &self.current_user())
      .field("store", &self.store)
      .finish_non_exhaustive()
  }
}
