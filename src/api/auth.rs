//! Sign-in, registration and password change.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::client::{ApiClient, FetchOptions};
use super::types::{MessageResponse, TokenResponse, User};
use crate::credentials::Credentials;
use crate::error::{ClientError, Result};
use crate::validation;

pub struct AuthApi {
  client: ApiClient,
}

/// Claims read from the token payload. The signature is not verified here.
#[derive(Debug, Deserialize)]
struct TokenClaims {
  #[serde(default)]
  user_id: u64,
}

impl AuthApi {
  pub(crate) fn new(client: ApiClient) -> Self {
    Self { client }
  }

  /// Sign in and store the credentials. With `remember` they outlive the process.
  pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<User> {
    validation::sign_in(email, password)?;

    let response: TokenResponse = self
      .client
      .post_public(
        "/api/auth/login",
        &json!({ "email": email, "password": password, "remember_me": remember }),
      )
      .await
      .map_err(|e| match e {
        ClientError::Api { status: 401, .. } => ClientError::Api {
          status: 401,
          message: "Invalid email or password".to_string(),
        },
        other => other,
      })?;

    self.adopt(response, email, remember)
  }

  /// Create an account and sign in with it.
  pub async fn register(
    &self,
    email: &str,
    password: &str,
    name: Option<&str>,
    remember: bool,
  ) -> Result<User> {
    validation::sign_in(email, password)?;
    let name = name
      .map(str::to_string)
      .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

    let response: TokenResponse = self
      .client
      .post_public(
        "/api/auth/register",
        &json!({ "email": email, "password": password, "name": name }),
      )
      .await
      .map_err(|e| match e {
        ClientError::Api { status: 409, .. } => ClientError::Api {
          status: 409,
          message: "A user with this email already exists".to_string(),
        },
        other => other,
      })?;

    self.adopt(response, email, remember)
  }

  pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<String> {
    let response: MessageResponse = self
      .client
      .fetch(
        Method::POST,
        "/api/auth/change-password",
        Some(&json!({ "old_password": old_password, "new_password": new_password })),
        FetchOptions::uncached(),
      )
      .await?;

    if response.message.is_empty() {
      Ok("Password changed".to_string())
    } else {
      Ok(response.message)
    }
  }

  pub fn logout(&self) {
    self.client.auth_manager().logout();
  }

  pub fn current_user(&self) -> Option<User> {
    self.client.auth_manager().current_user()
  }

  fn adopt(&self, response: TokenResponse, email: &str, remember: bool) -> Result<User> {
    let user = match response.user {
      Some(user) => user,
      None => User {
        id: user_id_from_token(&response.token)?,
        email: email.to_string(),
        name: None,
      },
    };

    self.client.auth_manager().sign_in(
      Credentials {
        token: response.token,
        user: user.clone(),
      },
      remember,
    )?;
    Ok(user)
  }
}

/// Read `user_id` from the payload segment of a JWT.
fn user_id_from_token(token: &str) -> Result<u64> {
  let invalid = || ClientError::validation("Invalid authorization token");

  let payload = token.split('.').nth(1).ok_or_else(invalid)?;
  let bytes = URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .map_err(|_| invalid())?;
  let claims: TokenClaims = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
  Ok(claims.user_id)
}
