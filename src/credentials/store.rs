use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::api::types::User;
use crate::error::Result;

/// Token plus the user it was issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
  pub token: String,
  pub user: User,
}

/// Durable credential file. "Remember me" sign-ins are written here;
/// session-only sign-ins stay in memory and never touch the file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
  path: Option<PathBuf>,
}

impl CredentialStore {
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }

  /// A store without a backing file. Every sign-in is session-only.
  #[cfg(test)]
  pub fn memory_only() -> Self {
    Self { path: None }
  }

  /// `$XDG_DATA_HOME/punch/credentials.json`, if a data directory exists.
  pub fn default_location() -> Self {
    let path = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("punch").join("credentials.json"));
    Self { path }
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  /// Read saved credentials. A corrupt file is removed and treated as signed out.
  pub fn load(&self) -> Result<Option<Credentials>> {
    let Some(path) = &self.path else {
      return Ok(None);
    };
    if !path.exists() {
      return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    match serde_json::from_str(&contents) {
      Ok(credentials) => Ok(Some(credentials)),
      Err(e) => {
        tracing::warn!(path = %path.display(), error = %e, "discarding unreadable credentials");
        fs::remove_file(path)?;
        Ok(None)
      }
    }
  }

  /// Write credentials atomically via an owner-only temp file. The temp file
  /// is removed if any step fails.
  pub fn save(&self, credentials: &Credentials) -> Result<()> {
    let Some(path) = &self.path else {
      return Ok(());
    };
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(credentials)?;
    let temp_path = path.with_extension("tmp");
    let written =
      write_private(&temp_path, json.as_bytes()).and_then(|()| fs::rename(&temp_path, path));
    if let Err(e) = written {
      let _ = fs::remove_file(&temp_path);
      return Err(e.into());
    }

    Ok(())
  }

  pub fn remove(&self) -> Result<()> {
    if let Some(path) = &self.path {
      if path.exists() {
        fs::remove_file(path)?;
      }
    }
    Ok(())
  }
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
  let mut file = fs::File::create(path)?;
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
  }
  file.write_all(contents)?;
  file.sync_all()
}
