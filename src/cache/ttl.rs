use serde::Deserialize;
use std::time::Duration;

/// Time-to-live per kind of cached response, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheTtl {
  pub categories_secs: u64,
  pub statistics_secs: u64,
  pub session_status_secs: u64,
}

impl Default for CacheTtl {
  fn default() -> Self {
    Self {
      categories_secs: 5 * 60,
      statistics_secs: 15 * 60,
      session_status_secs: 30,
    }
  }
}

impl CacheTtl {
  pub fn categories(&self) -> Duration {
    Duration::from_secs(self.categories_secs)
  }

  pub fn statistics(&self) -> Duration {
    Duration::from_secs(self.statistics_secs)
  }

  pub fn session_status(&self) -> Duration {
    Duration::from_secs(self.session_status_secs)
  }
}
