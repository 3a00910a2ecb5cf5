//! Wire types exchanged with the time tracker service.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a tracked session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  Active,
  Paused,
  Completed,
}

/// One tracked span of work time (`TimeEntry` on the wire)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSession {
  pub id: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<u64>,
  pub start_time: DateTime<Utc>,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub end_time: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub paused_at: Option<DateTime<Utc>>,
  pub status: SessionStatus,
  /// Cumulative paused seconds, maintained by the server
  #[serde(default, rename = "total_paused")]
  pub total_paused_seconds: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category_id: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<Category>,
}

impl TimeSession {
  /// Whether the session is still running (active or paused)
  pub fn is_open(&self) -> bool {
    self.status != SessionStatus::Completed
  }

  /// Category name if the server embedded the category
  pub fn category_name(&self) -> Option<&str> {
    self.category.as_ref().map(|c| c.name.as_str())
  }
}

/// Accepts `null`, a missing field, or the zero timestamp the service emits
/// for unset times (`0001-01-01T00:00:00Z`) as absent.
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let value: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
  Ok(value.filter(|t| t.year() > 1))
}

/// Marker body of `GET /api/time/status` when nothing is running
pub const NO_ACTIVE_ENTRY: &str = "no_active_entry";

/// Body of `GET /api/time/status`: a session or the `no_active_entry` marker.
/// Anything else fails to decode rather than reading as "no session".
#[derive(Debug, Clone, PartialEq)]
pub enum StatusResponse {
  Session(TimeSession),
  NoActiveEntry,
}

impl<'de> Deserialize<'de> for StatusResponse {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = serde_json::Value::deserialize(deserializer)?;
    let is_marker = value.get("id").is_none()
      && value.get("status").and_then(|s| s.as_str()) == Some(NO_ACTIVE_ENTRY);
    if is_marker {
      return Ok(StatusResponse::NoActiveEntry);
    }
    TimeSession::deserialize(value)
      .map(StatusResponse::Session)
      .map_err(serde::de::Error::custom)
  }
}

impl StatusResponse {
  /// The running session, if any.
  pub fn into_session(self) -> Option<TimeSession> {
    match self {
      StatusResponse::Session(session) => Some(session),
      StatusResponse::NoActiveEntry => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id: u64,
  pub name: String,
  #[serde(rename = "color")]
  pub color_hex: String,
  #[serde(default, rename = "user_id")]
  pub owner_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

/// Response of login and register. Older servers return only the token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
  pub token: String,
  #[serde(default)]
  pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
  #[serde(default)]
  pub message: String,
}

/// Aggregates returned by `GET /api/stats/custom`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeStats {
  #[serde(default)]
  pub total_duration: i64,
  #[serde(default)]
  pub average_daily_hours: f64,
  #[serde(default)]
  pub longest_session: i64,
  #[serde(default)]
  pub longest_session_date: String,
  /// Seconds worked per `YYYY-MM-DD`
  #[serde(default)]
  pub daily_stats: BTreeMap<String, i64>,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub entries: Vec<TimeSession>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_session_from_status_endpoint() {
    let json = r#"{
      "id": 12,
      "status": "paused",
      "start_time": "2024-03-01T09:00:00Z",
      "paused_at": "2024-03-01T10:00:00Z",
      "total_paused": 120,
      "duration": 3480
    }"#;
    let session: TimeSession = serde_json::from_str(json).unwrap();
    assert_eq!(session.id, 12);
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.total_paused_seconds, 120);
    assert!(session.end_time.is_none());
    assert!(session.paused_at.is_some());
  }

  #[test]
  fn test_zero_timestamp_is_absent() {
    let json = r##"{
      "id": 1,
      "user_id": 3,
      "status": "active",
      "start_time": "2024-03-01T09:00:00+03:00",
      "end_time": "0001-01-01T00:00:00Z",
      "paused_at": null,
      "total_paused": 0,
      "category_id": 4,
      "category": {"id": 4, "user_id": 3, "name": "Work", "color": "#ff0000"}
    }"##;
    let session: TimeSession = serde_json::from_str(json).unwrap();
    assert!(session.end_time.is_none());
    assert!(session.paused_at.is_none());
    assert_eq!(session.category_name(), Some("Work"));
    assert_eq!(session.category.unwrap().color_hex, "#ff0000");
  }

  #[test]
  fn test_no_active_entry_marker() {
    let status: StatusResponse = serde_json::from_str(r#"{"status": "no_active_entry"}"#).unwrap();
    assert_eq!(status.into_session(), None);
  }

  #[test]
  fn test_malformed_status_is_an_error() {
    let bad_timestamp = r#"{"id": 5, "status": "active", "start_time": "2024-03-01 09:00:00", "total_paused": 0}"#;
    assert!(serde_json::from_str::<StatusResponse>(bad_timestamp).is_err());

    let unknown_marker = r#"{"status": "maintenance"}"#;
    assert!(serde_json::from_str::<StatusResponse>(unknown_marker).is_err());
  }

  #[test]
  fn test_stats_tolerate_missing_fields() {
    let stats: TimeStats =
      serde_json::from_str(r#"{"total_duration": 3600, "entries": null}"#).unwrap();
    assert_eq!(stats.total_duration, 3600);
    assert!(stats.entries.is_empty());
    assert!(stats.daily_stats.is_empty());
  }
}
