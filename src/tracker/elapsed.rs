use chrono::{DateTime, Utc};

use crate::api::types::{SessionStatus, TimeSession};

/// Worked seconds of `session` as of `now`, never negative.
///
/// The end of the measured span depends on status:
/// - active: `now`
/// - paused: the server's `paused_at`, or `now` when the server omits it
///   (then any ongoing pause counts as worked time until the next refresh)
/// - completed: `end_time`, or `now` if missing
///
/// `total_paused_seconds` comes from the server and is always subtracted.
pub fn elapsed_seconds(session: &TimeSession, now: DateTime<Utc>) -> u64 {
  let until = match session.status {
    SessionStatus::Active => now,
    SessionStatus::Paused => session.paused_at.unwrap_or(now),
    SessionStatus::Completed => session.end_time.unwrap_or(now),
  };

  let span = (until - session.start_time).num_milliseconds().div_euclid(1000);
  let worked = span - session.total_paused_seconds;
  worked.max(0) as u64
}

/// `HH:MM:SS`, zero-padded, hours unbounded.
pub fn format_hms(seconds: u64) -> String {
  let hours = seconds / 3600;
  let minutes = (seconds % 3600) / 60;
  let secs = seconds % 60;
  format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn session(status: SessionStatus, total_paused: i64) -> TimeSession {
    TimeSession {
      id: 1,
      user_id: None,
      start_time: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
      end_time: None,
      paused_at: None,
      status,
      total_paused_seconds: total_paused,
      category_id: None,
      category: None,
    }
  }

  #[test]
  fn test_completed_session() {
    let mut s = session(SessionStatus::Completed, 600);
    s.end_time = Some(s.start_time + Duration::seconds(3600));

    let elapsed = elapsed_seconds(&s, Utc::now());
    assert_eq!(elapsed, 3000);
    assert_eq!(format_hms(elapsed), "00:50:00");
  }

  #[test]
  fn test_active_session_subtracts_pauses() {
    let s = session(SessionStatus::Active, 60);
    let now = s.start_time + Duration::milliseconds(125_900);
    assert_eq!(elapsed_seconds(&s, now), 65);
  }

  #[test]
  fn test_paused_session_uses_server_pause_instant() {
    let mut s = session(SessionStatus::Paused, 30);
    s.paused_at = Some(s.start_time + Duration::seconds(330));

    let much_later = s.start_time + Duration::hours(5);
    assert_eq!(elapsed_seconds(&s, much_later), 300);
  }

  #[test]
  fn test_paused_session_without_pause_instant_uses_now() {
    let s = session(SessionStatus::Paused, 30);
    let now = s.start_time + Duration::seconds(330);
    assert_eq!(elapsed_seconds(&s, now), 300);
  }

  #[test]
  fn test_floored_at_zero() {
    let s = session(SessionStatus::Active, 900);
    assert_eq!(elapsed_seconds(&s, s.start_time + Duration::seconds(10)), 0);
    // Clock skew: now before start
    assert_eq!(elapsed_seconds(&s, s.start_time - Duration::seconds(10)), 0);
  }

  #[test]
  fn test_format_hms() {
    assert_eq!(format_hms(0), "00:00:00");
    assert_eq!(format_hms(59), "00:00:59");
    assert_eq!(format_hms(3661), "01:01:01");
    assert_eq!(format_hms(100 * 3600 + 5), "100:00:05");
  }
}
