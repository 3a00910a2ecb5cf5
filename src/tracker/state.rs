use chrono::{DateTime, Utc};
use thiserror::Error;

use super::elapsed::{elapsed_seconds, format_hms};
use super::ticker::Ticker;
use crate::api::types::{SessionStatus, TimeSession};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
  NoSession,
  Active,
  Paused,
  Completed,
}

impl TimerState {
  pub fn label(&self) -> &'static str {
    match self {
      TimerState::NoSession => "No session",
      TimerState::Active => "Active",
      TimerState::Paused => "Paused",
      TimerState::Completed => "Completed",
    }
  }

  /// Active and Paused sessions block a new start.
  pub fn is_running(&self) -> bool {
    matches!(self, TimerState::Active | TimerState::Paused)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Load,
  Start,
  Pause,
  Resume,
  Stop,
  Delete,
}

impl Transition {
  pub fn progress_label(&self) -> &'static str {
    match self {
      Transition::Load => "Loading...",
      Transition::Start => "Starting...",
      Transition::Pause => "Pausing...",
      Transition::Resume => "Resuming...",
      Transition::Stop => "Stopping...",
      Transition::Delete => "Deleting...",
    }
  }
}

/// A transition refused locally, before any request is sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
  #[error("a session is already running")]
  SessionInProgress,
  #[error("there is no running session")]
  NoSession,
  #[error("the session is not active")]
  NotActive,
  #[error("the session is not paused")]
  NotPaused,
  #[error("stopping must be confirmed first")]
  NoPendingStop,
  #[error("the confirmation belongs to another session")]
  StaleConfirmation,
  #[error("another request is still in progress")]
  Busy,
}

/// Proof that the user confirmed stopping a particular session.
///
/// Only [`SessionTracker::confirm_stop`] creates one, and stopping consumes it.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct StopConfirmation {
  session_id: u64,
}

impl StopConfirmation {
  pub fn session_id(&self) -> u64 {
    self.session_id
  }
}

/// Local view of the user's current session.
///
/// Requests are split into `begin_*` (local validation, returns the entry
/// id to send) and `finish*` (adopt the server's answer). Between the two
/// the tracker is busy and refuses further transitions. Any failure keeps
/// the previous record, stops the tick and keeps a message for display.
#[derive(Debug, Default)]
pub struct SessionTracker {
  session: Option<TimeSession>,
  last_completed: Option<TimeSession>,
  elapsed: u64,
  ticker: Ticker,
  in_flight: Option<Transition>,
  pending_stop: Option<u64>,
  error: Option<String>,
}

impl SessionTracker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> TimerState {
    match self.session.as_ref().map(|s| s.status) {
      None => TimerState::NoSession,
      Some(SessionStatus::Active) => TimerState::Active,
      Some(SessionStatus::Paused) => TimerState::Paused,
      Some(SessionStatus::Completed) => TimerState::Completed,
    }
  }

  pub fn session(&self) -> Option<&TimeSession> {
    self.session.as_ref()
  }

  /// The session most recently stopped through this tracker.
  pub fn last_completed(&self) -> Option<&TimeSession> {
    self.last_completed.as_ref()
  }

  pub fn elapsed_hms(&self) -> String {
    format_hms(self.elapsed)
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  pub fn in_flight(&self) -> Option<Transition> {
    self.in_flight
  }

  pub fn is_ticking(&self) -> bool {
    self.ticker.is_running()
  }

  pub fn is_stop_pending(&self) -> bool {
    self.pending_stop.is_some()
  }

  pub fn begin_load(&mut self) -> std::result::Result<(), TransitionError> {
    self.begin(Transition::Load)
  }

  pub fn begin_start(&mut self) -> std::result::Result<(), TransitionError> {
    if self.state().is_running() {
      return Err(TransitionError::SessionInProgress);
    }
    self.begin(Transition::Start)
  }

  pub fn begin_pause(&mut self) -> std::result::Result<u64, TransitionError> {
    let id = match (self.state(), &self.session) {
      (TimerState::Active, Some(session)) => session.id,
      (TimerState::NoSession | TimerState::Completed, _) => return Err(TransitionError::NoSession),
      _ => return Err(TransitionError::NotActive),
    };
    self.begin(Transition::Pause)?;
    self.ticker.stop();
    Ok(id)
  }

  pub fn begin_resume(&mut self) -> std::result::Result<u64, TransitionError> {
    let id = match (self.state(), &self.session) {
      (TimerState::Paused, Some(session)) => session.id,
      (TimerState::NoSession | TimerState::Completed, _) => return Err(TransitionError::NoSession),
      _ => return Err(TransitionError::NotPaused),
    };
    self.begin(Transition::Resume)?;
    Ok(id)
  }

  /// First half of stopping: ask the user.
  pub fn request_stop(&mut self) -> std::result::Result<(), TransitionError> {
    let id = self.running_id()?;
    self.pending_stop = Some(id);
    Ok(())
  }

  pub fn cancel_stop(&mut self) {
    self.pending_stop = None;
  }

  /// Second half of stopping: the user said yes.
  pub fn confirm_stop(&mut self) -> std::result::Result<StopConfirmation, TransitionError> {
    let pending = self.pending_stop.take().ok_or(TransitionError::NoPendingStop)?;
    if self.running_id()? != pending {
      return Err(TransitionError::StaleConfirmation);
    }
    Ok(StopConfirmation { session_id: pending })
  }

  pub fn begin_stop(&mut self, confirmation: StopConfirmation) -> std::result::Result<u64, TransitionError> {
    let id = self.running_id()?;
    if confirmation.session_id != id {
      return Err(TransitionError::StaleConfirmation);
    }
    self.begin(Transition::Stop)?;
    self.ticker.stop();
    Ok(id)
  }

  /// Delete the locally known session, running or not.
  pub fn begin_delete(&mut self) -> std::result::Result<u64, TransitionError> {
    let id = self.session.as_ref().map(|s| s.id).ok_or(TransitionError::NoSession)?;
    self.begin(Transition::Delete)?;
    Ok(id)
  }

  /// Adopt the result of `GET /api/time/status`.
  pub fn finish_load(&mut self, result: Result<Option<TimeSession>>, now: DateTime<Utc>) -> Result<()> {
    self.in_flight = None;
    match result {
      Ok(session) => {
        self.error = None;
        self.adopt(session, now);
        if self.state() == TimerState::Active {
          self.ticker.start();
        } else {
          self.ticker.stop();
        }
        Ok(())
      }
      Err(e) => Err(self.fail(e)),
    }
  }

  /// Adopt the server's answer to start, pause, resume or stop.
  pub fn finish(&mut self, transition: Transition, result: Result<TimeSession>, now: DateTime<Utc>) -> Result<()> {
    self.in_flight = None;
    let session = match result {
      Ok(session) => session,
      Err(e) => return Err(self.fail(e)),
    };
    self.error = None;

    match transition {
      Transition::Start => {
        self.pending_stop = None;
        self.session = Some(session);
        self.elapsed = 0;
        self.ticker.start();
      }
      Transition::Pause => {
        self.adopt(Some(session), now);
        self.ticker.stop();
      }
      Transition::Resume => {
        self.adopt(Some(session), now);
        self.ticker.start();
      }
      Transition::Stop => {
        tracing::info!(id = session.id, "session stopped");
        self.ticker.stop();
        self.pending_stop = None;
        self.session = None;
        self.elapsed = 0;
        self.last_completed = Some(session);
      }
      Transition::Load | Transition::Delete => {
        self.adopt(Some(session), now);
      }
    }
    Ok(())
  }

  /// Forget session `id` locally once the server deleted it.
  pub fn finish_delete(&mut self, id: u64, result: Result<String>) -> Result<String> {
    self.in_flight = None;
    match result {
      Ok(message) => {
        self.error = None;
        if self.session.as_ref().is_some_and(|s| s.id == id) {
          self.ticker.stop();
          self.pending_stop = None;
          self.session = None;
          self.elapsed = 0;
        }
        if self.last_completed.as_ref().is_some_and(|s| s.id == id) {
          self.last_completed = None;
        }
        Ok(message)
      }
      Err(e) => Err(self.fail(e)),
    }
  }

  /// Apply queued display ticks. Returns whether anything changed.
  pub fn tick(&mut self) -> bool {
    let ticks = self.ticker.drain();
    if ticks == 0 || self.state() != TimerState::Active {
      return false;
    }
    self.elapsed += ticks;
    true
  }

  fn begin(&mut self, transition: Transition) -> std::result::Result<(), TransitionError> {
    if self.in_flight.is_some() {
      return Err(TransitionError::Busy);
    }
    tracing::debug!(?transition, "begin");
    self.in_flight = Some(transition);
    self.error = None;
    Ok(())
  }

  fn running_id(&self) -> std::result::Result<u64, TransitionError> {
    match &self.session {
      Some(session) if session.is_open() => Ok(session.id),
      _ => Err(TransitionError::NoSession),
    }
  }

  fn adopt(&mut self, session: Option<TimeSession>, now: DateTime<Utc>) {
    self.elapsed = session.as_ref().map(|s| elapsed_seconds(s, now)).unwrap_or(0);
    if session.as_ref().map(|s| s.id) != self.pending_stop {
      self.pending_stop = None;
    }
    self.session = session;
  }

  fn fail(&mut self, error: ClientError) -> ClientError {
    if error.is_auth_required() {
      tracing::info!("session request needs a fresh sign-in");
    } else {
      tracing::warn!(error = %error, "session request failed");
    }
    self.ticker.stop();
    self.error = Some(error.to_string());
    error
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
  }

  fn session(id: u64, status: SessionStatus) -> TimeSession {
    TimeSession {
      id,
      user_id: Some(1),
      start_time: at(0),
      end_time: None,
      paused_at: None,
      status,
      total_paused_seconds: 0,
      category_id: None,
      category: None,
    }
  }

  fn active_tracker() -> SessionTracker {
    let mut tracker = SessionTracker::new();
    tracker.begin_start().unwrap();
    tracker
      .finish(Transition::Start, Ok(session(7, SessionStatus::Active)), at(0))
      .unwrap();
    tracker
  }

  #[test]
  fn test_start_from_no_session() {
    let tracker = active_tracker();
    assert_eq!(tracker.state(), TimerState::Active);
    assert_eq!(tracker.elapsed_hms(), "00:00:00");
    assert!(tracker.is_ticking());
  }

  #[test]
  fn test_start_rejected_while_running() {
    let mut tracker = active_tracker();
    assert_eq!(tracker.begin_start(), Err(TransitionError::SessionInProgress));
    assert_eq!(tracker.in_flight(), None);
  }

  #[test]
  fn test_start_allowed_after_completed_record() {
    let mut tracker = SessionTracker::new();
    let mut done = session(3, SessionStatus::Completed);
    done.end_time = Some(at(60));
    tracker.finish_load(Ok(Some(done)), at(100)).unwrap();

    assert_eq!(tracker.state(), TimerState::Completed);
    assert!(!tracker.is_ticking());
    assert!(tracker.begin_start().is_ok());
  }

  #[test]
  fn test_pause_and_resume() {
    let mut tracker = active_tracker();
    assert_eq!(tracker.begin_resume(), Err(TransitionError::NotPaused));

    let id = tracker.begin_pause().unwrap();
    assert_eq!(id, 7);
    assert!(!tracker.is_ticking());

    let mut paused = session(7, SessionStatus::Paused);
    paused.paused_at = Some(at(90));
    tracker.finish(Transition::Pause, Ok(paused), at(95)).unwrap();
    assert_eq!(tracker.state(), TimerState::Paused);
    assert_eq!(tracker.elapsed_hms(), "00:01:30");

    assert_eq!(tracker.begin_pause(), Err(TransitionError::NotActive));
    tracker.begin_resume().unwrap();
    let mut resumed = session(7, SessionStatus::Active);
    resumed.total_paused_seconds = 30;
    tracker.finish(Transition::Resume, Ok(resumed), at(120)).unwrap();
    assert_eq!(tracker.state(), TimerState::Active);
    assert_eq!(tracker.elapsed_hms(), "00:01:30");
    assert!(tracker.is_ticking());
  }

  #[test]
  fn test_no_session_rejects_pause_and_resume() {
    let mut tracker = SessionTracker::new();
    assert_eq!(tracker.begin_pause(), Err(TransitionError::NoSession));
    assert_eq!(tracker.begin_resume(), Err(TransitionError::NoSession));
    assert_eq!(tracker.request_stop(), Err(TransitionError::NoSession));
  }

  #[test]
  fn test_stop_needs_confirmation() {
    let mut tracker = active_tracker();
    assert_eq!(tracker.confirm_stop(), Err(TransitionError::NoPendingStop));

    tracker.request_stop().unwrap();
    assert!(tracker.is_stop_pending());
    tracker.cancel_stop();
    assert_eq!(tracker.confirm_stop(), Err(TransitionError::NoPendingStop));

    tracker.request_stop().unwrap();
    let confirmation = tracker.confirm_stop().unwrap();
    assert_eq!(tracker.begin_stop(confirmation), Ok(7));

    let mut done = session(7, SessionStatus::Completed);
    done.end_time = Some(at(3600));
    tracker.finish(Transition::Stop, Ok(done), at(3600)).unwrap();

    assert_eq!(tracker.state(), TimerState::NoSession);
    assert_eq!(tracker.elapsed_hms(), "00:00:00");
    assert!(!tracker.is_ticking());
    assert_eq!(tracker.last_completed().map(|s| s.id), Some(7));
  }

  #[test]
  fn test_confirmation_for_replaced_session_is_stale() {
    let mut tracker = active_tracker();
    tracker.request_stop().unwrap();
    let confirmation = tracker.confirm_stop().unwrap();

    // Another client replaced the session meanwhile
    tracker.begin_load().unwrap();
    tracker
      .finish_load(Ok(Some(session(8, SessionStatus::Active))), at(10))
      .unwrap();

    assert_eq!(tracker.begin_stop(confirmation), Err(TransitionError::StaleConfirmation));
  }

  #[test]
  fn test_busy_while_request_in_flight() {
    let mut tracker = active_tracker();
    tracker.begin_pause().unwrap();
    assert_eq!(tracker.begin_pause(), Err(TransitionError::Busy));
    assert_eq!(tracker.begin_load(), Err(TransitionError::Busy));
  }

  #[test]
  fn test_failure_keeps_record_and_stops_tick() {
    let mut tracker = active_tracker();
    tracker.begin_load().unwrap();

    let err = tracker
      .finish_load(
        Err(ClientError::Api {
          status: 500,
          message: "database down".to_string(),
        }),
        at(30),
      )
      .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(tracker.state(), TimerState::Active);
    assert_eq!(tracker.error(), Some("database down"));
    assert!(!tracker.is_ticking());
    assert_eq!(tracker.in_flight(), None);
  }

  #[test]
  fn test_load_without_session() {
    let mut tracker = active_tracker();
    tracker.finish_load(Ok(None), at(5)).unwrap();
    assert_eq!(tracker.state(), TimerState::NoSession);
    assert_eq!(tracker.elapsed_hms(), "00:00:00");
    assert!(!tracker.is_ticking());
  }

  #[test]
  fn test_load_active_session_computes_elapsed() {
    let mut tracker = SessionTracker::new();
    let mut s = session(2, SessionStatus::Active);
    s.total_paused_seconds = 100;
    tracker.finish_load(Ok(Some(s)), at(1000)).unwrap();
    assert_eq!(tracker.elapsed_hms(), "00:15:00");
    assert!(tracker.is_ticking());
  }

  #[test]
  fn test_delete_forgets_local_session() {
    let mut tracker = active_tracker();
    let id = tracker.begin_delete().unwrap();
    let message = tracker.finish_delete(id, Ok("deleted".to_string())).unwrap();
    assert_eq!(message, "deleted");
    assert_eq!(tracker.state(), TimerState::NoSession);
  }

  #[test]
  fn test_delete_of_other_session_keeps_local() {
    let mut tracker = active_tracker();
    tracker.finish_delete(99, Ok(String::new())).unwrap();
    assert_eq!(tracker.state(), TimerState::Active);
  }

  #[tokio::test(start_paused = true)]
  async fn test_tick_only_counts_while_active() {
    let mut tracker = active_tracker();
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    assert!(tracker.tick());
    assert_eq!(tracker.elapsed_hms(), "00:00:02");

    tracker.begin_pause().unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    assert!(!tracker.tick());
    assert_eq!(tracker.elapsed_hms(), "00:00:02");
  }
}
