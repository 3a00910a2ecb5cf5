use chrono::Utc;
use std::future::Future;

use super::state::{SessionTracker, StopConfirmation, TimerState, Transition, TransitionError};
use crate::api::types::TimeSession;
use crate::api::TimeEntryApi;
use crate::error::Result;

/// The session endpoints the timer needs.
pub trait TimeBackend {
  fn status(&self) -> impl Future<Output = Result<Option<TimeSession>>> + Send;
  fn start(&self, category_id: Option<u64>) -> impl Future<Output = Result<TimeSession>> + Send;
  fn pause(&self, entry_id: u64) -> impl Future<Output = Result<TimeSession>> + Send;
  fn resume(&self, entry_id: u64) -> impl Future<Output = Result<TimeSession>> + Send;
  fn stop(&self, entry_id: u64) -> impl Future<Output = Result<TimeSession>> + Send;
  fn delete(&self, entry_id: u64) -> impl Future<Output = Result<String>> + Send;
}

impl TimeBackend for TimeEntryApi {
  async fn status(&self) -> Result<Option<TimeSession>> {
    TimeEntryApi::status(self, true).await
  }

  async fn start(&self, category_id: Option<u64>) -> Result<TimeSession> {
    TimeEntryApi::start(self, category_id).await
  }

  async fn pause(&self, entry_id: u64) -> Result<TimeSession> {
    TimeEntryApi::pause(self, entry_id).await
  }

  async fn resume(&self, entry_id: u64) -> Result<TimeSession> {
    TimeEntryApi::resume(self, entry_id).await
  }

  async fn stop(&self, entry_id: u64) -> Result<TimeSession> {
    TimeEntryApi::stop(self, entry_id).await
  }

  async fn delete(&self, entry_id: u64) -> Result<String> {
    TimeEntryApi::delete(self, entry_id).await
  }
}

/// Drives a [`SessionTracker`] against a backend, one request at a time.
pub struct SessionTimer<B> {
  backend: B,
  tracker: SessionTracker,
}

impl<B: TimeBackend> SessionTimer<B> {
  pub fn new(backend: B) -> Self {
    Self {
      backend,
      tracker: SessionTracker::new(),
    }
  }

  pub fn tracker(&self) -> &SessionTracker {
    &self.tracker
  }

  pub fn state(&self) -> TimerState {
    self.tracker.state()
  }

  /// Reload the running session from the server.
  pub async fn refresh(&mut self) -> Result<TimerState> {
    self.tracker.begin_load()?;
    let result = self.backend.status().await;
    self.tracker.finish_load(result, Utc::now())?;
    Ok(self.tracker.state())
  }

  pub async fn start(&mut self, category_id: Option<u64>) -> Result<&TimeSession> {
    self.tracker.begin_start()?;
    let result = self.backend.start(category_id).await;
    self.finish(Transition::Start, result)
  }

  pub async fn pause(&mut self) -> Result<&TimeSession> {
    let id = self.tracker.begin_pause()?;
    let result = self.backend.pause(id).await;
    self.finish(Transition::Pause, result)
  }

  pub async fn resume(&mut self) -> Result<&TimeSession> {
    let id = self.tracker.begin_resume()?;
    let result = self.backend.resume(id).await;
    self.finish(Transition::Resume, result)
  }

  pub fn request_stop(&mut self) -> Result<()> {
    Ok(self.tracker.request_stop()?)
  }

  pub fn confirm_stop(&mut self) -> Result<StopConfirmation> {
    Ok(self.tracker.confirm_stop()?)
  }

  pub fn cancel_stop(&mut self) {
    self.tracker.cancel_stop();
  }

  /// Stop the running session; returns the completed record.
  pub async fn stop(&mut self, confirmation: StopConfirmation) -> Result<TimeSession> {
    let id = self.tracker.begin_stop(confirmation)?;
    let result = self.backend.stop(id).await;
    self.tracker.finish(Transition::Stop, result, Utc::now())?;
    self
      .tracker
      .last_completed()
      .cloned()
      .ok_or(TransitionError::NoSession.into())
  }

  /// Delete any entry by id; the local session is forgotten if it matches.
  pub async fn delete(&mut self, entry_id: u64) -> Result<String> {
    let result = self.backend.delete(entry_id).await;
    self.tracker.finish_delete(entry_id, result)
  }

  fn finish(&mut self, transition: Transition, result: Result<TimeSession>) -> Result<&TimeSession> {
    self.tracker.finish(transition, result, Utc::now())?;
    self
      .tracker
      .session()
      .ok_or(TransitionError::NoSession.into())
  }
}
