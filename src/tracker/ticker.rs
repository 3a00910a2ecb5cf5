use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Recurring display tick for a running session.
///
/// At most one interval task is live per ticker: `start` replaces any
/// previous task, `stop` and `Drop` abort it. Ticks queue on a channel and
/// are drained by the owner with `drain`.
pub struct Ticker {
  period: Duration,
  running: bool,
  task: Option<JoinHandle<()>>,
  tx: mpsc::UnboundedSender<()>,
  rx: mpsc::UnboundedReceiver<()>,
}

impl Ticker {
  pub fn new(period: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      period,
      running: false,
      task: None,
      tx,
      rx,
    }
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  pub fn start(&mut self) {
    self.stop();
    self.running = true;

    // Without a runtime (plain unit tests) the ticker only tracks its flag
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      return;
    };

    let tx = self.tx.clone();
    let period = self.period;
    self.task = Some(handle.spawn(async move {
      let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
      interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        interval.tick().await;
        if tx.send(()).is_err() {
          break;
        }
      }
    }));
  }

  /// Abort the interval task and discard ticks that were not drained yet.
  pub fn stop(&mut self) {
    self.running = false;
    if let Some(task) = self.task.take() {
      task.abort();
    }
    while self.rx.try_recv().is_ok() {}
  }

  /// Number of ticks received since the last call.
  pub fn drain(&mut self) -> u64 {
    let mut count = 0;
    while self.rx.try_recv().is_ok() {
      count += 1;
    }
    if self.running {
      count
    } else {
      0
    }
  }
}

impl Default for Ticker {
  fn default() -> Self {
    Self::new(Duration::from_secs(1))
  }
}

impl Drop for Ticker {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

impl std::fmt::Debug for Ticker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Ticker")
      .field("period", &self.period)
      .field("running", &self.running)
      .finish_non_exhaustive()
  }
}
