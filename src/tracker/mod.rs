//! Session timer: elapsed-time math, the one-second display tick, and the
//! `NoSession → Active ⇄ Paused → Completed` state machine.

mod elapsed;
mod state;
mod ticker;
mod timer;

pub use elapsed::{elapsed_seconds, format_hms};
pub use state::{SessionTracker, TimerState, Transition, TransitionError};
pub use timer::SessionTimer;
