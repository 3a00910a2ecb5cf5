//! Typed access to the time tracker REST service.

mod auth;
mod categories;
mod client;
mod stats;
mod time;
pub mod types;

pub use client::ApiClient;
pub use time::TimeEntryApi;

#[cfg(test)]
pub(crate) use client::tests::{anonymous_client, signed_in_client};
