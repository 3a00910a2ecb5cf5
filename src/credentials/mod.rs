//! Signed-in state: the bearer token, the user record, and where they live.

mod manager;
mod store;

pub use manager::AuthManager;
pub use store::{CredentialStore, Credentials};
