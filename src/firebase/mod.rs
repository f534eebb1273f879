pub mod auth;
pub mod client;

pub use client::RtdbClient;

use async_trait::async_trait;
use std::fmt;

/// Transport-level failure: the backend's message plus its numeric
/// error code, retained by the client for the status report that
/// follows each write.
#[derive(Debug, Clone)]
pub struct FirebaseError {
    pub message: String,
    pub code: i32,
}

impl fmt::Display for FirebaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for FirebaseError {}

/// The remote database as the controller sees it: independent
/// fire-and-forget field writes over an authenticated session.
#[async_trait]
pub trait RemoteStore {
    /// Keep the session usable; called once per control-loop pass.
    async fn maintain(&mut self);
    /// True while an unexpired session token is held.
    fn ready(&self) -> bool;
    /// The failure recorded by the most recent write, if it failed.
    fn last_error(&self) -> Option<&FirebaseError>;
    /// Write one float field, rounded to `decimals` places.
    async fn set_number(&mut self, path: &str, value: f64, decimals: u8) -> bool;
    /// Write one integer field.
    async fn set_int(&mut self, path: &str, value: i64) -> bool;
}
