//! admin-session - client session layer for the admin dashboard
//!
//! Session state mirrored into short-lived and durable key-value stores, a
//! guard for protected operations, the password reset wizard, and the REST
//! API client those flows call.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod reset;
pub mod session;
pub mod storage;
pub mod table;

pub use config::Config;
pub use error::Error;
pub use guard::{GuardState, SessionGuard};
pub use session::{SessionStore, SharedSession};
pub use storage::Storage;
