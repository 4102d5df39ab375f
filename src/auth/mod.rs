//! Authentication flows
//!
//! Login, logout and profile operations that combine API calls with session
//! transitions.

pub mod service;

pub use service::AuthService;
