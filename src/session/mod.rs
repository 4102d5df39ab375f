//! Client session state

pub mod models;
pub mod state;

pub use models::{AuthStatus, NewSession, Role, Session, User, UserUpdate};
pub use state::{parse_expiry, SessionStore, SharedSession};
