//! REST API surface: authentication, error mapping, and handlers.

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::{AppAuth, AuthState, DatabaseAuthState};
pub use error::ApiError;
