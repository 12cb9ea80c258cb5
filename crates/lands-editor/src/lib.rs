//! # Lands Editor
//!
//! Session-gated region editing.
//!
//! - [`SessionManager`]: opaque, expiring session tokens
//! - [`EditorService`]: create, read, update and delete regions, answering
//!   with structured [`ApiResponse`] objects
//! - [`extract_session_token`]: token lookup from request headers
//!
//! The HTTP front-end that routes requests to the service lives elsewhere.

pub mod error;
pub mod service;
pub mod session;
pub mod token;

pub use error::EditorError;
pub use service::{ApiResponse, EditorService};
pub use session::{EditorAuthConfig, EditorConfig, EditorCredentials, Session, SessionManager};
pub use token::extract_session_token;
