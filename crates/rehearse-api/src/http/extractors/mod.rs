//! Request extractors: optional bearer auth and the session-id header.

pub mod auth;
pub mod session;

pub use auth::AuthUser;
pub use session::SessionIdHeader;
