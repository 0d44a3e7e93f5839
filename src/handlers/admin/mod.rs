//! # Admin Handlers
//!
//! Account management and feedback moderation. Every handler here is mounted
//! behind both the authentication middleware and the admin check, so handlers
//! may assume an admin [`AuthUser`](crate::middleware::AuthUser).

mod feedback;
mod users;

pub use feedback::*;
pub use users::*;
