//! # Utility Modules
//!
//! Constants, environment-driven configuration, secrets, input validators and
//! filesystem/image helpers shared by the handlers and the upload pipeline.

pub mod constant;
pub mod file;
pub mod secret;
pub mod static_object;
pub mod validator;
