//! # Business Logic Services
//!
//! Services encapsulate domain-specific functionality and provide clean
//! interfaces for use by HTTP handlers.
//!
//! ## Available Services
//!
//! - **Google** (`google`) - Google ID token verification
//! - **JWT** (`jwt`) - Access token creation and validation
//! - **Password** (`password`) - Argon2 hashing for local accounts
//! - **Upload** (`upload`) - Product color image pipeline

pub mod google;
pub mod jwt;
pub mod password;
pub mod upload;
