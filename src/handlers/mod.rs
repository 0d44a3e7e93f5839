//! # HTTP Request Handlers
//!
//! This module contains all HTTP request handlers for the storefront. Each
//! handler is responsible for processing specific HTTP requests and returning
//! appropriate responses.
//!
//! ## Available Handlers
//!
//! - **Admin** (`admin`) - Account management and feedback moderation
//! - **Authentication** (`auth`) - Local and Google sign-in, JWT issuance
//! - **Cart** (`cart`) - The caller's shopping cart
//! - **Favorites** (`favorite`) - The caller's favorite products
//! - **Feedback** (`feedback`) - Public feedback listing and submission
//! - **Health Check** (`health_check`) - Application health monitoring
//! - **Products** (`product`) - Catalog reads and multipart product editing
//! - **Users** (`user`) - Profile and address book

mod admin;
mod auth;
mod cart;
mod favorite;
mod feedback;
mod health_check;
mod product;
mod response;
mod user;

pub use admin::*;
pub use auth::*;
pub use cart::*;
pub use favorite::*;
pub use feedback::*;
pub use health_check::*;
pub use product::*;
pub use response::*;
pub use user::*;
