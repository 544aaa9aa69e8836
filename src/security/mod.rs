//! Security subsystem.
//!
//! # Responsibilities
//! - Shared-token checks on the item routes (tokens.rs)
//! - Bearer-key check on the admin routes lives with the admin router
//!
//! # Design Decisions
//! - Checks read the hot-reloadable config, so rotated tokens apply immediately
//! - Rejections are JSON `{"detail"}` bodies like every other handler error

pub mod tokens;

pub use tokens::token_guard;
