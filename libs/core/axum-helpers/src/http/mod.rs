//! HTTP middleware.
//!
//! ```ignore
//! use axum_helpers::http::cors_layer_for;
//!
//! let app = Router::new().layer(cors_layer_for(&config.allowed_origins)?);
//! ```

pub mod cors;

pub use cors::{cors_layer_for, create_cors_layer, create_permissive_cors_layer};
