//! platform-core: Shared infrastructure for the donation platform backend.
pub mod error;
pub mod middleware;

pub use axum;
pub use mongodb;
pub use serde;
pub use tracing;
pub use validator;
