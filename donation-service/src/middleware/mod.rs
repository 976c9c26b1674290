pub mod auth;

pub use auth::NgoIdentity;
