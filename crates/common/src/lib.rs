//! Shared types for the authgate workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
