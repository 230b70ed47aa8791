//! Common types shared by the smoke-runner workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
