//! Authenticated remote operations
//!
//! Models the calls a smoke run makes against the cloud-function endpoints:
//! - `Operation` names the server-side action and knows its method, body,
//!   and query string
//! - `RequestDescriptor` is the immutable, fully-authorized request
//! - `Dispatcher` sends a descriptor and classifies the response
//! - `FailureRecord` captures {message, status, statusText, details} for
//!   anything other than a 2xx

pub mod dispatch;
pub mod operation;
pub mod outcome;
pub mod request;

pub use dispatch::Dispatcher;
pub use operation::Operation;
pub use outcome::{FailureRecord, NO_ADDITIONAL_DETAILS, Outcome, RequestError};
pub use request::{HeaderInjection, RequestDescriptor};

/// Result alias for dispatch.
pub type Result<T> = std::result::Result<T, RequestError>;
