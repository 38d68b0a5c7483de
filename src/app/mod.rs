//! Application wiring and shared error types.

mod context;
mod error;

pub use context::AppContext;
pub use error::{ErrorSet, EstuaryError, FieldError, Result};
