//! The categorization pipeline root: state machine, retry policy, and
//! outcome persistence.

pub mod error;
pub mod service;

pub use error::{CategorizeError, PARSE_FAILURE_MESSAGE};
pub use service::{CategorizationOutcome, CategorizationService};
