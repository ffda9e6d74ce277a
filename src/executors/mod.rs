//! Generation executors
//!
//! - `image`: the generation invoker and its discriminated outcome
//! - `errors`: classification of raw provider failures

pub mod errors;
pub mod image;

pub use errors::{
    BALANCE_EXHAUSTED_MARKER, BALANCE_EXHAUSTED_MESSAGE, GENERIC_FAILURE_MESSAGE,
    MISSING_CREDENTIAL_MESSAGE, NO_IMAGE_MESSAGE, classify_provider_error,
};
pub use image::{ErrorCode, GenerationFailure, GenerationInvoker, GenerationOutcome, GenerationSuccess};
