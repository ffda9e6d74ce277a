//! Request parameter validation and building
//!
//! Turns raw user input into the parameter map sent to the provider, driven
//! entirely by a [`ModelSchema`](crate::types::ModelSchema).

pub mod validator;

pub use validator::{RangeBound, ValidationErrors, Violation, validate_input};
