//! Core data types
//!
//! - `schema`: declarative model parameter schemas
//! - `image`: provider image payloads
//! - `generation`: persisted generation records

pub mod generation;
pub mod image;
pub mod schema;

pub use generation::*;
pub use image::*;
pub use schema::*;
