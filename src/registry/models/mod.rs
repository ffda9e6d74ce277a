//! Built-in model declarations

use crate::error::SchemaError;
use crate::types::ModelSchema;

pub mod flux;

/// Every built-in model, in catalog order.
pub fn builtin_models() -> Result<Vec<ModelSchema>, SchemaError> {
    Ok(vec![
        flux::flux_1_1_pro()?,
        flux::flux_1_1_pro_ultra()?,
        flux::flux_lora()?,
    ])
}
