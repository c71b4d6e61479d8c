use std::collections::HashMap;

use validator::ValidationErrors;

use crate::database::StoreError;
use crate::types::CatId;

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error("Cat not found: {0}")]
    NotFound(CatId),

    #[error("Cat {0} belongs to another user")]
    Forbidden(CatId),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for CatError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), message)
            })
            .collect();

        CatError::Validation {
            message: "Invalid cat payload".to_string(),
            field_errors,
        }
    }
}
