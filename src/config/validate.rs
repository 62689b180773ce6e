//! Configuration validation
//!
//! Checks iteration settings for consistency before a run starts.

use super::schema::IterConfig;

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid hook_freq: 0 (must be > 0)")]
    ZeroHookFreq,

    #[error("Invalid num_epochs: 0 (must be > 0)")]
    ZeroEpochs,

    #[error("Invalid {field}: 0 (must be > 0 when set)")]
    ZeroFrequency { field: &'static str },
}

/// Validate iteration settings
///
/// Checks:
/// - `hook_freq` is a usable divisor
/// - at least one epoch is requested
/// - optional cadences are positive when set
pub fn validate_config(config: &IterConfig) -> Result<(), ValidationError> {
    if config.hook_freq == 0 {
        return Err(ValidationError::ZeroHookFreq);
    }

    if config.num_epochs == 0 {
        return Err(ValidationError::ZeroEpochs);
    }

    if config.val_freq == Some(0) {
        return Err(ValidationError::ZeroFrequency { field: "val_freq" });
    }

    if config.log_freq == Some(0) {
        return Err(ValidationError::ZeroFrequency { field: "log_freq" });
    }

    Ok(())
}
