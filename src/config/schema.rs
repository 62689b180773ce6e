//! YAML schema for iteration settings

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Settings consumed by the model iterator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterConfig {
    /// Number of passes over the data
    pub num_epochs: usize,

    /// Step hooks get their full payload only when `global_step % hook_freq == 0`
    pub hook_freq: u64,

    /// Absolute global step budget; ends the fast loop once reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<u64>,

    /// Validation cadence in global steps (advisory, enforced by hooks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_freq: Option<u64>,

    /// Logging cadence; fallback for `val_freq`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_freq: Option<u64>,

    /// Dry run: no training ticks, frozen global step, one pass
    #[serde(deserialize_with = "deserialize_bool_lenient")]
    pub test_mode: bool,
}

impl Default for IterConfig {
    fn default() -> Self {
        Self {
            num_epochs: 100,
            hook_freq: 100,
            num_steps: None,
            val_freq: None,
            log_freq: None,
            test_mode: false,
        }
    }
}

impl IterConfig {
    /// Create config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the epoch budget
    pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
        self.num_epochs = num_epochs;
        self
    }

    /// Set the hook sampling divisor
    pub fn with_hook_freq(mut self, hook_freq: u64) -> Self {
        self.hook_freq = hook_freq;
        self
    }

    /// Set the global step budget
    pub fn with_num_steps(mut self, num_steps: u64) -> Self {
        self.num_steps = Some(num_steps);
        self
    }

    /// Set the validation cadence
    pub fn with_val_freq(mut self, val_freq: u64) -> Self {
        self.val_freq = Some(val_freq);
        self
    }

    /// Set the logging cadence
    pub fn with_log_freq(mut self, log_freq: u64) -> Self {
        self.log_freq = Some(log_freq);
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Validation cadence: `val_freq`, falling back to `log_freq`
    pub fn validation_frequency(&self) -> Option<u64> {
        self.val_freq.or(self.log_freq)
    }

    /// Epochs actually run; dry-run forces a single pass
    pub fn effective_epochs(&self) -> usize {
        if self.test_mode {
            1
        } else {
            self.num_epochs
        }
    }

    /// Whether `global_step` has reached the step budget
    pub fn step_budget_reached(&self, global_step: u64) -> bool {
        self.num_steps.is_some_and(|budget| global_step >= budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IterConfig::default();
        assert_eq!(config.num_epochs, 100);
        assert_eq!(config.hook_freq, 100);
        assert!(config.num_steps.is_none());
        assert!(!config.test_mode);
    }

    #[test]
    fn test_validation_frequency_fallback_chain() {
        assert_eq!(IterConfig::new().validation_frequency(), None);
        assert_eq!(IterConfig::new().with_log_freq(50).validation_frequency(), Some(50));
        assert_eq!(
            IterConfig::new().with_log_freq(50).with_val_freq(10).validation_frequency(),
            Some(10)
        );
    }

    #[test]
    fn test_effective_epochs_in_test_mode() {
        let config = IterConfig::new().with_num_epochs(7);
        assert_eq!(config.effective_epochs(), 7);
        assert_eq!(config.with_test_mode(true).effective_epochs(), 1);
    }

    #[test]
    fn test_step_budget() {
        let config = IterConfig::new();
        assert!(!config.step_budget_reached(u64::MAX));
        let config = config.with_num_steps(3);
        assert!(!config.step_budget_reached(2));
        assert!(config.step_budget_reached(3));
        assert!(config.step_budget_reached(4));
    }

    #[test]
    fn test_test_mode_accepts_quoted_bool() {
        let config: IterConfig = serde_yaml::from_str("test_mode: \"true\"").unwrap();
        assert!(config.test_mode);
        let config: IterConfig = serde_yaml::from_str("test_mode: false").unwrap();
        assert!(!config.test_mode);
    }

    #[test]
    fn test_test_mode_rejects_garbage() {
        let result: Result<IterConfig, _> = serde_yaml::from_str("test_mode: \"maybe\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_roundtrip_skips_unset_options() {
        let yaml = serde_yaml::to_string(&IterConfig::new().with_num_epochs(2)).unwrap();
        assert!(!yaml.contains("num_steps"));
        let parsed: IterConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.num_epochs, 2);
    }
}
