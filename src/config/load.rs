//! Loading configuration from YAML

use super::schema::IterConfig;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Parse and validate a YAML configuration string
pub fn parse_config(yaml: &str) -> Result<IterConfig> {
    let config: IterConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load and validate a YAML configuration file
///
/// # Example
///
/// ```no_run
/// use hookloop::config::load_config;
///
/// let config = load_config("iterate.yaml")?;
/// println!("epochs: {}", config.num_epochs);
/// # Ok::<(), hookloop::Error>(())
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<IterConfig> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    parse_config(&yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let config = parse_config("num_epochs: 3\nval_freq: 20\n").unwrap();
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.hook_freq, 100);
        assert_eq!(config.validation_frequency(), Some(20));
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = parse_config("hook_freq: 0").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("hook_freq")));
    }

    #[test]
    fn test_parse_rejects_malformed_yaml() {
        let err = parse_config("num_epochs: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("Failed to parse")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_epochs: 2\nhook_freq: 1\ntest_mode: \"true\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.num_epochs, 2);
        assert_eq!(config.hook_freq, 1);
        assert!(config.test_mode);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("absent.yaml")));
    }
}
