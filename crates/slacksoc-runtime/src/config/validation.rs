//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, PluginEntry, SlacksocConfig, StateConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SlacksocConfig) -> ConfigResult<()> {
    validate_state_config(&config.state)?;
    validate_logging_config(&config.logging)?;
    validate_plugins(&config.plugins)?;
    Ok(())
}

fn validate_state_config(state: &StateConfig) -> ConfigResult<()> {
    if state.file.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("state.file"));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is 'file' but logging.file_path is not set",
        ));
    }
    Ok(())
}

/// Every entry needs a name and instance names must be unique, since they
/// key the persisted state.
fn validate_plugins(plugins: &[PluginEntry]) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for entry in plugins {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::missing_field("plugins[].name"));
        }
        if entry.instance.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(ConfigError::validation(format!(
                "plugin '{}' has an empty instance name",
                entry.name
            )));
        }
        if !seen.insert(entry.instance_name()) {
            return Err(ConfigError::DuplicateInstance(
                entry.instance_name().to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_validate_empty_config() {
        let config = SlacksocConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_state_file() {
        let mut config = SlacksocConfig::default();
        config.state.file = PathBuf::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_without_path() {
        let mut config = SlacksocConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("slacksoc.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_plugin_name() {
        let config = SlacksocConfig {
            plugins: vec![PluginEntry::new("  ")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_instance() {
        let mut second = PluginEntry::new("Respond");
        second.instance = Some("greetings".into());
        let mut third = PluginEntry::new("Debug");
        third.instance = Some("greetings".into());

        let config = SlacksocConfig {
            plugins: vec![PluginEntry::new("Respond"), second.clone()],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());

        let config = SlacksocConfig {
            plugins: vec![second, third],
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::DuplicateInstance(name)) if name == "greetings"));
    }
}
