use super::KeeperConfig;

const MAX_NAME_LEN: usize = 64;

/// Validate the complete configuration
pub fn validate_config(config: &KeeperConfig) -> Result<(), String> {
    validate_name(&config.name)?;
    validate_paths(config)?;
    validate_log_level(&config.log_level)
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Service name cannot be empty".to_string());
    }

    if name.len() > MAX_NAME_LEN {
        return Err(format!(
            "Service name too long (max {} characters): {}",
            MAX_NAME_LEN, name
        ));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(format!(
            "Service name can only contain alphanumeric characters, hyphens, and underscores: {}",
            name
        ));
    }

    Ok(())
}

fn validate_paths(config: &KeeperConfig) -> Result<(), String> {
    if config.binary_path.as_os_str().is_empty() {
        return Err("binary_path cannot be empty".to_string());
    }

    if config.staged_update() == Some(config.binary_path.as_path()) {
        return Err(format!(
            "update_path must differ from binary_path: {}",
            config.binary_path.display()
        ));
    }

    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), String> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(format!(
            "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}
