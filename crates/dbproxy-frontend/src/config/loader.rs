//! Configuration loader

use super::Config;
use crate::error::{ProxyError, Result};
use std::path::Path;

/// Load configuration from a YAML file
///
/// Also applies DBPROXY_* env var overrides after loading.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load configuration from a YAML string (useful for testing)
///
/// Also applies DBPROXY_* env var overrides after loading.
pub fn load_config_from_str(yaml: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(yaml)?;
    resolve_config_env_vars(&mut config)?;
    apply_env_overrides(&mut config);
    config.validate().map_err(ProxyError::Config)?;
    Ok(config)
}

/// Apply DBPROXY_* environment variable overrides to a config.
///
/// Supported env vars:
/// - `DBPROXY_LISTEN_ADDRESS` - Override listen address
/// - `DBPROXY_LISTEN_PORT` - Override listen port
/// - `DBPROXY_LOG_LEVEL` - Override log level
/// - `DBPROXY_HANDSHAKE_TIMEOUT_SECS` - Override handshake timeout
/// - `DBPROXY_MAX_CONNECTIONS` - Override max connections
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("DBPROXY_LISTEN_ADDRESS") {
        debug!("Overriding listen_address from DBPROXY_LISTEN_ADDRESS");
        config.server.listen_address = val;
    }
    if let Some(val) = lookup("DBPROXY_LISTEN_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            debug!("Overriding listen_port from DBPROXY_LISTEN_PORT");
            config.server.listen_port = port;
        }
    }
    if let Some(val) = lookup("DBPROXY_LOG_LEVEL") {
        debug!("Overriding log level from DBPROXY_LOG_LEVEL");
        config.logging.level = val;
    }
    if let Some(val) = lookup("DBPROXY_HANDSHAKE_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse::<u64>() {
            debug!("Overriding handshake_timeout from DBPROXY_HANDSHAKE_TIMEOUT_SECS");
            config.server.handshake_timeout_secs = secs;
        }
    }
    if let Some(val) = lookup("DBPROXY_MAX_CONNECTIONS") {
        if let Ok(max) = val.parse::<usize>() {
            debug!("Overriding max_connections from DBPROXY_MAX_CONNECTIONS");
            config.server.max_connections = max;
        }
    }
}

/// Name of the environment variable a value refers to, if it is a
/// placeholder.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - curly brace syntax
/// - `$VAR_NAME` - simple syntax (for single variable values)
fn placeholder_name(value: &str) -> Option<&str> {
    if value.starts_with("${") && value.ends_with('}') {
        Some(&value[2..value.len() - 1])
    } else if value.starts_with('$') && !value.contains(' ') && value.len() > 1 {
        Some(&value[1..])
    } else {
        None
    }
}

/// Resolve environment variables in a string value
///
/// If the environment variable is not set, the original value is preserved.
fn resolve_env_var(value: &str) -> String {
    let Some(var_name) = placeholder_name(value) else {
        return value.to_string();
    };

    match std::env::var(var_name) {
        Ok(env_value) => {
            debug!("Resolved env var {} from config", var_name);
            env_value
        }
        Err(_) => {
            warn!("Env var {} not set, keeping literal value", var_name);
            value.to_string()
        }
    }
}

/// Resolve a user's password.
///
/// An unset `${VAR}` placeholder is an error: the literal text must never
/// become the account password.
fn resolve_password(username: &str, value: &str) -> Result<String> {
    if value.starts_with("${") {
        if let Some(var_name) = placeholder_name(value) {
            return std::env::var(var_name).map_err(|_| {
                ProxyError::Config(format!(
                    "Password for user '{}' references unset env var {}",
                    username, var_name
                ))
            });
        }
    }
    Ok(resolve_env_var(value))
}

/// Resolve environment variables in all config fields that support it
fn resolve_config_env_vars(config: &mut Config) -> Result<()> {
    for user in &mut config.users {
        user.username = resolve_env_var(&user.username);
        user.password = resolve_password(&user.username, &user.password)?;
    }
    config.server.listen_address = resolve_env_var(&config.server.listen_address);
    Ok(())
}
