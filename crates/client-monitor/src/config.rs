//! Client monitor configuration.
//!
//! Configuration is loaded from environment variables:
//!
//! - `CLIENT_MONITOR_CONTROLLERS` - comma-separated `id=module::prefix`
//!   entries, e.g. `app=operator::controllers::app,wf=operator::workflow`
//! - `CLIENT_MONITOR_UNKNOWN_CONTROLLER` - controller label for
//!   unidentified callers (default: `unknown`)
//! - `CLIENT_MONITOR_METRIC_NAME` - histogram name
//!   (default: `controller_client_request_time_seconds`)

use crate::caller::{ControllerRegistry, UNKNOWN_CONTROLLER};
use crate::observability::metrics::CLIENT_REQUEST_TIME_SECONDS;
use std::collections::{HashMap, HashSet};
use std::env;
use thiserror::Error;
use tracing::info;

pub const ENV_CONTROLLERS: &str = "CLIENT_MONITOR_CONTROLLERS";
pub const ENV_UNKNOWN_CONTROLLER: &str = "CLIENT_MONITOR_UNKNOWN_CONTROLLER";
pub const ENV_METRIC_NAME: &str = "CLIENT_MONITOR_METRIC_NAME";

/// Client monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Controllers that may appear in the `controller` label.
    pub controllers: ControllerRegistry,

    /// Controller label for callers outside every registered module.
    pub unknown_controller: String,

    /// Histogram name.
    pub metric_name: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            controllers: ControllerRegistry::new(),
            unknown_controller: UNKNOWN_CONTROLLER.to_string(),
            metric_name: CLIENT_REQUEST_TIME_SECONDS.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid controller entry '{0}': expected id=module::prefix")]
    InvalidControllerEntry(String),

    #[error("Invalid controller id '{0}': must be non-empty [a-z0-9_-]")]
    InvalidControllerId(String),

    #[error("Duplicate controller registration: {0}")]
    DuplicateController(String),

    #[error("Invalid metric name '{0}'")]
    InvalidMetricName(String),

    #[error("No controllers registered: every caller would be labeled as unknown")]
    EmptyControllerRegistry,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let controllers = match vars.get(ENV_CONTROLLERS) {
            Some(value) => parse_controllers(value)?,
            None => ControllerRegistry::new(),
        };

        let unknown_controller = vars
            .get(ENV_UNKNOWN_CONTROLLER)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_CONTROLLER.to_string());
        if !is_valid_controller_id(&unknown_controller) {
            return Err(ConfigError::InvalidControllerId(unknown_controller));
        }
        if controllers.ids().any(|id| id == unknown_controller) {
            return Err(ConfigError::DuplicateController(unknown_controller));
        }

        let metric_name = vars
            .get(ENV_METRIC_NAME)
            .cloned()
            .unwrap_or_else(|| CLIENT_REQUEST_TIME_SECONDS.to_string());
        if !is_valid_metric_name(&metric_name) {
            return Err(ConfigError::InvalidMetricName(metric_name));
        }

        info!(
            target: "client_monitor.config",
            controllers = controllers.len(),
            unknown_controller = %unknown_controller,
            metric = %metric_name,
            "Client monitor configuration loaded"
        );

        Ok(MonitorConfig {
            controllers,
            unknown_controller,
            metric_name,
        })
    }
}

fn parse_controllers(value: &str) -> Result<ControllerRegistry, ConfigError> {
    let mut registry = ControllerRegistry::new();
    let mut ids = HashSet::new();
    let mut prefixes = HashSet::new();

    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, prefix) = entry
            .split_once('=')
            .map(|(id, prefix)| (id.trim(), prefix.trim()))
            .ok_or_else(|| ConfigError::InvalidControllerEntry(entry.to_string()))?;

        if prefix.is_empty() {
            return Err(ConfigError::InvalidControllerEntry(entry.to_string()));
        }
        if !is_valid_controller_id(id) {
            return Err(ConfigError::InvalidControllerId(id.to_string()));
        }
        if !ids.insert(id) {
            return Err(ConfigError::DuplicateController(id.to_string()));
        }
        if !prefixes.insert(prefix) {
            return Err(ConfigError::DuplicateController(prefix.to_string()));
        }

        registry.insert(id, prefix);
    }

    Ok(registry)
}

fn is_valid_controller_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Prometheus metric name: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = MonitorConfig::from_vars(&HashMap::new()).expect("defaults should load");

        assert!(config.controllers.is_empty());
        assert_eq!(config.unknown_controller, "unknown");
        assert_eq!(config.metric_name, "controller_client_request_time_seconds");
    }

    #[test]
    fn test_from_vars_parses_controllers() {
        let config = MonitorConfig::from_vars(&vars(&[(
            ENV_CONTROLLERS,
            "app=operator::controllers::application, workflow = operator::workflow,",
        )]))
        .expect("controllers should parse");

        assert_eq!(
            config.controllers.ids().collect::<Vec<_>>(),
            vec!["app", "workflow"]
        );
        assert_eq!(
            config.controllers.resolve("operator::workflow::steps"),
            Some("workflow")
        );
    }

    #[test]
    fn test_from_vars_rejects_malformed_entry() {
        let err = MonitorConfig::from_vars(&vars(&[(ENV_CONTROLLERS, "app")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidControllerEntry("app".to_string()));

        let err = MonitorConfig::from_vars(&vars(&[(ENV_CONTROLLERS, "app=")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidControllerEntry("app=".to_string()));
    }

    #[test]
    fn test_from_vars_rejects_invalid_ids() {
        let err =
            MonitorConfig::from_vars(&vars(&[(ENV_CONTROLLERS, "App=operator::app")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidControllerId("App".to_string()));

        let err = MonitorConfig::from_vars(&vars(&[(ENV_UNKNOWN_CONTROLLER, "")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidControllerId(String::new()));
    }

    #[test]
    fn test_from_vars_rejects_duplicates() {
        let err = MonitorConfig::from_vars(&vars(&[(
            ENV_CONTROLLERS,
            "app=operator::app,app=operator::other",
        )]))
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateController("app".to_string()));

        let err = MonitorConfig::from_vars(&vars(&[(
            ENV_CONTROLLERS,
            "app=operator::app,other=operator::app",
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateController("operator::app".to_string())
        );
    }

    #[test]
    fn test_from_vars_rejects_unknown_label_collision() {
        let err = MonitorConfig::from_vars(&vars(&[
            (ENV_CONTROLLERS, "other=operator::other"),
            (ENV_UNKNOWN_CONTROLLER, "other"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateController("other".to_string()));
    }

    #[test]
    fn test_from_vars_metric_name_validation() {
        let config = MonitorConfig::from_vars(&vars(&[(
            ENV_METRIC_NAME,
            "operator:client_request_time_seconds",
        )]))
        .unwrap();
        assert_eq!(config.metric_name, "operator:client_request_time_seconds");

        let err =
            MonitorConfig::from_vars(&vars(&[(ENV_METRIC_NAME, "9_request_seconds")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidMetricName("9_request_seconds".to_string())
        );

        let err = MonitorConfig::from_vars(&vars(&[(ENV_METRIC_NAME, "request-time")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidMetricName("request-time".to_string()));
    }
}
