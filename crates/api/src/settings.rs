//! Server settings

use alert_history::EntityId;
use reconciler::{ReceiverConfig, ReconcilerConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "ALERT_RECEIVER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "alert-receiver.toml";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Maximum log level (`trace` .. `error`)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Receivers in configured order
    pub receivers: Vec<ReceiverSettings>,
    /// Entities loaded into the in-memory store at startup (JSON)
    pub entities_file: Option<PathBuf>,
    pub reconciler: ReconcilerConfig,
}

/// One receiver: the token batches are posted under and its topic routes.
///
/// Tokens and alertnames are values rather than table keys, since the
/// config loader folds key case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverSettings {
    pub token: String,
    #[serde(default)]
    pub topics: Vec<TopicRoute>,
}

/// Alertname reported into an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRoute {
    pub alertname: String,
    pub entity_id: EntityId,
}

impl ReceiverSettings {
    pub fn receiver(&self) -> ReceiverConfig {
        ReceiverConfig::new(
            self.topics
                .iter()
                .map(|route| (route.alertname.clone(), route.entity_id)),
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            receivers: Vec::new(),
            entities_file: None,
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the config file (optional) overlaid with
    /// `ALERT_RECEIVER__*` environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ALERT_RECEIVER").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Receivers by token. A repeated token keeps its last definition.
    pub fn receiver_map(&self) -> HashMap<String, ReceiverConfig> {
        self.receivers
            .iter()
            .map(|settings| (settings.token.clone(), settings.receiver()))
            .collect()
    }
}
