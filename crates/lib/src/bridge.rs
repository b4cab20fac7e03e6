//! Narrow surface handed to an embedded UI: read a setting, write a setting, check the server.
//! Nothing else is reachable through it.

use serde_json::Value;

use crate::api::NexusClient;
use crate::config::{self, ApiConfig, Config};
use crate::connectivity;
use crate::settings::Settings;

#[derive(Clone)]
pub struct DesktopBridge {
    settings: Settings,
    fallback_url: String,
    api: ApiConfig,
}

impl DesktopBridge {
    pub fn new(settings: Settings, config: &Config) -> Self {
        Self {
            settings,
            fallback_url: config::resolve_default_api_url(config),
            api: config.api.clone(),
        }
    }

    pub fn get_setting(&self, key: &str) -> Option<Value> {
        self.settings.get_value(key)
    }

    /// Store `value` under `key`. Returns false if it could not be persisted.
    pub fn set_setting(&self, key: &str, value: Value) -> bool {
        match self.settings.set_value(key, value) {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to store setting {:?}: {:#}", key, e);
                false
            }
        }
    }

    /// Probe the server named by the current `apiUrl` setting. True only if it reports online.
    pub async fn check_server(&self) -> bool {
        let url = self.settings.api_url(&self.fallback_url);
        let client = NexusClient::from_config(url, &self.api);
        connectivity::check(&client, self.api.health_timeout())
            .await
            .is_connected()
    }
}
