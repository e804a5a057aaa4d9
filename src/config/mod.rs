//! Deployment configuration shared by the worker, page and push components.
//!
//! A [`PwaConfig`] starts from built-in defaults. [`PwaConfig::from_env`] overlays the
//! JSON discovered by [`default_config_json`](crate::platform::environment::default_config_json)
//! and then the `PWA_CACHE_VERSION` / `PWA_BACKEND_URL` overrides.
pub mod error;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::cache::{CacheVersion, DEFAULT_CACHE_VERSION, DEFAULT_MANIFEST};
use crate::platform::environment::{default_config_json, override_var};
use crate::push::PushEndpoints;
use crate::worker::NotificationDefaults;

pub use error::{ConfigError, ConfigErrorCode, ConfigResult};

use error::{invalid_config, invalid_scope};

pub const CACHE_VERSION_VAR: &str = "PWA_CACHE_VERSION";
pub const BACKEND_URL_VAR: &str = "PWA_BACKEND_URL";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PwaConfig {
    pub cache_version: String,
    /// Absolute URL of the worker scope; relative manifest entries resolve against it.
    pub scope: String,
    pub manifest: Vec<String>,
    pub push: PushConfig,
    pub notification: NotificationDefaults,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushConfig {
    pub backend_url: String,
    pub endpoints: PushEndpoints,
}

impl Default for PwaConfig {
    fn default() -> Self {
        Self {
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            scope: "http://localhost/".to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|entry| entry.to_string()).collect(),
            push: PushConfig::default(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost/".to_string(),
            endpoints: PushEndpoints::default(),
        }
    }
}

impl PwaConfig {
    /// Parses a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        serde_json::from_str(raw).map_err(|err| invalid_config(format!("Invalid config: {err}")))
    }

    /// Loads defaults, then discovered deployment JSON, then single-variable overrides.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = match default_config_json() {
            Some(map) => Self::from_map(map)?,
            None => Self::default(),
        };
        if let Some(version) = override_var(CACHE_VERSION_VAR) {
            config.cache_version = version;
        }
        if let Some(backend_url) = override_var(BACKEND_URL_VAR) {
            config.push.backend_url = backend_url;
        }
        Ok(config)
    }

    fn from_map(map: Map<String, Value>) -> ConfigResult<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|err| invalid_config(format!("Invalid deployment config: {err}")))
    }

    pub fn cache_version(&self) -> CacheVersion {
        CacheVersion::new(self.cache_version.clone())
    }

    pub fn scope_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.scope)
            .map_err(|err| invalid_scope(format!("Invalid scope \"{}\": {err}", self.scope)))
    }
}
