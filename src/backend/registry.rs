use super::pool::Rotator;
use crate::error::BootError;
use crate::spec::BackendConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Case-insensitive registry of backend name to a pooled [`Rotator`] and its
/// base URL components.
pub struct BackendRegistry {
    rotators: HashMap<String, Rotator>,
    configs: HashMap<String, BackendConfig>,
}

impl BackendRegistry {
    pub fn build(backends: &HashMap<String, BackendConfig>) -> Result<Self, BootError> {
        let mut rotators = HashMap::new();
        for (key, cfg) in backends {
            let base_url = format!("{}://{}:{}", cfg.scheme, cfg.host, cfg.port);
            reqwest::Url::parse(&base_url)
                .map_err(|e| BootError::InvalidBackendHost(cfg.name.clone(), e.to_string()))?;
            let pool_size = cfg.pool_size;
            let ttl = Duration::from_secs(cfg.ttl_seconds);
            let rotator = Rotator::new(pool_size, ttl, move || {
                reqwest::Client::builder()
                    .build()
                    .expect("reqwest client builder never fails without custom TLS config")
            });
            rotators.insert(key.clone(), rotator);
        }
        Ok(BackendRegistry {
            rotators,
            configs: backends.clone(),
        })
    }

    /// Look up a backend's pooled client by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<Arc<reqwest::Client>> {
        self.rotators
            .get(&name.to_ascii_uppercase())
            .map(|r| r.next_client())
    }

    /// The backend's scheme://host:port prefix, used to build absolute
    /// upstream URLs from the route's relative path.
    pub fn base_url(&self, name: &str) -> Option<String> {
        self.configs
            .get(&name.to_ascii_uppercase())
            .map(|cfg| format!("{}://{}:{}", cfg.scheme, cfg.host, cfg.port))
    }
}
