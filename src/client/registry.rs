use super::factory::ClientFactory;
use crate::error::BootError;
use crate::middleware::Transport;
use crate::spec::{RouteSpec, Spec};
use std::collections::HashMap;
use std::sync::Arc;

/// The reserved passthrough key used when no route matches and the spec
/// declares a default backend with `allowUnknown`.
pub const UNKNOWN_KEY: (&str, &str) = ("unknown", "unknown");

/// Case-insensitive registry of `(path, method)` to the route's composed
/// transport, built once at boot by the Client Factory.
pub struct ClientRegistry {
    entries: HashMap<(String, String), (Arc<RouteSpec>, Arc<dyn Transport>)>,
}

impl ClientRegistry {
    pub fn build(spec: &Spec, factory: &ClientFactory) -> Result<Self, BootError> {
        let mut entries = HashMap::new();
        for route in &spec.routes {
            let transport = factory.build(route)?;
            let key = (
                route.path_pattern.to_ascii_lowercase(),
                route.method.as_str().to_ascii_lowercase(),
            );
            entries.insert(key, (Arc::new(route.clone()), transport));
        }
        Ok(ClientRegistry { entries })
    }

    pub fn get(&self, path: &str, method: &str) -> Option<&(Arc<RouteSpec>, Arc<dyn Transport>)> {
        self.entries
            .get(&(path.to_ascii_lowercase(), method.to_ascii_lowercase()))
    }

    pub fn passthrough(&self) -> Option<&(Arc<RouteSpec>, Arc<dyn Transport>)> {
        self.entries.get(&(UNKNOWN_KEY.0.to_string(), UNKNOWN_KEY.1.to_string()))
    }
}
