use http::Method;
use serde_json::Value;
use std::collections::HashMap;

/// A named upstream: scheme+host+port the Backend Registry pools transports for.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub name: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Number of Recycler slots the Rotator round-robins across.
    pub pool_size: usize,
    /// Recycler TTL before a slot's pooled transport is swapped out.
    pub ttl_seconds: u64,
}

/// One entry in an operation's middleware chain: a registered middleware name
/// plus the config object the Client Factory hands to its `build`.
#[derive(Debug, Clone)]
pub struct MiddlewareRef {
    pub name: String,
    pub config: Value,
}

/// Route-level view the Router/Dispatcher/Client Factory consume: everything
/// needed to match a request, build its composed transport, and validate its
/// body against the OpenAPI schemas.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub method: Method,
    pub path_pattern: String,
    pub operation_id: String,
    pub backend: String,
    pub middleware: Vec<MiddlewareRef>,
    pub request_schema: Option<Value>,
    /// status -> content-type -> schema
    pub response_schemas: HashMap<u16, HashMap<String, Value>>,
}

/// The fully resolved spec: every route plus the named backend catalog.
#[derive(Debug, Clone)]
pub struct Spec {
    pub title: String,
    pub routes: Vec<RouteSpec>,
    pub backends: HashMap<String, BackendConfig>,
}

impl Spec {
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.get(&name.to_ascii_uppercase())
    }
}
