//! Router (C6): matches an inbound method+path against the routes compiled
//! from the spec and extracts path parameters.

use crate::spec::{RouteSpec, Spec};
use http::Method;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

struct CompiledRoute {
    regex: Regex,
    param_names: Vec<String>,
    route: Arc<RouteSpec>,
}

pub struct RouteMatch {
    pub route: Arc<RouteSpec>,
    pub path_params: HashMap<String, String>,
}

pub struct Router {
    routes: Vec<CompiledRoute>,
}

/// Convert an OpenAPI path template (`/pets/{id}`) into an anchored regex
/// with one named-order capture group per `{param}` segment.
fn path_to_regex(pattern: &str) -> (Regex, Vec<String>) {
    let mut param_names = Vec::new();
    let mut regex_str = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut name = String::new();
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    break;
                }
                name.push(c2);
            }
            param_names.push(name);
            regex_str.push_str("([^/]+)");
        } else {
            regex_str.push_str(&regex::escape(&c.to_string()));
        }
    }
    regex_str.push('$');
    (Regex::new(&regex_str).expect("path template compiles to a valid regex"), param_names)
}

impl Router {
    pub fn build(spec: &Spec) -> Self {
        let routes = spec
            .routes
            .iter()
            .map(|route| {
                let (regex, param_names) = path_to_regex(&route.path_pattern);
                CompiledRoute {
                    regex,
                    param_names,
                    route: Arc::new(route.clone()),
                }
            })
            .collect();
        Router { routes }
    }

    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for compiled in &self.routes {
            if compiled.route.method != *method {
                continue;
            }
            if let Some(captures) = compiled.regex.captures(path) {
                let mut path_params = HashMap::new();
                for (i, name) in compiled.param_names.iter().enumerate() {
                    if let Some(m) = captures.get(i + 1) {
                        path_params.insert(name.clone(), m.as_str().to_string());
                    }
                }
                return Some(RouteMatch {
                    route: compiled.route.clone(),
                    path_params,
                });
            }
        }
        None
    }
}

/// Parse `?a=1&b=2` query strings into a flat map; repeated keys keep the last value.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(query) = query else {
        return out;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        out.insert(
            urlencoding_decode(key),
            urlencoding_decode(value),
        );
    }
    out
}

fn urlencoding_decode(s: &str) -> String {
    percent_decode(s.replace('+', " ").as_bytes())
}

fn percent_decode(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""), 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::BackendConfig;
    use std::collections::HashMap as Map;

    fn route(path: &str, method: Method) -> RouteSpec {
        RouteSpec {
            method,
            path_pattern: path.to_string(),
            operation_id: "op".to_string(),
            backend: "BACKEND".to_string(),
            middleware: Vec::new(),
            request_schema: None,
            response_schemas: Map::new(),
        }
    }

    fn spec_with(routes: Vec<RouteSpec>) -> Spec {
        let mut backends = Map::new();
        backends.insert(
            "BACKEND".to_string(),
            BackendConfig {
                name: "backend".to_string(),
                scheme: "http".to_string(),
                host: "example.test".to_string(),
                port: 80,
                pool_size: 1,
                ttl_seconds: 60,
            },
        );
        Spec {
            title: "test".to_string(),
            routes,
            backends,
        }
    }

    #[test]
    fn matches_literal_path() {
        let spec = spec_with(vec![route("/health", Method::GET)]);
        let router = Router::build(&spec);
        assert!(router.match_route(&Method::GET, "/health").is_some());
        assert!(router.match_route(&Method::POST, "/health").is_none());
    }

    #[test]
    fn extracts_path_params() {
        let spec = spec_with(vec![route("/pets/{id}", Method::GET)]);
        let router = Router::build(&spec);
        let matched = router.match_route(&Method::GET, "/pets/42").expect("route matches");
        assert_eq!(matched.path_params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn does_not_match_extra_segments() {
        let spec = spec_with(vec![route("/pets/{id}", Method::GET)]);
        let router = Router::build(&spec);
        assert!(router.match_route(&Method::GET, "/pets/42/owner").is_none());
    }

    #[test]
    fn parses_query_string() {
        let q = parse_query(Some("a=1&b=hello%20world"));
        assert_eq!(q.get("a"), Some(&"1".to_string()));
        assert_eq!(q.get("b"), Some(&"hello world".to_string()));
    }
}
