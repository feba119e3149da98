use super::model::{BackendConfig, MiddlewareRef, RouteSpec, Spec};
use crate::error::BootError;
use crate::validator::{fail_if_issues, ValidationIssue};
use oas3::spec::ObjectOrReference;
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Replace every `${NAME}` in `text` with the value of the environment variable
/// `NAME`, or the empty string if unset. Single-pass: substitutions are not
/// re-scanned, so a value that itself contains `${...}` is not expanded further.
pub fn interpolate_env(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = text[i + 2..].find('}') {
                let name = &text[i + 2..i + 2 + end];
                out.push_str(&env::var(name).unwrap_or_default());
                i += 2 + end + 1;
                continue;
            }
        }
        let ch = text[i..].chars().next().expect("valid utf8 boundary");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn read_spec_source() -> Result<String, BootError> {
    if let Ok(path) = env::var("TRANSPORTD_OPENAPI_SPECIFICATION_FILE") {
        return std::fs::read_to_string(&path)
            .map_err(|e| BootError::SpecParse(format!("reading {path}: {e}")));
    }
    if let Ok(content) = env::var("TRANSPORTD_OPENAPI_SPECIFICATION_CONTENT") {
        return Ok(content);
    }
    Err(BootError::NoSpecSource)
}

fn parse_document(raw: &str) -> Result<Value, BootError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(raw).map_err(|e| BootError::SpecParse(e.to_string()))
    } else {
        serde_yaml::from_str(raw).map_err(|e| BootError::SpecParse(e.to_string()))
    }
}

fn resolve_schema_ref<'a>(spec: &'a OpenApiV3Spec, ref_path: &str) -> Option<&'a oas3::spec::ObjectSchema> {
    let name = ref_path.strip_prefix("#/components/schemas/")?;
    match spec.components.as_ref()?.schemas.get(name)? {
        ObjectOrReference::Object(schema) => Some(schema),
        _ => None,
    }
}

fn schema_value(spec: &OpenApiV3Spec, s: &ObjectOrReference<oas3::spec::ObjectSchema>) -> Option<Value> {
    match s {
        ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok(),
        ObjectOrReference::Ref { ref_path, .. } => {
            resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok())
        }
    }
}

fn extract_request_schema(spec: &OpenApiV3Spec, operation: &oas3::spec::Operation) -> Option<Value> {
    operation.request_body.as_ref().and_then(|r| match r {
        ObjectOrReference::Object(body) => body
            .content
            .get("application/json")
            .and_then(|media| media.schema.as_ref())
            .and_then(|s| schema_value(spec, s)),
        ObjectOrReference::Ref { ref_path, .. } => resolve_schema_ref(spec, ref_path)
            .and_then(|s| serde_json::to_value(s).ok()),
    })
}

fn extract_response_schemas(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
) -> HashMap<u16, HashMap<String, Value>> {
    let mut out = HashMap::new();
    let Some(responses) = operation.responses.as_ref() else {
        return out;
    };
    for (status_str, resp_ref) in responses {
        let Ok(status) = status_str.parse::<u16>() else {
            continue;
        };
        if let ObjectOrReference::Object(resp) = resp_ref {
            for (mt, media) in &resp.content {
                if let Some(schema) = media.schema.as_ref().and_then(|s| schema_value(spec, s)) {
                    out.entry(status).or_insert_with(HashMap::new).insert(mt.clone(), schema);
                }
            }
        }
    }
    out
}

/// Read a `{enabled: [name,…], <name>: {<config>}}` middleware block: `enabled`
/// lists the operator-declared chain in order, and each name's own key (if
/// present) carries its config object.
fn parse_middleware_block(block: &serde_json::Map<String, Value>) -> Vec<MiddlewareRef> {
    let Some(enabled) = block.get("enabled").and_then(Value::as_array) else {
        return Vec::new();
    };
    enabled
        .iter()
        .filter_map(|v| v.as_str())
        .map(|name| {
            let config = block.get(name).cloned().unwrap_or(Value::Object(Default::default()));
            MiddlewareRef { name: name.to_string(), config }
        })
        .collect()
}

fn parse_backend_host(host: &str) -> Option<(String, String, u16)> {
    let url = url::Url::parse(host).ok()?;
    let scheme = url.scheme();
    if scheme.is_empty() {
        return None;
    }
    let host_str = url.host_str()?;
    if host_str.is_empty() {
        return None;
    }
    let port = url.port().unwrap_or(if scheme == "https" { 443 } else { 80 });
    Some((scheme.to_string(), host_str.to_string(), port))
}

/// Parses the root `x-transportd-backends` extension:
/// `{backends: [name,…], <name>: {host, pool: {count, ttl}}}`. If the
/// `default` backend carries an `allowUnknown` sub-block, it is returned as
/// the passthrough route installed under the reserved `(unknown, unknown)` key.
fn parse_backends(
    root_ext: &HashMap<String, Value>,
    issues: &mut Vec<ValidationIssue>,
) -> (HashMap<String, BackendConfig>, Option<RouteSpec>) {
    let mut out = HashMap::new();
    let mut passthrough = None;
    let Some(Value::Object(root)) = root_ext.get("x-transportd-backends") else {
        return (out, passthrough);
    };
    let Some(names) = root.get("backends").and_then(Value::as_array) else {
        return (out, passthrough);
    };
    for name_value in names {
        let Some(name) = name_value.as_str() else { continue };
        let Some(cfg) = root.get(name).and_then(Value::as_object) else {
            issues.push(ValidationIssue::new(
                format!("backends.{name}"),
                "InvalidBackendHost",
                "backend is listed but has no config block",
            ));
            continue;
        };
        let Some(host_str) = cfg.get("host").and_then(Value::as_str) else {
            issues.push(ValidationIssue::new(
                format!("backends.{name}"),
                "InvalidBackendHost",
                "backend is missing a host",
            ));
            continue;
        };
        let Some((scheme, host, port)) = parse_backend_host(host_str) else {
            issues.push(ValidationIssue::new(
                format!("backends.{name}"),
                "InvalidBackendHost",
                format!("host {host_str:?} does not parse as a URL with scheme and host"),
            ));
            continue;
        };
        let pool = cfg.get("pool").and_then(Value::as_object);
        let pool_size = pool.and_then(|p| p.get("count")).and_then(Value::as_u64).unwrap_or(4) as usize;
        let ttl_seconds = pool.and_then(|p| p.get("ttl")).and_then(Value::as_u64).unwrap_or(300);
        out.insert(
            name.to_ascii_uppercase(),
            BackendConfig {
                name: name.to_string(),
                scheme,
                host,
                port,
                pool_size: pool_size.max(1),
                ttl_seconds,
            },
        );

        if name.eq_ignore_ascii_case("default") {
            if let Some(allow_unknown) = cfg.get("allowUnknown").and_then(Value::as_object) {
                passthrough = Some(RouteSpec {
                    method: http::Method::from_bytes(b"UNKNOWN").expect("valid extension token"),
                    path_pattern: "unknown".to_string(),
                    operation_id: "passthrough".to_string(),
                    backend: name.to_ascii_uppercase(),
                    middleware: parse_middleware_block(allow_unknown),
                    request_schema: None,
                    response_schemas: HashMap::new(),
                });
            }
        }
    }
    (out, passthrough)
}

/// Load, interpolate, parse, and validate an OpenAPI spec into the engine's
/// [`Spec`] view. Validation issues are accumulated and reported together.
pub fn load_spec() -> Result<Spec, BootError> {
    let raw = read_spec_source()?;
    let interpolated = interpolate_env(&raw);
    let mut value = parse_document(&interpolated)?;

    let root_ext: HashMap<String, Value> = value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| k.starts_with("x-"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    // oas3 rejects path items carrying unknown non-x- keys in some builds; strip
    // nothing here since transportd's extensions are already x-prefixed.
    let spec: OpenApiV3Spec =
        serde_json::from_value(value.take()).map_err(|e| BootError::SpecParse(e.to_string()))?;

    let title = spec.info.title.clone();
    let mut issues = Vec::new();
    let (backends, passthrough) = parse_backends(&root_ext, &mut issues);

    let mut routes = Vec::new();
    if let Some(paths) = spec.paths.as_ref() {
        for (path, item) in paths {
            for (method, operation) in item.methods() {
                let location = format!("{path} {method}");
                let ext = operation.extensions.get("x-transportd").and_then(Value::as_object);

                let operation_id = operation
                    .operation_id
                    .clone()
                    .unwrap_or_else(|| format!("{method}_{path}"));

                let Some(ext) = ext else {
                    issues.push(ValidationIssue::new(
                        &location,
                        "MissingExtension",
                        "operation is missing the x-transportd extension block",
                    ));
                    continue;
                };
                let Some(backend) = ext.get("backend").and_then(Value::as_str).map(str::to_string) else {
                    issues.push(ValidationIssue::new(&location, "MissingExtension", "operation is missing a backend"));
                    continue;
                };
                if !backends.contains_key(&backend.to_ascii_uppercase()) {
                    issues.push(ValidationIssue::new(
                        &location,
                        "UnknownBackend",
                        format!("operation references unknown backend {backend:?}"),
                    ));
                }

                routes.push(RouteSpec {
                    method: method.clone(),
                    path_pattern: path.clone(),
                    operation_id,
                    backend,
                    middleware: parse_middleware_block(ext),
                    request_schema: extract_request_schema(&spec, operation),
                    response_schemas: extract_response_schemas(&spec, operation),
                });
            }
        }
    }

    if let Some(route) = passthrough {
        routes.push(route);
    }

    fail_if_issues(issues);
    Ok(Spec { title, routes, backends })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_known_and_blanks_unknown() {
        std::env::set_var("TRANSPORTD_TEST_VAR", "value");
        let out = interpolate_env("host=${TRANSPORTD_TEST_VAR} missing=${TRANSPORTD_TEST_MISSING}");
        assert_eq!(out, "host=value missing=");
        std::env::remove_var("TRANSPORTD_TEST_VAR");
    }

    #[test]
    fn interpolation_is_single_pass() {
        std::env::set_var("TRANSPORTD_OUTER", "${TRANSPORTD_INNER}");
        std::env::set_var("TRANSPORTD_INNER", "leaf");
        let out = interpolate_env("${TRANSPORTD_OUTER}");
        assert_eq!(out, "${TRANSPORTD_INNER}");
        std::env::remove_var("TRANSPORTD_OUTER");
        std::env::remove_var("TRANSPORTD_INNER");
    }

    #[test]
    fn unterminated_placeholder_is_left_alone() {
        let out = interpolate_env("no closing ${BRACE");
        assert_eq!(out, "no closing ${BRACE");
    }

    #[test]
    fn parses_backend_host_and_pool() {
        let mut root_ext = HashMap::new();
        root_ext.insert(
            "x-transportd-backends".to_string(),
            serde_json::json!({
                "backends": ["ORDERS"],
                "ORDERS": {
                    "host": "http://orders.internal:8080",
                    "pool": {"count": 4, "ttl": 120}
                }
            }),
        );
        let mut issues = Vec::new();
        let (backends, passthrough) = parse_backends(&root_ext, &mut issues);
        assert!(issues.is_empty());
        assert!(passthrough.is_none());
        let orders = backends.get("ORDERS").expect("backend present");
        assert_eq!(orders.scheme, "http");
        assert_eq!(orders.host, "orders.internal");
        assert_eq!(orders.port, 8080);
        assert_eq!(orders.pool_size, 4);
        assert_eq!(orders.ttl_seconds, 120);
    }

    #[test]
    fn builds_passthrough_route_from_default_allow_unknown() {
        let mut root_ext = HashMap::new();
        root_ext.insert(
            "x-transportd-backends".to_string(),
            serde_json::json!({
                "backends": ["default"],
                "default": {
                    "host": "http://fallback.internal:9090",
                    "pool": {"count": 1, "ttl": 60},
                    "allowUnknown": {"enabled": ["accesslog"]}
                }
            }),
        );
        let mut issues = Vec::new();
        let (backends, passthrough) = parse_backends(&root_ext, &mut issues);
        assert!(issues.is_empty());
        assert!(backends.contains_key("DEFAULT"));
        let route = passthrough.expect("passthrough route built");
        assert_eq!(route.path_pattern, "unknown");
        assert_eq!(route.backend, "DEFAULT");
        assert_eq!(route.middleware.len(), 1);
        assert_eq!(route.middleware[0].name, "accesslog");
    }

    #[test]
    fn rejects_backend_with_unparseable_host() {
        let mut root_ext = HashMap::new();
        root_ext.insert(
            "x-transportd-backends".to_string(),
            serde_json::json!({
                "backends": ["ORDERS"],
                "ORDERS": {"host": "not-a-url"}
            }),
        );
        let mut issues = Vec::new();
        let (backends, _) = parse_backends(&root_ext, &mut issues);
        assert!(backends.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, "InvalidBackendHost");
    }

    #[test]
    fn parses_middleware_block_config_by_name() {
        let block: serde_json::Map<String, Value> = serde_json::from_value(serde_json::json!({
            "enabled": ["timeout", "retry"],
            "timeout": {"timeout_ms": 2000},
            "retry": {"codes": [503], "limit": 3}
        }))
        .expect("valid object");
        let middleware = parse_middleware_block(&block);
        assert_eq!(middleware.len(), 2);
        assert_eq!(middleware[0].name, "timeout");
        assert_eq!(middleware[0].config["timeout_ms"], 2000);
        assert_eq!(middleware[1].name, "retry");
        assert_eq!(middleware[1].config["limit"], 3);
    }
}
