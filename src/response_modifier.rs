//! Response Modifier (C10): if a response carries a `Location` header that
//! parses as an absolute URL, rewrite it to a path-only URL (scheme and host
//! cleared, path and query preserved verbatim), so a 201/3xx from any upstream
//! doesn't leak internal hostnames to the caller.

use crate::backend::BackendRegistry;
use crate::middleware::{Context, ProxyResponse};
use http::Uri;

pub fn rewrite_location(_backends: &BackendRegistry, _ctx: &Context, mut resp: ProxyResponse) -> ProxyResponse {
    let Some(location) = resp.headers.get(http::header::LOCATION).and_then(|v| v.to_str().ok()) else {
        return resp;
    };
    let Ok(uri) = location.parse::<Uri>() else {
        return resp;
    };
    if uri.scheme().is_none() {
        return resp;
    }
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    if let Ok(value) = path_and_query.parse() {
        resp.headers.insert(http::header::LOCATION, value);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{BackendConfig, RouteSpec};
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn test_ctx() -> (BackendRegistry, Context) {
        let mut backends = HashMap::new();
        backends.insert(
            "BACKEND".to_string(),
            BackendConfig {
                name: "backend".into(),
                scheme: "http".into(),
                host: "upstream.internal".into(),
                port: 8080,
                pool_size: 1,
                ttl_seconds: 60,
            },
        );
        let registry = BackendRegistry::build(&backends).expect("valid backend config");
        let route = Arc::new(RouteSpec {
            method: http::Method::POST,
            path_pattern: "/orders".into(),
            operation_id: "create_order".into(),
            backend: "BACKEND".into(),
            middleware: Vec::new(),
            request_schema: None,
            response_schemas: HashMap::new(),
        });
        let ctx = Context {
            route,
            path_params: HashMap::new(),
            query_params: HashMap::new(),
        };
        (registry, ctx)
    }

    #[test]
    fn clears_scheme_and_host_from_absolute_location() {
        let (registry, ctx) = test_ctx();
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::LOCATION,
            "http://upstream.internal:8080/orders/42".parse().expect("valid header"),
        );
        let resp = ProxyResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::new(),
        };

        let rewritten = rewrite_location(&registry, &ctx, resp);
        assert_eq!(rewritten.headers.get(http::header::LOCATION).unwrap(), "/orders/42");
    }

    #[test]
    fn rewrites_absolute_location_even_to_a_different_host() {
        let (registry, ctx) = test_ctx();
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::LOCATION,
            "https://other.example:9090/next?x=1".parse().expect("valid header"),
        );
        let resp = ProxyResponse {
            status: StatusCode::FOUND,
            headers,
            body: Bytes::new(),
        };

        let rewritten = rewrite_location(&registry, &ctx, resp);
        assert_eq!(rewritten.headers.get(http::header::LOCATION).unwrap(), "/next?x=1");
    }

    #[test]
    fn leaves_relative_location_unchanged() {
        let (registry, ctx) = test_ctx();
        let mut headers = HeaderMap::new();
        headers.insert(http::header::LOCATION, "/already/relative".parse().expect("valid header"));
        let resp = ProxyResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::new(),
        };

        let rewritten = rewrite_location(&registry, &ctx, resp);
        assert_eq!(rewritten.headers.get(http::header::LOCATION).unwrap(), "/already/relative");
    }
}
