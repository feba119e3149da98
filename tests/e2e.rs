//! End-to-end scenarios against a `wiremock` upstream, covering the literal
//! scenarios named by the request lifecycle engine's testable properties.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use transportd::backend::BackendRegistry;
use transportd::client::{ClientFactory, ClientRegistry};
use transportd::dispatcher::Dispatcher;
use transportd::middleware::MiddlewareRegistry;
use transportd::router::Router;
use transportd::spec::{BackendConfig, MiddlewareRef, RouteSpec, Spec};
use transportd::validator_cache::ValidatorCache;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_dispatcher(spec: &Spec) -> Dispatcher {
    let backends = Arc::new(BackendRegistry::build(&spec.backends).expect("valid backends"));
    let validator_cache = ValidatorCache::new(true);
    let middleware_registry = Arc::new(MiddlewareRegistry::new(validator_cache));
    let factory = ClientFactory::new(backends.clone(), middleware_registry);
    let client_registry = ClientRegistry::build(spec, &factory).expect("valid routes");
    let router = Router::build(spec);
    Dispatcher::new(router, client_registry, backends)
}

fn backend_for(mock: &MockServer) -> BackendConfig {
    let url = url::Url::parse(&mock.uri()).expect("wiremock uri parses");
    BackendConfig {
        name: "api".into(),
        scheme: url.scheme().to_string(),
        host: url.host_str().expect("host").to_string(),
        port: url.port().unwrap_or(80),
        pool_size: 1,
        ttl_seconds: 300,
    }
}

#[tokio::test]
async fn happy_path_request_validation_passes_query_through() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"greeting": "hi"})))
        .mount(&mock)
        .await;

    let mut backends = HashMap::new();
    backends.insert("API".to_string(), backend_for(&mock));

    let route = RouteSpec {
        method: Method::GET,
        path_pattern: "/hello".into(),
        operation_id: "get_hello".into(),
        backend: "API".into(),
        middleware: vec![],
        request_schema: None,
        response_schemas: HashMap::new(),
    };
    let spec = Spec { title: "test".into(), routes: vec![route], backends };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(
            Method::GET,
            "/hello?name=world".parse::<Uri>().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await;

    assert_eq!(resp.status.as_u16(), 200);
    let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(body["greeting"], "hi");
}

#[tokio::test]
async fn missing_required_query_param_rejected_before_backend_call() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let mut backends = HashMap::new();
    backends.insert("API".to_string(), backend_for(&mock));

    let route = RouteSpec {
        method: Method::GET,
        path_pattern: "/hello".into(),
        operation_id: "get_hello".into(),
        backend: "API".into(),
        middleware: vec![MiddlewareRef {
            name: "validateheaders".into(),
            config: json!({"headers": [{"name": "X-Required"}]}),
        }],
        request_schema: None,
        response_schemas: HashMap::new(),
    };
    let spec = Spec { title: "test".into(), routes: vec![route], backends };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(Method::GET, "/hello".parse::<Uri>().unwrap(), HeaderMap::new(), Bytes::new())
        .await;

    assert_eq!(resp.status.as_u16(), 400);
    mock.verify().await;
}

#[tokio::test]
async fn retry_reissues_on_configured_status_until_success() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock)
        .await;

    let mut backends = HashMap::new();
    backends.insert("API".to_string(), backend_for(&mock));

    let route = RouteSpec {
        method: Method::GET,
        path_pattern: "/flaky".into(),
        operation_id: "get_flaky".into(),
        backend: "API".into(),
        middleware: vec![MiddlewareRef {
            name: "retry".into(),
            config: json!({"codes": [503], "limit": 3, "backoff_ms": 1}),
        }],
        request_schema: None,
        response_schemas: HashMap::new(),
    };
    let spec = Spec { title: "test".into(), routes: vec![route], backends };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(Method::GET, "/flaky".parse::<Uri>().unwrap(), HeaderMap::new(), Bytes::new())
        .await;

    assert_eq!(resp.status.as_u16(), 200);
}

#[tokio::test]
async fn router_miss_without_passthrough_returns_404() {
    let spec = Spec { title: "test".into(), routes: vec![], backends: HashMap::new() };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(Method::GET, "/unknown".parse::<Uri>().unwrap(), HeaderMap::new(), Bytes::new())
        .await;

    assert_eq!(resp.status.as_u16(), 404);
}

#[tokio::test]
async fn router_miss_with_passthrough_proxies_to_unknown_backend() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/anything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"passed": true})))
        .mount(&mock)
        .await;

    let mut backends = HashMap::new();
    backends.insert("DEFAULT".to_string(), backend_for(&mock));

    let passthrough = RouteSpec {
        method: Method::from_bytes(b"UNKNOWN").unwrap(),
        path_pattern: "unknown".into(),
        operation_id: "passthrough".into(),
        backend: "DEFAULT".into(),
        middleware: vec![],
        request_schema: None,
        response_schemas: HashMap::new(),
    };
    let spec = Spec { title: "test".into(), routes: vec![passthrough], backends };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(Method::GET, "/anything".parse::<Uri>().unwrap(), HeaderMap::new(), Bytes::new())
        .await;

    assert_eq!(resp.status.as_u16(), 200);
}

#[tokio::test]
async fn timeout_middleware_maps_to_gateway_timeout() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(200)))
        .mount(&mock)
        .await;

    let mut backends = HashMap::new();
    backends.insert("API".to_string(), backend_for(&mock));

    let route = RouteSpec {
        method: Method::GET,
        path_pattern: "/slow".into(),
        operation_id: "get_slow".into(),
        backend: "API".into(),
        middleware: vec![MiddlewareRef {
            name: "timeout".into(),
            config: json!({"timeout_ms": 20}),
        }],
        request_schema: None,
        response_schemas: HashMap::new(),
    };
    let spec = Spec { title: "test".into(), routes: vec![route], backends };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(Method::GET, "/slow".parse::<Uri>().unwrap(), HeaderMap::new(), Bytes::new())
        .await;

    assert_eq!(resp.status.as_u16(), 504);
}

#[tokio::test]
async fn location_header_is_rewritten_relative_to_backend() {
    let mock = MockServer::start().await;
    let backend_cfg = backend_for(&mock);
    let location = format!("{}://{}:{}/next?x=1", backend_cfg.scheme, backend_cfg.host, backend_cfg.port);
    Mock::given(method("GET"))
        .and(path("/redirect"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location.as_str()))
        .mount(&mock)
        .await;

    let mut backends = HashMap::new();
    backends.insert("API".to_string(), backend_cfg);

    let route = RouteSpec {
        method: Method::GET,
        path_pattern: "/redirect".into(),
        operation_id: "get_redirect".into(),
        backend: "API".into(),
        middleware: vec![],
        request_schema: None,
        response_schemas: HashMap::new(),
    };
    let spec = Spec { title: "test".into(), routes: vec![route], backends };
    let dispatcher = build_dispatcher(&spec);

    let resp = dispatcher
        .dispatch(Method::GET, "/redirect".parse::<Uri>().unwrap(), HeaderMap::new(), Bytes::new())
        .await;

    assert_eq!(resp.status.as_u16(), 302);
    assert_eq!(resp.headers.get(http::header::LOCATION).unwrap(), "/next?x=1");
}
