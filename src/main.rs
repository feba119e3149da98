use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use transportd::backend::BackendRegistry;
use transportd::client::{ClientFactory, ClientRegistry};
use transportd::dispatcher::Dispatcher;
use transportd::error::{HTTPError, TransportError};
use transportd::middleware::{MiddlewareRegistry, ProxyResponse};
use transportd::router::Router as SpecRouter;
use transportd::spec::load_spec;
use transportd::validator_cache::ValidatorCache;
use transportd::{cli, telemetry};

use clap::Parser;

fn proxy_response_into_axum(resp: ProxyResponse) -> Response {
    let mut builder = Response::builder().status(resp.status);
    if let Some(headers) = builder.headers_mut() {
        *headers = resp.headers;
    }
    builder
        .body(axum::body::Body::from(resp.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn proxy_handler(State(dispatcher): State<Arc<Dispatcher>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let method: Method = parts.method.clone();
    let uri: Uri = parts.uri.clone();
    let headers: HeaderMap = parts.headers.clone();

    let body_bytes = match Bytes::from_request(Request::from_parts(parts, body), &()).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let err = HTTPError::from_transport_error(&TransportError::Cancelled);
            return proxy_response_into_axum(ProxyResponse::from_http_error(&err));
        }
    };

    let resp = dispatcher.dispatch(method, uri, headers, body_bytes).await;
    proxy_response_into_axum(resp)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    if args.example {
        println!("{}", cli::EXAMPLE_SPEC);
        return Ok(());
    }

    telemetry::init()?;

    let spec = load_spec()?;
    tracing::info!(title = %spec.title, routes = spec.routes.len(), "loaded spec");

    let backends = Arc::new(BackendRegistry::build(&spec.backends)?);
    let validator_cache = ValidatorCache::new(true);
    let middleware_registry = Arc::new(MiddlewareRegistry::new(validator_cache));
    let factory = ClientFactory::new(backends.clone(), middleware_registry);
    let client_registry = ClientRegistry::build(&spec, &factory)?;
    let router = SpecRouter::build(&spec);
    let dispatcher = Arc::new(Dispatcher::new(router, client_registry, backends));

    let app = axum::Router::new()
        .fallback(proxy_handler)
        .with_state(dispatcher);

    let addr = std::env::var("TRANSPORTD_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "transportd listening");
    axum::serve(listener, app).await?;
    Ok(())
}
