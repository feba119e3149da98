//! Middleware Registry (C3) and the Transport composition contract (C4/C8).
//!
//! Each middleware is a struct wrapping `next: Arc<dyn Transport>`; calling
//! `round_trip` on the outermost wrap walks the whole chain down to the pooled
//! base transport and back. This is the polymorphic-Transport modeling of the
//! "wrap function" called for in the design notes, in place of boxed closures.

mod accesslog;
mod asaptoken;
mod asapvalidate;
mod basicauth;
mod headerinject;
mod hedging;
mod metrics;
mod registry;
mod requestvalidation;
mod responsevalidation;
mod retry;
mod retryafter;
mod strip;
mod timeout;
mod validateheaders;

pub use registry::{MiddlewareFactory, MiddlewareRegistry};

use crate::error::TransportError;
use crate::spec::RouteSpec;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use std::collections::HashMap;
use std::sync::Arc;

/// An outbound request as it flows through the middleware chain.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A response as it flows back up the middleware chain.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn from_http_error(err: &crate::error::HTTPError) -> Self {
        let body = Bytes::from(serde_json::to_vec(&err.to_body()).unwrap_or_default());
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, "application/json".parse().expect("static header value"));
        ProxyResponse {
            status: StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers,
            body,
        }
    }
}

/// Per-request immutable context: the matched route plus its path/query
/// parameters, populated exactly once by the Dispatcher before any
/// middleware runs.
#[derive(Debug, Clone)]
pub struct Context {
    pub route: Arc<RouteSpec>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
}

/// The composed-transport contract every middleware and the pooled base
/// transport implement.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError>;
}
