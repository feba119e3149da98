//! Dispatcher (C7): matches the inbound request, builds its per-request
//! [`Context`] exactly once, runs it through the route's composed transport,
//! and maps the outcome to a response the HTTP listener can write back.

use crate::backend::BackendRegistry;
use crate::client::ClientRegistry;
use crate::error::HTTPError;
use crate::middleware::{Context, ProxyRequest, ProxyResponse};
use crate::response_modifier;
use crate::router::{parse_query, Router};
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use std::sync::Arc;

pub struct Dispatcher {
    router: Router,
    client_registry: ClientRegistry,
    backends: Arc<BackendRegistry>,
}

impl Dispatcher {
    pub fn new(router: Router, client_registry: ClientRegistry, backends: Arc<BackendRegistry>) -> Self {
        Dispatcher {
            router,
            client_registry,
            backends,
        }
    }

    pub async fn dispatch(&self, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> ProxyResponse {
        let query_params = parse_query(uri.query());

        let Some(matched) = self.router.match_route(&method, uri.path()) else {
            return match self.client_registry.passthrough() {
                Some((route, transport)) => {
                    let ctx = Context {
                        route: route.clone(),
                        path_params: Default::default(),
                        query_params,
                    };
                    let req = ProxyRequest { method, uri, headers, body };
                    match transport.round_trip(&ctx, req).await {
                        Ok(resp) => response_modifier::rewrite_location(&self.backends, &ctx, resp),
                        Err(err) => ProxyResponse::from_http_error(&HTTPError::from_transport_error(&err)),
                    }
                }
                None => ProxyResponse::from_http_error(&HTTPError::not_found("no route matches this request")),
            };
        };

        let Some((_, transport)) = self
            .client_registry
            .get(&matched.route.path_pattern, matched.route.method.as_str())
        else {
            return ProxyResponse::from_http_error(&HTTPError::new(
                500,
                "internal",
                "route matched but has no composed transport",
            ));
        };

        let ctx = Context {
            route: matched.route,
            path_params: matched.path_params,
            query_params,
        };
        let req = ProxyRequest { method, uri, headers, body };

        match transport.round_trip(&ctx, req).await {
            Ok(resp) => response_modifier::rewrite_location(&self.backends, &ctx, resp),
            Err(err) => ProxyResponse::from_http_error(&HTTPError::from_transport_error(&err)),
        }
    }
}
