use crate::backend::BackendRegistry;
use crate::error::{BootError, TransportError};
use crate::middleware::{Context, MiddlewareRegistry, ProxyRequest, ProxyResponse, Transport};
use crate::spec::RouteSpec;
use async_trait::async_trait;
use std::sync::Arc;

/// The pooled base transport: forwards a [`ProxyRequest`] to the backend named
/// by the route, using the Backend Registry's rotating pool of clients.
pub struct BaseTransport {
    backends: Arc<BackendRegistry>,
    backend_name: String,
}

#[async_trait]
impl Transport for BaseTransport {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let Some(client) = self.backends.get(&self.backend_name) else {
            return Err(TransportError::Upstream(format!("backend {:?} has no pooled transport", self.backend_name)));
        };
        let Some(base_url) = self.backends.base_url(&self.backend_name) else {
            return Err(TransportError::Upstream(format!("backend {:?} has no base url", self.backend_name)));
        };

        let url = format!("{base_url}{}", req.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"));
        let _ = &ctx.route.operation_id;

        let mut builder = client.request(req.method.clone(), &url).body(req.body.clone());
        for (name, value) in req.headers.iter() {
            builder = builder.header(name, value);
        }

        match builder.send().await {
            Ok(resp) => {
                let status = resp.status();
                let headers = resp.headers().clone();
                let body = resp.bytes().await.unwrap_or_default();
                Ok(ProxyResponse { status, headers, body })
            }
            Err(e) if e.is_timeout() => Err(TransportError::DeadlineExceeded),
            Err(e) => Err(TransportError::Upstream(e.to_string())),
        }
    }
}

/// Builds the composed transport for one route: the pooled base transport
/// wrapped by the route's declared middleware chain, outermost-first.
pub struct ClientFactory {
    backends: Arc<BackendRegistry>,
    middleware: Arc<MiddlewareRegistry>,
}

impl ClientFactory {
    pub fn new(backends: Arc<BackendRegistry>, middleware: Arc<MiddlewareRegistry>) -> Self {
        ClientFactory { backends, middleware }
    }

    pub fn build(&self, route: &RouteSpec) -> Result<Arc<dyn Transport>, BootError> {
        let mut transport: Arc<dyn Transport> = Arc::new(BaseTransport {
            backends: self.backends.clone(),
            backend_name: route.backend.clone(),
        });
        for mw in route.middleware.iter().rev() {
            transport = self.middleware.wrap(&mw.name, &mw.config, transport, &route.operation_id)?;
        }
        Ok(transport)
    }
}
