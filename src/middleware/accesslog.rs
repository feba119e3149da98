use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Logs method, path, status, and latency for every request. Never rejects a
/// request and never short-circuits the chain.
struct AccessLog {
    next: Arc<dyn Transport>,
}

#[async_trait]
impl Transport for AccessLog {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let start = Instant::now();
        let method = req.method.clone();
        let uri = req.uri.clone();
        let result = self.next.round_trip(ctx, req).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(resp) => info!(
                operation = %ctx.route.operation_id,
                method = %method,
                uri = %uri,
                status = resp.status.as_u16(),
                latency_ms = elapsed.as_millis() as u64,
                "request completed"
            ),
            Err(err) => info!(
                operation = %ctx.route.operation_id,
                method = %method,
                uri = %uri,
                error = %err,
                latency_ms = elapsed.as_millis() as u64,
                "request failed"
            ),
        }
        result
    }
}

pub struct AccessLogFactory;

impl MiddlewareFactory for AccessLogFactory {
    fn name(&self) -> &'static str {
        "accesslog"
    }

    fn build(&self, _config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        Ok(Arc::new(AccessLog { next }))
    }
}
