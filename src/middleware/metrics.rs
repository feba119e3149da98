use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide per-operation request/status counters. Lock-free via `DashMap`,
/// mirroring the teacher's bucketed counter approach without the histogram
/// machinery the spec's middleware table does not ask for.
static COUNTERS: Lazy<DashMap<(String, u16), AtomicU64>> = Lazy::new(DashMap::new);

pub fn snapshot() -> Vec<((String, u16), u64)> {
    COUNTERS
        .iter()
        .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
        .collect()
}

struct Metrics {
    next: Arc<dyn Transport>,
}

#[async_trait]
impl Transport for Metrics {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let result = self.next.round_trip(ctx, req).await;
        let status = match &result {
            Ok(resp) => resp.status.as_u16(),
            Err(TransportError::Cancelled) => 499,
            Err(TransportError::DeadlineExceeded) => 504,
            Err(TransportError::Upstream(_)) => 502,
        };
        COUNTERS
            .entry((ctx.route.operation_id.clone(), status))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        result
    }
}

pub struct MetricsFactory;

impl MiddlewareFactory for MetricsFactory {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn build(&self, _config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        Ok(Arc::new(Metrics { next }))
    }
}
