use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Bounds how long the downstream chain may take before the caller sees a
/// deadline-exceeded error. Responses are buffered (not streamed) end to end
/// in this engine, so there is no separate "let the response drain" phase to
/// preserve once a deadline fires: aborting the wrapped future is equivalent
/// to aborting the downstream read.
struct Timeout {
    next: Arc<dyn Transport>,
    duration: Duration,
}

#[async_trait]
impl Transport for Timeout {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        match tokio::time::timeout(self.duration, self.next.round_trip(ctx, req)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::DeadlineExceeded),
        }
    }
}

pub struct TimeoutFactory;

impl MiddlewareFactory for TimeoutFactory {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let ms = config
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| BootError::InvalidConfig("timeout".into(), "missing timeout_ms".into()))?;
        Ok(Arc::new(Timeout {
            next,
            duration: Duration::from_millis(ms),
        }))
    }
}
