use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Honors a `Retry-After` response header: if the wrapped transport returns
/// 429 or 503 with a parseable `Retry-After` (seconds), sleeps that long and
/// retries once. Any other status or a second failure passes through as-is.
struct RetryAfter {
    next: Arc<dyn Transport>,
    max_wait: Duration,
}

fn retry_after_seconds(resp: &ProxyResponse) -> Option<u64> {
    if resp.status.as_u16() != 429 && resp.status.as_u16() != 503 {
        return None;
    }
    resp.headers
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

#[async_trait]
impl Transport for RetryAfter {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let first = self.next.round_trip(ctx, req.clone()).await?;
        let Some(seconds) = retry_after_seconds(&first) else {
            return Ok(first);
        };
        let wait = Duration::from_secs(seconds).min(self.max_wait);
        tokio::time::sleep(wait).await;
        self.next.round_trip(ctx, req).await
    }
}

pub struct RetryAfterFactory;

impl MiddlewareFactory for RetryAfterFactory {
    fn name(&self) -> &'static str {
        "retryafter"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let max_wait_ms = config.get("max_wait_ms").and_then(Value::as_u64).unwrap_or(30_000);
        Ok(Arc::new(RetryAfter {
            next,
            max_wait: Duration::from_millis(max_wait_ms),
        }))
    }
}
