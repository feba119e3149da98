use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Fires a second, identical attempt if the first hasn't returned within
/// `delay`, and takes whichever completes first. The loser is dropped, which
/// cancels its in-flight future cooperatively at its next await point —
/// on a multi-threaded tokio runtime this does not forcefully preempt an
/// upstream call already in progress, only stops polling it.
struct Hedging {
    next: Arc<dyn Transport>,
    delay: Duration,
}

#[async_trait]
impl Transport for Hedging {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let primary = self.next.round_trip(ctx, req.clone());
        tokio::pin!(primary);

        tokio::select! {
            result = &mut primary => result,
            _ = tokio::time::sleep(self.delay) => {
                let hedged = self.next.round_trip(ctx, req);
                tokio::select! {
                    result = primary => result,
                    result = hedged => result,
                }
            }
        }
    }
}

pub struct HedgingFactory;

impl MiddlewareFactory for HedgingFactory {
    fn name(&self) -> &'static str {
        "hedging"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let delay_ms = config
            .get("delay_ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| BootError::InvalidConfig("hedging".into(), "missing delay_ms".into()))?;
        Ok(Arc::new(Hedging {
            next,
            delay: Duration::from_millis(delay_ms),
        }))
    }
}
