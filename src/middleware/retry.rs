use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackoffMode {
    Fixed,
    Exponential,
}

/// Retries on a configured set of response status codes, response-phase only:
/// a transport error propagates unchanged and is never retried here (that is
/// the Error Mapper's concern). Backoff is jittered uniformly in `[0.8b, 1.2b]`
/// for fixed mode, doubled per attempt (each still jittered) for exponential.
struct Retry {
    next: Arc<dyn Transport>,
    codes: Vec<u16>,
    limit: u32,
    backoff: Duration,
    mode: BackoffMode,
}

fn jittered(backoff: Duration) -> Duration {
    let millis = backoff.as_millis() as f64;
    let factor = rand::rng().random_range(0.8..=1.2);
    Duration::from_millis((millis * factor) as u64)
}

#[async_trait]
impl Transport for Retry {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            let resp = self.next.round_trip(ctx, req.clone()).await?;
            if attempt + 1 >= self.limit || !self.codes.contains(&resp.status.as_u16()) {
                return Ok(resp);
            }
            let backoff = match self.mode {
                BackoffMode::Fixed => self.backoff,
                BackoffMode::Exponential => self.backoff * 2u32.saturating_pow(attempt),
            };
            tokio::time::sleep(jittered(backoff)).await;
            attempt += 1;
        }
    }
}

pub struct RetryFactory;

impl MiddlewareFactory for RetryFactory {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let codes = config
            .get("codes")
            .and_then(Value::as_array)
            .ok_or_else(|| BootError::InvalidConfig("retry".into(), "missing codes".into()))?
            .iter()
            .filter_map(|v| v.as_u64())
            .map(|v| v as u16)
            .collect();
        let limit = config.get("limit").and_then(Value::as_u64).unwrap_or(3) as u32;
        let backoff_ms = config.get("backoff_ms").and_then(Value::as_u64).unwrap_or(10);
        let mode = match config.get("mode").and_then(Value::as_str) {
            Some("exponential") => BackoffMode::Exponential,
            _ => BackoffMode::Fixed,
        };
        Ok(Arc::new(Retry {
            next,
            codes,
            limit: limit.max(1),
            backoff: Duration::from_millis(backoff_ms),
            mode,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(100);
        for _ in 0..50 {
            let j = jittered(base);
            assert!(j.as_millis() >= 80 && j.as_millis() <= 120);
        }
    }
}
