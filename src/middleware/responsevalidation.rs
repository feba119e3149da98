use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, HTTPError, TransportError};
use crate::validator_cache::ValidatorCache;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use tracing::warn;

/// Validates the upstream's response body against the operation's OpenAPI
/// response schema for the status actually returned. A schema mismatch maps
/// to a 502 `HTTPError` to the caller; a transport error from downstream
/// propagates unchanged without being validated.
struct ResponseValidation {
    next: Arc<dyn Transport>,
    cache: ValidatorCache,
}

fn decode_body(resp: &ProxyResponse) -> Option<Value> {
    let is_gzip = resp
        .headers
        .get(http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);

    if is_gzip {
        let mut decoder = GzDecoder::new(&resp.body[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).ok()?;
        serde_json::from_slice(&decompressed).ok()
    } else {
        serde_json::from_slice(&resp.body).ok()
    }
}

#[async_trait]
impl Transport for ResponseValidation {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let resp = self.next.round_trip(ctx, req).await?;
        let Some(by_content_type) = ctx.route.response_schemas.get(&resp.status.as_u16()) else {
            return Ok(resp);
        };
        let Some(schema) = by_content_type.get("application/json") else {
            return Ok(resp);
        };
        let Some(validator) = self.cache.get_or_compile(
            &ctx.route.operation_id,
            "response",
            Some(resp.status.as_u16()),
            schema,
        ) else {
            return Ok(resp);
        };
        if let Some(body) = decode_body(&resp) {
            if let Err(error) = validator.validate(&body) {
                let reason = error.to_string();
                warn!(
                    operation = %ctx.route.operation_id,
                    status = resp.status.as_u16(),
                    error = %reason,
                    "upstream response failed schema validation"
                );
                return Ok(ProxyResponse::from_http_error(&HTTPError::bad_gateway(reason)));
            }
        }
        Ok(resp)
    }
}

pub struct ResponseValidationFactory {
    cache: ValidatorCache,
}

impl ResponseValidationFactory {
    pub fn new(cache: ValidatorCache) -> Self {
        ResponseValidationFactory { cache }
    }
}

impl MiddlewareFactory for ResponseValidationFactory {
    fn name(&self) -> &'static str {
        "responsevalidation"
    }

    fn build(&self, _config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        Ok(Arc::new(ResponseValidation {
            next,
            cache: self.cache.clone(),
        }))
    }
}
