use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, HTTPError, TransportError};
use crate::validator_cache::ValidatorCache;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Validates the inbound request body against the operation's OpenAPI request
/// schema before forwarding. Schema is resolved once at build time; the
/// compiled validator itself is shared via [`ValidatorCache`].
struct RequestValidation {
    next: Arc<dyn Transport>,
    cache: ValidatorCache,
}

#[async_trait]
impl Transport for RequestValidation {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let Some(schema) = ctx.route.request_schema.as_ref() else {
            return self.next.round_trip(ctx, req).await;
        };
        if req.body.is_empty() {
            return self.next.round_trip(ctx, req).await;
        }
        let Ok(body_value) = serde_json::from_slice::<Value>(&req.body) else {
            return Ok(ProxyResponse::from_http_error(&HTTPError::bad_request("request body is not valid JSON")));
        };
        let Some(validator) = self.cache.get_or_compile(&ctx.route.operation_id, "request", None, schema) else {
            return self.next.round_trip(ctx, req).await;
        };
        if let Err(error) = validator.validate(&body_value) {
            let reason = error.to_string();
            return Ok(ProxyResponse::from_http_error(&HTTPError::bad_request(reason)));
        }
        self.next.round_trip(ctx, req).await
    }
}

pub struct RequestValidationFactory {
    cache: ValidatorCache,
}

impl RequestValidationFactory {
    pub fn new(cache: ValidatorCache) -> Self {
        RequestValidationFactory { cache }
    }
}

impl MiddlewareFactory for RequestValidationFactory {
    fn name(&self) -> &'static str {
        "requestvalidation"
    }

    fn build(&self, _config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        Ok(Arc::new(RequestValidation {
            next,
            cache: self.cache.clone(),
        }))
    }
}
