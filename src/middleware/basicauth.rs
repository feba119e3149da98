use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, HTTPError, TransportError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;

/// Requires a valid `Authorization: Basic ...` header matching a configured
/// username/password before forwarding the request.
struct BasicAuth {
    next: Arc<dyn Transport>,
    expected: String,
}

#[async_trait]
impl Transport for BasicAuth {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let provided = req
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Basic "))
            .and_then(|encoded| STANDARD.decode(encoded).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok());

        match provided {
            Some(creds) if creds == self.expected => self.next.round_trip(ctx, req).await,
            _ => Ok(ProxyResponse::from_http_error(&HTTPError::unauthorized("invalid basic auth credentials"))),
        }
    }
}

pub struct BasicAuthFactory;

impl MiddlewareFactory for BasicAuthFactory {
    fn name(&self) -> &'static str {
        "basicauth"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let username = config
            .get("username")
            .and_then(Value::as_str)
            .ok_or_else(|| BootError::InvalidConfig("basicauth".into(), "missing username".into()))?;
        let password = config
            .get("password")
            .and_then(Value::as_str)
            .ok_or_else(|| BootError::InvalidConfig("basicauth".into(), "missing password".into()))?;
        Ok(Arc::new(BasicAuth {
            next,
            expected: format!("{username}:{password}"),
        }))
    }
}
