use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use http::{HeaderName, HeaderValue};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

fn parse_header_map(config: &Value, middleware_name: &str) -> Result<Vec<(HeaderName, HeaderValue)>, BootError> {
    let Some(obj) = config.get("headers").and_then(Value::as_object) else {
        return Err(BootError::InvalidConfig(middleware_name.to_string(), "missing headers map".into()));
    };
    obj.iter()
        .map(|(name, value)| {
            let value = value.as_str().unwrap_or_default();
            let header_name = HeaderName::from_str(name)
                .map_err(|e| BootError::InvalidConfig(middleware_name.to_string(), format!("invalid header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| BootError::InvalidConfig(middleware_name.to_string(), format!("invalid header value for {name:?}: {e}")))?;
            Ok((header_name, header_value))
        })
        .collect()
}

struct RequestHeaderInject {
    next: Arc<dyn Transport>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

#[async_trait]
impl Transport for RequestHeaderInject {
    async fn round_trip(&self, ctx: &Context, mut req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        for (name, value) in &self.headers {
            req.headers.insert(name.clone(), value.clone());
        }
        self.next.round_trip(ctx, req).await
    }
}

pub struct RequestHeaderInjectFactory;

impl MiddlewareFactory for RequestHeaderInjectFactory {
    fn name(&self) -> &'static str {
        "requestheaderinject"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        Ok(Arc::new(RequestHeaderInject {
            next,
            headers: parse_header_map(config, "requestheaderinject")?,
        }))
    }
}

struct ResponseHeaderInject {
    next: Arc<dyn Transport>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

#[async_trait]
impl Transport for ResponseHeaderInject {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let mut resp = self.next.round_trip(ctx, req).await?;
        for (name, value) in &self.headers {
            resp.headers.insert(name.clone(), value.clone());
        }
        Ok(resp)
    }
}

pub struct ResponseHeaderInjectFactory;

impl MiddlewareFactory for ResponseHeaderInjectFactory {
    fn name(&self) -> &'static str {
        "responseheaderinject"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        Ok(Arc::new(ResponseHeaderInject {
            next,
            headers: parse_header_map(config, "responseheaderinject")?,
        }))
    }
}
