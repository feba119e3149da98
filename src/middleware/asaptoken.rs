use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize)]
struct Claims {
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
    sub: String,
}

/// Mints a fresh HS256 JWT and attaches it to the outbound request as a
/// bearer token, minted once per request (no caching — the token's short TTL
/// makes reuse not worth the complexity `asapvalidate`'s cache carries).
struct AsapToken {
    next: Arc<dyn Transport>,
    key: EncodingKey,
    issuer: String,
    audience: String,
    subject: String,
    ttl_seconds: i64,
}

#[async_trait]
impl Transport for AsapToken {
    async fn round_trip(&self, ctx: &Context, mut req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
            sub: self.subject.clone(),
        };
        match encode(&Header::new(Algorithm::HS256), &claims, &self.key) {
            Ok(token) => {
                if let Ok(value) = format!("Bearer {token}").parse() {
                    req.headers.insert(http::header::AUTHORIZATION, value);
                }
            }
            Err(e) => {
                return Err(TransportError::Upstream(format!("failed to mint ASAP token: {e}")));
            }
        }
        self.next.round_trip(ctx, req).await
    }
}

pub struct AsapTokenFactory;

impl MiddlewareFactory for AsapTokenFactory {
    fn name(&self) -> &'static str {
        "asaptoken"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let secret = config
            .get("secret")
            .and_then(Value::as_str)
            .ok_or_else(|| BootError::InvalidConfig("asaptoken".into(), "missing secret".into()))?;
        let issuer = config.get("issuer").and_then(Value::as_str).unwrap_or("transportd").to_string();
        let audience = config
            .get("audience")
            .and_then(Value::as_str)
            .ok_or_else(|| BootError::InvalidConfig("asaptoken".into(), "missing audience".into()))?
            .to_string();
        let subject = config.get("subject").and_then(Value::as_str).unwrap_or(&issuer).to_string();
        let ttl_seconds = config.get("ttl_seconds").and_then(Value::as_i64).unwrap_or(60);
        Ok(Arc::new(AsapToken {
            next,
            key: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            subject,
            ttl_seconds,
        }))
    }
}
