use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, HTTPError, TransportError};
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const KEY_TTL: Duration = Duration::from_secs(300);

struct JwksCache {
    keys: RwLock<std::collections::HashMap<String, DecodingKey>>,
    fetched_at: AtomicU64,
    refreshing: AtomicBool,
}

impl JwksCache {
    fn new() -> Self {
        JwksCache {
            keys: RwLock::new(std::collections::HashMap::new()),
            fetched_at: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }

    fn is_stale(&self) -> bool {
        Self::now_secs().saturating_sub(self.fetched_at.load(Ordering::Relaxed)) > KEY_TTL.as_secs()
    }

    /// Fetch and replace the JWKS key set. Debounced: only one concurrent
    /// refresh runs per cache; other callers see the in-flight result on
    /// their next lookup rather than piling on redundant HTTP requests.
    async fn refresh(&self, jwks_url: &str) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let result = reqwest::get(jwks_url).await;
        if let Ok(resp) = result {
            if let Ok(body) = resp.json::<Value>().await {
                let mut fresh = std::collections::HashMap::new();
                if let Some(keys) = body.get("keys").and_then(Value::as_array) {
                    for key in keys {
                        let (Some(kid), Some(n), Some(e)) = (
                            key.get("kid").and_then(Value::as_str),
                            key.get("n").and_then(Value::as_str),
                            key.get("e").and_then(Value::as_str),
                        ) else {
                            continue;
                        };
                        if let Ok(decoding_key) = DecodingKey::from_rsa_components(n, e) {
                            fresh.insert(kid.to_string(), decoding_key);
                        }
                    }
                }
                if let Ok(mut guard) = self.keys.write() {
                    *guard = fresh;
                }
                self.fetched_at.store(Self::now_secs(), Ordering::Relaxed);
            } else {
                warn!(jwks_url, "failed to parse JWKS response body");
            }
        } else {
            warn!(jwks_url, "failed to fetch JWKS");
        }
        self.refreshing.store(false, Ordering::Release);
    }

    async fn key_for(&self, jwks_url: &str, kid: &str) -> Option<DecodingKey> {
        if self.is_stale() {
            self.refresh(jwks_url).await;
        }
        self.keys.read().ok()?.get(kid).cloned()
    }
}

/// Validates the inbound request's bearer JWT against a JWKS before allowing
/// it through. Rotation-safe claims cache keyed by `token|kid`, grounded on
/// the same kid-keyed invalidation approach a JWKS bearer auth provider uses.
struct AsapValidate {
    next: Arc<dyn Transport>,
    jwks_url: String,
    issuer: Option<String>,
    audience: Option<String>,
    cache: Arc<JwksCache>,
    claims_cache: RwLock<LruCache<String, i64>>,
}

#[async_trait]
impl Transport for AsapValidate {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let Some(token) = req
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return Ok(ProxyResponse::from_http_error(&HTTPError::unauthorized("missing bearer token")));
        };

        let Ok(header) = decode_header(token) else {
            return Ok(ProxyResponse::from_http_error(&HTTPError::unauthorized("malformed token")));
        };
        let Some(kid) = header.kid else {
            return Ok(ProxyResponse::from_http_error(&HTTPError::unauthorized("token missing kid")));
        };

        let cache_key = format!("{token}|{kid}");
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
        let mut cache_hit = false;
        if let Ok(mut cache) = self.claims_cache.write() {
            if let Some(exp) = cache.get(&cache_key) {
                if *exp > now {
                    cache_hit = true;
                } else {
                    cache.pop(&cache_key);
                }
            }
        }
        if cache_hit {
            debug!(operation = %ctx.route.operation_id, "asapvalidate cache hit");
            return self.next.round_trip(ctx, req).await;
        }

        let Some(key) = self.cache.key_for(&self.jwks_url, &kid).await else {
            return Ok(ProxyResponse::from_http_error(&HTTPError::unauthorized("unknown signing key")));
        };

        let mut validation = Validation::new(Algorithm::RS256);
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        if let Some(aud) = &self.audience {
            validation.set_audience(&[aud]);
        }
        match decode::<Value>(token, &key, &validation) {
            Ok(data) => {
                let exp = data.claims.get("exp").and_then(Value::as_i64).unwrap_or(now);
                if let Ok(mut cache) = self.claims_cache.write() {
                    cache.put(cache_key, exp);
                }
                self.next.round_trip(ctx, req).await
            }
            Err(e) => Ok(ProxyResponse::from_http_error(&HTTPError::unauthorized(format!(
                "token validation failed: {e}"
            )))),
        }
    }
}

pub struct AsapValidateFactory;

impl MiddlewareFactory for AsapValidateFactory {
    fn name(&self) -> &'static str {
        "asapvalidate"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let jwks_url = config
            .get("jwks_url")
            .and_then(Value::as_str)
            .ok_or_else(|| BootError::InvalidConfig("asapvalidate".into(), "missing jwks_url".into()))?
            .to_string();
        let issuer = config.get("issuer").and_then(Value::as_str).map(str::to_string);
        let audience = config.get("audience").and_then(Value::as_str).map(str::to_string);
        Ok(Arc::new(AsapValidate {
            next,
            jwks_url,
            issuer,
            audience,
            cache: Arc::new(JwksCache::new()),
            claims_cache: RwLock::new(LruCache::new(NonZeroUsize::new(1024).expect("nonzero"))),
        }))
    }
}
