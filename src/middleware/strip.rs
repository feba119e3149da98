use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, TransportError};
use async_trait::async_trait;
use http::uri::{PathAndQuery, Uri};
use serde_json::Value;
use std::sync::Arc;

/// Removes the first `count` path segments from the outbound request path
/// before it reaches the backend, e.g. `count=2` on `/a/b/c/d` -> `/c/d`.
struct Strip {
    next: Arc<dyn Transport>,
    count: usize,
}

fn strip_segments(path: &str, count: usize) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    // A leading "/" produces an empty first segment; preserve it separately.
    let leading_empty = segments.first().map(|s| s.is_empty()).unwrap_or(false);
    if leading_empty {
        segments.remove(0);
    }
    let remaining: Vec<&str> = segments.into_iter().skip(count).collect();
    let joined = remaining.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        format!("/{joined}")
    }
}

#[async_trait]
impl Transport for Strip {
    async fn round_trip(&self, ctx: &Context, mut req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        let new_path = strip_segments(req.uri.path(), self.count);
        let pq = match req.uri.query() {
            Some(q) => format!("{new_path}?{q}"),
            None => new_path,
        };
        if let Ok(path_and_query) = pq.parse::<PathAndQuery>() {
            let mut parts = req.uri.clone().into_parts();
            parts.path_and_query = Some(path_and_query);
            if let Ok(new_uri) = Uri::from_parts(parts) {
                req.uri = new_uri;
            }
        }
        self.next.round_trip(ctx, req).await
    }
}

pub struct StripFactory;

impl MiddlewareFactory for StripFactory {
    fn name(&self) -> &'static str {
        "strip"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let count = config
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| BootError::InvalidConfig("strip".into(), "missing count".into()))? as usize;
        Ok(Arc::new(Strip { next, count }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_segments() {
        assert_eq!(strip_segments("/a/b/c/d", 2), "/c/d");
        assert_eq!(strip_segments("/a/b", 2), "/");
        assert_eq!(strip_segments("/a/b", 0), "/a/b");
    }
}
