use super::registry::MiddlewareFactory;
use super::{Context, ProxyRequest, ProxyResponse, Transport};
use crate::error::{BootError, HTTPError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// One required header: a canonical name, an optional single-character
/// delimiter for splitting incoming values, and an optional allow-list. With
/// no allow-list the header must simply be present and non-empty; with one,
/// at least one incoming value (after delimiter splitting) must match it.
struct RequiredHeader {
    name: http::HeaderName,
    delimiter: Option<char>,
    allowed: Option<Vec<String>>,
}

struct ValidateHeaders {
    next: Arc<dyn Transport>,
    required: Vec<RequiredHeader>,
}

#[async_trait]
impl Transport for ValidateHeaders {
    async fn round_trip(&self, ctx: &Context, req: ProxyRequest) -> Result<ProxyResponse, TransportError> {
        for header in &self.required {
            let Some(value) = req.headers.get(&header.name).and_then(|v| v.to_str().ok()) else {
                return Ok(ProxyResponse::from_http_error(&HTTPError::bad_request(format!(
                    "missing required header {:?}",
                    header.name.as_str()
                ))));
            };
            if value.is_empty() {
                return Ok(ProxyResponse::from_http_error(&HTTPError::bad_request(format!(
                    "missing required header {:?}",
                    header.name.as_str()
                ))));
            }
            let Some(allowed) = &header.allowed else {
                continue;
            };
            let incoming: Vec<&str> = match header.delimiter {
                Some(delim) => value.split(delim).map(str::trim).collect(),
                None => vec![value.trim()],
            };
            if !incoming.iter().any(|v| allowed.iter().any(|a| a == v)) {
                return Ok(ProxyResponse::from_http_error(&HTTPError::bad_request(format!(
                    "header {:?} did not contain an allowed value",
                    header.name.as_str()
                ))));
            }
        }
        self.next.round_trip(ctx, req).await
    }
}

pub struct ValidateHeadersFactory;

impl MiddlewareFactory for ValidateHeadersFactory {
    fn name(&self) -> &'static str {
        "validateheaders"
    }

    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError> {
        let entries = config
            .get("headers")
            .and_then(Value::as_array)
            .ok_or_else(|| BootError::InvalidConfig("validateheaders".into(), "missing headers list".into()))?;

        let mut required = Vec::with_capacity(entries.len());
        for entry in entries {
            let name_str = entry
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| BootError::InvalidConfig("validateheaders".into(), "header entry missing name".into()))?;
            let name = http::HeaderName::from_bytes(name_str.as_bytes())
                .map_err(|_| BootError::InvalidConfig("validateheaders".into(), format!("invalid header name {name_str:?}")))?;
            let delimiter = entry
                .get("delimiter")
                .and_then(Value::as_str)
                .and_then(|d| d.chars().next());
            let allowed = entry.get("allowed").and_then(Value::as_array).map(|a| {
                a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect::<Vec<_>>()
            });
            required.push(RequiredHeader { name, delimiter, allowed });
        }

        Ok(Arc::new(ValidateHeaders { next, required }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_when_no_allowed_value_present() {
        let entry = json!({"name": "X-Api-Version", "allowed": ["v1", "v2"], "delimiter": ","});
        let name = http::HeaderName::from_bytes(entry["name"].as_str().unwrap().as_bytes()).unwrap();
        let header = RequiredHeader {
            name,
            delimiter: entry.get("delimiter").and_then(Value::as_str).and_then(|d| d.chars().next()),
            allowed: entry
                .get("allowed")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
        };
        let incoming: Vec<&str> = "v3,v4".split(header.delimiter.unwrap()).map(str::trim).collect();
        let allowed = header.allowed.unwrap();
        assert!(!incoming.iter().any(|v| allowed.iter().any(|a| a == v)));
    }
}
