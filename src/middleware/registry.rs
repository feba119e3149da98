use super::{
    accesslog::AccessLogFactory, asaptoken::AsapTokenFactory, asapvalidate::AsapValidateFactory,
    basicauth::BasicAuthFactory, headerinject::{RequestHeaderInjectFactory, ResponseHeaderInjectFactory},
    hedging::HedgingFactory, metrics::MetricsFactory, requestvalidation::RequestValidationFactory,
    responsevalidation::ResponseValidationFactory, retry::RetryFactory, retryafter::RetryAfterFactory,
    strip::StripFactory, timeout::TimeoutFactory, validateheaders::ValidateHeadersFactory, Transport,
};
use crate::error::BootError;
use crate::validator_cache::ValidatorCache;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered middleware's constructor: takes the populated config for one
/// operation and the transport it wraps, and returns the composed transport.
pub trait MiddlewareFactory: Send + Sync {
    fn name(&self) -> &'static str;
    fn build(&self, config: &Value, next: Arc<dyn Transport>) -> Result<Arc<dyn Transport>, BootError>;
}

/// Global registry of the 14 named middleware contracts, keyed by lowercase name.
pub struct MiddlewareRegistry {
    factories: HashMap<&'static str, Box<dyn MiddlewareFactory>>,
}

impl MiddlewareRegistry {
    pub fn new(validator_cache: ValidatorCache) -> Self {
        let mut factories: HashMap<&'static str, Box<dyn MiddlewareFactory>> = HashMap::new();
        let mut register = |f: Box<dyn MiddlewareFactory>| {
            factories.insert(f.name(), f);
        };
        register(Box::new(AccessLogFactory));
        register(Box::new(MetricsFactory));
        register(Box::new(TimeoutFactory));
        register(Box::new(AsapValidateFactory));
        register(Box::new(AsapTokenFactory));
        register(Box::new(RetryFactory));
        register(Box::new(RetryAfterFactory));
        register(Box::new(HedgingFactory));
        register(Box::new(RequestValidationFactory::new(validator_cache.clone())));
        register(Box::new(ResponseValidationFactory::new(validator_cache)));
        register(Box::new(StripFactory));
        register(Box::new(RequestHeaderInjectFactory));
        register(Box::new(ResponseHeaderInjectFactory));
        register(Box::new(BasicAuthFactory));
        register(Box::new(ValidateHeadersFactory));
        MiddlewareRegistry { factories }
    }

    pub fn wrap(
        &self,
        name: &str,
        config: &Value,
        next: Arc<dyn Transport>,
        operation_id: &str,
    ) -> Result<Arc<dyn Transport>, BootError> {
        let factory = self
            .factories
            .get(name.to_ascii_lowercase().as_str())
            .ok_or_else(|| BootError::UnknownMiddleware(name.to_string(), operation_id.to_string()))?;
        factory.build(config, next)
    }
}
