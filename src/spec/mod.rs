//! Spec Loader (C1).
//!
//! Loads an OpenAPI 3 document (plus `x-transportd-*` extension blocks), resolves
//! `${NAME}` environment placeholders in the raw text before parsing, and exposes
//! three views used by the rest of the engine: the runtime extension (global
//! defaults), the backends extension (named upstreams), and, per operation, the
//! route's backend name, middleware chain, and validation schemas.

mod load;
mod model;

pub use load::{interpolate_env, load_spec};
pub use model::{BackendConfig, MiddlewareRef, RouteSpec, Spec};
