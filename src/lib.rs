//! # transportd
//!
//! **transportd** is an OpenAPI 3-driven reverse proxy: an OpenAPI document,
//! annotated with `x-transportd-*` extension blocks, compiles into a per-operation
//! HTTP client chain (auth, validation, retries, hedging, timeouts, logging) sitting
//! in front of a pooled, rotating set of `reqwest` clients per backend.
//!
//! ## Architecture
//!
//! The request lifecycle is built from a fixed pipeline of components:
//!
//! - **[`spec`]** — Spec Loader: parses the OpenAPI document plus its extensions
//!   into backend configs and per-operation route specs.
//! - **[`backend`]** — Backend Registry: a case-insensitive map of backend name to
//!   a [`backend::Rotator`] of pooled, TTL-recycled `reqwest::Client`s.
//! - **[`middleware`]** — Middleware Registry and the 14 named middleware
//!   contracts, each a [`middleware::Transport`] wrapping the next one in the chain.
//! - **[`client`]** — Client Factory and Client Registry: compose each route's
//!   middleware chain around the pooled base transport, once, at boot.
//! - **[`router`]** — Router: matches inbound method+path against compiled routes
//!   and extracts path parameters.
//! - **[`dispatcher`]** — Dispatcher: ties router, client registry, and response
//!   modifier together into the per-request path.
//! - **[`response_modifier`]** — rewrites backend-internal `Location` headers back
//!   into client-facing relative paths.
//! - **[`error`]** — the two-enum error taxonomy (`BootError`, `TransportError`)
//!   and the canonical `HTTPError` JSON body.
//! - **[`telemetry`]** — structured logging setup.
//! - **[`validator`]**, **[`validator_cache`]** — JSON Schema validation support
//!   shared by the requestvalidation/responsevalidation middleware.
//! - **[`cli`]** — the process's `-h`/`--example` flag.
//!
//! ## Quick start
//!
//! ```no_run
//! use transportd::spec::load_spec;
//!
//! let spec = load_spec().expect("failed to load spec");
//! println!("loaded {} routes", spec.routes.len());
//! ```

pub mod backend;
pub mod cli;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod response_modifier;
pub mod router;
pub mod spec;
pub mod telemetry;
pub mod validator;
pub mod validator_cache;
