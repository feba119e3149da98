//! Structured logging setup (C11, ambient). `RUST_LOG` drives the filter;
//! `TRANSPORTD_LOG_FORMAT` (`json` default, or `pretty`) drives the renderer.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("TRANSPORTD_LOG_FORMAT").unwrap_or_default().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match LogFormat::from_env() {
        LogFormat::Json => fmt().with_env_filter(filter).json().try_init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).pretty().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!(e)).context("failed to initialize structured logging")
}
