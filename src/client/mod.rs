//! Client Factory (C4) and Client Registry (C5).

mod factory;
mod registry;

pub use factory::{BaseTransport, ClientFactory};
pub use registry::ClientRegistry;
