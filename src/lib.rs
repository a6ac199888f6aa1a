//! Product-inventory test server for exercising reverse proxies and
//! ingress controllers: two read-only JSON routes behind a configurable
//! artificial delay.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod seed;
pub mod server;
pub mod store;

pub use config::{Config, ServerConfig};
pub use models::{Product, Property};
pub use server::{create_router, Server, ServerError};
pub use store::{MemoryStore, Store, StoreError};

/// Shared handler state — cheap to clone (the store sits behind an `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}
