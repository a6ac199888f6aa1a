use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Product;
use crate::seed;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("product {0:?} not found")]
    NotFound(String),

    #[error("duplicate product id {0:?}")]
    DuplicateId(String),
}

/// Read-only access to the product inventory.
///
/// Handlers only see this trait, so a persistent backend can replace
/// [`MemoryStore`] without touching the HTTP layer. Every method hands out
/// owned copies; the store stays the sole owner of its records.
pub trait Store: Send + Sync + 'static {
    /// Every product held. Callers must not rely on the order.
    fn get_all(&self) -> Vec<Product>;

    /// Exact, case-sensitive lookup by id.
    fn get_product(&self, id: &str) -> Result<Product, StoreError>;
}

// ── In-memory snapshot ────────────────────────────────────────────────────────

/// Immutable snapshot of the inventory, built once at startup.
///
/// There is no mutation API, so sharing it behind an `Arc` gives lock-free
/// concurrent reads. A future mutable variant should wrap the map in an
/// `RwLock` inside the store rather than synchronizing at call sites.
///
/// Serializes as the keyed mapping `{ "<id>": Product, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    products: IndexMap<String, Product>,
}

impl MemoryStore {
    /// Build a snapshot from `products`, rejecting repeated ids.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Result<Self, StoreError> {
        let mut map = IndexMap::new();
        for product in products {
            if map.contains_key(&product.id) {
                return Err(StoreError::DuplicateId(product.id));
            }
            map.insert(product.id.clone(), product);
        }
        Ok(Self { products: map })
    }

    /// The reference coffee inventory.
    pub fn seeded() -> Self {
        let products = seed::inventory()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Store for MemoryStore {
    fn get_all(&self) -> Vec<Product> {
        self.products.values().cloned().collect()
    }

    fn get_product(&self, id: &str) -> Result<Product, StoreError> {
        self.products
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
