//! # Provider Traits
//!
//! The three collaborators a session talks to. [`RestBackend`] implements
//! all of them over HTTP; [`InMemoryBackend`] implements them for mock mode
//! and tests.
//!
//! [`RestBackend`]: crate::rest::RestBackend
//! [`InMemoryBackend`]: crate::memory::InMemoryBackend

use async_trait::async_trait;
use uuid::Uuid;

use optica_core::order::{OrderConfirmation, OrderPayload};
use optica_core::{Product, StockLevel};

use crate::error::ClientResult;

/// Supplies product records. Called once per mount.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn list_products(&self) -> ClientResult<Vec<Product>>;
}

/// Supplies stock levels. Called on mount and after each successful checkout.
#[async_trait]
pub trait StockProvider: Send + Sync {
    async fn list_stock(&self) -> ClientResult<Vec<StockLevel>>;
}

/// Accepts finalized sales and orders.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Submits `payload`. `request_id` is unique per attempt and is only used
    /// for tracing and the request header.
    async fn submit(&self, payload: &OrderPayload, request_id: Uuid) -> ClientResult<OrderConfirmation>;
}
