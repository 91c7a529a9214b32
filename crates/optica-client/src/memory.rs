//! # In-Memory Backend
//!
//! Provider implementation backed by plain vectors. Used for the mock mode
//! of the front end and as the fake in session tests.
//!
//! Every call is counted, any of the three operations can be told to fail,
//! and accepted payloads are kept for inspection. Submitting does NOT touch
//! the stock levels; tests that need the server to "sell" units call
//! [`InMemoryBackend::set_stock`] themselves.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use optica_core::order::{OrderConfirmation, OrderPayload};
use optica_core::{Product, StockLevel};

use crate::error::{ClientError, ClientResult};
use crate::providers::{CatalogProvider, OrderSink, StockProvider};

/// Vector-backed catalog, stock and sink.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    products: Mutex<Vec<Product>>,
    stock: Mutex<Vec<StockLevel>>,
    submitted: Mutex<Vec<(Uuid, OrderPayload)>>,

    catalog_failure: Mutex<Option<ClientError>>,
    stock_failure: Mutex<Option<ClientError>>,
    submit_failure: Mutex<Option<ClientError>>,

    list_products_calls: AtomicUsize,
    list_stock_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    pub fn new(products: Vec<Product>, stock: Vec<StockLevel>) -> Self {
        InMemoryBackend {
            products: Mutex::new(products),
            stock: Mutex::new(stock),
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Replaces the stock the next `list_stock` call returns.
    pub async fn set_stock(&self, stock: Vec<StockLevel>) {
        *self.stock.lock().await = stock;
    }

    pub async fn set_products(&self, products: Vec<Product>) {
        *self.products.lock().await = products;
    }

    /// Makes `list_products` fail with `error` until cleared with `None`.
    pub async fn fail_catalog(&self, error: Option<ClientError>) {
        *self.catalog_failure.lock().await = error;
    }

    /// Makes `list_stock` fail with `error` until cleared with `None`.
    pub async fn fail_stock(&self, error: Option<ClientError>) {
        *self.stock_failure.lock().await = error;
    }

    /// Makes `submit` fail with `error` until cleared with `None`.
    pub async fn fail_submit(&self, error: Option<ClientError>) {
        *self.submit_failure.lock().await = error;
    }

    /// Payloads accepted so far, oldest first.
    pub async fn submitted(&self) -> Vec<OrderPayload> {
        self.submitted
            .lock()
            .await
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Request ids of accepted payloads, oldest first.
    pub async fn request_ids(&self) -> Vec<Uuid> {
        self.submitted.lock().await.iter().map(|(id, _)| *id).collect()
    }

    pub fn list_products_calls(&self) -> usize {
        self.list_products_calls.load(Ordering::SeqCst)
    }

    pub fn list_stock_calls(&self) -> usize {
        self.list_stock_calls.load(Ordering::SeqCst)
    }

    /// Submissions attempted, including failed ones.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogProvider for InMemoryBackend {
    async fn list_products(&self) -> ClientResult<Vec<Product>> {
        self.list_products_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.catalog_failure.lock().await.clone() {
            return Err(err);
        }
        Ok(self.products.lock().await.clone())
    }
}

#[async_trait]
impl StockProvider for InMemoryBackend {
    async fn list_stock(&self) -> ClientResult<Vec<StockLevel>> {
        self.list_stock_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.stock_failure.lock().await.clone() {
            return Err(err);
        }
        Ok(self.stock.lock().await.clone())
    }
}

#[async_trait]
impl OrderSink for InMemoryBackend {
    async fn submit(&self, payload: &OrderPayload, request_id: Uuid) -> ClientResult<OrderConfirmation> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.submit_failure.lock().await.clone() {
            return Err(err);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().await.push((request_id, payload.clone()));
        debug!(%request_id, id, "in-memory submission accepted");

        Ok(OrderConfirmation {
            id: Some(id.to_string()),
            status: payload.status,
            message: None,
        })
    }
}
