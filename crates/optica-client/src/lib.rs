//! # optica-client: Sessions and Backend Access for Optica POS
//!
//! Drives the POS and óptica-order screens on top of `optica-core`: loads the
//! catalog and stock, applies cart mutations, and submits checkouts through
//! a pluggable sink.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        optica-client                                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  PosSession / OrderSession                                       │  │
//! │  │  Cart + Catalog + StockSnapshot, owned per open view             │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ Arc<dyn ...>                            │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │CatalogProvider │  │ StockProvider  │  │      OrderSink         │    │
//! │  │ list_products  │  │  list_stock    │  │  submit(payload, id)   │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │         ▲                     ▲                     ▲                   │
//! │         └─────────── RestBackend (reqwest) ─────────┘                   │
//! │         └─────────── InMemoryBackend (mock) ────────┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - The POS session: mount, cart mutations, checkout
//! - [`order_session`] - Óptica orders with the payment allow-list
//! - [`providers`] - Catalog, stock and sink traits
//! - [`rest`] - HTTP backend
//! - [`memory`] - In-memory backend for mock mode and tests
//! - [`config`] - TOML + environment configuration
//! - [`error`] - `ClientError` and the UI `Notice`
//! - [`logging`] - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod order_session;
pub mod providers;
pub mod rest;
pub mod session;

pub use config::{ApiConfig, ClientConfig, PosConfig};
pub use error::{ClientError, ClientResult, Notice, NoticeCode, NoticeLevel};
pub use memory::InMemoryBackend;
pub use order_session::OrderSession;
pub use providers::{CatalogProvider, OrderSink, StockProvider};
pub use rest::RestBackend;
pub use session::{CartLineView, CartView, CheckoutOutcome, PosSession, QuickAdd, SessionState};
