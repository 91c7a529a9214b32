//! # optica-core: Pure Business Logic for Optica POS
//!
//! Everything the point-of-sale and óptica-order screens compute lives here,
//! as plain functions over owned values. Network calls, token storage and
//! rendering belong to `optica-client` and the web front end.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Optica POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web front end                                │   │
//! │  │    POS view ──► Cart ──► Checkout modal ──► Sales report       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    optica-client                                │   │
//! │  │    PosSession, OrderSession, RestBackend                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ optica-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   money   types   stock   catalog   cart   order   access      │   │
//! │  │   report  validation  error                                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` (integer centavos) and `Percent` (basis points)
//! - [`types`] - Products, payment methods, customers, ópticas
//! - [`stock`] - Stock levels and the fetched availability snapshot
//! - [`catalog`] - Product lookup, quick search and filters
//! - [`cart`] - The cart engine: stock-checked mutations and totals
//! - [`order`] - Checkout payload construction
//! - [`access`] - Role → route/action table
//! - [`report`] - Sales KPIs and low-stock listing
//! - [`validation`] - Input coercion and business rule checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use optica_core::cart::Cart;
//! use optica_core::money::{Money, Percent};
//! use optica_core::stock::{StockLevel, StockSnapshot};
//! use optica_core::types::{Product, ProductId};
//!
//! let frame = Product::new(ProductId(1), "ARM-001", "Armazón Clásico", Money::from_cents(10_000));
//! let stock = StockSnapshot::from_levels([StockLevel::new(ProductId(1), 5, 2)]);
//!
//! let mut cart = Cart::new();
//! cart.add(&frame, &stock).unwrap();
//! cart.add(&frame, &stock).unwrap();
//! cart.set_order_discount(Percent::from_whole(10));
//!
//! let totals = cart.totals();
//! assert_eq!(totals.subtotal.cents(), 20_000);
//! assert_eq!(totals.total.cents(), 18_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod report;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartStatus, CartTotals, DiscountMode};
pub use catalog::Catalog;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use stock::{StockLevel, StockSnapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Checked after stock: with 1000 or more units available, going past 999
/// fails with `Validation(OutOfRange)` rather than `InsufficientStock`.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Customer name used on counter sales when the cashier leaves it blank.
pub const COUNTER_CUSTOMER_NAME: &str = "Mostrador";
