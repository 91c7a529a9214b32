//! # Domain Types
//!
//! Core domain types used throughout Optica POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  PaymentMethod  │   │   CustomerRef   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (backend)   │   │  Cash           │   │  Counter{name}  │       │
//! │  │  sku (business) │   │  Card           │   │  Optica{id}     │       │
//! │  │  sale_price     │   │  Transfer       │   └─────────────────┘       │
//! │  │  cost (admin)   │   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │     Optica      │   │   OrderStatus   │                              │
//! │  │  ─────────────  │   │  ─────────────  │                              │
//! │  │  id, name       │   │  EnProceso      │                              │
//! │  │  payment_methods│   │  Pagado         │                              │
//! │  └─────────────────┘   │  Completado     │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Products are keyed by the backend's integer id; the SKU is the
//! human-facing business key and is what the quick-add box searches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::COUNTER_CUSTOMER_NAME;

// =============================================================================
// Product Id
// =============================================================================

/// Backend identifier of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        ProductId(id)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product from the catalog. Read-only within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown to the cashier.
    pub name: String,

    /// Category label (e.g. "Armazones", "Lentes de contacto").
    pub category: Option<String>,

    /// Free-form product type used by the order modal filter.
    #[serde(rename = "type")]
    #[ts(rename = "type")]
    pub product_type: Option<String>,

    /// Unit sale price.
    pub sale_price: Money,

    /// Unit cost. Only admins may see it.
    pub cost: Option<Money>,

    /// Low-stock threshold; stock at or below it is flagged critical.
    pub min_stock: i64,
}

impl Product {
    /// Creates a product with the required fields; the rest default to empty.
    pub fn new(id: ProductId, sku: impl Into<String>, name: impl Into<String>, sale_price: Money) -> Self {
        Product {
            id,
            sku: sku.into(),
            name: name.into(),
            category: None,
            product_type: None,
            sale_price,
            cost: None,
            min_stock: 0,
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the product type.
    pub fn with_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    /// Sets the unit cost.
    pub fn with_cost(mut self, cost: Money) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Sets the low-stock threshold.
    pub fn with_min_stock(mut self, min_stock: i64) -> Self {
        self.min_stock = min_stock;
        self
    }

    /// Returns a copy with the cost removed, for non-admin views.
    pub fn without_cost(&self) -> Product {
        Product {
            cost: None,
            ..self.clone()
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale or order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Efectivo.
    Cash,
    /// Tarjeta (external terminal).
    Card,
    /// Transferencia bancaria.
    Transfer,
}

impl PaymentMethod {
    /// Wire value expected by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }

    /// Label shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Efectivo",
            PaymentMethod::Card => "Tarjeta",
            PaymentMethod::Transfer => "Transferencia",
        }
    }

    /// Maps the numeric `payment_method_id` used by stored sales.
    pub fn from_legacy_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(PaymentMethod::Cash),
            2 => Some(PaymentMethod::Card),
            3 => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec!["cash".to_string(), "card".to_string(), "transfer".to_string()],
            }),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Who the sale or order is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerRef {
    /// Walk-in customer at the counter, identified only by a free-text name.
    Counter { name: String },
    /// Partner óptica account.
    Optica { id: i64 },
}

impl CustomerRef {
    /// Counter customer; a blank name becomes "Mostrador".
    pub fn counter(name: &str) -> Self {
        let name = name.trim();
        CustomerRef::Counter {
            name: if name.is_empty() {
                COUNTER_CUSTOMER_NAME.to_string()
            } else {
                name.to_string()
            },
        }
    }

    /// Customer name for counter sales, if any.
    pub fn counter_name(&self) -> Option<&str> {
        match self {
            CustomerRef::Counter { name } => Some(name),
            CustomerRef::Optica { .. } => None,
        }
    }

    /// Óptica id for partner orders, if any.
    pub fn optica_id(&self) -> Option<i64> {
        match self {
            CustomerRef::Optica { id } => Some(*id),
            CustomerRef::Counter { .. } => None,
        }
    }
}

impl Default for CustomerRef {
    fn default() -> Self {
        CustomerRef::counter("")
    }
}

// =============================================================================
// Óptica
// =============================================================================

/// A partner optical retailer that places orders against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Optica {
    pub id: i64,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Payment methods the admin enabled for this account.
    #[serde(default = "default_optica_payment_methods")]
    pub payment_methods: Vec<PaymentMethod>,
}

/// Accounts created without an explicit list accept cash and transfer.
pub fn default_optica_payment_methods() -> Vec<PaymentMethod> {
    vec![PaymentMethod::Cash, PaymentMethod::Transfer]
}

impl Optica {
    /// Creates an óptica with the default payment methods.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Optica {
            id,
            name: name.into(),
            email: None,
            payment_methods: default_optica_payment_methods(),
        }
    }

    /// Checks whether the óptica may pay with `method`.
    pub fn allows(&self, method: PaymentMethod) -> bool {
        self.payment_methods.contains(&method)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an óptica order on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Submitted, not yet paid. Every new order starts here.
    #[default]
    EnProceso,
    /// Paid, pending delivery.
    Pagado,
    /// Delivered.
    Completado,
}

impl OrderStatus {
    /// Label shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::EnProceso => "En proceso",
            OrderStatus::Pagado => "Pagado",
            OrderStatus::Completado => "Completado",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
