//! # Error Types
//!
//! Domain-specific error types for optica-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  optica-core errors (this file)                                        │
//! │  ├── CoreError        - Cart / checkout rule violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  optica-client errors (separate crate)                                 │
//! │  ├── ClientError      - Provider, sink and transport failures          │
//! │  └── Notice           - What the user sees (serialized)                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → Notice → UI          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries enough context (product name, SKU, quantities) for
//! the client to render a specific warning instead of a generic failure.

use thiserror::Error;

use crate::types::ProductId;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// All of these are recoverable: the cart is left exactly as it was before
/// the rejected operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product id is not part of the loaded catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Available stock cannot cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Click "+" on a line (qty 3)
    ///      │
    ///      ▼
    /// Check snapshot: stock=5, reserved=2 → available=3
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI warns: "Armazón Clásico no tiene stock suficiente."
    /// ```
    #[error("Insufficient stock for {name} ({sku}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        sku: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Checkout attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The óptica account does not accept this payment method.
    #[error("Payment method {method} is not enabled for óptica {optica}")]
    PaymentMethodNotAllowed { method: String, optica: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors that the UI shows as a dismissible warning
    /// rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. } | CoreError::EmptyCart | CoreError::NotInCart(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
