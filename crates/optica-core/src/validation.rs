//! # Validation Module
//!
//! Input coercion and business rule checks for Optica POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Input boxes (discount %, quantity)                           │
//! │  ├── COERCED, never rejected: parse_percent_input, coerce_quantity     │
//! │  └── Garbage becomes the nearest sane value                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart / session (Rust)                                        │
//! │  └── THIS MODULE: quantity, cart size, free-text lengths               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: REST backend                                                 │
//! │  └── Authoritative stock and permission checks                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use optica_core::validation::{coerce_quantity_input, parse_percent_input};
//!
//! assert_eq!(parse_percent_input("15").bps(), 1500);
//! assert_eq!(parse_percent_input("abc").bps(), 0);
//! assert_eq!(coerce_quantity_input("2.7"), 2);
//! ```

use crate::error::ValidationError;
use crate::money::Percent;
use crate::types::PaymentMethod;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name accepted on a counter sale.
pub const MAX_CUSTOMER_NAME_LEN: usize = 120;

/// Longest free-text note accepted on an order.
pub const MAX_NOTES_LEN: usize = 500;

// =============================================================================
// Input Coercion
// =============================================================================

/// Turns whatever was typed into a discount box into a clamped percentage.
///
/// A trailing `%` is accepted, as is a comma decimal separator. Anything that
/// does not parse counts as 0%.
///
/// ```rust
/// use optica_core::validation::parse_percent_input;
///
/// assert_eq!(parse_percent_input("12,5 %").bps(), 1250);
/// assert_eq!(parse_percent_input("-3").bps(), 0);
/// assert_eq!(parse_percent_input("140").bps(), 10_000);
/// ```
pub fn parse_percent_input(raw: &str) -> Percent {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
    match cleaned.parse::<f64>() {
        Ok(pct) if pct.is_finite() => Percent::from_percentage(pct),
        _ => Percent::zero(),
    }
}

/// Turns a typed quantity into an integer in `[1, MAX_LINE_QUANTITY]`.
///
/// Fractions are truncated; unparseable input becomes 1.
pub fn coerce_quantity_input(raw: &str) -> i64 {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite())
        .map(|q| q.trunc() as i64)
        .unwrap_or(1);
    parsed.clamp(1, MAX_LINE_QUANTITY)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (matches nothing in quick search, everything in filters)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a counter customer name. Blank is fine (becomes "Mostrador").
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates order notes. Blank notes become `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Order modal: type quantity                                            │
/// │                                                                         │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → MustBePositive                                  │
/// │       ├── qty > 999? → OutOfRange                                      │
/// │       └── OK → stock check against the snapshot                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
///
/// ## Rules
/// - Must not exceed MAX_CART_LINES (100)
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

/// An óptica must accept at least one payment method.
pub fn validate_optica_payment_methods(methods: &[PaymentMethod]) -> ValidationResult<()> {
    if methods.is_empty() {
        return Err(ValidationError::Required {
            field: "payment_methods".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
