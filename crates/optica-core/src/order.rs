//! # Checkout Payload
//!
//! Turns a validated cart into the payload handed to the order sink.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    OrderPayload::build                                  │
//! │                                                                         │
//! │  Cart + StockSnapshot + CheckoutRequest                                │
//! │       │                                                                 │
//! │       ├── cart empty?              → EmptyCart                          │
//! │       ├── any qty > available?     → InsufficientStock (names product)  │
//! │       ├── name / notes too long?   → Validation                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderPayload { items, subtotal, discount_amount, total, ... }         │
//! │       │                                                                 │
//! │       ├── OrderChannel::Sale  → POST /sales  (counter POS)             │
//! │       └── OrderChannel::Order → POST /orders (óptica, en_proceso)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Building never touches the cart; on any error the caller still has the
//! cart exactly as it was.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine, DiscountMode};
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Percent};
use crate::stock::StockSnapshot;
use crate::types::{CustomerRef, Optica, OrderStatus, PaymentMethod, ProductId};
use crate::validation::{validate_customer_name, validate_notes};

// =============================================================================
// Channel
// =============================================================================

/// Where a checkout goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    /// Counter sale from the POS screen.
    Sale,
    /// Óptica order from the orders screen.
    Order,
}

impl OrderChannel {
    /// Status a new submission starts in, if the channel tracks one.
    pub fn initial_status(&self) -> Option<OrderStatus> {
        match self {
            OrderChannel::Sale => None,
            OrderChannel::Order => Some(OrderStatus::EnProceso),
        }
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// How a line's discount is expressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    None,
    /// The order-level percentage applies to this line.
    OrderPercent,
    /// The line carries its own percentage.
    LinePercent,
}

/// One line of a submitted sale or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_type: DiscountType,
    pub discount_value: Percent,
    /// Set only for per-line discounts; order discounts live on the payload.
    pub discount_amount: Option<Money>,
    /// Line subtotal minus its own discount.
    pub line_total: Money,
}

impl OrderLine {
    fn from_cart_line(line: &CartLine, mode: DiscountMode, order_discount: Percent) -> Self {
        let subtotal = line.line_subtotal();

        let (discount_type, discount_value, discount_amount) = match mode {
            DiscountMode::Order if order_discount.is_zero() => (DiscountType::None, Percent::zero(), None),
            DiscountMode::Order => (DiscountType::OrderPercent, order_discount, None),
            DiscountMode::PerLine if line.line_discount.is_zero() => {
                (DiscountType::None, Percent::zero(), None)
            }
            DiscountMode::PerLine => (
                DiscountType::LinePercent,
                line.line_discount,
                Some(line.line_discount_amount()),
            ),
        };

        OrderLine {
            product_id: line.product_id,
            sku: line.sku.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_type,
            discount_value,
            discount_amount,
            line_total: subtotal - discount_amount.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Checkout Request
// =============================================================================

/// What the cashier or óptica chose in the checkout modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub customer: CustomerRef,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    /// Counter sale; a blank name becomes "Mostrador".
    pub fn counter(payment_method: PaymentMethod, customer_name: &str) -> Self {
        CheckoutRequest {
            payment_method,
            customer: CustomerRef::counter(customer_name),
            notes: None,
        }
    }

    /// Order placed by an óptica account.
    pub fn optica(payment_method: PaymentMethod, optica_id: i64) -> Self {
        CheckoutRequest {
            payment_method,
            customer: CustomerRef::Optica { id: optica_id },
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Order Payload
// =============================================================================

/// A finalized sale or order, ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub channel: OrderChannel,
    pub payment_method: PaymentMethod,
    pub customer: CustomerRef,
    pub notes: Option<String>,
    pub status: Option<OrderStatus>,
    pub discount_mode: DiscountMode,
    /// The order-level percentage; zero in per-line mode.
    pub order_discount_percent: Percent,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

impl OrderPayload {
    /// Validates `cart` against `stock` and builds the payload.
    ///
    /// ## Errors
    /// - `EmptyCart`
    /// - `InsufficientStock` for the first line that no longer fits
    /// - `Validation` for an over-long customer name or notes
    pub fn build(
        channel: OrderChannel,
        cart: &Cart,
        stock: &StockSnapshot,
        request: &CheckoutRequest,
    ) -> CoreResult<OrderPayload> {
        cart.validate_stock(stock)?;

        let customer = match &request.customer {
            CustomerRef::Counter { name } => CustomerRef::counter(&validate_customer_name(name)?),
            optica @ CustomerRef::Optica { .. } => optica.clone(),
        };
        let notes = validate_notes(request.notes.as_deref())?;

        let totals = cart.totals();
        let mode = cart.discount_mode();
        let order_discount = match mode {
            DiscountMode::Order => cart.order_discount(),
            DiscountMode::PerLine => Percent::zero(),
        };

        let items = cart
            .lines()
            .iter()
            .map(|line| OrderLine::from_cart_line(line, mode, order_discount))
            .collect();

        Ok(OrderPayload {
            channel,
            payment_method: request.payment_method,
            customer,
            notes,
            status: channel.initial_status(),
            discount_mode: mode,
            order_discount_percent: order_discount,
            items,
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            total: totals.total,
        })
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

impl Cart {
    /// Shorthand for [`OrderPayload::build`].
    pub fn prepare_checkout(
        &self,
        channel: OrderChannel,
        stock: &StockSnapshot,
        request: &CheckoutRequest,
    ) -> CoreResult<OrderPayload> {
        OrderPayload::build(channel, self, stock, request)
    }
}

/// Rejects a payment method the óptica account has not enabled.
pub fn ensure_payment_allowed(optica: &Optica, method: PaymentMethod) -> CoreResult<()> {
    if optica.allows(method) {
        Ok(())
    } else {
        Err(CoreError::PaymentMethodNotAllowed {
            method: method.label().to_string(),
            optica: optica.name.clone(),
        })
    }
}

// =============================================================================
// Order Confirmation
// =============================================================================

/// What the sink returns after accepting a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    /// Backend id of the new sale or order, when it reports one.
    pub id: Option<String>,
    pub status: Option<OrderStatus>,
    pub message: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
