//! # Cart Engine
//!
//! The in-memory cart behind the POS and óptica-order screens. Every
//! mutation that adds units is checked against the last fetched
//! [`StockSnapshot`]; a rejected mutation leaves the cart exactly as it was.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  UI Action              Cart Method              Stock Check            │
//! │  ─────────              ───────────              ───────────            │
//! │                                                                         │
//! │  "Agregar" ───────────► add() ─────────────────► in_cart + 1 <= avail  │
//! │  "+" on a line ───────► increment() ───────────► in_cart + 1 <= avail  │
//! │  "-" on a line ───────► decrement() ───────────► none (floors at 1)    │
//! │  Trash icon ──────────► remove() ──────────────► none (idempotent)     │
//! │  Quantity box ────────► set_quantity() ────────► qty <= avail          │
//! │  "Cobrar" ────────────► validate_stock() ──────► every line re-checked │
//! │                                                                         │
//! │  totals() is a pure function of (lines, discount_mode, discounts).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Discount Modes
//! ```text
//! ┌───────────────────────────────┬─────────────────────────────────────────┐
//! │  DiscountMode::Order          │  DiscountMode::PerLine                  │
//! │  ───────────────────          │  ─────────────────────                  │
//! │  subtotal × order_discount    │  Σ line_subtotal × line_discount        │
//! │  line discounts: kept, inert  │  order discount: kept, inert            │
//! └───────────────────────────────┴─────────────────────────────────────────┘
//! ```
//!
//! ## State
//! `Empty → Populated` on the first successful add, back to `Empty` on
//! `clear()` (successful checkout or view teardown).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Percent};
use crate::stock::StockSnapshot;
use crate::types::{Product, ProductId};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::MAX_CART_LINES;

// =============================================================================
// Discount Mode
// =============================================================================

/// Whether the discount applies to the whole order or to each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountMode {
    /// One percentage over the cart subtotal.
    #[default]
    Order,
    /// Each line carries its own percentage.
    PerLine,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product in the cart.
///
/// SKU, name and unit price are frozen when the line is created, so the cart
/// keeps displaying and charging the same values even if the catalog is
/// reloaded mid-session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// Only used in [`DiscountMode::PerLine`].
    pub line_discount: Percent,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price: product.sale_price,
            quantity,
            line_discount: Percent::zero(),
            added_at: Utc::now(),
        }
    }

    /// Unit price × quantity, before any discount.
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// This line's own discount, rounded to the centavo.
    pub fn line_discount_amount(&self) -> Money {
        self.line_subtotal().percentage(self.line_discount)
    }

    fn insufficient(&self, available: i64, requested: i64) -> CoreError {
        CoreError::InsufficientStock {
            product_id: self.product_id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Cart Status
// =============================================================================

/// Lifecycle state of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Empty,
    Populated,
}

// =============================================================================
// Cart
// =============================================================================

/// The cart for one POS or order session.
///
/// ## Invariants
/// - Lines are unique by product (adding again increases quantity)
/// - `1 <= quantity <= available` right after any add or increment
/// - At most [`MAX_CART_LINES`] lines
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    discount_mode: DiscountMode,
    order_discount: Percent,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart in order-discount mode with 0% discount.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            discount_mode: DiscountMode::Order,
            order_discount: Percent::zero(),
            created_at: Utc::now(),
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds one unit of `product`.
    ///
    /// ## Returns
    /// The product's new quantity in the cart.
    ///
    /// ## Errors
    /// - `InsufficientStock` if one more unit exceeds what is available
    /// - `CartTooLarge` if this would open line number 101
    pub fn add(&mut self, product: &Product, stock: &StockSnapshot) -> CoreResult<i64> {
        self.add_quantity(product, 1, stock)
    }

    /// Adds `quantity` units of `product`, merging into an existing line.
    ///
    /// Used by the order modal, where the óptica types a quantity before
    /// pressing "Agregar".
    pub fn add_quantity(
        &mut self,
        product: &Product,
        quantity: i64,
        stock: &StockSnapshot,
    ) -> CoreResult<i64> {
        validate_quantity(quantity)?;

        let current = self.quantity_of(product.id);
        let requested = current + quantity;
        let available = stock.available(product.id);

        if available <= 0 || requested > available {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                available,
                requested,
            });
        }
        validate_quantity(requested)?;

        if let Some(line) = self.line_mut(product.id) {
            line.quantity = requested;
            return Ok(requested);
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        })?;

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(requested)
    }

    /// Adds one unit to an existing line, with the same stock check as [`Cart::add`].
    pub fn increment(&mut self, product_id: ProductId, stock: &StockSnapshot) -> CoreResult<i64> {
        let available = stock.available(product_id);
        let line = self
            .line_mut(product_id)
            .ok_or(CoreError::NotInCart(product_id))?;

        let requested = line.quantity + 1;
        if requested > available {
            return Err(line.insufficient(available, requested));
        }
        validate_quantity(requested)?;

        line.quantity = requested;
        Ok(requested)
    }

    /// Removes one unit from a line, never going below 1.
    ///
    /// Decrementing a quantity-1 line is a no-op; use [`Cart::remove`] to
    /// delete it.
    pub fn decrement(&mut self, product_id: ProductId) -> CoreResult<i64> {
        let line = self
            .line_mut(product_id)
            .ok_or(CoreError::NotInCart(product_id))?;

        line.quantity = (line.quantity - 1).max(1);
        Ok(line.quantity)
    }

    /// Sets a line's quantity directly. A quantity of 0 removes the line.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        stock: &StockSnapshot,
    ) -> CoreResult<i64> {
        if quantity == 0 {
            return if self.remove(product_id) {
                Ok(0)
            } else {
                Err(CoreError::NotInCart(product_id))
            };
        }
        validate_quantity(quantity)?;

        let available = stock.available(product_id);
        let line = self
            .line_mut(product_id)
            .ok_or(CoreError::NotInCart(product_id))?;

        if quantity > available {
            return Err(line.insufficient(available, quantity));
        }

        line.quantity = quantity;
        Ok(quantity)
    }

    /// Deletes a line. Returns whether anything was removed; removing an
    /// absent line is a no-op.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Stores a line's own discount. It only counts in per-line mode.
    pub fn set_line_discount(&mut self, product_id: ProductId, discount: Percent) -> CoreResult<()> {
        let line = self
            .line_mut(product_id)
            .ok_or(CoreError::NotInCart(product_id))?;
        line.line_discount = discount;
        Ok(())
    }

    /// Switches discount mode. Stored percentages of the other mode are kept.
    pub fn set_discount_mode(&mut self, mode: DiscountMode) {
        self.discount_mode = mode;
    }

    /// Stores the order-level discount. It only counts in order mode.
    pub fn set_order_discount(&mut self, discount: Percent) {
        self.order_discount = discount;
    }

    /// Back to order mode with every percentage at 0.
    pub fn reset_discounts(&mut self) {
        self.discount_mode = DiscountMode::Order;
        self.order_discount = Percent::zero();
        for line in &mut self.lines {
            line.line_discount = Percent::zero();
        }
    }

    /// Drops every line. Discount settings are left alone.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Re-checks every line against `stock`, in cart order.
    ///
    /// ## Errors
    /// - `EmptyCart` if there are no lines
    /// - `InsufficientStock` naming the first line that no longer fits
    pub fn validate_stock(&self, stock: &StockSnapshot) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        for line in &self.lines {
            let available = stock.available(line.product_id);
            if line.quantity > available {
                return Err(line.insufficient(available, line.quantity));
            }
        }
        Ok(())
    }

    /// Subtotal, discount and total under the current discount mode.
    pub fn totals(&self) -> CartTotals {
        let subtotal: Money = self.lines.iter().map(CartLine::line_subtotal).sum();
        let discount = match self.discount_mode {
            DiscountMode::Order => subtotal.percentage(self.order_discount),
            DiscountMode::PerLine => self.lines.iter().map(CartLine::line_discount_amount).sum(),
        };

        CartTotals {
            item_count: self.lines.len(),
            total_quantity: self.total_quantity(),
            subtotal,
            discount,
            total: subtotal - discount,
            discount_mode: self.discount_mode,
            order_discount: self.order_discount,
        }
    }

    pub fn status(&self) -> CartStatus {
        if self.lines.is_empty() {
            CartStatus::Empty
        } else {
            CartStatus::Populated
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Units of `product_id` already in the cart (0 if absent).
    pub fn quantity_of(&self, product_id: ProductId) -> i64 {
        self.line(product_id).map_or(0, |l| l.quantity)
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn discount_mode(&self) -> DiscountMode {
        self.discount_mode
    }

    pub fn order_discount(&self) -> Percent {
        self.order_discount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for the checkout panel.
///
/// Always `total == subtotal - discount` and `0 <= discount <= subtotal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub discount_mode: DiscountMode,
    pub order_discount: Percent,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::stock::StockLevel;
    use crate::MAX_LINE_QUANTITY;

    fn product(id: i64, price_pesos: i64) -> Product {
        Product::new(
            ProductId(id),
            format!("SKU-{}", id),
            format!("Producto {}", id),
            Money::from_pesos(price_pesos),
        )
    }

    fn stock(levels: &[(i64, i64, i64)]) -> StockSnapshot {
        StockSnapshot::from_levels(
            levels
                .iter()
                .map(|&(id, stock, reserved)| StockLevel::new(ProductId(id), stock, reserved)),
        )
    }

    /// P1 (qty 2, $100) and P2 (qty 1, $50).
    fn two_line_cart() -> Cart {
        let snapshot = stock(&[(1, 10, 0), (2, 10, 0)]);
        let mut cart = Cart::new();
        cart.add(&product(1, 100), &snapshot).unwrap();
        cart.add(&product(1, 100), &snapshot).unwrap();
        cart.add(&product(2, 50), &snapshot).unwrap();
        cart
    }

    #[test]
    fn test_add_respects_available_stock() {
        let p = product(1, 100);
        let snapshot = stock(&[(1, 5, 2)]);
        let mut cart = Cart::new();

        assert_eq!(cart.add(&p, &snapshot).unwrap(), 1);
        assert_eq!(cart.add(&p, &snapshot).unwrap(), 2);
        assert_eq!(cart.add(&p, &snapshot).unwrap(), 3);

        let err = cart.add(&p, &snapshot).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
        assert!(matches!(
            cart.increment(p.id, &snapshot),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(cart.quantity_of(p.id), 3);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_unknown_or_out_of_stock_product() {
        let mut cart = Cart::new();
        let snapshot = stock(&[(1, 0, 0)]);

        assert!(cart.add(&product(1, 100), &snapshot).is_err());
        assert!(cart.add(&product(9, 100), &snapshot).is_err());
        assert!(cart.is_empty());
        assert_eq!(cart.status(), CartStatus::Empty);
    }

    #[test]
    fn test_add_freezes_price_and_merges_lines() {
        let snapshot = stock(&[(1, 5, 0)]);
        let mut cart = Cart::new();
        cart.add(&product(1, 100), &snapshot).unwrap();

        let repriced = product(1, 999);
        cart.add(&repriced, &snapshot).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].unit_price, Money::from_pesos(100));
        assert_eq!(cart.status(), CartStatus::Populated);
    }

    #[test]
    fn test_add_quantity_checks_the_sum() {
        let p = product(1, 100);
        let snapshot = stock(&[(1, 4, 0)]);
        let mut cart = Cart::new();

        assert_eq!(cart.add_quantity(&p, 3, &snapshot).unwrap(), 3);
        assert!(cart.add_quantity(&p, 2, &snapshot).is_err());
        assert!(cart.add_quantity(&p, 0, &snapshot).is_err());
        assert_eq!(cart.quantity_of(p.id), 3);
    }

    #[test]
    fn test_decrement_floors_at_one() {
        let mut cart = two_line_cart();

        assert_eq!(cart.decrement(ProductId(1)).unwrap(), 1);
        assert_eq!(cart.decrement(ProductId(1)).unwrap(), 1);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.decrement(ProductId(7)), Err(CoreError::NotInCart(ProductId(7))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = two_line_cart();

        assert!(cart.remove(ProductId(2)));
        let after_first = cart.totals();
        assert!(!cart.remove(ProductId(2)));
        assert_eq!(cart.totals(), after_first);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = two_line_cart();
        let snapshot = stock(&[(1, 3, 0), (2, 10, 0)]);

        assert_eq!(cart.set_quantity(ProductId(1), 3, &snapshot).unwrap(), 3);
        assert!(cart.set_quantity(ProductId(1), 4, &snapshot).is_err());
        assert_eq!(cart.quantity_of(ProductId(1)), 3);

        assert_eq!(cart.set_quantity(ProductId(2), 0, &snapshot).unwrap(), 0);
        assert!(cart.line(ProductId(2)).is_none());
        assert!(cart.set_quantity(ProductId(2), 0, &snapshot).is_err());
    }

    #[test]
    fn test_order_discount_totals() {
        let mut cart = two_line_cart();
        cart.set_order_discount(Percent::from_whole(10));

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Money::from_pesos(250));
        assert_eq!(totals.discount, Money::from_cents(2_500));
        assert_eq!(totals.total, Money::from_pesos(225));
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_quantity, 3);
    }

    #[test]
    fn test_per_line_discount_totals() {
        let mut cart = two_line_cart();
        cart.set_discount_mode(DiscountMode::PerLine);
        cart.set_line_discount(ProductId(1), Percent::from_whole(20)).unwrap();
        cart.set_line_discount(ProductId(2), Percent::zero()).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Money::from_pesos(250));
        assert_eq!(totals.discount, Money::from_pesos(40));
        assert_eq!(totals.total, Money::from_pesos(210));
    }

    #[test]
    fn test_inactive_mode_values_are_inert() {
        let mut cart = two_line_cart();
        cart.set_line_discount(ProductId(1), Percent::from_whole(50)).unwrap();

        // Order mode: line discounts stored but ignored.
        let before = cart.totals().total;
        cart.set_line_discount(ProductId(2), Percent::from_whole(90)).unwrap();
        assert_eq!(cart.totals().total, before);

        // Per-line mode: order discount stored but ignored.
        cart.set_discount_mode(DiscountMode::PerLine);
        let before = cart.totals().total;
        cart.set_order_discount(Percent::from_whole(80));
        assert_eq!(cart.totals().total, before);
        assert_eq!(cart.order_discount(), Percent::from_whole(80));

        // Switching back restores the retained values.
        cart.set_discount_mode(DiscountMode::Order);
        assert_eq!(cart.totals().discount, Money::from_pesos(200));
        assert_eq!(cart.line(ProductId(1)).unwrap().line_discount, Percent::from_whole(50));
    }

    #[test]
    fn test_totals_identity_and_bounds() {
        let mut cart = two_line_cart();
        for pct in [0.0, 33.333, 99.99, 100.0, 150.0, -10.0] {
            cart.set_order_discount(Percent::from_percentage(pct));
            let t = cart.totals();
            assert_eq!(t.total, t.subtotal - t.discount);
            assert!(!t.total.is_negative());
            assert!(t.discount <= t.subtotal);
        }

        cart.set_discount_mode(DiscountMode::PerLine);
        cart.set_line_discount(ProductId(1), Percent::from_percentage(400.0)).unwrap();
        let t = cart.totals();
        assert_eq!(t.discount, Money::from_pesos(200));
        assert_eq!(t.total, Money::from_pesos(50));
    }

    #[test]
    fn test_per_line_rounding_is_per_line() {
        let snapshot = stock(&[(1, 10, 0), (2, 10, 0)]);
        let mut cart = Cart::new();
        cart.add(&Product::new(ProductId(1), "A", "A", Money::from_cents(5)), &snapshot)
            .unwrap();
        cart.add(&Product::new(ProductId(2), "B", "B", Money::from_cents(5)), &snapshot)
            .unwrap();
        cart.set_discount_mode(DiscountMode::PerLine);
        cart.set_line_discount(ProductId(1), Percent::from_whole(10)).unwrap();
        cart.set_line_discount(ProductId(2), Percent::from_whole(10)).unwrap();

        // 0.5 centavo per line, each rounded half-up.
        assert_eq!(cart.totals().discount, Money::from_cents(2));
    }

    #[test]
    fn test_validate_stock_names_first_offender() {
        let cart = two_line_cart();
        let dropped = stock(&[(1, 1, 0), (2, 0, 0)]);

        match cart.validate_stock(&dropped) {
            Err(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_id, ProductId(1));
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        assert!(cart.validate_stock(&stock(&[(1, 2, 0), (2, 1, 0)])).is_ok());
        assert_eq!(Cart::new().validate_stock(&dropped), Err(CoreError::EmptyCart));
    }

    #[test]
    fn test_reset_discounts_and_clear() {
        let mut cart = two_line_cart();
        cart.set_discount_mode(DiscountMode::PerLine);
        cart.set_order_discount(Percent::from_whole(5));
        cart.set_line_discount(ProductId(1), Percent::from_whole(5)).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.discount_mode(), DiscountMode::PerLine);

        cart.reset_discounts();
        assert_eq!(cart.discount_mode(), DiscountMode::Order);
        assert!(cart.order_discount().is_zero());
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        let levels: Vec<_> = (0..=MAX_CART_LINES as i64)
            .map(|id| StockLevel::new(ProductId(id), 1, 0))
            .collect();
        let snapshot = StockSnapshot::from_levels(levels);

        for id in 0..MAX_CART_LINES as i64 {
            cart.add(&product(id, 1), &snapshot).unwrap();
        }
        assert_eq!(
            cart.add(&product(MAX_CART_LINES as i64, 1), &snapshot),
            Err(CoreError::CartTooLarge { max: MAX_CART_LINES })
        );
    }

    #[test]
    fn test_line_quantity_cap_above_stock() {
        let p = product(1, 10);
        let snapshot = stock(&[(1, 1500, 0)]);
        let mut cart = Cart::new();

        assert_eq!(cart.add_quantity(&p, MAX_LINE_QUANTITY, &snapshot), Ok(MAX_LINE_QUANTITY));

        let over = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        };
        assert_eq!(cart.add(&p, &snapshot), Err(CoreError::Validation(over.clone())));
        assert_eq!(cart.increment(p.id, &snapshot), Err(CoreError::Validation(over)));
        assert_eq!(cart.quantity_of(p.id), MAX_LINE_QUANTITY);

        // Past the stock, the stock error still wins.
        let short = stock(&[(1, 1200, 300)]);
        assert!(matches!(
            cart.add(&p, &short),
            Err(CoreError::InsufficientStock { available: 900, .. })
        ));
    }
}
