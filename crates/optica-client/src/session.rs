//! # POS Session
//!
//! One open point-of-sale view: the cart, the catalog it was built from, and
//! the last stock snapshot, plus the providers that refill them.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Lifecycle                                    │
//! │                                                                         │
//! │  ┌───────────┐ mount() ┌──────────┐ checkout() ┌──────────────────┐    │
//! │  │ Unmounted │────────►│  Ready   │───────────►│ sink.submit()    │    │
//! │  └───────────┘    │    │          │◄───────────│ clear + refresh  │    │
//! │        ▲          │    └──────────┘   success  └──────────────────┘    │
//! │        │          │         │                                           │
//! │        │          ▼         │ add / increment / decrement / remove     │
//! │        │   ┌─────────────┐  │ discounts / totals / view                │
//! │        │   │ Unavailable │  │                                           │
//! │        │   │ (catalog or │  │                                           │
//! │        │   │  stock)     │  │                                           │
//! │        │   └─────────────┘  │                                           │
//! │        └──── teardown() ◄───┘                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Mutations are synchronous and take a short lock on the session state.
//! Only provider and sink calls are awaited, and no lock is held across them.
//! A second `checkout()` while one is in flight returns `CheckoutInProgress`;
//! that flag guards the UI against double submission and does not lock
//! stock anywhere.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use optica_core::access::{Action, Role};
use optica_core::order::{CheckoutRequest, OrderChannel, OrderConfirmation, OrderPayload};
use optica_core::validation::{coerce_quantity_input, parse_percent_input};
use optica_core::{
    Cart, CartTotals, Catalog, CoreError, CustomerRef, DiscountMode, Money, Percent, Product,
    ProductId, StockSnapshot, COUNTER_CUSTOMER_NAME,
};

use crate::config::PosConfig;
use crate::error::{ClientError, ClientResult, Notice};
use crate::providers::{CatalogProvider, OrderSink, StockProvider};

// =============================================================================
// Session State
// =============================================================================

/// Whether the session can be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// `mount()` has not run (or `teardown()` ran).
    Unmounted,
    /// Catalog and stock are loaded.
    Ready,
    /// Mount failed; operations return the stored error.
    Unavailable(ClientError),
}

struct Inner {
    state: SessionState,
    cart: Cart,
    catalog: Catalog,
    stock: StockSnapshot,
}

impl Inner {
    fn ensure_ready(&self) -> ClientResult<()> {
        match &self.state {
            SessionState::Ready => Ok(()),
            SessionState::Unmounted => Err(ClientError::NotMounted),
            SessionState::Unavailable(err) => Err(err.clone()),
        }
    }

    fn product(&self, product_id: ProductId) -> ClientResult<Product> {
        self.catalog
            .get(product_id)
            .cloned()
            .ok_or_else(|| CoreError::ProductNotFound(product_id).into())
    }
}

/// Clears the in-flight flag when the checkout ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Views
// =============================================================================

/// One cart row as the POS table renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_discount: Percent,
    pub line_subtotal: Money,
    /// Units available in the current snapshot.
    pub available: i64,
    /// The "+" button is disabled.
    pub at_limit: bool,
    /// Stock dropped below the cart quantity since the line was added.
    pub out_of_stock: bool,
}

/// Everything the cart panel needs in one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
    pub checkout_in_progress: bool,
}

/// Result of the quick-add box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickAdd {
    Added { product_id: ProductId, quantity: i64 },
    EmptyQuery,
    NoMatch,
}

impl QuickAdd {
    /// Info notice for the two non-adding outcomes.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            QuickAdd::Added { .. } => None,
            QuickAdd::EmptyQuery => Some(Notice::empty_search()),
            QuickAdd::NoMatch => Some(Notice::no_search_results()),
        }
    }
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub confirmation: OrderConfirmation,
    /// What was sent to the sink.
    pub payload: OrderPayload,
    /// False if the post-checkout stock fetch failed and the old snapshot
    /// is still in use.
    pub stock_refreshed: bool,
    pub notice: Notice,
}

// =============================================================================
// POS Session
// =============================================================================

/// An open POS view.
pub struct PosSession {
    catalog_provider: Arc<dyn CatalogProvider>,
    stock_provider: Arc<dyn StockProvider>,
    sink: Arc<dyn OrderSink>,
    settings: PosConfig,
    inner: Mutex<Inner>,
    checkout_in_flight: AtomicBool,
}

impl std::fmt::Debug for PosSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosSession")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("checkout_in_flight", &self.is_checkout_in_flight())
            .finish()
    }
}

impl PosSession {
    pub fn new(
        catalog_provider: Arc<dyn CatalogProvider>,
        stock_provider: Arc<dyn StockProvider>,
        sink: Arc<dyn OrderSink>,
        settings: PosConfig,
    ) -> Self {
        PosSession {
            catalog_provider,
            stock_provider,
            sink,
            settings,
            inner: Mutex::new(Inner {
                state: SessionState::Unmounted,
                cart: Cart::new(),
                catalog: Catalog::default(),
                stock: StockSnapshot::empty(),
            }),
            checkout_in_flight: AtomicBool::new(false),
        }
    }

    /// Session whose three providers are the same backend.
    pub fn with_backend<B>(backend: Arc<B>, settings: PosConfig) -> Self
    where
        B: CatalogProvider + StockProvider + OrderSink + 'static,
    {
        PosSession::new(backend.clone(), backend.clone(), backend, settings)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Loads the catalog, then stock, and starts an empty cart.
    ///
    /// ## Errors
    /// - `CatalogUnavailable` / `StockUnavailable`: the session stays
    ///   `Unavailable` until the next successful mount
    /// - `Unauthorized`: passed through so the caller can log out
    pub async fn mount(&self) -> ClientResult<()> {
        debug!("mounting POS session");

        let products = match self.catalog_provider.list_products().await {
            Ok(products) => products,
            Err(err) => return Err(self.fail_mount(err, ClientError::CatalogUnavailable)),
        };
        let levels = match self.stock_provider.list_stock().await {
            Ok(levels) => levels,
            Err(err) => return Err(self.fail_mount(err, ClientError::StockUnavailable)),
        };

        let mut inner = self.lock();
        inner.catalog = Catalog::new(products);
        inner.stock = StockSnapshot::from_levels(levels);
        inner.cart = Cart::new();
        inner.state = SessionState::Ready;

        info!(
            products = inner.catalog.len(),
            stock_rows = inner.stock.len(),
            "POS session mounted"
        );
        Ok(())
    }

    fn fail_mount(&self, err: ClientError, wrap: fn(String) -> ClientError) -> ClientError {
        let err = match err {
            ClientError::Unauthorized => ClientError::Unauthorized,
            other => wrap(other.to_string()),
        };
        error!(error = %err, "POS session mount failed");
        self.lock().state = SessionState::Unavailable(err.clone());
        err
    }

    /// Leaves the view: drops the cart and goes back to `Unmounted`.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        inner.cart = Cart::new();
        inner.state = SessionState::Unmounted;
        debug!("POS session torn down");
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn settings(&self) -> &PosConfig {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Catalog Access
    // -------------------------------------------------------------------------

    /// Products of the mounted catalog.
    pub fn products(&self) -> ClientResult<Vec<Product>> {
        let inner = self.lock();
        inner.ensure_ready()?;
        Ok(inner.catalog.products().to_vec())
    }

    /// Catalog as `role` may see it; unit cost is stripped unless the role
    /// can view it.
    pub fn products_for(&self, role: Role) -> ClientResult<Vec<Product>> {
        let products = self.products()?;
        if role.can(Action::ViewUnitCost) {
            return Ok(products);
        }
        Ok(products.iter().map(Product::without_cost).collect())
    }

    /// Products matching the order-modal filters.
    pub fn filter_products(
        &self,
        text: Option<&str>,
        category: Option<&str>,
        product_type: Option<&str>,
    ) -> ClientResult<Vec<Product>> {
        let inner = self.lock();
        inner.ensure_ready()?;
        Ok(inner
            .catalog
            .filter(text, category, product_type)
            .cloned()
            .collect())
    }

    /// Units of `product_id` available in the current snapshot.
    pub fn available(&self, product_id: ProductId) -> i64 {
        self.lock().stock.available(product_id)
    }

    // -------------------------------------------------------------------------
    // Cart Mutations
    // -------------------------------------------------------------------------

    /// Adds one unit of a catalog product.
    pub fn add_to_cart(&self, product_id: ProductId) -> ClientResult<i64> {
        self.add_quantity(product_id, 1)
    }

    /// Adds `quantity` units of a catalog product (order modal).
    pub fn add_quantity(&self, product_id: ProductId, quantity: i64) -> ClientResult<i64> {
        let mut inner = self.lock();
        inner.ensure_ready()?;
        let product = inner.product(product_id)?;

        let Inner { cart, stock, .. } = &mut *inner;
        let result = cart.add_quantity(&product, quantity, stock);
        log_mutation("add", product_id, &result);
        Ok(result?)
    }

    /// Order-modal variant taking the raw quantity field.
    pub fn add_quantity_input(&self, product_id: ProductId, raw: &str) -> ClientResult<i64> {
        self.add_quantity(product_id, coerce_quantity_input(raw))
    }

    /// Adds the first product whose SKU or name contains `query`.
    pub fn quick_add(&self, query: &str) -> ClientResult<QuickAdd> {
        let product_id = {
            let inner = self.lock();
            inner.ensure_ready()?;
            if query.trim().is_empty() {
                return Ok(QuickAdd::EmptyQuery);
            }
            match inner.catalog.search(query) {
                Some(product) => product.id,
                None => {
                    debug!(query, "quick add found nothing");
                    return Ok(QuickAdd::NoMatch);
                }
            }
        };

        let quantity = self.add_to_cart(product_id)?;
        Ok(QuickAdd::Added {
            product_id,
            quantity,
        })
    }

    pub fn increment_line(&self, product_id: ProductId) -> ClientResult<i64> {
        let mut inner = self.lock();
        inner.ensure_ready()?;

        let Inner { cart, stock, .. } = &mut *inner;
        let result = cart.increment(product_id, stock);
        log_mutation("increment", product_id, &result);
        Ok(result?)
    }

    /// Removes one unit; a line never drops below 1 this way.
    pub fn decrement_line(&self, product_id: ProductId) -> ClientResult<i64> {
        let mut inner = self.lock();
        inner.ensure_ready()?;

        let result = inner.cart.decrement(product_id);
        log_mutation("decrement", product_id, &result);
        Ok(result?)
    }

    /// Sets a line's quantity; 0 removes it.
    pub fn set_line_quantity(&self, product_id: ProductId, quantity: i64) -> ClientResult<i64> {
        let mut inner = self.lock();
        inner.ensure_ready()?;

        let Inner { cart, stock, .. } = &mut *inner;
        let result = cart.set_quantity(product_id, quantity, stock);
        log_mutation("set_quantity", product_id, &result);
        Ok(result?)
    }

    /// Deletes a line. Removing an absent line is not an error.
    pub fn remove_line(&self, product_id: ProductId) -> bool {
        let removed = self.lock().cart.remove(product_id);
        debug!(product_id = product_id.0, removed, "remove line");
        removed
    }

    pub fn set_discount_mode(&self, mode: DiscountMode) {
        debug!(?mode, "discount mode");
        self.lock().cart.set_discount_mode(mode);
    }

    /// Stores the order discount from the raw input field and returns the
    /// clamped value. Non-numeric input becomes 0%.
    pub fn set_order_discount_percent(&self, raw: &str) -> Percent {
        let pct = parse_percent_input(raw);
        debug!(raw, bps = pct.bps(), "order discount");
        self.lock().cart.set_order_discount(pct);
        pct
    }

    /// Stores a line discount from the raw input field.
    pub fn set_line_discount_percent(&self, product_id: ProductId, raw: &str) -> ClientResult<Percent> {
        let pct = parse_percent_input(raw);
        debug!(product_id = product_id.0, raw, bps = pct.bps(), "line discount");
        self.lock().cart.set_line_discount(product_id, pct)?;
        Ok(pct)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn totals(&self) -> CartTotals {
        self.lock().cart.totals()
    }

    pub fn cart(&self) -> Cart {
        self.lock().cart.clone()
    }

    pub fn is_checkout_in_flight(&self) -> bool {
        self.checkout_in_flight.load(Ordering::SeqCst)
    }

    /// Cart lines with their availability flags, and totals.
    pub fn view(&self) -> CartView {
        let inner = self.lock();
        let lines = inner
            .cart
            .lines()
            .iter()
            .map(|line| {
                let available = inner.stock.available(line.product_id);
                CartLineView {
                    product_id: line.product_id,
                    sku: line.sku.clone(),
                    name: line.name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                    line_discount: line.line_discount,
                    line_subtotal: line.line_subtotal(),
                    available,
                    at_limit: line.quantity >= available,
                    out_of_stock: line.quantity > available,
                }
            })
            .collect();

        CartView {
            lines,
            totals: inner.cart.totals(),
            checkout_in_progress: self.is_checkout_in_flight(),
        }
    }

    // -------------------------------------------------------------------------
    // Stock
    // -------------------------------------------------------------------------

    /// Replaces the stock snapshot. On failure the old snapshot is kept.
    pub async fn refresh_stock(&self) -> ClientResult<()> {
        self.lock().ensure_ready()?;

        match self.stock_provider.list_stock().await {
            Ok(levels) => {
                let snapshot = StockSnapshot::from_levels(levels);
                debug!(rows = snapshot.len(), "stock refreshed");
                self.lock().stock = snapshot;
                Ok(())
            }
            Err(ClientError::Unauthorized) => Err(ClientError::Unauthorized),
            Err(err) => {
                warn!(error = %err, "stock refresh failed, keeping previous snapshot");
                Err(ClientError::StockUnavailable(err.to_string()))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Submits the cart as a counter sale.
    ///
    /// ## Flow
    /// 1. Re-validate every line against the current snapshot (no sink call
    ///    if any line no longer fits)
    /// 2. Submit through the sink with a fresh request id
    /// 3. On success: clear the cart, refetch stock, optionally reset
    ///    discounts
    /// 4. On failure: keep the cart untouched
    pub async fn checkout(&self, request: CheckoutRequest) -> ClientResult<CheckoutOutcome> {
        self.submit(OrderChannel::Sale, request).await
    }

    pub(crate) async fn submit(
        &self,
        channel: OrderChannel,
        request: CheckoutRequest,
    ) -> ClientResult<CheckoutOutcome> {
        if self.checkout_in_flight.swap(true, Ordering::SeqCst) {
            warn!("checkout already in flight");
            return Err(ClientError::CheckoutInProgress);
        }
        let _in_flight = InFlight(&self.checkout_in_flight);

        let payload = {
            let inner = self.lock();
            inner.ensure_ready()?;
            let request = self.with_counter_name(request);
            match inner.cart.prepare_checkout(channel, &inner.stock, &request) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, ?channel, "checkout rejected before submission");
                    return Err(err.into());
                }
            }
        };

        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            ?channel,
            lines = payload.items.len(),
            total = %payload.total,
            method = %payload.payment_method,
            "submitting checkout"
        );

        let confirmation = match self.sink.submit(&payload, request_id).await {
            Ok(confirmation) => confirmation,
            Err(ClientError::Unauthorized) => {
                error!(%request_id, "checkout rejected: session expired");
                return Err(ClientError::Unauthorized);
            }
            Err(err) => {
                error!(%request_id, error = %err, "checkout failed, cart preserved");
                return Err(ClientError::SubmissionFailed {
                    message: err.backend_message().map(str::to_string),
                    cause: err.to_string(),
                });
            }
        };

        {
            let mut inner = self.lock();
            inner.cart.clear();
            if self.settings.reset_discounts_after_checkout {
                inner.cart.reset_discounts();
            }
        }
        info!(%request_id, id = ?confirmation.id, "checkout completed");

        let stock_refreshed = self.refresh_stock().await.is_ok();

        let notice = match channel {
            OrderChannel::Sale => Notice::sale_registered(),
            OrderChannel::Order => Notice::order_sent(),
        };
        Ok(CheckoutOutcome {
            confirmation,
            payload,
            stock_refreshed,
            notice,
        })
    }

    /// Blank or placeholder counter names become the configured counter
    /// customer.
    fn with_counter_name(&self, request: CheckoutRequest) -> CheckoutRequest {
        let placeholder = match &request.customer {
            CustomerRef::Counter { name } => {
                let name = name.trim();
                name.is_empty() || name == COUNTER_CUSTOMER_NAME
            }
            CustomerRef::Optica { .. } => false,
        };

        if placeholder {
            CheckoutRequest {
                customer: CustomerRef::counter(&self.settings.counter_customer_name),
                ..request
            }
        } else {
            request
        }
    }
}

fn log_mutation<T: std::fmt::Debug>(op: &str, product_id: ProductId, result: &Result<T, CoreError>) {
    match result {
        Ok(value) => debug!(op, product_id = product_id.0, ?value, "cart updated"),
        Err(err) => warn!(op, product_id = product_id.0, error = %err, "cart mutation rejected"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use optica_core::{PaymentMethod, StockLevel};

    fn backend() -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::new(
            vec![
                Product::new(ProductId(1), "ARM-001", "Armazón Clásico", Money::from_pesos(100)),
                Product::new(ProductId(2), "LEN-002", "Lente Monofocal", Money::from_pesos(50)),
            ],
            vec![
                StockLevel::new(ProductId(1), 5, 2),
                StockLevel::new(ProductId(2), 1, 0),
            ],
        ))
    }

    #[tokio::test]
    async fn test_operations_require_mount() {
        let session = PosSession::with_backend(backend(), PosConfig::default());
        assert_eq!(session.add_to_cart(ProductId(1)), Err(ClientError::NotMounted));

        session.mount().await.unwrap();
        assert_eq!(session.add_to_cart(ProductId(1)), Ok(1));

        session.teardown();
        assert_eq!(session.state(), SessionState::Unmounted);
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_view_flags() {
        let session = PosSession::with_backend(backend(), PosConfig::default());
        session.mount().await.unwrap();

        session.add_to_cart(ProductId(2)).unwrap();
        session.add_to_cart(ProductId(1)).unwrap();

        let view = session.view();
        assert_eq!(view.lines.len(), 2);
        assert!(view.lines[0].at_limit);
        assert!(!view.lines[0].out_of_stock);
        assert_eq!(view.lines[1].available, 3);
        assert!(!view.lines[1].at_limit);
        assert_eq!(view.totals.subtotal, Money::from_pesos(150));
    }

    #[tokio::test]
    async fn test_unit_cost_is_admin_only() {
        let backend = Arc::new(InMemoryBackend::new(
            vec![Product::new(ProductId(1), "ARM-001", "Armazón", Money::from_pesos(100))
                .with_cost(Money::from_pesos(40))],
            vec![],
        ));
        let session = PosSession::with_backend(backend, PosConfig::default());
        session.mount().await.unwrap();

        assert_eq!(session.products_for(Role::Admin).unwrap()[0].cost, Some(Money::from_pesos(40)));
        assert_eq!(session.products_for(Role::Employee).unwrap()[0].cost, None);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let session = PosSession::with_backend(backend(), PosConfig::default());
        session.mount().await.unwrap();

        assert_eq!(
            session.add_to_cart(ProductId(99)),
            Err(ClientError::Core(CoreError::ProductNotFound(ProductId(99))))
        );
    }

    #[tokio::test]
    async fn test_discount_inputs_are_clamped() {
        let session = PosSession::with_backend(backend(), PosConfig::default());
        session.mount().await.unwrap();
        session.add_to_cart(ProductId(1)).unwrap();

        assert_eq!(session.set_order_discount_percent("150"), Percent::from_whole(100));
        assert_eq!(session.set_order_discount_percent("abc"), Percent::zero());
        assert_eq!(
            session.set_line_discount_percent(ProductId(1), "12.5%").unwrap(),
            Percent::from_bps(1250)
        );
        assert!(session.set_line_discount_percent(ProductId(2), "5").is_err());
    }

    #[tokio::test]
    async fn test_blank_counter_name_uses_config() {
        let backend = backend();
        let settings = PosConfig {
            counter_customer_name: "Público general".to_string(),
            ..PosConfig::default()
        };
        let session = PosSession::with_backend(backend.clone(), settings);
        session.mount().await.unwrap();
        session.add_to_cart(ProductId(1)).unwrap();

        session
            .checkout(CheckoutRequest::counter(PaymentMethod::Cash, "  "))
            .await
            .unwrap();

        let sent = backend.submitted().await;
        assert_eq!(sent[0].customer.counter_name(), Some("Público general"));
    }
}
