//! End-to-end session flows against the in-memory backend.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use optica_client::{
    ClientError, ClientResult, InMemoryBackend, Notice, NoticeCode, OrderSink, PosConfig,
    PosSession, QuickAdd, SessionState,
};
use optica_core::order::{CheckoutRequest, OrderConfirmation, OrderPayload};
use optica_core::{CoreError, DiscountMode, Money, PaymentMethod, Percent, Product, ProductId, StockLevel};

// =============================================================================
// Fixtures
// =============================================================================

const FRAME: ProductId = ProductId(1);
const LENS: ProductId = ProductId(2);

fn products() -> Vec<Product> {
    vec![
        Product::new(FRAME, "ARM-001", "Armazón Clásico", Money::from_pesos(100)).with_category("Armazones"),
        Product::new(LENS, "LEN-002", "Lente Monofocal", Money::from_pesos(50)).with_category("Lentes"),
    ]
}

fn stock(frame: i64, frame_reserved: i64, lens: i64) -> Vec<StockLevel> {
    vec![
        StockLevel::new(FRAME, frame, frame_reserved),
        StockLevel::new(LENS, lens, 0),
    ]
}

async fn mounted(settings: PosConfig) -> (Arc<InMemoryBackend>, PosSession) {
    let backend = Arc::new(InMemoryBackend::new(products(), stock(5, 0, 5)));
    let session = PosSession::with_backend(backend.clone(), settings);
    session.mount().await.unwrap();
    (backend, session)
}

fn cash() -> CheckoutRequest {
    CheckoutRequest::counter(PaymentMethod::Cash, "")
}

/// Sink that holds every submission until the gate opens.
struct GatedSink {
    gate: Notify,
    inner: Arc<InMemoryBackend>,
}

#[async_trait]
impl OrderSink for GatedSink {
    async fn submit(&self, payload: &OrderPayload, request_id: Uuid) -> ClientResult<OrderConfirmation> {
        self.gate.notified().await;
        self.inner.submit(payload, request_id).await
    }
}

// =============================================================================
// Mount
// =============================================================================

#[tokio::test]
async fn test_mount_loads_catalog_then_stock() {
    let (backend, session) = mounted(PosConfig::default()).await;

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(backend.list_products_calls(), 1);
    assert_eq!(backend.list_stock_calls(), 1);
    assert_eq!(session.products().unwrap().len(), 2);
    assert_eq!(session.available(FRAME), 5);
}

#[tokio::test]
async fn test_catalog_failure_leaves_session_unavailable() {
    let backend = Arc::new(InMemoryBackend::new(products(), stock(5, 0, 5)));
    backend
        .fail_catalog(Some(ClientError::Transport("connection refused".into())))
        .await;

    let session = PosSession::with_backend(backend.clone(), PosConfig::default());
    let err = session.mount().await.unwrap_err();

    assert!(matches!(err, ClientError::CatalogUnavailable(_)));
    assert_eq!(backend.list_stock_calls(), 0);
    assert!(matches!(session.state(), SessionState::Unavailable(_)));
    assert!(matches!(
        session.add_to_cart(FRAME),
        Err(ClientError::CatalogUnavailable(_))
    ));
    assert_eq!(Notice::from(&err).code, NoticeCode::CatalogUnavailable);

    backend.fail_catalog(None).await;
    session.mount().await.unwrap();
    assert_eq!(session.add_to_cart(FRAME), Ok(1));
}

#[tokio::test]
async fn test_stock_failure_and_unauthorized() {
    let backend = Arc::new(InMemoryBackend::new(products(), stock(5, 0, 5)));
    backend.fail_stock(Some(ClientError::Timeout)).await;
    let session = PosSession::with_backend(backend.clone(), PosConfig::default());
    assert!(matches!(
        session.mount().await,
        Err(ClientError::StockUnavailable(_))
    ));

    backend.fail_stock(Some(ClientError::Unauthorized)).await;
    assert_eq!(session.mount().await, Err(ClientError::Unauthorized));
}

// =============================================================================
// Cart Through the Session
// =============================================================================

#[tokio::test]
async fn test_reserved_units_limit_adds() {
    let backend = Arc::new(InMemoryBackend::new(products(), stock(5, 2, 5)));
    let session = PosSession::with_backend(backend, PosConfig::default());
    session.mount().await.unwrap();

    for expected in 1..=3 {
        assert_eq!(session.add_to_cart(FRAME), Ok(expected));
    }

    let err = session.add_to_cart(FRAME).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Core(CoreError::InsufficientStock { available: 3, requested: 4, .. })
    ));
    assert!(session.increment_line(FRAME).is_err());
    assert_eq!(session.cart().quantity_of(FRAME), 3);

    let notice = Notice::from(&err);
    assert_eq!(notice.title, "Ya no hay en inventario");
    assert_eq!(notice.message, "Armazón Clásico no tiene stock suficiente.");
}

#[tokio::test]
async fn test_quick_add() {
    let (_, session) = mounted(PosConfig::default()).await;

    assert_eq!(
        session.quick_add("armazon").unwrap(),
        QuickAdd::Added { product_id: FRAME, quantity: 1 }
    );
    assert_eq!(
        session.quick_add("len-002").unwrap(),
        QuickAdd::Added { product_id: LENS, quantity: 1 }
    );

    let empty = session.quick_add("   ").unwrap();
    assert_eq!(empty.notice().map(|n| n.title), Some("Buscar".to_string()));

    let missing = session.quick_add("estuche").unwrap();
    assert_eq!(missing, QuickAdd::NoMatch);
    assert_eq!(session.cart().total_quantity(), 2);
}

#[tokio::test]
async fn test_line_controls() {
    let (_, session) = mounted(PosConfig::default()).await;
    session.add_quantity(FRAME, 3).unwrap();

    assert_eq!(session.decrement_line(FRAME), Ok(2));
    assert_eq!(session.increment_line(FRAME), Ok(3));
    assert_eq!(session.set_line_quantity(FRAME, 1), Ok(1));
    assert_eq!(session.decrement_line(FRAME), Ok(1));

    assert!(session.remove_line(FRAME));
    assert!(!session.remove_line(FRAME));
    assert!(session.view().lines.is_empty());
}

#[tokio::test]
async fn test_discount_modes_through_session() {
    let (_, session) = mounted(PosConfig::default()).await;
    session.add_quantity(FRAME, 2).unwrap();
    session.add_to_cart(LENS).unwrap();

    session.set_order_discount_percent("10");
    assert_eq!(session.totals().total, Money::from_pesos(225));

    session.set_discount_mode(DiscountMode::PerLine);
    session.set_line_discount_percent(FRAME, "20").unwrap();
    let totals = session.totals();
    assert_eq!(totals.discount, Money::from_pesos(40));
    assert_eq!(totals.total, Money::from_pesos(210));

    session.set_discount_mode(DiscountMode::Order);
    assert_eq!(session.totals().total, Money::from_pesos(225));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_stock_drop_rejects_checkout_without_submitting() {
    let (backend, session) = mounted(PosConfig::default()).await;
    session.add_quantity(FRAME, 4).unwrap();

    backend.set_stock(stock(2, 0, 5)).await;
    session.refresh_stock().await.unwrap();

    let view = session.view();
    assert!(view.lines[0].out_of_stock);

    let err = session.checkout(cash()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Core(CoreError::InsufficientStock { product_id: FRAME, .. })
    ));
    assert_eq!(backend.submit_calls(), 0);
    assert_eq!(session.cart().quantity_of(FRAME), 4);
}

#[tokio::test]
async fn test_successful_checkout_clears_cart_and_refetches_stock() {
    let (backend, session) = mounted(PosConfig::default()).await;
    session.add_quantity(FRAME, 2).unwrap();
    session.add_to_cart(LENS).unwrap();
    session.set_order_discount_percent("10");

    backend.set_stock(stock(3, 0, 4)).await;
    let stock_calls = backend.list_stock_calls();

    let outcome = session
        .checkout(CheckoutRequest::counter(PaymentMethod::Card, "Ana López"))
        .await
        .unwrap();

    assert!(session.cart().is_empty());
    assert_eq!(backend.list_stock_calls(), stock_calls + 1);
    assert!(outcome.stock_refreshed);
    assert_eq!(session.available(FRAME), 3);
    assert_eq!(outcome.notice, Notice::sale_registered());
    assert_eq!(outcome.payload.total, Money::from_pesos(225));
    assert_eq!(outcome.confirmation.id.as_deref(), Some("1"));

    // Discounts survive unless configured otherwise.
    assert_eq!(session.cart().order_discount(), Percent::from_whole(10));

    let sent = backend.submitted().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].customer.counter_name(), Some("Ana López"));
    assert_eq!(sent[0].payment_method, PaymentMethod::Card);
}

#[tokio::test]
async fn test_reset_discounts_after_checkout_when_configured() {
    let settings = PosConfig {
        reset_discounts_after_checkout: true,
        ..PosConfig::default()
    };
    let (_, session) = mounted(settings).await;
    session.add_to_cart(FRAME).unwrap();
    session.set_discount_mode(DiscountMode::PerLine);
    session.set_order_discount_percent("15");

    session.checkout(cash()).await.unwrap();

    let totals = session.totals();
    assert_eq!(totals.discount_mode, DiscountMode::Order);
    assert_eq!(totals.order_discount, Percent::zero());
}

#[tokio::test]
async fn test_sink_failure_preserves_cart() {
    let (backend, session) = mounted(PosConfig::default()).await;
    session.add_quantity(FRAME, 2).unwrap();
    backend
        .fail_submit(Some(ClientError::Http {
            status: 422,
            message: "Stock insuficiente en almacén".into(),
        }))
        .await;
    let stock_calls = backend.list_stock_calls();

    let err = session.checkout(cash()).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::SubmissionFailed {
            message: Some("Stock insuficiente en almacén".into()),
            cause: "HTTP 422: Stock insuficiente en almacén".into(),
        }
    );
    assert_eq!(Notice::from(&err).message, "Stock insuficiente en almacén");
    assert_eq!(session.cart().quantity_of(FRAME), 2);
    assert_eq!(backend.list_stock_calls(), stock_calls);

    backend.fail_submit(Some(ClientError::Timeout)).await;
    let err = session.checkout(cash()).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::SubmissionFailed {
            message: None,
            cause: "Request timed out".into(),
        }
    );
    assert!(!session.is_checkout_in_flight());
}

#[tokio::test]
async fn test_transport_failure_keeps_cause() {
    let (backend, session) = mounted(PosConfig::default()).await;
    session.add_to_cart(LENS).unwrap();
    backend
        .fail_submit(Some(ClientError::Transport("connection reset by peer".into())))
        .await;

    let err = session.checkout(cash()).await.unwrap_err();
    match &err {
        ClientError::SubmissionFailed { message, cause } => {
            assert_eq!(*message, None);
            assert!(cause.contains("connection reset by peer"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("connection reset by peer"));
    assert_eq!(Notice::from(&err).message, "No se pudo registrar la operación.");
    assert_eq!(session.cart().quantity_of(LENS), 1);
}

#[tokio::test]
async fn test_failed_stock_refresh_after_checkout_keeps_snapshot() {
    let (backend, session) = mounted(PosConfig::default()).await;
    session.add_to_cart(FRAME).unwrap();
    backend.fail_stock(Some(ClientError::Timeout)).await;

    let outcome = session.checkout(cash()).await.unwrap();

    assert!(!outcome.stock_refreshed);
    assert!(session.cart().is_empty());
    assert_eq!(session.available(FRAME), 5);
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(backend.submit_calls(), 1);
    assert_eq!(outcome.notice, Notice::sale_registered());
}

#[tokio::test]
async fn test_empty_cart_checkout() {
    let (backend, session) = mounted(PosConfig::default()).await;
    let err = session.checkout(cash()).await.unwrap_err();

    assert_eq!(err, ClientError::Core(CoreError::EmptyCart));
    assert_eq!(Notice::from(&err).title, "Carrito vacío");
    assert_eq!(backend.submit_calls(), 0);
}

#[tokio::test]
async fn test_second_checkout_while_in_flight() {
    let backend = Arc::new(InMemoryBackend::new(products(), stock(5, 0, 5)));
    let sink = Arc::new(GatedSink {
        gate: Notify::new(),
        inner: backend.clone(),
    });
    let session = PosSession::new(backend.clone(), backend.clone(), sink.clone(), PosConfig::default());
    session.mount().await.unwrap();
    session.add_to_cart(FRAME).unwrap();

    let (first, second) = tokio::join!(session.checkout(cash()), async {
        let result = session.checkout(cash()).await;
        sink.gate.notify_one();
        result
    });

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), ClientError::CheckoutInProgress);
    assert_eq!(backend.submit_calls(), 1);
    assert!(!session.is_checkout_in_flight());
}
