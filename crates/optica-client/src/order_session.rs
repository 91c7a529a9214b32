//! # Óptica Order Session
//!
//! The "Pedidos" screen: a partner óptica builds a cart from the same catalog
//! and stock as the POS, then sends it as an order. Orders start in
//! `en_proceso` and may only use the payment methods the óptica account
//! allows.

use std::ops::Deref;
use tracing::warn;

use optica_core::order::{ensure_payment_allowed, CheckoutRequest, OrderChannel};
use optica_core::validation::validate_optica_payment_methods;
use optica_core::{CoreError, Optica, PaymentMethod};

use crate::error::{ClientError, ClientResult, Notice};
use crate::session::{CheckoutOutcome, PosSession};

/// A [`PosSession`] opened on behalf of one óptica account.
#[derive(Debug)]
pub struct OrderSession {
    pos: PosSession,
    optica: Optica,
}

impl OrderSession {
    /// ## Errors
    /// - `Validation` if the account has no payment methods at all
    pub fn new(pos: PosSession, optica: Optica) -> ClientResult<Self> {
        validate_optica_payment_methods(&optica.payment_methods)?;
        Ok(OrderSession { pos, optica })
    }

    pub fn optica(&self) -> &Optica {
        &self.optica
    }

    /// Methods offered in the order modal.
    pub fn allowed_methods(&self) -> &[PaymentMethod] {
        &self.optica.payment_methods
    }

    /// Sends the cart as an order for this óptica.
    ///
    /// The payment method is checked against the account before anything
    /// else; a disallowed method never reaches the sink.
    pub async fn place_order(
        &self,
        payment_method: PaymentMethod,
        notes: Option<&str>,
    ) -> ClientResult<CheckoutOutcome> {
        if let Err(err) = ensure_payment_allowed(&self.optica, payment_method) {
            warn!(optica = self.optica.id, method = %payment_method, "payment method not allowed");
            return Err(err.into());
        }

        let mut request = CheckoutRequest::optica(payment_method, self.optica.id);
        if let Some(notes) = notes {
            request = request.with_notes(notes);
        }

        self.pos.submit(OrderChannel::Order, request).await
    }

    /// Notice for a failed order. An empty cart reads "Sin productos" here
    /// instead of the POS wording.
    pub fn notice_for(err: &ClientError) -> Notice {
        match err {
            ClientError::Core(CoreError::EmptyCart) => Notice::empty_order(),
            other => Notice::from(other),
        }
    }
}

impl Deref for OrderSession {
    type Target = PosSession;

    fn deref(&self) -> &PosSession {
        &self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PosConfig;
    use crate::memory::InMemoryBackend;
    use optica_core::{Money, OrderStatus, Product, ProductId, StockLevel};
    use std::sync::Arc;

    async fn session(methods: Vec<PaymentMethod>) -> (Arc<InMemoryBackend>, OrderSession) {
        let backend = Arc::new(InMemoryBackend::new(
            vec![Product::new(ProductId(1), "ARM-001", "Armazón", Money::from_pesos(100))],
            vec![StockLevel::new(ProductId(1), 10, 0)],
        ));
        let pos = PosSession::with_backend(backend.clone(), PosConfig::default());
        pos.mount().await.unwrap();

        let mut optica = Optica::new(8, "Óptica Central");
        optica.payment_methods = methods;
        (backend, OrderSession::new(pos, optica).unwrap())
    }

    #[tokio::test]
    async fn test_disallowed_method_never_submits() {
        let (backend, orders) = session(vec![PaymentMethod::Transfer]).await;
        orders.add_quantity(ProductId(1), 2).unwrap();

        let err = orders.place_order(PaymentMethod::Cash, None).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(CoreError::PaymentMethodNotAllowed { .. })
        ));
        assert_eq!(backend.submit_calls(), 0);
        assert_eq!(orders.cart().total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_order_is_sent_en_proceso() {
        let (backend, orders) = session(vec![PaymentMethod::Transfer]).await;
        orders.add_quantity_input(ProductId(1), "3").unwrap();

        let outcome = orders
            .place_order(PaymentMethod::Transfer, Some("entregar el lunes"))
            .await
            .unwrap();

        assert_eq!(outcome.confirmation.status, Some(OrderStatus::EnProceso));
        assert_eq!(outcome.notice, Notice::order_sent());

        let sent = backend.submitted().await;
        assert_eq!(sent[0].customer.optica_id(), Some(8));
        assert_eq!(sent[0].notes.as_deref(), Some("entregar el lunes"));
        assert!(orders.cart().is_empty());
    }

    #[tokio::test]
    async fn test_empty_order_notice() {
        let (_, orders) = session(vec![PaymentMethod::Cash]).await;
        let err = orders.place_order(PaymentMethod::Cash, None).await.unwrap_err();
        assert_eq!(OrderSession::notice_for(&err).title, "Sin productos");
    }

    #[tokio::test]
    async fn test_account_without_methods_is_rejected() {
        let backend = Arc::new(InMemoryBackend::default());
        let pos = PosSession::with_backend(backend, PosConfig::default());
        let mut optica = Optica::new(1, "Sin métodos");
        optica.payment_methods.clear();
        assert!(OrderSession::new(pos, optica).is_err());
    }
}
