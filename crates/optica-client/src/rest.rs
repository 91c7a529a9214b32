//! # REST Backend
//!
//! HTTP implementation of the provider traits against the Optica API.
//!
//! ## Request Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RestBackend                                      │
//! │                                                                         │
//! │  every request:  Accept: application/json                              │
//! │                  Authorization: Bearer <token>   (when logged in)      │
//! │                  timeout from ApiConfig (12 s by default)              │
//! │                                                                         │
//! │  GET  /products            ──► Vec<Product>                            │
//! │  GET  /inventory           ──► Vec<StockLevel>                         │
//! │  GET  /inventory/low-stock ──► Vec<LowStockEntry> (computed if 404)    │
//! │  GET  /opticas             ──► Vec<Optica>                             │
//! │  GET  /sales               ──► Vec<SaleRecord>                         │
//! │  POST /sales               ◄── counter sale                            │
//! │  POST /orders              ◄── óptica order (status en_proceso)        │
//! │                                                                         │
//! │  401      → ClientError::Unauthorized (caller logs out)                │
//! │  other !2xx → ClientError::Http { status, message from JSON body }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Shapes
//! The backend is loose about its JSON: prices arrive as numbers or decimal
//! strings, keys as `snake_case` or `camelCase`, lists bare or wrapped in
//! `{ "data": [...] }`, and inventory rows flat or nested under `product`.
//! The DTOs below absorb all of that so the rest of the crate only sees
//! `optica-core` types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use optica_core::order::{OrderChannel, OrderConfirmation, OrderPayload};
use optica_core::report::{low_stock, LowStockEntry, SaleRecord};
use optica_core::{
    Money, Optica, OrderStatus, PaymentMethod, Product, ProductId, StockLevel, StockSnapshot,
    COUNTER_CUSTOMER_NAME,
};

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::providers::{CatalogProvider, OrderSink, StockProvider};

/// Header carrying the per-attempt request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

// =============================================================================
// Backend
// =============================================================================

/// HTTP client for the Optica API.
#[derive(Debug)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl RestBackend {
    /// Builds a client for `config.base_url`.
    ///
    /// ## Errors
    /// - `InvalidConfig` if the URL does not parse or the client cannot be built
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        url::Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(RestBackend {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(config.token.clone()),
        })
    }

    /// Replaces the bearer token (after login) or clears it (logout).
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = self.token.read().await.as_deref() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        debug!(path, "GET");
        let response = self.request(Method::GET, path).await.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Vec<T>> {
        let body: ListBody<T> = self.get_json(path).await?;
        Ok(body.into_vec())
    }

    // -------------------------------------------------------------------------
    // Extra endpoints (not part of the provider traits)
    // -------------------------------------------------------------------------

    /// Stored sales for the reports screen.
    pub async fn list_sales(&self) -> ClientResult<Vec<SaleRecord>> {
        let rows: Vec<SaleRow> = self.get_list("/sales").await?;
        Ok(rows.into_iter().filter_map(SaleRow::into_record).collect())
    }

    /// Óptica accounts with their payment allow-lists.
    pub async fn list_opticas(&self) -> ClientResult<Vec<Optica>> {
        self.get_list("/opticas").await
    }

    /// Products at or below their minimum stock.
    ///
    /// Uses `/inventory/low-stock` when the backend has it; on 404 the list
    /// is computed from `/products` and `/inventory`.
    pub async fn low_stock(&self) -> ClientResult<Vec<LowStockEntry>> {
        match self.get_list::<LowStockRow>("/inventory/low-stock").await {
            Ok(rows) => {
                let mut entries: Vec<_> = rows.into_iter().filter_map(LowStockRow::into_entry).collect();
                entries.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.sku.cmp(&b.sku)));
                Ok(entries)
            }
            Err(ClientError::Http { status: 404, .. }) => {
                debug!("low-stock endpoint missing, computing locally");
                let products = self.list_products().await?;
                let snapshot = StockSnapshot::from_levels(self.list_stock().await?);
                Ok(low_stock(&products, &snapshot))
            }
            Err(e) => Err(e),
        }
    }
}

/// Maps 401 and other failures; passes 2xx through.
async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        warn!("backend answered 401, session must be discarded");
        return Err(ClientError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    warn!(status = status.as_u16(), %message, "backend request failed");

    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Pulls `message` (or `error`) out of a JSON error body.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

// =============================================================================
// Provider Implementations
// =============================================================================

#[async_trait]
impl CatalogProvider for RestBackend {
    async fn list_products(&self) -> ClientResult<Vec<Product>> {
        let rows: Vec<ProductRow> = self.get_list("/products").await?;
        let total = rows.len();
        let products: Vec<Product> = rows.into_iter().filter_map(ProductRow::into_product).collect();

        if products.len() != total {
            warn!(skipped = total - products.len(), "skipped catalog rows without a usable price");
        }
        info!(count = products.len(), "catalog loaded");
        Ok(products)
    }
}

#[async_trait]
impl StockProvider for RestBackend {
    async fn list_stock(&self) -> ClientResult<Vec<StockLevel>> {
        let rows: Vec<InventoryRow> = self.get_list("/inventory").await?;
        let levels: Vec<StockLevel> = rows.into_iter().filter_map(InventoryRow::into_level).collect();
        debug!(count = levels.len(), "stock loaded");
        Ok(levels)
    }
}

#[async_trait]
impl OrderSink for RestBackend {
    async fn submit(&self, payload: &OrderPayload, request_id: Uuid) -> ClientResult<OrderConfirmation> {
        let (path, body) = match payload.channel {
            OrderChannel::Sale => ("/sales", serde_json::to_value(SaleBody::from(payload))?),
            OrderChannel::Order => ("/orders", serde_json::to_value(OrderBody::from(payload))?),
        };

        info!(%request_id, path, total = %payload.total, "submitting");
        let response = self
            .request(Method::POST, path)
            .await
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        // The sale is recorded once the status is 2xx, whatever the body says.
        let text = response.text().await.unwrap_or_default();
        let value = acknowledgement_body(&text);
        Ok(confirmation_from(&value, payload.channel))
    }
}

/// Body of a 2xx submit response. Empty or non-JSON bodies become `Null`.
fn acknowledgement_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, body_len = text.len(), "accepted submit returned a non-JSON body");
            Value::Null
        }
    }
}

fn confirmation_from(value: &Value, channel: OrderChannel) -> OrderConfirmation {
    let record = value.get("data").unwrap_or(value);
    let id = record.get("id").and_then(|v| match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    });
    let status = record
        .get("status")
        .and_then(|s| serde_json::from_value::<OrderStatus>(s.clone()).ok())
        .or_else(|| channel.initial_status());
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    OrderConfirmation { id, status, message }
}

// =============================================================================
// Outgoing DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    product_id: i64,
    sku: String,
    qty: i64,
    price: f64,
    discount_type: optica_core::order::DiscountType,
    discount_value: f64,
    discount_amount: Option<f64>,
    line_total: f64,
}

fn wire_items(payload: &OrderPayload) -> Vec<WireItem> {
    payload
        .items
        .iter()
        .map(|i| WireItem {
            product_id: i.product_id.0,
            sku: i.sku.clone(),
            qty: i.quantity,
            price: i.unit_price.as_decimal(),
            discount_type: i.discount_type,
            discount_value: i.discount_value.as_percentage(),
            discount_amount: i.discount_amount.map(|m| m.as_decimal()),
            line_total: i.line_total.as_decimal(),
        })
        .collect()
}

/// `POST /sales` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaleBody {
    items: Vec<WireItem>,
    method: PaymentMethod,
    customer_name: String,
    discount_mode: optica_core::DiscountMode,
    subtotal: f64,
    discount_pct: f64,
    discount_amount: f64,
    total: f64,
    notes: Option<String>,
}

impl From<&OrderPayload> for SaleBody {
    fn from(p: &OrderPayload) -> Self {
        SaleBody {
            items: wire_items(p),
            method: p.payment_method,
            customer_name: p
                .customer
                .counter_name()
                .unwrap_or(COUNTER_CUSTOMER_NAME)
                .to_string(),
            discount_mode: p.discount_mode,
            subtotal: p.subtotal.as_decimal(),
            discount_pct: p.order_discount_percent.as_percentage(),
            discount_amount: p.discount_amount.as_decimal(),
            total: p.total.as_decimal(),
            notes: p.notes.clone(),
        }
    }
}

/// `POST /orders` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody {
    optica_id: Option<i64>,
    date: DateTime<Utc>,
    items: Vec<WireItem>,
    payment_method: PaymentMethod,
    status: OrderStatus,
    discount_mode: optica_core::DiscountMode,
    subtotal: f64,
    discount_pct: f64,
    discount_amount: f64,
    total: f64,
    notes: Option<String>,
}

impl From<&OrderPayload> for OrderBody {
    fn from(p: &OrderPayload) -> Self {
        OrderBody {
            optica_id: p.customer.optica_id(),
            date: Utc::now(),
            items: wire_items(p),
            payment_method: p.payment_method,
            status: p.status.unwrap_or_default(),
            discount_mode: p.discount_mode,
            subtotal: p.subtotal.as_decimal(),
            discount_pct: p.order_discount_percent.as_percentage(),
            discount_amount: p.discount_amount.as_decimal(),
            total: p.total.as_decimal(),
            notes: p.notes.clone(),
        }
    }
}

// =============================================================================
// Incoming DTOs
// =============================================================================

/// A list, bare or wrapped in `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Bare(v) | ListBody::Wrapped { data: v } => v,
        }
    }
}

/// Category as a plain string or as `{ "name": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryField {
    Name(String),
    Object { name: String },
}

impl CategoryField {
    fn into_name(self) -> String {
        match self {
            CategoryField::Name(n) | CategoryField::Object { name: n } => n,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: i64,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: Option<CategoryField>,
    #[serde(default, rename = "type")]
    product_type: Option<String>,
    #[serde(default, alias = "salePrice")]
    sale_price: Option<Value>,
    #[serde(default, alias = "buyPrice")]
    buy_price: Option<Value>,
    #[serde(default, alias = "minStock")]
    min_stock: Option<Value>,
    /// Only present when a product is embedded in a low-stock row.
    #[serde(default)]
    stock: Option<Value>,
}

impl ProductRow {
    fn into_product(self) -> Option<Product> {
        let price = self.sale_price.as_ref().and_then(decimal_money)?;

        let mut product = Product::new(ProductId(self.id), self.sku, self.name, price)
            .with_min_stock(self.min_stock.as_ref().and_then(integer).unwrap_or(0));
        if let Some(category) = self.category.map(CategoryField::into_name).filter(|c| !c.is_empty()) {
            product = product.with_category(category);
        }
        if let Some(t) = self.product_type.filter(|t| !t.is_empty()) {
            product = product.with_type(t);
        }
        if let Some(cost) = self.buy_price.as_ref().and_then(decimal_money) {
            product = product.with_cost(cost);
        }
        Some(product)
    }
}

#[derive(Debug, Deserialize)]
struct ProductRef {
    id: i64,
}

/// Inventory row, either `{ stock, reserved, product: { id } }` or flat.
#[derive(Debug, Deserialize)]
struct InventoryRow {
    #[serde(default)]
    product: Option<ProductRef>,
    #[serde(default, alias = "productId")]
    product_id: Option<i64>,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    stock: Option<Value>,
    #[serde(default)]
    reserved: Option<Value>,
}

impl InventoryRow {
    fn into_level(self) -> Option<StockLevel> {
        let product_id = self
            .product
            .map(|p| p.id)
            .or(self.product_id)
            .or(self.id)?;
        let stock = self.stock.as_ref().and_then(integer).unwrap_or(0);
        let reserved = self.reserved.as_ref().and_then(integer).unwrap_or(0);
        Some(StockLevel::new(ProductId(product_id), stock, reserved))
    }
}

#[derive(Debug, Deserialize)]
struct LowStockRow {
    #[serde(default)]
    product: Option<ProductRow>,
    #[serde(flatten)]
    flat: Value,
}

impl LowStockRow {
    fn into_entry(self) -> Option<LowStockEntry> {
        let stock = self.flat.get("stock").and_then(integer);
        let (id, sku, name, min_stock, nested_stock) = match self.product {
            Some(p) => (
                p.id,
                p.sku,
                p.name,
                p.min_stock.as_ref().and_then(integer),
                p.stock.as_ref().and_then(integer),
            ),
            None => {
                let flat = &self.flat;
                (
                    flat.get("id").and_then(integer)?,
                    flat.get("sku").and_then(Value::as_str).unwrap_or_default().to_string(),
                    flat.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    flat.get("minStock")
                        .or_else(|| flat.get("min_stock"))
                        .and_then(integer),
                    None,
                )
            }
        };

        Some(LowStockEntry {
            product_id: ProductId(id),
            sku,
            name,
            stock: stock.or(nested_stock).unwrap_or(0),
            min_stock: min_stock.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    id: Value,
    #[serde(default, alias = "createdAt")]
    created_at: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, alias = "customerName")]
    customer_name: Option<String>,
    #[serde(default, alias = "paymentMethodId")]
    payment_method_id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    subtotal: Option<Value>,
    #[serde(default, alias = "discountAmount")]
    discount_amount: Option<Value>,
    #[serde(default)]
    total: Option<Value>,
}

impl SaleRow {
    fn into_record(self) -> Option<SaleRecord> {
        let id = match self.id {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            _ => return None,
        };
        let payment_method = self
            .payment_method_id
            .as_ref()
            .and_then(integer)
            .and_then(PaymentMethod::from_legacy_id)
            .or_else(|| self.method.as_deref().and_then(|m| m.parse().ok()));
        let total = self.total.as_ref().and_then(decimal_money).unwrap_or_default();

        Some(SaleRecord {
            id,
            created_at: self
                .created_at
                .or(self.date)
                .as_deref()
                .and_then(parse_timestamp),
            customer_name: self
                .customer_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| COUNTER_CUSTOMER_NAME.to_string()),
            payment_method,
            subtotal: self.subtotal.as_ref().and_then(decimal_money).unwrap_or(total),
            discount_amount: self
                .discount_amount
                .as_ref()
                .and_then(decimal_money)
                .unwrap_or_default(),
            total,
        })
    }
}

// =============================================================================
// Value Helpers
// =============================================================================

/// A price sent as `1299.9` or `"1299.90"`.
fn decimal_money(value: &Value) -> Option<Money> {
    match value {
        Value::Number(n) => Money::parse_decimal(&n.to_string()).ok(),
        Value::String(s) => Money::parse_decimal(s).ok(),
        _ => None,
    }
}

/// A count sent as `5`, `5.0` or `"5"`.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339, or Laravel's `YYYY-MM-DD HH:MM:SS` (taken as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use optica_core::order::CheckoutRequest;
    use optica_core::{Cart, Percent};
    use serde_json::json;

    #[test]
    fn test_product_row_shapes() {
        let rows: ListBody<ProductRow> = serde_json::from_value(json!({
            "data": [
                {"id": 1, "sku": "ARM-001", "name": "Armazón", "salePrice": 1299.9,
                 "category": {"name": "Armazones"}, "type": "Metal", "buy_price": "600.00", "minStock": 2},
                {"id": 2, "sku": "LC-1", "name": "Lente", "sale_price": "350", "category": "Lentes"},
                {"id": 3, "sku": "BAD", "name": "Sin precio"}
            ]
        }))
        .unwrap();

        let products: Vec<_> = rows.into_vec().into_iter().filter_map(ProductRow::into_product).collect();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].sale_price, Money::from_cents(129_990));
        assert_eq!(products[0].category.as_deref(), Some("Armazones"));
        assert_eq!(products[0].product_type.as_deref(), Some("Metal"));
        assert_eq!(products[0].cost, Some(Money::from_pesos(600)));
        assert_eq!(products[0].min_stock, 2);
        assert_eq!(products[1].sale_price, Money::from_pesos(350));
    }

    #[test]
    fn test_inventory_row_shapes() {
        let rows: ListBody<InventoryRow> = serde_json::from_value(json!([
            {"stock": 5, "reserved": 2, "product": {"id": 1, "sku": "ARM-001"}},
            {"productId": 2, "stock": "4"},
            {"id": 3, "stock": 1.0},
            {"stock": 9}
        ]))
        .unwrap();

        let levels: Vec<_> = rows.into_vec().into_iter().filter_map(InventoryRow::into_level).collect();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].available(), 3);
        assert_eq!(levels[1], StockLevel::new(ProductId(2), 4, 0));
        assert_eq!(levels[2].stock, 1);
    }

    #[test]
    fn test_sale_row_mapping() {
        let row: SaleRow = serde_json::from_value(json!({
            "id": 17,
            "created_at": "2024-05-01 10:30:00",
            "payment_method_id": 3,
            "total": "450.50"
        }))
        .unwrap();
        let record = row.into_record().unwrap();

        assert_eq!(record.id, "17");
        assert_eq!(record.customer_name, "Mostrador");
        assert_eq!(record.payment_method, Some(PaymentMethod::Transfer));
        assert_eq!(record.total, Money::from_cents(45_050));
        assert_eq!(record.subtotal, record.total);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_low_stock_row_shapes() {
        let rows: Vec<LowStockRow> = serde_json::from_value(json!([
            {"stock": 1, "product": {"id": 1, "sku": "A", "name": "Armazón", "min_stock": 3}},
            {"id": 2, "sku": "B", "name": "Lente", "stock": 0, "minStock": 2}
        ]))
        .unwrap();

        let entries: Vec<_> = rows.into_iter().filter_map(LowStockRow::into_entry).collect();
        assert_eq!(entries[0].stock, 1);
        assert_eq!(entries[0].min_stock, 3);
        assert_eq!(entries[1].product_id, ProductId(2));
        assert_eq!(entries[1].min_stock, 2);
    }

    #[test]
    fn test_sale_body_wire_format() {
        let product = Product::new(ProductId(1), "ARM-001", "Armazón", Money::from_pesos(100));
        let stock = StockSnapshot::from_levels([StockLevel::new(ProductId(1), 5, 0)]);
        let mut cart = Cart::new();
        cart.add(&product, &stock).unwrap();
        cart.set_order_discount(Percent::from_whole(10));

        let payload = cart
            .prepare_checkout(
                OrderChannel::Sale,
                &stock,
                &CheckoutRequest::counter(PaymentMethod::Card, ""),
            )
            .unwrap();
        let body = serde_json::to_value(SaleBody::from(&payload)).unwrap();

        assert_eq!(body["method"], "card");
        assert_eq!(body["customerName"], "Mostrador");
        assert_eq!(body["discountPct"], 10.0);
        assert_eq!(body["total"], 90.0);
        assert_eq!(body["items"][0]["qty"], 1);
        assert_eq!(body["items"][0]["price"], 100.0);
    }

    #[test]
    fn test_order_body_wire_format() {
        let product = Product::new(ProductId(1), "ARM-001", "Armazón", Money::from_pesos(100));
        let stock = StockSnapshot::from_levels([StockLevel::new(ProductId(1), 5, 0)]);
        let mut cart = Cart::new();
        cart.add(&product, &stock).unwrap();

        let payload = cart
            .prepare_checkout(
                OrderChannel::Order,
                &stock,
                &CheckoutRequest::optica(PaymentMethod::Transfer, 8).with_notes("urgente"),
            )
            .unwrap();
        let body = serde_json::to_value(OrderBody::from(&payload)).unwrap();

        assert_eq!(body["opticaId"], 8);
        assert_eq!(body["status"], "en_proceso");
        assert_eq!(body["paymentMethod"], "transfer");
        assert_eq!(body["notes"], "urgente");
    }

    #[test]
    fn test_confirmation_parsing() {
        let c = confirmation_from(&json!({"data": {"id": 42}, "message": "ok"}), OrderChannel::Order);
        assert_eq!(c.id.as_deref(), Some("42"));
        assert_eq!(c.status, Some(OrderStatus::EnProceso));
        assert_eq!(c.message.as_deref(), Some("ok"));

        let empty = confirmation_from(&Value::Null, OrderChannel::Sale);
        assert_eq!(empty, OrderConfirmation::default());
    }

    #[test]
    fn test_acknowledgement_body_tolerates_plain_text() {
        assert_eq!(acknowledgement_body(""), Value::Null);
        assert_eq!(acknowledgement_body("OK"), Value::Null);
        assert_eq!(acknowledgement_body("<html><body>Created</body></html>"), Value::Null);
        assert_eq!(acknowledgement_body(r#"{"data": {"id": 7}}"#), json!({"data": {"id": 7}}));
    }

    /// Answers a single HTTP request with a fixed response on a local port.
    fn serve_once(response: String) -> (String, std::thread::JoinHandle<()>) {
        use std::io::{BufRead, BufReader, Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            reader.get_mut().write_all(response.as_bytes()).unwrap();
        });
        (base_url, handle)
    }

    #[tokio::test]
    async fn test_plain_text_created_completes_checkout() {
        use crate::config::PosConfig;
        use crate::memory::InMemoryBackend;
        use crate::session::PosSession;
        use std::sync::Arc;

        let body = "OK";
        let (base_url, server) = serve_once(format!(
            "HTTP/1.1 201 Created\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));
        let rest = RestBackend::new(&ApiConfig {
            base_url,
            ..ApiConfig::default()
        })
        .unwrap();

        let memory = Arc::new(InMemoryBackend::new(
            vec![Product::new(ProductId(1), "ARM-001", "Armazón", Money::from_pesos(100))],
            vec![StockLevel::new(ProductId(1), 1, 0)],
        ));
        let session = PosSession::new(memory.clone(), memory.clone(), Arc::new(rest), PosConfig::default());
        session.mount().await.unwrap();
        session.add_to_cart(ProductId(1)).unwrap();

        let outcome = session
            .checkout(CheckoutRequest::counter(PaymentMethod::Cash, ""))
            .await
            .unwrap();
        server.join().unwrap();

        assert!(session.cart().is_empty());
        assert_eq!(outcome.confirmation.id, None);
        assert_eq!(outcome.confirmation.status, None);
        assert!(outcome.stock_refreshed);
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(r#"{"message": "Stock insuficiente"}"#).as_deref(),
            Some("Stock insuficiente")
        );
        assert_eq!(extract_message("<html>"), None);
        assert_eq!(extract_message(r#"{"message": ""}"#), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-05-01T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-05-01 10:30:00").is_some());
        assert!(parse_timestamp("ayer").is_none());
    }
}
