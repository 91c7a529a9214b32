//! # Client Error Types
//!
//! Errors raised by sessions, providers and the REST backend, plus the
//! [`Notice`] every one of them turns into for the UI.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Optica POS                             │
//! │                                                                         │
//! │  UI action ──► PosSession method ──► Result<T, ClientError>            │
//! │                      │                                                  │
//! │                      ├── cart rule broken?   CoreError ──────┐          │
//! │                      ├── fetch failed?       Catalog/Stock   │          │
//! │                      │                       Unavailable ────┤          │
//! │                      ├── sink rejected?      SubmissionFailed┤          │
//! │                      └── 401?                Unauthorized ───┤          │
//! │                                                              ▼          │
//! │                                    Notice { level, code, title, msg }   │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                    dismissible alert in the UI          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing escapes a session un-translated: the UI only ever renders a
//! `Notice`.

use serde::Serialize;
use thiserror::Error;

use optica_core::{CoreError, ValidationError};

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Every failure a session, provider or sink can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A cart or checkout rule was broken. The cart is unchanged.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// Product list could not be loaded on mount.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Stock levels could not be loaded.
    #[error("Stock unavailable: {0}")]
    StockUnavailable(String),

    /// The session has not been mounted (or its last mount failed).
    #[error("Session is not mounted")]
    NotMounted,

    /// A checkout is already running for this session.
    #[error("A checkout is already in progress")]
    CheckoutInProgress,

    /// The sink refused the sale or order. The cart is preserved for retry.
    ///
    /// `message` is what the backend said, if anything; `cause` is the
    /// underlying error as text.
    #[error("Submission failed: {cause}")]
    SubmissionFailed { message: Option<String>, cause: String },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// HTTP 401: the token is missing or expired; the caller must log out.
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection refused, DNS failure, TLS error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Core(CoreError::Validation(err))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidConfig(format!("invalid URL: {}", err))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl ClientError {
    /// Returns true if retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout => true,
            ClientError::Http { status, .. } => *status >= 500,
            ClientError::SubmissionFailed { .. } => true,
            _ => false,
        }
    }

    /// The message the backend sent, if this error carries one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ClientError::Http { message, .. } if !message.is_empty() => Some(message),
            ClientError::SubmissionFailed { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// Notice
// =============================================================================

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Machine-readable notice codes.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (notice.code) {
///   case 'UNAUTHORIZED':
///     logoutAndGoTo('#/login');
///     break;
///   case 'INSUFFICIENT_STOCK':
///     refreshCartButtons();
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeCode {
    InsufficientStock,
    EmptyCart,
    NotFound,
    CartError,
    ValidationError,
    PaymentNotAllowed,
    CatalogUnavailable,
    StockUnavailable,
    CheckoutInProgress,
    SubmissionFailed,
    Unauthorized,
    Network,
    Internal,
    Completed,
}

/// What the user sees.
///
/// ## Serialization
/// ```json
/// {
///   "level": "warning",
///   "code": "INSUFFICIENT_STOCK",
///   "title": "Ya no hay en inventario",
///   "message": "Armazón Clásico no tiene stock suficiente."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: NoticeCode,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(
        level: NoticeLevel,
        code: NoticeCode,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Notice {
            level,
            code,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Confirmation shown after a counter sale.
    pub fn sale_registered() -> Self {
        Notice::new(
            NoticeLevel::Success,
            NoticeCode::Completed,
            "Venta registrada",
            "La venta se guardó correctamente.",
        )
    }

    /// Confirmation shown after an óptica order.
    pub fn order_sent() -> Self {
        Notice::new(
            NoticeLevel::Success,
            NoticeCode::Completed,
            "Enviado",
            "Pedido registrado.",
        )
    }

    /// Order submitted with no products.
    pub fn empty_order() -> Self {
        Notice::new(
            NoticeLevel::Info,
            NoticeCode::EmptyCart,
            "Sin productos",
            "Agrega al menos un producto.",
        )
    }

    /// Quick search found nothing.
    pub fn no_search_results() -> Self {
        Notice::new(
            NoticeLevel::Info,
            NoticeCode::NotFound,
            "Sin resultados",
            "No se encontró producto con ese criterio.",
        )
    }

    /// Quick search box was empty.
    pub fn empty_search() -> Self {
        Notice::new(
            NoticeLevel::Info,
            NoticeCode::ValidationError,
            "Buscar",
            "Escribe SKU o nombre para agregar.",
        )
    }
}

impl From<&CoreError> for Notice {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { name, .. } => Notice::new(
                NoticeLevel::Warning,
                NoticeCode::InsufficientStock,
                "Ya no hay en inventario",
                format!("{} no tiene stock suficiente.", name),
            ),
            CoreError::EmptyCart => Notice::new(
                NoticeLevel::Info,
                NoticeCode::EmptyCart,
                "Carrito vacío",
                "Agrega productos antes de cobrar.",
            ),
            CoreError::ProductNotFound(_) => Notice::new(
                NoticeLevel::Info,
                NoticeCode::NotFound,
                "No encontrado",
                "El producto no está en el catálogo.",
            ),
            CoreError::NotInCart(_) | CoreError::CartTooLarge { .. } => Notice::new(
                NoticeLevel::Warning,
                NoticeCode::CartError,
                "Carrito",
                err.to_string(),
            ),
            CoreError::PaymentMethodNotAllowed { method, .. } => Notice::new(
                NoticeLevel::Warning,
                NoticeCode::PaymentNotAllowed,
                "Método de pago no permitido",
                format!("{} no está habilitado para esta óptica.", method),
            ),
            CoreError::Validation(v) => Notice::new(
                NoticeLevel::Warning,
                NoticeCode::ValidationError,
                "Dato inválido",
                v.to_string(),
            ),
        }
    }
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Core(core) => Notice::from(core),
            ClientError::CatalogUnavailable(_) => Notice::new(
                NoticeLevel::Error,
                NoticeCode::CatalogUnavailable,
                "Error",
                "No se pudieron cargar los productos.",
            ),
            ClientError::StockUnavailable(_) => Notice::new(
                NoticeLevel::Error,
                NoticeCode::StockUnavailable,
                "Error",
                "No se pudo cargar el inventario.",
            ),
            ClientError::NotMounted => Notice::new(
                NoticeLevel::Error,
                NoticeCode::CatalogUnavailable,
                "Error",
                "La vista no terminó de cargar.",
            ),
            ClientError::CheckoutInProgress => Notice::new(
                NoticeLevel::Info,
                NoticeCode::CheckoutInProgress,
                "Procesando",
                "Ya se está procesando el cobro.",
            ),
            ClientError::SubmissionFailed { message, .. } => Notice::new(
                NoticeLevel::Error,
                NoticeCode::SubmissionFailed,
                "Error",
                message
                    .clone()
                    .unwrap_or_else(|| "No se pudo registrar la operación.".to_string()),
            ),
            ClientError::Unauthorized => Notice::new(
                NoticeLevel::Warning,
                NoticeCode::Unauthorized,
                "Sesión expirada",
                "Vuelve a iniciar sesión.",
            ),
            ClientError::Http { .. }
            | ClientError::Transport(_)
            | ClientError::Timeout
            | ClientError::Decode(_) => Notice::new(
                NoticeLevel::Error,
                NoticeCode::Network,
                "Error",
                err.backend_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "No se pudo conectar con el servidor.".to_string()),
            ),
            ClientError::InvalidConfig(_) | ClientError::ConfigLoadFailed(_) => Notice::new(
                NoticeLevel::Error,
                NoticeCode::Internal,
                "Error",
                err.to_string(),
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
