//! # Access Policy
//!
//! One declarative table of which role may open which screen or perform
//! which action. The router guard, the navigation menu and the inventory
//! screen all read from here.
//!
//! ## Role Table
//! ```text
//! ┌──────────┬──────────────────────────────────────────┬──────────┐
//! │ Role     │ Routes                                   │ Landing  │
//! ├──────────┼──────────────────────────────────────────┼──────────┤
//! │ Admin    │ everything                               │ /pos     │
//! │ Employee │ /pos /inventory /orders                  │ /pos     │
//! │ Optica   │ /pos /orders                             │ /orders  │
//! │ (none)   │ /login /register                         │ /login   │
//! └──────────┴──────────────────────────────────────────┴──────────┘
//! ```
//!
//! These checks only shape the UI. The REST backend enforces the real
//! permissions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Role
// =============================================================================

/// Role stored with the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
    Optica,
}

impl Role {
    /// Badge label shown next to the user name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Employee => "Empleado",
            Role::Optica => "Óptica",
        }
    }

    /// Whether this role may perform `action`.
    pub fn can(&self, action: Action) -> bool {
        ACTION_TABLE
            .iter()
            .find(|(a, _)| *a == action)
            .map_or(false, |(_, roles)| roles.contains(self))
    }

    /// Whether this role may open `route`.
    pub fn can_visit(&self, route: Route) -> bool {
        route.is_public() || ROUTE_TABLE.iter().any(|r| r.route == route && r.roles.contains(self))
    }

    /// Screen a role lands on after login or an unknown route.
    pub fn landing(&self) -> Route {
        match self {
            Role::Optica => Route::Orders,
            Role::Admin | Role::Employee => Route::Pos,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Optica => "optica",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrador" => Ok(Role::Admin),
            "employee" | "empleado" => Ok(Role::Employee),
            "optica" | "óptica" => Ok(Role::Optica),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".to_string(), "employee".to_string(), "optica".to_string()],
            }),
        }
    }
}

// =============================================================================
// Route
// =============================================================================

/// A screen of the web client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Register,
    Pos,
    Inventory,
    Sales,
    Users,
    Opticas,
    Orders,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Login,
        Route::Register,
        Route::Pos,
        Route::Inventory,
        Route::Sales,
        Route::Users,
        Route::Opticas,
        Route::Orders,
    ];

    /// Path without the hash prefix, e.g. `/pos`.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Pos => "/pos",
            Route::Inventory => "/inventory",
            Route::Sales => "/sales",
            Route::Users => "/users",
            Route::Opticas => "/opticas",
            Route::Orders => "/orders",
        }
    }

    /// Parses `#/pos`, `/pos` or `pos`. Unknown paths give `None`.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.trim();
        let path = path.strip_prefix('#').unwrap_or(path);
        let path = path.strip_prefix('/').unwrap_or(path);
        Route::ALL
            .into_iter()
            .find(|r| r.path().trim_start_matches('/') == path)
    }

    /// Reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Things a screen may show or allow depending on role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// See a product's unit cost.
    ViewUnitCost,
    /// Create, edit or delete inventory rows.
    EditInventory,
    /// Ring up a counter sale.
    Checkout,
    /// Submit an óptica order.
    PlaceOrder,
    /// Open sales KPIs and history.
    ViewReports,
    /// Manage users and óptica accounts.
    ManageAccounts,
}

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Employee, Role::Optica];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

const ACTION_TABLE: &[(Action, &[Role])] = &[
    (Action::ViewUnitCost, ADMIN_ONLY),
    (Action::EditInventory, ADMIN_ONLY),
    (Action::Checkout, ALL_ROLES),
    (Action::PlaceOrder, ALL_ROLES),
    (Action::ViewReports, ADMIN_ONLY),
    (Action::ManageAccounts, ADMIN_ONLY),
];

// =============================================================================
// Route Table
// =============================================================================

/// Who may open a route, and its menu label.
#[derive(Debug, Clone, Copy)]
struct RouteRule {
    route: Route,
    label: &'static str,
    roles: &'static [Role],
}

/// Menu order follows this table. Public routes have no row.
const ROUTE_TABLE: &[RouteRule] = &[
    RouteRule {
        route: Route::Pos,
        label: "Punto de Venta",
        roles: ALL_ROLES,
    },
    RouteRule {
        route: Route::Inventory,
        label: "Inventario",
        roles: &[Role::Admin, Role::Employee],
    },
    RouteRule {
        route: Route::Sales,
        label: "Ventas / Reportes",
        roles: ADMIN_ONLY,
    },
    RouteRule {
        route: Route::Users,
        label: "Usuarios",
        roles: ADMIN_ONLY,
    },
    RouteRule {
        route: Route::Opticas,
        label: "Ópticas",
        roles: ADMIN_ONLY,
    },
    RouteRule {
        route: Route::Orders,
        label: "Pedidos",
        roles: ALL_ROLES,
    },
];

fn is_admin_only(route: Route) -> bool {
    ROUTE_TABLE
        .iter()
        .any(|r| r.route == route && r.roles == ADMIN_ONLY)
}

const ADMIN_ONLY_WARNING: &str = "Solo administradores.";
const EMPLOYEE_WARNING: &str = "Tu rol solo permite POS, Inventario y Pedidos.";

// =============================================================================
// Guard
// =============================================================================

/// Result of checking a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    /// Go to `to` instead, showing `warning` when present.
    Redirect {
        to: Route,
        warning: Option<String>,
    },
}

/// Decides where a navigation to `route` ends up.
///
/// `route` is `None` for a path that matches no screen.
///
/// ## Flow
/// ```text
/// unknown route ──► landing (or /login without a session)
/// public route  ──► Allow
/// no session    ──► /login
/// admin-only    ──► landing + "Solo administradores."
/// employee      ──► /pos    + "Tu rol solo permite POS, Inventario y Pedidos."
/// óptica        ──► /orders, no message
/// ```
pub fn guard(role: Option<Role>, route: Option<Route>) -> AccessDecision {
    let Some(route) = route else {
        return AccessDecision::Redirect {
            to: role.map_or(Route::Login, |r| r.landing()),
            warning: None,
        };
    };

    if route.is_public() {
        return AccessDecision::Allow;
    }

    let Some(role) = role else {
        return AccessDecision::Redirect {
            to: Route::Login,
            warning: None,
        };
    };

    if role.can_visit(route) {
        return AccessDecision::Allow;
    }

    let warning = if is_admin_only(route) {
        Some(ADMIN_ONLY_WARNING)
    } else {
        match role {
            Role::Employee => Some(EMPLOYEE_WARNING),
            Role::Admin | Role::Optica => None,
        }
    };

    AccessDecision::Redirect {
        to: role.landing(),
        warning: warning.map(str::to_string),
    }
}

/// A navigation menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuEntry {
    route: Route,
    pub label: String,
}

/// Menu entries for `role`, in display order.
pub fn menu(role: Role) -> Vec<MenuEntry> {
    ROUTE_TABLE
        .iter()
        .filter(|r| r.roles.contains(&role))
        .map(|r| MenuEntry {
            route: r.route,
            label: r.label.to_string(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
