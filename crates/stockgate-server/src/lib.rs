//! Stockgate Server Library
//!
//! Authorization and audit control plane for the inventory and budget
//! application.
//!
//! # Overview
//!
//! - **Permission model** ([`rbac`]): compiled-in role → permission table,
//!   page and action lookups, pure decision functions
//! - **Audit log** ([`audit`]): bounded in-memory store with filtering,
//!   pruning and JSON/CSV export
//! - **Security gate** ([`middleware::security`]): every sensitive operation
//!   passes a gate that records exactly one audit entry per call
//! - **HTTP adapter** ([`api`], [`middleware::actor`]): header-based actor
//!   resolution, 401/403 mapping, audit query/export routes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use stockgate_server::audit::{AuditAction, AuditLogger, AuditQuery};
//! use stockgate_server::middleware::{GateContext, SecurityGate};
//! use stockgate_server::rbac::{Permission, Role, User};
//!
//! let audit = Arc::new(AuditLogger::new(1_000));
//! let gate = SecurityGate::new(audit.clone());
//! let staff = User::new("u-7", "kim@example.com", Role::Staff);
//!
//! let ctx = GateContext::for_action(AuditAction::StockUpdated);
//! assert!(gate.authorize(Some(&staff), Permission::UpdateStock, &ctx).is_ok());
//! assert!(gate.authorize(Some(&staff), Permission::ManageUsers, &ctx).is_err());
//! assert_eq!(audit.count_matching(&AuditQuery::new()), 2);
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rbac;

pub use error::{AppError, ServerError, ServerResult};
