//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::rbac::{Role, User};

// ============================================================================
// Audit Defaults
// ============================================================================

/// Default number of entries a query returns
pub const DEFAULT_AUDIT_QUERY_LIMIT: usize = 100;

/// Upper bound on page size accepted from HTTP callers
pub const MAX_AUDIT_QUERY_LIMIT: usize = 1000;

/// Default number of entries the in-memory store keeps
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Default age after which entries become eligible for pruning
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Actor id recorded when no user could be resolved
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Detail map attached to an entry
pub type AuditDetails = BTreeMap<String, JsonValue>;

/// Severity of an audit entry, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AuditLevel {
    pub const ALL: [AuditLevel; 4] = [
        AuditLevel::Info,
        AuditLevel::Warning,
        AuditLevel::Error,
        AuditLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    // Sessions
    Login,
    Logout,
    LoginFailed,
    PasswordChanged,

    // Accounts
    UserCreated,
    UserUpdated,
    UserDeleted,
    UserRoleChanged,
    UserDeactivated,

    // Catalog and stock
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    StockUpdated,
    BarcodeScanned,
    SupplierCreated,
    SupplierUpdated,
    SupplierDeleted,

    // Budget workflow
    BudgetRequestCreated,
    BudgetRequestUpdated,
    BudgetRequestApproved,
    BudgetRequestRejected,

    // Reporting and settings
    ReportGenerated,
    DataExported,
    SettingsChanged,

    // Audit trail itself
    AuditLogsViewed,
    AuditLogsExported,
    AuditLogsPruned,

    // Gate outcomes
    AccessGranted,
    SecurityViolation,
    UnauthenticatedAccess,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::PasswordChanged => "PASSWORD_CHANGED",
            Self::UserCreated => "USER_CREATED",
            Self::UserUpdated => "USER_UPDATED",
            Self::UserDeleted => "USER_DELETED",
            Self::UserRoleChanged => "USER_ROLE_CHANGED",
            Self::UserDeactivated => "USER_DEACTIVATED",
            Self::ProductCreated => "PRODUCT_CREATED",
            Self::ProductUpdated => "PRODUCT_UPDATED",
            Self::ProductDeleted => "PRODUCT_DELETED",
            Self::StockUpdated => "STOCK_UPDATED",
            Self::BarcodeScanned => "BARCODE_SCANNED",
            Self::SupplierCreated => "SUPPLIER_CREATED",
            Self::SupplierUpdated => "SUPPLIER_UPDATED",
            Self::SupplierDeleted => "SUPPLIER_DELETED",
            Self::BudgetRequestCreated => "BUDGET_REQUEST_CREATED",
            Self::BudgetRequestUpdated => "BUDGET_REQUEST_UPDATED",
            Self::BudgetRequestApproved => "BUDGET_REQUEST_APPROVED",
            Self::BudgetRequestRejected => "BUDGET_REQUEST_REJECTED",
            Self::ReportGenerated => "REPORT_GENERATED",
            Self::DataExported => "DATA_EXPORTED",
            Self::SettingsChanged => "SETTINGS_CHANGED",
            Self::AuditLogsViewed => "AUDIT_LOGS_VIEWED",
            Self::AuditLogsExported => "AUDIT_LOGS_EXPORTED",
            Self::AuditLogsPruned => "AUDIT_LOGS_PRUNED",
            Self::AccessGranted => "ACCESS_GRANTED",
            Self::SecurityViolation => "SECURITY_VIOLATION",
            Self::UnauthenticatedAccess => "UNAUTHENTICATED_ACCESS",
        }
    }

    /// Severity used when the caller does not pick one
    pub fn default_level(&self) -> AuditLevel {
        match self {
            Self::SecurityViolation => AuditLevel::Critical,
            Self::LoginFailed
            | Self::UnauthenticatedAccess
            | Self::UserDeleted
            | Self::UserRoleChanged
            | Self::UserDeactivated
            | Self::ProductDeleted
            | Self::SupplierDeleted
            | Self::AuditLogsPruned => AuditLevel::Warning,
            _ => AuditLevel::Info,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource types that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Product,
    Stock,
    Supplier,
    BudgetRequest,
    User,
    Report,
    Settings,
    AuditLog,
    Session,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Stock => "stock",
            Self::Supplier => "supplier",
            Self::BudgetRequest => "budget_request",
            Self::User => "user",
            Self::Report => "report",
            Self::Settings => "settings",
            Self::AuditLog => "audit_log",
            Self::Session => "session",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded audit entry. Never mutated after the logger creates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Insertion order within the logger; breaks timestamp ties
    pub sequence: u64,
    /// Actor id at the time of the action
    pub user_id: String,
    /// Actor email at the time of the action
    pub user_email: String,
    /// Actor role at the time of the action (absent for anonymous actors)
    pub user_role: Option<Role>,
    pub action: AuditAction,
    pub level: AuditLevel,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: AuditDetails,
    /// Client IP address (IPv4 or IPv6)
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Input for [`AuditLogger::append`](super::AuditLogger::append): an entry
/// without id, sequence or timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: String,
    pub user_email: String,
    pub user_role: Option<Role>,
    pub action: AuditAction,
    pub level: Option<AuditLevel>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<String>,
    pub details: AuditDetails,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: Option<bool>,
    pub error_message: Option<String>,
}

impl NewAuditEntry {
    /// Start an entry for the anonymous actor
    pub fn new(action: AuditAction) -> Self {
        Self {
            user_id: ANONYMOUS_ACTOR.to_string(),
            user_email: String::new(),
            user_role: None,
            action,
            level: None,
            resource_type: None,
            resource_id: None,
            details: AuditDetails::new(),
            ip_address: None,
            user_agent: None,
            success: None,
            error_message: None,
        }
    }

    /// Snapshot the actor's identity and current role
    pub fn actor(mut self, user: &User) -> Self {
        self.user_id = user.id.clone();
        self.user_email = user.email.clone();
        self.user_role = Some(user.role);
        self
    }

    pub fn level(mut self, level: AuditLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn resource(mut self, resource_type: ResourceType, resource_id: Option<String>) -> Self {
        self.resource_type = Some(resource_type);
        self.resource_id = resource_id;
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn details(mut self, details: AuditDetails) -> Self {
        self.details.extend(details);
        self
    }

    pub fn ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Mark the entry as a failed outcome
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.success = Some(false);
        self.error_message = Some(error_message.into());
        self
    }

    /// Severity that will be recorded
    pub fn effective_level(&self) -> AuditLevel {
        self.level.unwrap_or_else(|| self.action.default_level())
    }

    pub(crate) fn into_entry(self, id: Uuid, sequence: u64, timestamp: DateTime<Utc>) -> AuditEntry {
        let level = self.effective_level();
        AuditEntry {
            id,
            sequence,
            user_id: self.user_id,
            user_email: self.user_email,
            user_role: self.user_role,
            action: self.action,
            level,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            timestamp,
            success: self.success.unwrap_or(true),
            error_message: self.error_message,
        }
    }
}

/// Filter for audit queries. Every dimension is optional; set dimensions
/// are AND-combined. Date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub action: Option<AuditAction>,
    pub level: Option<AuditLevel>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    /// Maximum number of results to return
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Number of matching entries to skip
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_AUDIT_QUERY_LIMIT
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            action: None,
            level: None,
            resource_type: None,
            resource_id: None,
            start_date: None,
            end_date: None,
            success: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn level(mut self, level: AuditLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn resource(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Same predicates, no pagination
    pub fn unpaginated(&self) -> Self {
        Self {
            limit: usize::MAX,
            offset: 0,
            ..self.clone()
        }
    }

    /// Whether an entry satisfies every set predicate
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(ref user_id) = self.user_id {
            if &entry.user_id != user_id {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(resource_type) = self.resource_type {
            if entry.resource_type != Some(resource_type) {
                return false;
            }
        }
        if let Some(ref resource_id) = self.resource_id {
            if entry.resource_id.as_ref() != Some(resource_id) {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if entry.timestamp > end {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.success != success {
                return false;
            }
        }

        true
    }
}
