//! Roles, permissions and the user record the gates evaluate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when parsing RBAC identifiers at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),
}

/// User role. Assigned at account creation, changed only by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Staff, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
        }
    }

    /// Roles allowed to see the reason behind a denial
    pub fn sees_deny_reasons(&self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            "viewer" => Ok(Self::Viewer),
            _ => Err(RbacError::UnknownRole(s.to_string())),
        }
    }
}

/// Atomic capability gating one kind of operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Dashboard and catalog
    ViewDashboard,
    ViewProducts,
    CreateProducts,
    EditProducts,
    DeleteProducts,

    // Inventory
    UpdateStock,
    ScanBarcodes,

    // Suppliers
    ViewSuppliers,
    ManageSuppliers,

    // Budget workflow
    ViewBudgetRequests,
    CreateBudgetRequests,
    ApproveBudgetRequests,

    // Reporting
    ViewReports,
    ExportData,

    // Administration
    ManageUsers,
    ViewAuditLogs,
    ManageSettings,
}

impl Permission {
    /// Every permission, in declaration order
    pub fn all() -> &'static [Permission] {
        &[
            Permission::ViewDashboard,
            Permission::ViewProducts,
            Permission::CreateProducts,
            Permission::EditProducts,
            Permission::DeleteProducts,
            Permission::UpdateStock,
            Permission::ScanBarcodes,
            Permission::ViewSuppliers,
            Permission::ManageSuppliers,
            Permission::ViewBudgetRequests,
            Permission::CreateBudgetRequests,
            Permission::ApproveBudgetRequests,
            Permission::ViewReports,
            Permission::ExportData,
            Permission::ManageUsers,
            Permission::ViewAuditLogs,
            Permission::ManageSettings,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "view_dashboard",
            Permission::ViewProducts => "view_products",
            Permission::CreateProducts => "create_products",
            Permission::EditProducts => "edit_products",
            Permission::DeleteProducts => "delete_products",
            Permission::UpdateStock => "update_stock",
            Permission::ScanBarcodes => "scan_barcodes",
            Permission::ViewSuppliers => "view_suppliers",
            Permission::ManageSuppliers => "manage_suppliers",
            Permission::ViewBudgetRequests => "view_budget_requests",
            Permission::CreateBudgetRequests => "create_budget_requests",
            Permission::ApproveBudgetRequests => "approve_budget_requests",
            Permission::ViewReports => "view_reports",
            Permission::ExportData => "export_data",
            Permission::ManageUsers => "manage_users",
            Permission::ViewAuditLogs => "view_audit_logs",
            Permission::ManageSettings => "manage_settings",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| RbacError::UnknownPermission(s.to_string()))
    }
}

/// The actor a gate evaluates.
///
/// Owned by the account service; the control plane only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create an active user with the given role
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            is_active: true,
            department: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Administrative role change. Returns the previous role.
    pub fn change_role(&mut self, role: Role) -> Role {
        std::mem::replace(&mut self.role, role)
    }

    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Manager ".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(
            "owner".parse::<Role>(),
            Err(RbacError::UnknownRole("owner".to_string()))
        );
    }

    #[test]
    fn test_permission_string_conversion() {
        assert_eq!(Permission::ApproveBudgetRequests.as_str(), "approve_budget_requests");
        assert_eq!(
            "view_audit_logs".parse::<Permission>().unwrap(),
            Permission::ViewAuditLogs
        );
        assert!("launch_rockets".parse::<Permission>().is_err());
    }

    #[test]
    fn test_permission_serde_matches_as_str() {
        for permission in Permission::all() {
            let json = serde_json::to_string(permission).unwrap();
            assert_eq!(json, format!("\"{}\"", permission.as_str()));
        }
    }

    #[test]
    fn test_change_role_returns_previous() {
        let mut user = User::new("u-1", "u1@example.com", Role::Staff);
        let previous = user.change_role(Role::Manager);
        assert_eq!(previous, Role::Staff);
        assert_eq!(user.role, Role::Manager);
    }

    #[test]
    fn test_user_builders() {
        let user = User::new("u-2", "u2@example.com", Role::Viewer)
            .with_department("warehouse")
            .deactivated();
        assert_eq!(user.department.as_deref(), Some("warehouse"));
        assert!(!user.is_active);
    }
}
