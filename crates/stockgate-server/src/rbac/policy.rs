//! Role-to-permission table and permission checks
//!
//! Every check here is pure: it reads the compiled-in table and the user
//! record, nothing else. Checks fail closed: an inactive user holds no
//! permissions whatever their role.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::models::{Permission, Role, User};

const ADMIN_PERMISSIONS: &[Permission] = &[
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
];

const MANAGER_PERMISSIONS: &[Permission] = &[
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
    Permission::ViewAuditLogs,
];

const STAFF_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewProducts,
    Permission::CreateProducts,
    Permission::EditProducts,
    Permission::UpdateStock,
    Permission::ScanBarcodes,
    Permission::ViewSuppliers,
    Permission::ViewBudgetRequests,
    Permission::CreateBudgetRequests,
];

// Not a subset of staff: viewers get read-only reports.
const VIEWER_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewProducts,
    Permission::ViewSuppliers,
    Permission::ViewBudgetRequests,
    Permission::ViewReports,
];

/// The compiled-in permission list of a role
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN_PERMISSIONS,
        Role::Manager => MANAGER_PERMISSIONS,
        Role::Staff => STAFF_PERMISSIONS,
        Role::Viewer => VIEWER_PERMISSIONS,
    }
}

/// Permission set of a role
pub fn permissions_for(role: Role) -> HashSet<Permission> {
    role_permissions(role).iter().copied().collect()
}

/// Effective permissions of a user; empty when the account is inactive
pub fn user_permissions(user: &User) -> HashSet<Permission> {
    if user.is_active {
        permissions_for(user.role)
    } else {
        HashSet::new()
    }
}

/// Why a gate refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    #[serde(rename = "inactive")]
    Inactive,
    #[serde(rename = "role lacks permission")]
    RoleLacksPermission,
    #[serde(rename = "no permission requested")]
    NoPermissionRequested,
    #[serde(rename = "unknown action")]
    UnknownAction,
    #[serde(rename = "role not allowed")]
    RoleNotAllowed,
    #[serde(rename = "not resource owner")]
    NotOwner,
    #[serde(rename = "department mismatch")]
    DepartmentMismatch,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::RoleLacksPermission => "role lacks permission",
            Self::NoPermissionRequested => "no permission requested",
            Self::UnknownAction => "unknown action",
            Self::RoleNotAllowed => "role not allowed",
            Self::NotOwner => "not resource owner",
            Self::DepartmentMismatch => "department mismatch",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub const fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Check a single permission
pub fn has_permission(user: &User, permission: Permission) -> AccessDecision {
    if !user.is_active {
        return AccessDecision::deny(DenyReason::Inactive);
    }

    if role_permissions(user.role).contains(&permission) {
        AccessDecision::allow()
    } else {
        AccessDecision::deny(DenyReason::RoleLacksPermission)
    }
}

/// Allowed if at least one permission matches. An empty list is denied.
pub fn has_any_permission(user: &User, permissions: &[Permission]) -> AccessDecision {
    if !user.is_active {
        return AccessDecision::deny(DenyReason::Inactive);
    }

    let mut last = AccessDecision::deny(DenyReason::NoPermissionRequested);
    for &permission in permissions {
        last = has_permission(user, permission);
        if last.allowed {
            return last;
        }
    }
    last
}

/// Allowed only if every permission matches. An empty list is allowed
/// (vacuous truth) for active users.
pub fn has_all_permissions(user: &User, permissions: &[Permission]) -> AccessDecision {
    if !user.is_active {
        return AccessDecision::deny(DenyReason::Inactive);
    }

    permissions
        .iter()
        .map(|&permission| has_permission(user, permission))
        .find(|decision| !decision.allowed)
        .unwrap_or_else(AccessDecision::allow)
}
