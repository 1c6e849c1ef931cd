//! Page and action lookup tables
//!
//! Navigation is default-open: a page key with no table entry requires no
//! permission. Mutation is default-closed: an action key with no entry is
//! denied with [`DenyReason::UnknownAction`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use super::models::{Permission, User};
use super::policy::{has_all_permissions, has_any_permission, AccessDecision, DenyReason};

/// Application page a user may navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Dashboard,
    Products,
    Inventory,
    Scanner,
    Suppliers,
    BudgetRequests,
    Reports,
    Users,
    AuditLogs,
    Settings,
}

impl Page {
    pub const ALL: [Page; 10] = [
        Page::Dashboard,
        Page::Products,
        Page::Inventory,
        Page::Scanner,
        Page::Suppliers,
        Page::BudgetRequests,
        Page::Reports,
        Page::Users,
        Page::AuditLogs,
        Page::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Products => "products",
            Page::Inventory => "inventory",
            Page::Scanner => "scanner",
            Page::Suppliers => "suppliers",
            Page::BudgetRequests => "budget_requests",
            Page::Reports => "reports",
            Page::Users => "users",
            Page::AuditLogs => "audit_logs",
            Page::Settings => "settings",
        }
    }

    /// Permissions of which the user needs at least one
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            Page::Dashboard => &[Permission::ViewDashboard],
            Page::Products => &[Permission::ViewProducts],
            Page::Inventory => &[Permission::UpdateStock, Permission::ViewProducts],
            Page::Scanner => &[Permission::ScanBarcodes],
            Page::Suppliers => &[Permission::ViewSuppliers],
            Page::BudgetRequests => &[Permission::ViewBudgetRequests],
            Page::Reports => &[Permission::ViewReports],
            Page::Users => &[Permission::ManageUsers],
            Page::AuditLogs => &[Permission::ViewAuditLogs],
            Page::Settings => &[Permission::ManageSettings],
        }
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.as_str() == s)
            .ok_or_else(|| format!("unknown page: {}", s))
    }
}

/// Mutating or sensitive operation a user may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateProduct,
    EditProduct,
    DeleteProduct,
    UpdateStock,
    ImportProducts,
    ScanBarcode,
    CreateSupplier,
    EditSupplier,
    DeleteSupplier,
    CreateBudgetRequest,
    ApproveBudgetRequest,
    RejectBudgetRequest,
    ExportReport,
    ExportData,
    ManageUsers,
    ChangeUserRole,
    ViewAuditLogs,
    ExportAuditLogs,
    PruneAuditLogs,
    ChangeSettings,
}

impl Action {
    pub const ALL: [Action; 20] = [
        Action::CreateProduct,
        Action::EditProduct,
        Action::DeleteProduct,
        Action::UpdateStock,
        Action::ImportProducts,
        Action::ScanBarcode,
        Action::CreateSupplier,
        Action::EditSupplier,
        Action::DeleteSupplier,
        Action::CreateBudgetRequest,
        Action::ApproveBudgetRequest,
        Action::RejectBudgetRequest,
        Action::ExportReport,
        Action::ExportData,
        Action::ManageUsers,
        Action::ChangeUserRole,
        Action::ViewAuditLogs,
        Action::ExportAuditLogs,
        Action::PruneAuditLogs,
        Action::ChangeSettings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateProduct => "create_product",
            Action::EditProduct => "edit_product",
            Action::DeleteProduct => "delete_product",
            Action::UpdateStock => "update_stock",
            Action::ImportProducts => "import_products",
            Action::ScanBarcode => "scan_barcode",
            Action::CreateSupplier => "create_supplier",
            Action::EditSupplier => "edit_supplier",
            Action::DeleteSupplier => "delete_supplier",
            Action::CreateBudgetRequest => "create_budget_request",
            Action::ApproveBudgetRequest => "approve_budget_request",
            Action::RejectBudgetRequest => "reject_budget_request",
            Action::ExportReport => "export_report",
            Action::ExportData => "export_data",
            Action::ManageUsers => "manage_users",
            Action::ChangeUserRole => "change_user_role",
            Action::ViewAuditLogs => "view_audit_logs",
            Action::ExportAuditLogs => "export_audit_logs",
            Action::PruneAuditLogs => "prune_audit_logs",
            Action::ChangeSettings => "change_settings",
        }
    }

    /// Permissions the user must hold all of
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            Action::CreateProduct => &[Permission::CreateProducts],
            Action::EditProduct => &[Permission::EditProducts],
            Action::DeleteProduct => &[Permission::DeleteProducts],
            Action::UpdateStock => &[Permission::UpdateStock],
            Action::ImportProducts => &[Permission::CreateProducts, Permission::EditProducts],
            Action::ScanBarcode => &[Permission::ScanBarcodes],
            Action::CreateSupplier | Action::EditSupplier | Action::DeleteSupplier => {
                &[Permission::ManageSuppliers]
            },
            Action::CreateBudgetRequest => &[Permission::CreateBudgetRequests],
            Action::ApproveBudgetRequest | Action::RejectBudgetRequest => {
                &[Permission::ApproveBudgetRequests]
            },
            Action::ExportReport => &[Permission::ViewReports, Permission::ExportData],
            Action::ExportData => &[Permission::ExportData],
            Action::ManageUsers | Action::ChangeUserRole => &[Permission::ManageUsers],
            Action::ViewAuditLogs => &[Permission::ViewAuditLogs],
            Action::ExportAuditLogs => &[Permission::ViewAuditLogs, Permission::ExportData],
            Action::PruneAuditLogs => &[Permission::ViewAuditLogs, Permission::ManageSettings],
            Action::ChangeSettings => &[Permission::ManageSettings],
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown action: {}", s))
    }
}

/// Check navigation to a known page
pub fn can_access(user: &User, page: Page) -> AccessDecision {
    has_any_permission(user, page.required_permissions())
}

/// Check navigation by page key. Unknown keys are permitted for active users.
pub fn can_access_page(user: &User, page_key: &str) -> AccessDecision {
    if !user.is_active {
        return AccessDecision::deny(DenyReason::Inactive);
    }

    match page_key.parse::<Page>() {
        Ok(page) => can_access(user, page),
        Err(_) => {
            debug!(page = %page_key, user_id = %user.id, "No permission entry for page, allowing");
            AccessDecision::allow()
        },
    }
}

/// Check a known action
pub fn can_perform(user: &User, action: Action) -> AccessDecision {
    has_all_permissions(user, action.required_permissions())
}

/// Check an action by key. Unknown keys are denied.
pub fn can_perform_action(
    user: &User,
    action_key: &str,
    resource_id: Option<&str>,
) -> AccessDecision {
    if !user.is_active {
        return AccessDecision::deny(DenyReason::Inactive);
    }

    match action_key.parse::<Action>() {
        Ok(action) => can_perform(user, action),
        Err(_) => {
            warn!(
                action = %action_key,
                user_id = %user.id,
                resource_id = ?resource_id,
                "No permission entry for action, denying"
            );
            AccessDecision::deny(DenyReason::UnknownAction)
        },
    }
}
