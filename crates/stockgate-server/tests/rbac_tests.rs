//! Integration tests for the permission model
//!
//! These tests verify:
//! - Permission checks agree with the role table for every pair
//! - Inactive users hold nothing
//! - Page lookups fail open and action lookups fail closed

use proptest::prelude::*;
use stockgate_server::rbac::{
    can_access, can_access_page, can_perform, can_perform_action, has_all_permissions,
    has_any_permission, has_permission, permissions_for, role_permissions, user_permissions,
    Action, DenyReason, Page, Permission, Role, User,
};

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn permission_strategy() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::all().to_vec())
}

fn user(role: Role) -> User {
    User::new(format!("{role}-1"), format!("{role}@example.com"), role)
}

proptest! {
    #[test]
    fn prop_has_permission_matches_table(role in role_strategy(), permission in permission_strategy()) {
        let decision = has_permission(&user(role), permission);
        prop_assert_eq!(decision.allowed, permissions_for(role).contains(&permission));
        if !decision.allowed {
            prop_assert_eq!(decision.reason, Some(DenyReason::RoleLacksPermission));
        }
    }

    #[test]
    fn prop_inactive_users_denied(role in role_strategy(), permission in permission_strategy()) {
        let inactive = user(role).deactivated();
        let decision = has_permission(&inactive, permission);
        prop_assert!(!decision.allowed);
        prop_assert_eq!(decision.reason, Some(DenyReason::Inactive));
    }

    #[test]
    fn prop_any_and_all_agree_with_single_checks(
        role in role_strategy(),
        permissions in prop::collection::vec(permission_strategy(), 1..6),
    ) {
        let actor = user(role);
        let singles: Vec<bool> = permissions
            .iter()
            .map(|&p| has_permission(&actor, p).allowed)
            .collect();

        prop_assert_eq!(has_any_permission(&actor, &permissions).allowed, singles.iter().any(|&b| b));
        prop_assert_eq!(has_all_permissions(&actor, &permissions).allowed, singles.iter().all(|&b| b));
    }
}

#[test]
fn test_role_table() {
    assert_eq!(role_permissions(Role::Admin).len(), 17);
    assert_eq!(role_permissions(Role::Manager).len(), 15);
    assert_eq!(role_permissions(Role::Staff).len(), 9);
    assert_eq!(role_permissions(Role::Viewer).len(), 5);

    let manager = permissions_for(Role::Manager);
    assert!(!manager.contains(&Permission::ManageUsers));
    assert!(!manager.contains(&Permission::ManageSettings));
    assert!(manager.contains(&Permission::ViewAuditLogs));

    let staff = permissions_for(Role::Staff);
    assert!(staff.contains(&Permission::UpdateStock));
    assert!(!staff.contains(&Permission::ApproveBudgetRequests));
    assert!(!staff.contains(&Permission::ViewReports));

    assert!(permissions_for(Role::Viewer).contains(&Permission::ViewReports));
}

#[test]
fn test_empty_lists_convention() {
    let viewer = user(Role::Viewer);
    assert!(!has_any_permission(&viewer, &[]).allowed);
    assert!(has_all_permissions(&viewer, &[]).allowed);
}

#[test]
fn test_user_permissions_follow_role_change() {
    let mut actor = user(Role::Viewer);
    assert!(!user_permissions(&actor).contains(&Permission::UpdateStock));

    actor.change_role(Role::Staff);
    assert!(user_permissions(&actor).contains(&Permission::UpdateStock));
}

#[test]
fn test_page_access_per_role() {
    let staff = user(Role::Staff);
    assert!(can_access(&staff, Page::Scanner).allowed);
    assert!(can_access(&staff, Page::Inventory).allowed);
    assert!(!can_access(&staff, Page::Reports).allowed);
    assert!(!can_access(&staff, Page::AuditLogs).allowed);

    let manager = user(Role::Manager);
    assert!(can_access(&manager, Page::AuditLogs).allowed);
    assert!(!can_access(&manager, Page::Users).allowed);
    assert!(!can_access(&manager, Page::Settings).allowed);

    let admin = user(Role::Admin);
    for page in Page::ALL {
        assert!(can_access(&admin, page).allowed, "admin blocked from {}", page.as_str());
    }
}

#[test]
fn test_page_and_action_key_asymmetry() {
    let viewer = user(Role::Viewer);
    assert!(can_access_page(&viewer, "release_notes").allowed);

    let decision = can_perform_action(&viewer, "release_notes", None);
    assert!(!decision.allowed);
    assert_eq!(decision.reason, Some(DenyReason::UnknownAction));
}

#[test]
fn test_inactive_user_cannot_open_unknown_page() {
    let inactive = user(Role::Admin).deactivated();
    assert_eq!(
        can_access_page(&inactive, "release_notes").reason,
        Some(DenyReason::Inactive)
    );
    assert!(!can_access(&inactive, Page::Dashboard).allowed);
    assert!(!can_perform(&inactive, Action::ExportData).allowed);
    assert_eq!(
        can_perform_action(&inactive, "launch_rocket", None).reason,
        Some(DenyReason::Inactive)
    );
}

#[test]
fn test_budget_approval_actions() {
    let staff = user(Role::Staff);
    let manager = user(Role::Manager);

    assert!(can_perform(&staff, Action::CreateBudgetRequest).allowed);
    assert!(!can_perform(&staff, Action::ApproveBudgetRequest).allowed);
    assert!(can_perform(&manager, Action::ApproveBudgetRequest).allowed);
    assert!(can_perform(&manager, Action::RejectBudgetRequest).allowed);
    assert!(!can_perform(&manager, Action::ChangeUserRole).allowed);
}

#[test]
fn test_audit_actions() {
    let manager = user(Role::Manager);
    assert!(can_perform_action(&manager, "view_audit_logs", None).allowed);
    assert!(can_perform_action(&manager, "export_audit_logs", None).allowed);
    assert!(!can_perform_action(&manager, "prune_audit_logs", None).allowed);

    let admin = user(Role::Admin);
    assert!(can_perform_action(&admin, "prune_audit_logs", None).allowed);
}
