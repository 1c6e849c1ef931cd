//! Integration tests for the security gate
//!
//! These tests verify:
//! - Exactly one audit entry per gate call with an actor
//! - Denials are critical SECURITY_VIOLATION entries with attempt details
//! - Role, ownership and department variants share the same contract
//! - Unauthenticated calls are rejected before any check

use serde_json::json;
use std::sync::Arc;
use stockgate_server::audit::{
    AuditAction, AuditLevel, AuditLogger, AuditQuery, ResourceType, ANONYMOUS_ACTOR,
};
use stockgate_server::middleware::{GateContext, GateError, GateOptions, SecurityGate};
use stockgate_server::rbac::{DenyReason, Permission, Role, User};

fn setup() -> (Arc<AuditLogger>, SecurityGate) {
    let audit = Arc::new(AuditLogger::new(100));
    let gate = SecurityGate::new(audit.clone());
    (audit, gate)
}

fn actor(id: &str, role: Role) -> User {
    User::new(id, format!("{id}@example.com"), role)
}

fn all_entries(audit: &AuditLogger) -> Vec<stockgate_server::audit::AuditEntry> {
    audit.query(&AuditQuery::new().limit(usize::MAX))
}

fn denied_reason(result: Result<stockgate_server::middleware::Proceed, GateError>) -> DenyReason {
    match result {
        Err(GateError::Denied { reason, .. }) => reason,
        other => panic!("expected denial, got {:?}", other),
    }
}

// ============================================================================
// authorize
// ============================================================================

#[test]
fn test_staff_cannot_approve_budget_requests() {
    let (audit, gate) = setup();
    let staff = actor("staff-1", Role::Staff);
    let ctx = GateContext::for_action(AuditAction::BudgetRequestApproved)
        .resource(ResourceType::BudgetRequest, "br-9");

    let result = gate.authorize(Some(&staff), Permission::ApproveBudgetRequests, &ctx);
    let err = result.unwrap_err();
    let audit_id = match &err {
        GateError::Denied {
            reason,
            role,
            audit_id,
        } => {
            assert_eq!(*reason, DenyReason::RoleLacksPermission);
            assert_eq!(*role, Some(Role::Staff));
            *audit_id
        },
        other => panic!("unexpected {:?}", other),
    };

    let entries = all_entries(&audit);
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.id, audit_id);
    assert_eq!(entry.action, AuditAction::SecurityViolation);
    assert_eq!(entry.level, AuditLevel::Critical);
    assert!(!entry.success);
    assert_eq!(entry.user_id, "staff-1");
    assert_eq!(entry.user_role, Some(Role::Staff));
    assert_eq!(entry.details["attempted_permission"], "approve_budget_requests");
    assert_eq!(entry.details["reason"], "role lacks permission");
    assert_eq!(entry.error_message.as_deref(), Some("role lacks permission"));
    assert_eq!(entry.resource_id.as_deref(), Some("br-9"));
}

#[test]
fn test_granted_mutation_records_intended_action() {
    let (audit, gate) = setup();
    let staff = actor("staff-1", Role::Staff);
    let ctx = GateContext::for_action(AuditAction::StockUpdated)
        .resource(ResourceType::Stock, "sku-42")
        .detail("delta", -3)
        .origin(Some("192.168.1.20".to_string()), Some("scanner/1.0".to_string()));

    let proceed = gate
        .authorize(Some(&staff), Permission::UpdateStock, &ctx)
        .unwrap();

    let entries = all_entries(&audit);
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.id, proceed.audit_id);
    assert_eq!(entry.action, AuditAction::StockUpdated);
    assert_eq!(entry.level, AuditLevel::Info);
    assert!(entry.success);
    assert_eq!(entry.details["delta"], -3);
    assert_eq!(entry.ip_address.as_deref(), Some("192.168.1.20"));
    assert_eq!(entry.user_agent.as_deref(), Some("scanner/1.0"));
}

#[test]
fn test_grant_without_action_records_access_granted() {
    let (audit, gate) = setup();
    let viewer = actor("v-1", Role::Viewer);

    gate.authorize(Some(&viewer), Permission::ViewReports, &GateContext::new())
        .unwrap();

    assert_eq!(all_entries(&audit)[0].action, AuditAction::AccessGranted);
}

#[test]
fn test_deletion_grant_is_recorded_at_info() {
    let (audit, gate) = setup();
    let manager = actor("m-1", Role::Manager);
    let ctx = GateContext::for_action(AuditAction::ProductDeleted);

    gate.authorize(Some(&manager), Permission::DeleteProducts, &ctx)
        .unwrap();

    assert_eq!(all_entries(&audit)[0].level, AuditLevel::Info);
}

#[test]
fn test_one_entry_per_call() {
    let (audit, gate) = setup();
    let staff = actor("s-1", Role::Staff);
    let ctx = GateContext::new();

    for (i, &permission) in Permission::all().iter().enumerate() {
        let _ = gate.authorize(Some(&staff), permission, &ctx);
        assert_eq!(audit.len(), i + 1);
    }
    assert_eq!(
        audit.count_matching(&AuditQuery::new().action(AuditAction::SecurityViolation)),
        Permission::all().len() - 9
    );
}

#[test]
fn test_inactive_admin_denied() {
    let (audit, gate) = setup();
    let inactive = actor("a-1", Role::Admin).deactivated();

    let reason = denied_reason(gate.authorize(
        Some(&inactive),
        Permission::ViewDashboard,
        &GateContext::new(),
    ));
    assert_eq!(reason, DenyReason::Inactive);
    assert_eq!(all_entries(&audit)[0].details["reason"], "inactive");
}

#[test]
fn test_inactive_actor_with_unknown_action_reports_inactive() {
    let (audit, gate) = setup();
    let inactive = actor("m-1", Role::Manager).deactivated();

    let reason = denied_reason(gate.authorize_action(
        Some(&inactive),
        "launch_rocket",
        &GateContext::new(),
    ));
    assert_eq!(reason, DenyReason::Inactive);

    let entries = all_entries(&audit);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].details["reason"], "inactive");
    assert_eq!(entries[0].details["attempted_action"], "launch_rocket");
}

// ============================================================================
// Unauthenticated
// ============================================================================

#[test]
fn test_missing_actor_is_unauthenticated() {
    let (audit, gate) = setup();
    let ctx = GateContext::for_action(AuditAction::ProductCreated);

    let err = gate
        .authorize(None, Permission::CreateProducts, &ctx)
        .unwrap_err();
    assert_eq!(err, GateError::Unauthenticated);

    let entries = all_entries(&audit);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::UnauthenticatedAccess);
    assert_eq!(entries[0].level, AuditLevel::Warning);
    assert_eq!(entries[0].user_id, ANONYMOUS_ACTOR);
    assert_eq!(entries[0].user_role, None);
    assert_eq!(entries[0].details["intended_action"], "PRODUCT_CREATED");
}

#[test]
fn test_missing_actor_rejected_by_every_gate() {
    let audit = Arc::new(AuditLogger::new(10));
    let gate = SecurityGate::with_options(
        audit.clone(),
        GateOptions {
            log_anonymous_attempts: false,
        },
    );
    let ctx = GateContext::new();
    let resource = json!({ "owner_id": "x", "department": "d" });

    assert_eq!(gate.require_admin(None, &ctx), Err(GateError::Unauthenticated));
    assert_eq!(
        gate.authorize_action(None, "create_product", &ctx),
        Err(GateError::Unauthenticated)
    );
    assert_eq!(
        gate.require_ownership(None, &resource, "owner_id", &ctx),
        Err(GateError::Unauthenticated)
    );
    assert_eq!(
        gate.require_department_access(None, &resource, "department", &ctx),
        Err(GateError::Unauthenticated)
    );
    assert!(audit.is_empty());
}

// ============================================================================
// authorize_action
// ============================================================================

#[test]
fn test_unknown_action_key_denied_for_admin() {
    let (audit, gate) = setup();
    let admin = actor("root", Role::Admin);

    let reason = denied_reason(gate.authorize_action(
        Some(&admin),
        "format_disk",
        &GateContext::new(),
    ));
    assert_eq!(reason, DenyReason::UnknownAction);

    let entry = &all_entries(&audit)[0];
    assert_eq!(entry.details["attempted_action"], "format_disk");
    assert_eq!(entry.level, AuditLevel::Critical);
}

#[test]
fn test_known_action_key() {
    let (_, gate) = setup();
    let staff = actor("s-1", Role::Staff);
    let ctx = GateContext::for_action(AuditAction::ProductCreated);

    assert!(gate.authorize_action(Some(&staff), "import_products", &ctx).is_ok());
    assert_eq!(
        denied_reason(gate.authorize_action(Some(&staff), "delete_supplier", &ctx)),
        DenyReason::RoleLacksPermission
    );
}

// ============================================================================
// Role gates
// ============================================================================

#[test]
fn test_role_gate_variants() {
    let (audit, gate) = setup();
    let ctx = GateContext::new();
    let admin = actor("a", Role::Admin);
    let manager = actor("m", Role::Manager);
    let staff = actor("s", Role::Staff);
    let viewer = actor("v", Role::Viewer);

    assert!(gate.require_admin(Some(&admin), &ctx).is_ok());
    assert!(gate.require_admin(Some(&manager), &ctx).is_err());

    assert!(gate.require_manager_or_admin(Some(&manager), &ctx).is_ok());
    assert!(gate.require_manager_or_admin(Some(&staff), &ctx).is_err());

    assert!(gate.require_staff_or_above(Some(&staff), &ctx).is_ok());
    assert_eq!(
        denied_reason(gate.require_staff_or_above(Some(&viewer), &ctx)),
        DenyReason::RoleNotAllowed
    );

    assert_eq!(audit.len(), 6);
    let last = &all_entries(&audit)[0];
    assert_eq!(last.details["required_roles"], json!(["admin", "manager", "staff"]));
    assert_eq!(last.details["gate"], "role");
}

#[test]
fn test_explicit_role_list() {
    let (_, gate) = setup();
    let viewer = actor("v", Role::Viewer);
    let ctx = GateContext::new();

    assert!(gate
        .require_role(Some(&viewer), &[Role::Viewer, Role::Admin], &ctx)
        .is_ok());
    assert!(gate.require_role(Some(&viewer), &[], &ctx).is_err());
}

// ============================================================================
// Ownership and department gates
// ============================================================================

#[test]
fn test_admin_bypasses_ownership() {
    let (audit, gate) = setup();
    let admin = actor("root", Role::Admin);
    let ctx = GateContext::new();

    for resource in [
        json!({ "requested_by": "someone-else" }),
        json!({ "requested_by": null }),
        json!({}),
    ] {
        assert!(gate
            .require_ownership(Some(&admin), &resource, "requested_by", &ctx)
            .is_ok());
    }
    assert_eq!(
        audit.count_matching(&AuditQuery::new().action(AuditAction::SecurityViolation)),
        0
    );
}

#[test]
fn test_owner_passes_and_non_owner_denied() {
    let (audit, gate) = setup();
    let staff = actor("s-1", Role::Staff);
    let manager = actor("m-1", Role::Manager);
    let request = json!({ "id": "br-1", "requested_by": "s-1" });
    let ctx = GateContext::for_action(AuditAction::BudgetRequestUpdated)
        .resource(ResourceType::BudgetRequest, "br-1");

    assert!(gate
        .require_ownership(Some(&staff), &request, "requested_by", &ctx)
        .is_ok());

    // Managers do not bypass ownership
    let reason = denied_reason(gate.require_ownership(Some(&manager), &request, "requested_by", &ctx));
    assert_eq!(reason, DenyReason::NotOwner);

    let entry = &all_entries(&audit)[0];
    assert_eq!(entry.action, AuditAction::SecurityViolation);
    assert_eq!(entry.details["resource_owner"], "s-1");
    assert_eq!(entry.details["actor_id"], "m-1");
    assert_eq!(entry.details["reason"], "not resource owner");
}

#[test]
fn test_inactive_admin_does_not_bypass_ownership() {
    let (_, gate) = setup();
    let inactive = actor("root", Role::Admin).deactivated();

    let reason = denied_reason(gate.require_ownership(
        Some(&inactive),
        &json!({ "owner_id": "x" }),
        "owner_id",
        &GateContext::new(),
    ));
    assert_eq!(reason, DenyReason::Inactive);
}

#[test]
fn test_department_gate() {
    let (audit, gate) = setup();
    let ctx = GateContext::new();
    let resource = json!({ "department": "warehouse" });

    let manager = actor("m", Role::Manager);
    let same = actor("s1", Role::Staff).with_department("warehouse");
    let other = actor("s2", Role::Staff).with_department("front-office");
    let viewer = actor("v", Role::Viewer).with_department("warehouse");

    assert!(gate
        .require_department_access(Some(&manager), &resource, "department", &ctx)
        .is_ok());
    assert!(gate
        .require_department_access(Some(&same), &resource, "department", &ctx)
        .is_ok());
    assert!(gate
        .require_department_access(Some(&viewer), &resource, "department", &ctx)
        .is_ok());
    assert_eq!(
        denied_reason(gate.require_department_access(Some(&other), &resource, "department", &ctx)),
        DenyReason::DepartmentMismatch
    );

    let entry = &all_entries(&audit)[0];
    assert_eq!(entry.details["resource_department"], "warehouse");
    assert_eq!(entry.details["actor_department"], "front-office");
    assert_eq!(audit.len(), 4);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gate_shared_across_tasks() {
    let (audit, gate) = setup();
    let mut handles = Vec::new();

    for i in 0..10 {
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            let role = if i % 2 == 0 { Role::Staff } else { Role::Viewer };
            let user = actor(&format!("u-{i}"), role);
            gate.authorize(Some(&user), Permission::UpdateStock, &GateContext::new())
                .is_ok()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 5);
    assert_eq!(audit.len(), 10);
    assert_eq!(
        audit.count_matching(&AuditQuery::new().action(AuditAction::SecurityViolation)),
        5
    );
}
