//! Security gate
//!
//! Every gate call with a resolved actor appends exactly one audit entry:
//! the intended action on success, `SECURITY_VIOLATION` at critical level on
//! denial. Calls without an actor are rejected before any check and, when
//! enabled, recorded once as `UNAUTHENTICATED_ACCESS` under the anonymous
//! actor.

use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit::{
    AuditAction, AuditDetails, AuditLevel, AuditLogger, NewAuditEntry, ResourceType,
};
use crate::rbac::{
    can_perform_action, has_permission, AccessDecision, DenyReason, Permission, Role, User,
};

/// Why a guarded operation must not run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("access denied: {reason}")]
    Denied {
        reason: DenyReason,
        role: Option<Role>,
        audit_id: Uuid,
    },
}

impl GateError {
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            GateError::Unauthenticated => None,
            GateError::Denied { reason, .. } => Some(*reason),
        }
    }
}

/// Permission to run the guarded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proceed {
    /// Entry recorded for this decision
    pub audit_id: Uuid,
}

/// Per-call information recorded alongside the decision
#[derive(Debug, Clone, Default)]
pub struct GateContext {
    /// Recorded on success; defaults to `ACCESS_GRANTED`
    pub action: Option<AuditAction>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<String>,
    pub details: AuditDetails,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl GateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_action(action: AuditAction) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn resource(mut self, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type);
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn origin(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    fn entry(&self, action: AuditAction) -> NewAuditEntry {
        let mut entry = NewAuditEntry::new(action)
            .details(self.details.clone())
            .ip_address(self.ip_address.clone())
            .user_agent(self.user_agent.clone());
        if let Some(resource_type) = self.resource_type {
            entry = entry.resource(resource_type, self.resource_id.clone());
        }
        entry
    }
}

/// Gate behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOptions {
    /// Record `UNAUTHENTICATED_ACCESS` when no actor is present
    pub log_anonymous_attempts: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            log_anonymous_attempts: true,
        }
    }
}

/// Authorization gate in front of every sensitive operation
#[derive(Debug, Clone)]
pub struct SecurityGate {
    audit: Arc<AuditLogger>,
    options: GateOptions,
}

impl SecurityGate {
    pub fn new(audit: Arc<AuditLogger>) -> Self {
        Self::with_options(audit, GateOptions::default())
    }

    pub fn with_options(audit: Arc<AuditLogger>, options: GateOptions) -> Self {
        Self { audit, options }
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    pub fn options(&self) -> GateOptions {
        self.options
    }

    /// Gate on a single permission
    pub fn authorize(
        &self,
        actor: Option<&User>,
        permission: Permission,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        let actor = self.authenticate(actor, "permission", ctx)?;
        let decision = has_permission(actor, permission);
        self.settle(
            actor,
            decision,
            "permission",
            subject("attempted_permission", permission.as_str()),
            ctx,
        )
    }

    /// Gate on an action key. Keys without a table entry are denied.
    pub fn authorize_action(
        &self,
        actor: Option<&User>,
        action_key: &str,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        let actor = self.authenticate(actor, "action", ctx)?;
        let decision = can_perform_action(actor, action_key, ctx.resource_id.as_deref());
        self.settle(actor, decision, "action", subject("attempted_action", action_key), ctx)
    }

    /// Gate on an explicit role allow-list
    pub fn require_role(
        &self,
        actor: Option<&User>,
        roles: &[Role],
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        let actor = self.authenticate(actor, "role", ctx)?;
        let decision = if !actor.is_active {
            AccessDecision::deny(DenyReason::Inactive)
        } else if roles.contains(&actor.role) {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(DenyReason::RoleNotAllowed)
        };

        let required: Vec<&str> = roles.iter().map(Role::as_str).collect();
        self.settle(actor, decision, "role", subject("required_roles", required), ctx)
    }

    pub fn require_admin(
        &self,
        actor: Option<&User>,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        self.require_role(actor, &[Role::Admin], ctx)
    }

    pub fn require_manager_or_admin(
        &self,
        actor: Option<&User>,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        self.require_role(actor, &[Role::Admin, Role::Manager], ctx)
    }

    pub fn require_staff_or_above(
        &self,
        actor: Option<&User>,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        self.require_role(actor, &[Role::Admin, Role::Manager, Role::Staff], ctx)
    }

    /// Require `resource[owner_field]` to equal the actor id. Admins bypass.
    pub fn require_ownership(
        &self,
        actor: Option<&User>,
        resource: &JsonValue,
        owner_field: &str,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        let actor = self.authenticate(actor, "ownership", ctx)?;
        let owner = resource.get(owner_field).cloned().unwrap_or(JsonValue::Null);

        let decision = if !actor.is_active {
            AccessDecision::deny(DenyReason::Inactive)
        } else if actor.role == Role::Admin || field_equals(&owner, &actor.id) {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(DenyReason::NotOwner)
        };

        let mut details = AuditDetails::new();
        details.insert("owner_field".to_string(), owner_field.into());
        details.insert("resource_owner".to_string(), owner);
        details.insert("actor_id".to_string(), actor.id.clone().into());
        self.settle(actor, decision, "ownership", details, ctx)
    }

    /// Require `resource[department_field]` to equal the actor's department.
    /// Admins and managers bypass.
    pub fn require_department_access(
        &self,
        actor: Option<&User>,
        resource: &JsonValue,
        department_field: &str,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        let actor = self.authenticate(actor, "department", ctx)?;
        let department = resource
            .get(department_field)
            .cloned()
            .unwrap_or(JsonValue::Null);

        let decision = if !actor.is_active {
            AccessDecision::deny(DenyReason::Inactive)
        } else if matches!(actor.role, Role::Admin | Role::Manager) {
            AccessDecision::allow()
        } else {
            match actor.department.as_deref() {
                Some(own) if field_equals(&department, own) => AccessDecision::allow(),
                _ => AccessDecision::deny(DenyReason::DepartmentMismatch),
            }
        };

        let mut details = AuditDetails::new();
        details.insert("department_field".to_string(), department_field.into());
        details.insert("resource_department".to_string(), department);
        details.insert("actor_department".to_string(), json!(actor.department));
        self.settle(actor, decision, "department", details, ctx)
    }

    fn authenticate<'a>(
        &self,
        actor: Option<&'a User>,
        gate: &'static str,
        ctx: &GateContext,
    ) -> Result<&'a User, GateError> {
        match actor {
            Some(actor) => Ok(actor),
            None => {
                if self.options.log_anonymous_attempts {
                    let mut entry = ctx.entry(AuditAction::UnauthenticatedAccess).detail("gate", gate);
                    if let Some(action) = ctx.action {
                        entry = entry.detail("intended_action", action.as_str());
                    }
                    self.audit.append(entry.failed("authentication required"));
                } else {
                    debug!(gate, "Rejected unauthenticated call");
                }
                Err(GateError::Unauthenticated)
            },
        }
    }

    fn settle(
        &self,
        actor: &User,
        decision: AccessDecision,
        gate: &'static str,
        subject: AuditDetails,
        ctx: &GateContext,
    ) -> Result<Proceed, GateError> {
        if decision.allowed {
            let action = ctx.action.unwrap_or(AuditAction::AccessGranted);
            let entry = self.audit.append(
                ctx.entry(action)
                    .actor(actor)
                    .level(AuditLevel::Info)
                    .details(subject)
                    .detail("gate", gate),
            );
            debug!(user_id = %actor.id, gate, action = %action, "Access granted");
            return Ok(Proceed { audit_id: entry.id });
        }

        let reason = decision.reason.unwrap_or(DenyReason::RoleLacksPermission);
        let mut entry = ctx
            .entry(AuditAction::SecurityViolation)
            .actor(actor)
            .level(AuditLevel::Critical)
            .details(subject)
            .detail("reason", reason.as_str())
            .detail("gate", gate);
        if let Some(action) = ctx.action {
            entry = entry.detail("intended_action", action.as_str());
        }
        let entry = self.audit.append(entry.failed(reason.as_str()));

        warn!(
            user_id = %actor.id,
            role = %actor.role,
            gate,
            reason = %reason,
            audit_id = %entry.id,
            "Access denied"
        );

        Err(GateError::Denied {
            reason,
            role: Some(actor.role),
            audit_id: entry.id,
        })
    }
}

fn subject(key: &str, value: impl Into<JsonValue>) -> AuditDetails {
    let mut details = AuditDetails::new();
    details.insert(key.to_string(), value.into());
    details
}

// Owner ids may be stored as strings or numbers.
fn field_equals(value: &JsonValue, expected: &str) -> bool {
    match value {
        JsonValue::String(s) => s == expected,
        JsonValue::Number(n) => n.to_string() == expected,
        _ => false,
    }
}
