//! Permission model
//!
//! A static role → permission table plus the decision functions built on
//! it. Nothing in this module holds state or performs I/O; every function
//! can be called from any task without synchronization.
//!
//! # Example
//!
//! ```
//! use stockgate_server::rbac::{has_permission, Permission, Role, User};
//!
//! let staff = User::new("u-42", "sam@example.com", Role::Staff);
//! let decision = has_permission(&staff, Permission::ApproveBudgetRequests);
//! assert!(!decision.allowed);
//! assert_eq!(decision.reason.unwrap().as_str(), "role lacks permission");
//! ```

mod catalog;
mod models;
mod policy;

pub use catalog::{can_access, can_access_page, can_perform, can_perform_action, Action, Page};
pub use models::{Permission, RbacError, Role, User};
pub use policy::{
    has_all_permissions, has_any_permission, has_permission, permissions_for, role_permissions,
    user_permissions, AccessDecision, DenyReason,
};
