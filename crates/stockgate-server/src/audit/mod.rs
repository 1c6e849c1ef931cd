//! Audit logging
//!
//! Append-only, bounded, in-memory record of gate decisions and business
//! actions. One [`AuditLogger`] is built at startup and shared by `Arc`
//! between the security gate, the HTTP routes and the prune task.
//!
//! - **Append**: never fails; evicts the oldest entries past capacity
//! - **Query**: newest first, AND-combined filters, offset/limit paging
//! - **Prune**: age-based, entries exactly at the cutoff are kept
//! - **Export**: JSON array or RFC 4180 CSV of a filtered result set

pub mod export;
pub mod models;
pub mod store;

pub use export::{entries_to_csv, entries_to_json, ExportFormat, DETAIL_COLUMN_PREFIX};
pub use models::{
    AuditAction, AuditDetails, AuditEntry, AuditLevel, AuditQuery, NewAuditEntry, ResourceType,
    ANONYMOUS_ACTOR, DEFAULT_AUDIT_CAPACITY, DEFAULT_AUDIT_QUERY_LIMIT, DEFAULT_RETENTION_DAYS,
    MAX_AUDIT_QUERY_LIMIT,
};
pub use store::{describe_metrics, AuditLogger, AuditStats, LevelCounts};
