//! Bounded in-memory audit log
//!
//! Entries are kept newest-first in a `VecDeque`. Inserting past capacity
//! evicts from the tail. Sequence assignment and insertion happen under the
//! same write lock, so head-to-tail order is always descending sequence.

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{
    AuditAction, AuditEntry, AuditLevel, AuditQuery, NewAuditEntry, ResourceType,
    DEFAULT_AUDIT_CAPACITY, DEFAULT_RETENTION_DAYS,
};
use crate::rbac::{Role, User};

pub const ENTRIES_TOTAL_METRIC: &str = "audit_entries_total";
pub const ENTRIES_EVICTED_METRIC: &str = "audit_entries_evicted_total";
pub const ENTRIES_PRUNED_METRIC: &str = "audit_entries_pruned_total";

/// Register descriptions for the audit counters with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        ENTRIES_TOTAL_METRIC,
        "Total number of audit entries appended"
    );
    describe_counter!(
        ENTRIES_EVICTED_METRIC,
        "Audit entries dropped because the log was at capacity"
    );
    describe_counter!(
        ENTRIES_PRUNED_METRIC,
        "Audit entries removed by age-based pruning"
    );
}

struct AuditBuffer {
    entries: VecDeque<AuditEntry>,
    last_sequence: u64,
}

/// Process-wide audit log, shared behind an `Arc`
pub struct AuditLogger {
    capacity: usize,
    retention: Duration,
    buffer: RwLock<AuditBuffer>,
}

/// Per-level entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub critical: usize,
}

impl LevelCounts {
    fn bump(&mut self, level: AuditLevel) {
        match level {
            AuditLevel::Info => self.info += 1,
            AuditLevel::Warning => self.warning += 1,
            AuditLevel::Error => self.error += 1,
            AuditLevel::Critical => self.critical += 1,
        }
    }
}

/// Snapshot of the buffer contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub capacity: usize,
    pub by_level: LevelCounts,
    pub failures: usize,
    pub security_violations: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("capacity", &self.capacity)
            .field("retention", &self.retention)
            .field("len", &self.len())
            .finish()
    }
}

impl AuditLogger {
    /// Create a logger holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self::with_retention(capacity, Duration::days(DEFAULT_RETENTION_DAYS))
    }

    pub fn with_retention(capacity: usize, retention: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            retention,
            buffer: RwLock::new(AuditBuffer {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                last_sequence: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.buffer.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.read().entries.is_empty()
    }

    /// Record an entry. Never fails; evicts the oldest entries past capacity.
    pub fn append(&self, new_entry: NewAuditEntry) -> AuditEntry {
        self.insert(new_entry, Utc::now())
    }

    fn insert(&self, new_entry: NewAuditEntry, timestamp: DateTime<Utc>) -> AuditEntry {
        let (entry, evicted) = {
            let mut buffer = self.buffer.write();
            buffer.last_sequence += 1;
            let entry = new_entry.into_entry(Uuid::new_v4(), buffer.last_sequence, timestamp);
            buffer.entries.push_front(entry.clone());

            let mut evicted = 0u64;
            while buffer.entries.len() > self.capacity {
                buffer.entries.pop_back();
                evicted += 1;
            }
            (entry, evicted)
        };

        trace_entry(&entry);
        counter!(
            ENTRIES_TOTAL_METRIC,
            "action" => entry.action.as_str(),
            "level" => entry.level.as_str()
        )
        .increment(1);
        if evicted > 0 {
            counter!(ENTRIES_EVICTED_METRIC).increment(evicted);
        }

        entry
    }

    /// Matching entries, newest first, after offset and limit
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        let buffer = self.buffer.read();
        buffer
            .entries
            .iter()
            .filter(|entry| query.matches(entry))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect()
    }

    /// Number of entries matching the filter, ignoring pagination
    pub fn count_matching(&self, query: &AuditQuery) -> usize {
        let buffer = self.buffer.read();
        buffer.entries.iter().filter(|entry| query.matches(entry)).count()
    }

    pub fn recent_by_severity(&self, level: AuditLevel, limit: usize) -> Vec<AuditEntry> {
        self.query(&AuditQuery::new().level(level).limit(limit))
    }

    pub fn recent_by_actor(&self, user_id: &str, limit: usize) -> Vec<AuditEntry> {
        self.query(&AuditQuery::new().user(user_id).limit(limit))
    }

    pub fn recent_by_action(&self, action: AuditAction, limit: usize) -> Vec<AuditEntry> {
        self.query(&AuditQuery::new().action(action).limit(limit))
    }

    /// Remove entries with `timestamp < now - age`. Returns the number removed.
    ///
    /// A horizon reaching past the earliest representable time prunes nothing.
    pub fn prune_older_than(&self, age: Duration) -> usize {
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.prune_before(cutoff)
    }

    /// Remove entries strictly older than `cutoff`; entries at the cutoff stay
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> usize {
        let removed = {
            let mut buffer = self.buffer.write();
            let before = buffer.entries.len();
            buffer.entries.retain(|entry| entry.timestamp >= cutoff);
            before - buffer.entries.len()
        };

        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned audit entries");
            counter!(ENTRIES_PRUNED_METRIC).increment(removed as u64);
        } else {
            debug!(cutoff = %cutoff, "No audit entries to prune");
        }

        removed
    }

    /// Prune using the configured retention horizon
    pub fn prune_expired(&self) -> usize {
        self.prune_older_than(self.retention)
    }

    pub fn stats(&self) -> AuditStats {
        let buffer = self.buffer.read();
        let mut stats = AuditStats {
            total: buffer.entries.len(),
            capacity: self.capacity,
            by_level: LevelCounts::default(),
            failures: 0,
            security_violations: 0,
            oldest: None,
            newest: None,
        };

        for entry in &buffer.entries {
            stats.by_level.bump(entry.level);
            if !entry.success {
                stats.failures += 1;
            }
            if entry.action == AuditAction::SecurityViolation {
                stats.security_violations += 1;
            }
            stats.oldest = Some(stats.oldest.map_or(entry.timestamp, |t| t.min(entry.timestamp)));
            stats.newest = Some(stats.newest.map_or(entry.timestamp, |t| t.max(entry.timestamp)));
        }

        stats
    }

    // ------------------------------------------------------------------------
    // Convenience recorders
    // ------------------------------------------------------------------------

    pub fn log_login(&self, user: &User, ip_address: Option<String>) -> AuditEntry {
        self.append(
            NewAuditEntry::new(AuditAction::Login)
                .actor(user)
                .resource(ResourceType::Session, Some(user.id.clone()))
                .ip_address(ip_address),
        )
    }

    /// Failed sign-in. The account may not exist, so only the email is kept.
    pub fn log_login_failed(
        &self,
        email: &str,
        reason: &str,
        ip_address: Option<String>,
    ) -> AuditEntry {
        let mut entry = NewAuditEntry::new(AuditAction::LoginFailed)
            .resource(ResourceType::Session, None)
            .detail("email", email)
            .ip_address(ip_address)
            .failed(reason);
        entry.user_email = email.to_string();
        self.append(entry)
    }

    pub fn log_logout(&self, user: &User) -> AuditEntry {
        self.append(
            NewAuditEntry::new(AuditAction::Logout)
                .actor(user)
                .resource(ResourceType::Session, Some(user.id.clone())),
        )
    }

    /// Record `changed_by` moving `target` from `previous` to its current role
    pub fn log_user_role_changed(
        &self,
        changed_by: &User,
        target: &User,
        previous: Role,
    ) -> AuditEntry {
        self.append(
            NewAuditEntry::new(AuditAction::UserRoleChanged)
                .actor(changed_by)
                .resource(ResourceType::User, Some(target.id.clone()))
                .detail("previous_role", previous.as_str())
                .detail("new_role", target.role.as_str()),
        )
    }

    pub fn log_security_violation(&self, user: &User, description: &str) -> AuditEntry {
        self.append(
            NewAuditEntry::new(AuditAction::SecurityViolation)
                .actor(user)
                .detail("description", description)
                .failed(description),
        )
    }
}

fn trace_entry(entry: &AuditEntry) {
    match entry.level {
        AuditLevel::Info => info!(
            audit_id = %entry.id,
            sequence = entry.sequence,
            action = %entry.action,
            user_id = %entry.user_id,
            resource_type = ?entry.resource_type,
            resource_id = ?entry.resource_id,
            success = entry.success,
            "Audit"
        ),
        AuditLevel::Warning => warn!(
            audit_id = %entry.id,
            sequence = entry.sequence,
            action = %entry.action,
            user_id = %entry.user_id,
            resource_type = ?entry.resource_type,
            resource_id = ?entry.resource_id,
            success = entry.success,
            error = ?entry.error_message,
            "Audit"
        ),
        AuditLevel::Error | AuditLevel::Critical => error!(
            audit_id = %entry.id,
            sequence = entry.sequence,
            level = %entry.level,
            action = %entry.action,
            user_id = %entry.user_id,
            user_role = ?entry.user_role,
            resource_type = ?entry.resource_type,
            resource_id = ?entry.resource_id,
            ip = ?entry.ip_address,
            error = ?entry.error_message,
            "Audit"
        ),
    }
}
