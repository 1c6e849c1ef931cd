//! Audit export formats

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

use super::models::{AuditEntry, AuditQuery};
use super::store::AuditLogger;
use crate::error::{ServerError, ServerResult};

/// Prefix of the per-key detail columns in CSV exports
pub const DETAIL_COLUMN_PREFIX: &str = "detail.";

const CSV_COLUMNS: [&str; 14] = [
    "id",
    "sequence",
    "timestamp",
    "user_id",
    "user_email",
    "user_role",
    "action",
    "level",
    "resource_type",
    "resource_id",
    "ip_address",
    "user_agent",
    "success",
    "error_message",
];

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    /// Attachment filename stamped with the export time
    pub fn default_filename(&self) -> String {
        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        format!("audit-logs-{}.{}", timestamp, self.as_str())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ServerError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl AuditLogger {
    /// Filtered result set as a pretty-printed JSON array
    pub fn export_json(&self, query: &AuditQuery) -> ServerResult<String> {
        entries_to_json(&self.query(query))
    }

    /// Filtered result set as RFC 4180 CSV with a header row
    pub fn export_csv(&self, query: &AuditQuery) -> ServerResult<String> {
        entries_to_csv(&self.query(query))
    }

    pub fn export(&self, format: ExportFormat, query: &AuditQuery) -> ServerResult<String> {
        match format {
            ExportFormat::Json => self.export_json(query),
            ExportFormat::Csv => self.export_csv(query),
        }
    }
}

pub fn entries_to_json(entries: &[AuditEntry]) -> ServerResult<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

pub fn entries_to_csv(entries: &[AuditEntry]) -> ServerResult<String> {
    let detail_keys: BTreeSet<&str> = entries
        .iter()
        .flat_map(|entry| entry.details.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = CSV_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(detail_keys.iter().map(|key| format!("{DETAIL_COLUMN_PREFIX}{key}")));
    writer.write_record(header)?;

    for entry in entries {
        let mut record = vec![
            entry.id.to_string(),
            entry.sequence.to_string(),
            entry.timestamp.to_rfc3339(),
            entry.user_id.clone(),
            entry.user_email.clone(),
            optional(entry.user_role.map(|role| role.as_str())),
            entry.action.as_str().to_string(),
            entry.level.as_str().to_string(),
            optional(entry.resource_type.map(|rt| rt.as_str())),
            optional(entry.resource_id.as_deref()),
            optional(entry.ip_address.as_deref()),
            optional(entry.user_agent.as_deref()),
            entry.success.to_string(),
            optional(entry.error_message.as_deref()),
        ];
        record.extend(
            detail_keys
                .iter()
                .map(|key| entry.details.get(*key).map(detail_cell).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| ServerError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn optional(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_default()
}

// Strings are written verbatim, everything else as compact JSON.
fn detail_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
