//! HTTP routes over the audit log and the permission model

pub mod response;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::audit::{
    AuditAction, AuditEntry, AuditLogger, AuditQuery, AuditStats, ExportFormat, ResourceType,
    DEFAULT_RETENTION_DAYS, MAX_AUDIT_QUERY_LIMIT,
};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{
    cors_layer, tracing_layer, CurrentActor, GateContext, GateOptions, RequestOrigin, SecurityGate,
};
use crate::rbac::{can_access_page, user_permissions, AccessDecision, Action, Permission, Role};
use response::{ApiResponse, PaginationMeta};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub audit: Arc<AuditLogger>,
    pub gate: SecurityGate,
}

impl AppState {
    pub fn new(audit: Arc<AuditLogger>, options: GateOptions) -> Self {
        let gate = SecurityGate::with_options(audit.clone(), options);
        Self { audit, gate }
    }

    /// Build the logger and gate from configuration
    pub fn from_config(config: &Config) -> Self {
        let retention = config
            .audit
            .retention()
            .unwrap_or_else(|| Duration::days(DEFAULT_RETENTION_DAYS));
        let audit = Arc::new(AuditLogger::with_retention(config.audit.capacity, retention));
        Self::new(
            audit,
            GateOptions {
                log_anonymous_attempts: config.audit.log_anonymous_attempts,
            },
        )
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let api_v1 = Router::new()
        .route("/audit", get(list_audit_logs))
        .route("/audit/stats", get(audit_stats))
        .route("/audit/export", get(export_audit_logs))
        .route("/audit/prune", post(prune_audit_logs))
        .route("/access/permissions", get(my_permissions))
        .route("/access/pages/:page", get(page_access));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1)
        .with_state(state)
        .layer(tracing_layer())
        .layer(cors_layer(&config.cors))
}

fn origin_context(ctx: GateContext, origin: RequestOrigin) -> GateContext {
    ctx.origin(origin.ip_address, origin.user_agent)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "audit_entries": state.audit.len(),
        })),
    )
}

/// Query audit logs, newest first
async fn list_audit_logs(
    State(state): State<AppState>,
    actor: CurrentActor,
    origin: RequestOrigin,
    Query(mut query): Query<AuditQuery>,
) -> Result<ApiResponse<Vec<AuditEntry>>, AppError> {
    query.limit = query.limit.min(MAX_AUDIT_QUERY_LIMIT);

    let ctx = origin_context(
        GateContext::for_action(AuditAction::AuditLogsViewed)
            .resource_type(ResourceType::AuditLog)
            .detail("limit", query.limit)
            .detail("offset", query.offset),
        origin,
    );
    state
        .gate
        .authorize(actor.user(), Permission::ViewAuditLogs, &ctx)?;

    let total = state.audit.count_matching(&query);
    let entries = state.audit.query(&query);
    let meta = PaginationMeta::new(query.offset, query.limit, total);

    Ok(ApiResponse::success_with_meta(entries, json!(meta)))
}

async fn audit_stats(
    State(state): State<AppState>,
    actor: CurrentActor,
    origin: RequestOrigin,
) -> Result<ApiResponse<AuditStats>, AppError> {
    let ctx = origin_context(GateContext::new().resource_type(ResourceType::AuditLog), origin);
    state
        .gate
        .authorize(actor.user(), Permission::ViewAuditLogs, &ctx)?;

    Ok(ApiResponse::success(state.audit.stats()))
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    format: Option<String>,
}

/// Download the filtered audit log as JSON or CSV
async fn export_audit_logs(
    State(state): State<AppState>,
    actor: CurrentActor,
    origin: RequestOrigin,
    Query(params): Query<ExportParams>,
    Query(mut query): Query<AuditQuery>,
) -> Result<Response, AppError> {
    query.limit = query.limit.min(MAX_AUDIT_QUERY_LIMIT);
    let requested = params.format.unwrap_or_else(|| ExportFormat::Csv.to_string());

    let ctx = origin_context(
        GateContext::for_action(AuditAction::AuditLogsExported)
            .resource_type(ResourceType::AuditLog)
            .detail("format", requested.as_str()),
        origin,
    );
    state
        .gate
        .authorize_action(actor.user(), Action::ExportAuditLogs.as_str(), &ctx)?;

    let format: ExportFormat = requested.parse()?;
    let body = state.audit.export(format, &query)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.default_filename()),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct PruneParams {
    older_than_days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct PruneResult {
    older_than_days: i64,
    removed: usize,
    remaining: usize,
}

/// Remove entries older than the given horizon (defaults to the retention)
async fn prune_audit_logs(
    State(state): State<AppState>,
    actor: CurrentActor,
    origin: RequestOrigin,
    Query(params): Query<PruneParams>,
) -> Result<ApiResponse<PruneResult>, AppError> {
    let days = params
        .older_than_days
        .unwrap_or_else(|| state.audit.retention().num_days());

    let ctx = origin_context(
        GateContext::for_action(AuditAction::AuditLogsPruned)
            .resource_type(ResourceType::AuditLog)
            .detail("older_than_days", days),
        origin,
    );
    state.gate.require_admin(actor.user(), &ctx)?;

    if days < 1 {
        return Err(AppError::BadRequest(
            "older_than_days must be at least 1".to_string(),
        ));
    }
    let horizon = Duration::try_days(days).ok_or_else(|| {
        AppError::BadRequest(format!("older_than_days is out of range: {}", days))
    })?;

    let removed = state.audit.prune_older_than(horizon);
    info!(removed, older_than_days = days, "Audit log pruned on request");

    Ok(ApiResponse::success(PruneResult {
        older_than_days: days,
        removed,
        remaining: state.audit.len(),
    }))
}

#[derive(Debug, Serialize)]
struct PermissionSummary {
    user_id: String,
    role: Role,
    is_active: bool,
    permissions: Vec<Permission>,
}

/// Effective permissions of the calling actor
async fn my_permissions(actor: CurrentActor) -> Result<ApiResponse<PermissionSummary>, AppError> {
    let user = actor.0.ok_or(AppError::Unauthenticated)?;

    let mut permissions: Vec<Permission> = user_permissions(&user).into_iter().collect();
    permissions.sort();

    Ok(ApiResponse::success(PermissionSummary {
        user_id: user.id,
        role: user.role,
        is_active: user.is_active,
        permissions,
    }))
}

#[derive(Debug, Serialize)]
struct PageAccess {
    page: String,
    #[serde(flatten)]
    decision: AccessDecision,
}

/// Navigation decision for a page key; unknown keys are open
async fn page_access(
    actor: CurrentActor,
    Path(page): Path<String>,
) -> Result<ApiResponse<PageAccess>, AppError> {
    let user = actor.0.ok_or(AppError::Unauthenticated)?;
    let decision = can_access_page(&user, &page);

    Ok(ApiResponse::success(PageAccess { page, decision }))
}
