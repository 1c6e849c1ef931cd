//! Request extractors for the actor and its origin
//!
//! The session layer in front of this service authenticates the caller and
//! forwards the resolved identity as `x-user-*` headers.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::net::SocketAddr;

use crate::error::AppError;
use crate::rbac::{Role, User};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_ACTIVE_HEADER: &str = "x-user-active";
pub const USER_DEPARTMENT_HEADER: &str = "x-user-department";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// The resolved actor, or `None` when the request carries no identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentActor(pub Option<User>);

impl CurrentActor {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Client address and user agent of the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the actor from identity headers.
///
/// A request without `x-user-id` is anonymous. A present id with a missing
/// or unknown role is malformed.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let Some(id) = header_str(headers, USER_ID_HEADER) else {
        return Ok(None);
    };

    let role: Role = header_str(headers, USER_ROLE_HEADER)
        .ok_or_else(|| AppError::BadRequest(format!("missing {} header", USER_ROLE_HEADER)))?
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{}", e)))?;

    let is_active = match header_str(headers, USER_ACTIVE_HEADER) {
        None => true,
        Some(raw) => raw.parse::<bool>().map_err(|_| {
            AppError::BadRequest(format!("invalid {} header: {}", USER_ACTIVE_HEADER, raw))
        })?,
    };

    let mut user = User::new(id, header_str(headers, USER_EMAIL_HEADER).unwrap_or_default(), role);
    user.is_active = is_active;
    user.department = header_str(headers, USER_DEPARTMENT_HEADER).map(str::to_string);

    Ok(Some(user))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(CurrentActor)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // First hop of x-forwarded-for wins over the socket peer
        let forwarded = header_str(&parts.headers, FORWARDED_FOR_HEADER)
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        });

        let user_agent = header_str(&parts.headers, header::USER_AGENT.as_str()).map(str::to_string);

        Ok(RequestOrigin {
            ip_address,
            user_agent,
        })
    }
}
