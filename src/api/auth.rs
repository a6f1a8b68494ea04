//! Caller identity as asserted by the fronting gateway.
//!
//! Authentication happens upstream; this service only reads the resulting
//! `X-User-Id` and `X-User-Role` headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::response::ApiError;
use crate::projection::{Caller, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        let id = header_value(parts, USER_ID_HEADER);
        let role = header_value(parts, USER_ROLE_HEADER)
            .map(|r| Role::parse(&r))
            .unwrap_or_default();
        Ok(Caller::new(id, role))
    }
}

impl Caller {
    /// The caller's id, or 401.
    pub fn require_id(&self) -> Result<&str, ApiError> {
        self.id
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Caller identity is required"))
    }

    /// The caller's id if they are an administrator; 401 or 403 otherwise.
    pub fn require_admin(&self) -> Result<&str, ApiError> {
        let id = self.require_id()?;
        if self.role != Role::Admin {
            return Err(ApiError::forbidden("Administrator role is required"));
        }
        Ok(id)
    }
}
