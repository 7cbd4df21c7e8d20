use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Set by the identity gateway in front of this service. Trusted as-is.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Some(Role::Customer),
            "provider" => Some(Role::Provider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated principal for the current request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The provider themself, or an admin acting for them.
    pub fn can_manage_provider(&self, provider_id: Uuid) -> bool {
        self.is_admin() || (self.role == Role::Provider && self.user_id == provider_id)
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers
            .get(USER_ID_HEADER)?
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())?;
        let role = headers
            .get(USER_ROLE_HEADER)?
            .to_str()
            .ok()
            .and_then(Role::parse)?;

        Some(Self { user_id, role })
    }
}

pub async fn require_auth(mut request: Request, next: Next) -> Result<Response, AppError> {
    let user = CurrentUser::from_headers(request.headers()).ok_or(AppError::Unauthorized)?;

    // Insert current user into request extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
