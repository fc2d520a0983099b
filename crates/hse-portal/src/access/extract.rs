use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use super::{resolve_role, AccessError, Caller};
use crate::directory::DirectoryRepository;

/// Request header naming the acting identity. Session handling lives in front of the portal.
pub const CALLER_HEADER: &str = "x-portal-user";

/// Resolves usernames into [`Caller`] contexts; installed as a request extension.
#[derive(Clone)]
pub struct CallerResolver {
    directory: Arc<dyn DirectoryRepository>,
}

impl CallerResolver {
    pub fn new(directory: Arc<dyn DirectoryRepository>) -> Self {
        Self { directory }
    }

    pub fn resolve(&self, username: &str) -> Result<Caller, AccessError> {
        let identity = self
            .directory
            .identity_by_username(username)
            .map_err(|err| AccessError::Lookup(err.to_string()))?
            .ok_or(AccessError::Unauthenticated)?;

        let employee = self
            .directory
            .employee_for_identity(identity.id)
            .map_err(|err| AccessError::Lookup(err.to_string()))?
            .map(|employee| employee.id);

        Ok(Caller {
            identity: identity.id,
            role: resolve_role(&identity),
            username: identity.username,
            employee,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AccessError::Unauthenticated)?;

        let Some(resolver) = parts.extensions.get::<CallerResolver>() else {
            warn!("caller resolver extension missing; rejecting request");
            return Err(AccessError::Lookup("caller resolver not installed".to_string()));
        };

        resolver.resolve(username)
    }
}
