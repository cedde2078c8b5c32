use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use wishlist_types::UserId;

use crate::config::TokenEntry;
use crate::error::{ServerError, ServerResult};

/// Who is behind a request. Anonymous callers may still claim as guests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<UserId>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn user(id: UserId) -> Self {
        Self { user: Some(id) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read an `Authorization: Bearer <token>` header. Anything else is anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map_or(Self::Anonymous, |token| Self::Bearer(token.to_string()))
    }
}

/// Resolves request credentials to an account. Accounts, passwords and
/// federated login live outside this service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Fixed token table loaded from configuration.
pub struct StaticTokenAuth {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenAuth {
    pub fn new(entries: &[TokenEntry]) -> Self {
        Self {
            tokens: entries
                .iter()
                .map(|e| (e.token.clone(), e.user_id))
                .collect(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => self
                .tokens
                .get(token)
                .map(|user| Identity::user(*user))
                .ok_or(ServerError::InvalidCredentials),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }
}
