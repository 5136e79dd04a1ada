use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use brokerlink_core::{CallerIdentity, IdentityVerifier, RelayError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

/// One accepted bearer token and the identity it stands for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

/// Verifies bearer tokens against a fixed table.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    identities: HashMap<String, CallerIdentity>,
}

impl StaticTokenVerifier {
    pub fn new(entries: &[TokenEntry]) -> Self {
        let identities = entries
            .iter()
            .map(|e| {
                (
                    e.token.clone(),
                    CallerIdentity {
                        user_id: e.user_id.clone(),
                        email: e.email.clone(),
                    },
                )
            })
            .collect();
        Self { identities }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Option<CallerIdentity> {
        self.identities.get(token).cloned()
    }
}

/// The verified caller of a request, if the bearer token checked out.
pub struct Caller(pub Option<CallerIdentity>);

impl Caller {
    pub fn require(self) -> Result<CallerIdentity, RelayError> {
        self.0.ok_or(RelayError::Unauthenticated)
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok();
        let identity = match bearer {
            Some(TypedHeader(Authorization(bearer))) => state.verifier.verify(bearer.token()).await,
            None => None,
        };
        Ok(Caller(identity))
    }
}
