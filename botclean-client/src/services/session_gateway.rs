//! Session and billing collaborator
//!
//! The host application owns sign-in and billing. The orchestrator only asks
//! it for a bearer token and, optionally, the current credit balance.

use crate::error::AuthError;
use crate::models::CreditInfo;
use async_trait::async_trait;

/// Credential and credit source consumed by the orchestrator
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Bearer token for one request
    ///
    /// # Returns
    /// * `Ok(Some(token))` - signed in
    /// * `Ok(None)` - not signed in; the run fails before any network call
    /// * `Err(AuthError::Gateway)` - the gateway itself failed
    async fn bearer_token(&self) -> Result<Option<String>, AuthError>;

    /// Current balance, `None` if unknown
    async fn credit_info(&self) -> Option<CreditInfo> {
        None
    }
}

/// Gateway with fixed answers
#[derive(Debug, Clone, Default)]
pub struct StaticGateway {
    token: Option<String>,
    credits: Option<CreditInfo>,
}

impl StaticGateway {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            credits: None,
        }
    }

    /// Gateway with no signed-in user
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_credits(mut self, credits: CreditInfo) -> Self {
        self.credits = Some(credits);
        self
    }
}

#[async_trait]
impl SessionGateway for StaticGateway {
    async fn bearer_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.token.clone().filter(|t| !t.trim().is_empty()))
    }

    async fn credit_info(&self) -> Option<CreditInfo> {
        self.credits.clone()
    }
}

/// Resolve a token or fail with `NotAuthenticated`
pub async fn require_token(gateway: &dyn SessionGateway) -> Result<String, AuthError> {
    gateway.bearer_token().await?.ok_or(AuthError::NotAuthenticated)
}
