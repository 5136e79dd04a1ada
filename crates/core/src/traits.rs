use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Relay Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the relay, each with a short machine-readable kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Upstream is still processing the request")]
    StillProcessing,
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Unauthenticated => "unauthenticated",
            RelayError::InvalidArgument(_) => "invalid-argument",
            RelayError::NotFound(_) => "not-found",
            RelayError::AlreadyExists(_) => "already-exists",
            RelayError::StillProcessing => "still-processing",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Transport(_) => "transport",
            RelayError::Internal(_) => "internal",
        }
    }

    /// The upstream HTTP status, when the failure came from an upstream response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RelayError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Collapse any failure into a generic internal error that keeps its message.
    pub fn into_internal(self) -> Self {
        match self {
            RelayError::Internal(_) => self,
            other => RelayError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for RelayError {
    fn from(e: StoreError) -> Self {
        RelayError::Internal(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Upstream API Trait
// ---------------------------------------------------------------------------

/// The external provisioning / trading-session / statistics service.
///
/// Data endpoints return the upstream JSON untouched; shape interpretation
/// belongs to the caller.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Register a broker account (provisioning).
    async fn create_account(&self, credentials: &BrokerCredentials)
        -> Result<CreatedAccount, RelayError>;

    /// Look up an account (provisioning) with at most `max_attempts` tries.
    async fn get_account(
        &self,
        account_id: &str,
        max_attempts: u32,
    ) -> Result<ProvisionedAccount, RelayError>;

    /// Remove an account (provisioning).
    async fn delete_account(&self, account_id: &str) -> Result<(), RelayError>;

    /// Switch on the statistics feature for an account (provisioning).
    async fn enable_statistics(&self, account_id: &str) -> Result<(), RelayError>;

    /// Current balance/equity snapshot (trading session).
    async fn account_information(&self, account_id: &str) -> Result<Value, RelayError>;

    /// Deals executed within `range` (trading session).
    async fn history_deals(&self, account_id: &str, range: DateRange)
        -> Result<Value, RelayError>;

    /// Performance metrics (statistics).
    async fn metrics(&self, account_id: &str) -> Result<Value, RelayError>;

    /// Closed trades within `range` (statistics).
    async fn historical_trades(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<Value, RelayError>;

    /// Day-by-day growth series (statistics).
    async fn daily_growth(&self, account_id: &str) -> Result<Value, RelayError>;
}

// ---------------------------------------------------------------------------
// Link Store Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while reading or writing user links.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Per-user link storage, keyed by the caller's user id.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Fetch the user's link, if one was ever written.
    async fn get(&self, user_id: &str) -> Result<Option<UserBrokerLink>, StoreError>;

    /// Merge `update` into the user's record, creating it if missing.
    async fn upsert(&self, user_id: &str, update: &LinkUpdate) -> Result<(), StoreError>;

    /// Remove the account fields from an existing record and stamp `at`.
    /// A missing record is left missing.
    async fn clear_account(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Suspends the current task; swapped for a recorder in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Maps a presented credential to a verified caller.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// `None` when the credential is unknown or invalid.
    async fn verify(&self, token: &str) -> Option<CallerIdentity>;
}
