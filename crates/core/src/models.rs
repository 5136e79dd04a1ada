use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Platform tag used when the caller does not supply one.
pub const DEFAULT_PLATFORM: &str = "mt5";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A caller whose identity has already been verified by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

// ---------------------------------------------------------------------------
// User ↔ broker account link
// ---------------------------------------------------------------------------

/// The persisted mapping between an end user and their provisioned broker account.
///
/// Presence of `account_id` is the only signal of "connected". Disconnecting
/// clears the account fields but keeps the record (and its timestamps).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBrokerLink {
    pub user_id: String,
    /// Opaque account handle issued by the upstream service.
    pub account_id: Option<String>,
    pub server: Option<String>,
    pub login: Option<String>,
    pub platform: Option<String>,
    pub email: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl UserBrokerLink {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// The linked account id, if the user is currently connected.
    pub fn active_account_id(&self) -> Option<&str> {
        self.account_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_connected(&self) -> bool {
        self.active_account_id().is_some()
    }

    /// Merge an update into this record. `None` fields leave existing values untouched.
    pub fn apply(&mut self, update: &LinkUpdate) {
        if let Some(v) = &update.account_id {
            self.account_id = Some(v.clone());
        }
        if let Some(v) = &update.server {
            self.server = Some(v.clone());
        }
        if let Some(v) = &update.login {
            self.login = Some(v.clone());
        }
        if let Some(v) = &update.platform {
            self.platform = Some(v.clone());
        }
        if let Some(v) = &update.email {
            self.email = Some(v.clone());
        }
        if let Some(v) = update.connected_at {
            self.connected_at = Some(v);
        }
        if let Some(v) = update.updated_at {
            self.updated_at = Some(v);
        }
    }

    /// Remove the account fields and stamp the disconnect time.
    pub fn clear_account(&mut self, at: DateTime<Utc>) {
        self.account_id = None;
        self.server = None;
        self.login = None;
        self.platform = None;
        self.disconnected_at = Some(at);
        self.updated_at = Some(at);
    }
}

/// Merge-upsert payload for a [`UserBrokerLink`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkUpdate {
    pub account_id: Option<String>,
    pub server: Option<String>,
    pub login: Option<String>,
    pub platform: Option<String>,
    pub email: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Upstream account
// ---------------------------------------------------------------------------

/// Credentials used to register a broker account upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    pub server: String,
    pub login: String,
    pub password: String,
    pub platform: String,
}

impl BrokerCredentials {
    /// Deterministic upstream account name for this login.
    pub fn account_name(&self) -> String {
        format!("{}-{}", self.platform, self.login)
    }
}

/// Lifecycle state of an account registered with the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountLifecycle {
    Created,
    Deploying,
    Deployed,
    DeployFailed,
    Undeploying,
    Undeployed,
    UndeployFailed,
    Deleting,
    Other(String),
}

impl From<String> for AccountLifecycle {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CREATED" => Self::Created,
            "DEPLOYING" => Self::Deploying,
            "DEPLOYED" => Self::Deployed,
            "DEPLOY_FAILED" => Self::DeployFailed,
            "UNDEPLOYING" => Self::Undeploying,
            "UNDEPLOYED" => Self::Undeployed,
            "UNDEPLOY_FAILED" => Self::UndeployFailed,
            "DELETING" => Self::Deleting,
            _ => Self::Other(raw),
        }
    }
}

impl From<AccountLifecycle> for String {
    fn from(state: AccountLifecycle) -> Self {
        match state {
            AccountLifecycle::Created => "CREATED".to_string(),
            AccountLifecycle::Deploying => "DEPLOYING".to_string(),
            AccountLifecycle::Deployed => "DEPLOYED".to_string(),
            AccountLifecycle::DeployFailed => "DEPLOY_FAILED".to_string(),
            AccountLifecycle::Undeploying => "UNDEPLOYING".to_string(),
            AccountLifecycle::Undeployed => "UNDEPLOYED".to_string(),
            AccountLifecycle::UndeployFailed => "UNDEPLOY_FAILED".to_string(),
            AccountLifecycle::Deleting => "DELETING".to_string(),
            AccountLifecycle::Other(raw) => raw,
        }
    }
}

/// Connection status between the upstream service and the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    DisconnectedFromBroker,
    Other(String),
}

impl From<String> for ConnectionStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CONNECTED" => Self::Connected,
            "DISCONNECTED" => Self::Disconnected,
            "DISCONNECTED_FROM_BROKER" => Self::DisconnectedFromBroker,
            _ => Self::Other(raw),
        }
    }
}

impl From<ConnectionStatus> for String {
    fn from(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => "CONNECTED".to_string(),
            ConnectionStatus::Disconnected => "DISCONNECTED".to_string(),
            ConnectionStatus::DisconnectedFromBroker => "DISCONNECTED_FROM_BROKER".to_string(),
            ConnectionStatus::Other(raw) => raw,
        }
    }
}

/// An account as reported by the upstream provisioning API.
///
/// Never persisted; polled whenever its state matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedAccount {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<AccountLifecycle>,
    #[serde(default)]
    pub connection_status: Option<ConnectionStatus>,
}

impl ProvisionedAccount {
    /// Usable for trading-session calls: deployed, or already connected to the broker.
    pub fn is_deployed(&self) -> bool {
        matches!(self.state, Some(AccountLifecycle::Deployed))
            || matches!(self.connection_status, Some(ConnectionStatus::Connected))
    }
}

/// Result of a successful create-account call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAccount {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub state: Option<AccountLifecycle>,
}

// ---------------------------------------------------------------------------
// Time range
// ---------------------------------------------------------------------------

/// Inclusive time window for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// The `days` days leading up to `now`.
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            from: now - Duration::days(days),
            to: now,
        }
    }

    /// Fill in whichever bound the caller left out.
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        default_days: i64,
    ) -> Self {
        let fallback = Self::trailing_days(now, default_days);
        Self {
            from: from.unwrap_or(fallback.from),
            to: to.unwrap_or(fallback.to),
        }
    }
}
