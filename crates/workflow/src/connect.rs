use brokerlink_core::*;
use std::fmt;
use tracing::{debug, info, warn};

use crate::context::{require_identity, WorkflowContext};
use crate::poll::poll_until;

/// Phases of a connect call, used for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPhase {
    NoLink,
    Linking,
    AwaitingDeploy,
    Connected,
    DeployPending,
}

impl fmt::Display for ConnectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectPhase::NoLink => "no_link",
            ConnectPhase::Linking => "linking",
            ConnectPhase::AwaitingDeploy => "awaiting_deploy",
            ConnectPhase::Connected => "connected",
            ConnectPhase::DeployPending => "deploy_pending",
        };
        f.write_str(s)
    }
}

/// How a successful connect call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The stored link already points at a live upstream account.
    AlreadyLinked { deployed: bool },
    /// A new account was created and reported deployed within the polling budget.
    Connected,
    /// A new account was created but is still deploying.
    DeployPending,
}

impl ConnectOutcome {
    pub fn deployed(&self) -> bool {
        match self {
            ConnectOutcome::AlreadyLinked { deployed } => *deployed,
            ConnectOutcome::Connected => true,
            ConnectOutcome::DeployPending => false,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ConnectOutcome::AlreadyLinked { .. } => "Broker account already connected.",
            ConnectOutcome::Connected => "Broker account connected successfully.",
            ConnectOutcome::DeployPending => {
                "Broker account linked. Deployment is still in progress; check back in a minute."
            }
        }
    }
}

impl From<ConnectOutcome> for ConnectResponse {
    fn from(outcome: ConnectOutcome) -> Self {
        ConnectResponse {
            success: true,
            deployed: outcome.deployed(),
            message: outcome.message().to_string(),
        }
    }
}

/// Link the caller's broker account upstream and wait for it to deploy.
///
/// Reuses the stored account when it still exists upstream. Once a new account
/// has been created the call always succeeds, deployed or not.
pub async fn connect(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
    request: ConnectRequest,
) -> Result<ConnectResponse, RelayError> {
    let caller = require_identity(caller)?;
    let credentials = validate(request)?;
    let user_id = caller.user_id.as_str();

    let link = ctx.store.get(user_id).await?;
    match link.as_ref().and_then(|l| l.active_account_id()) {
        Some(account_id) => {
            if let Some(account) = verify_existing(ctx, account_id).await {
                info!(user_id = %user_id, account_id = %account_id, "Reusing linked broker account");
                return Ok(ConnectOutcome::AlreadyLinked {
                    deployed: account.is_deployed(),
                }
                .into());
            }
            info!(
                user_id = %user_id,
                account_id = %account_id,
                "Linked account is gone upstream, provisioning a new one"
            );
        }
        None => debug!(user_id = %user_id, phase = %ConnectPhase::NoLink, "No linked account"),
    }

    debug!(user_id = %user_id, phase = %ConnectPhase::Linking, "Creating upstream account");
    let created = match ctx.upstream.create_account(&credentials).await {
        Ok(created) => created,
        Err(e) if is_already_exists(&e) => {
            warn!(user_id = %user_id, error = %e, "Broker account already registered upstream");
            return Err(RelayError::AlreadyExists(
                "This broker account is already registered. Please contact support.".to_string(),
            ));
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Account provisioning failed");
            return Err(e.into_internal());
        }
    };

    let now = ctx.clock.now();
    // The account exists upstream from here on, so a failed write must not fail the call.
    if let Err(e) = ctx
        .store
        .upsert(
            user_id,
            &LinkUpdate {
                account_id: Some(created.id.clone()),
                server: Some(credentials.server.clone()),
                login: Some(credentials.login.clone()),
                platform: Some(credentials.platform.clone()),
                email: caller.email.clone(),
                connected_at: Some(now),
                updated_at: Some(now),
            },
        )
        .await
    {
        warn!(user_id = %user_id, account_id = %created.id, error = %e, "Failed to persist broker link");
    }

    debug!(user_id = %user_id, account_id = %created.id, phase = %ConnectPhase::AwaitingDeploy, "Waiting for deployment");
    let outcome = if await_deployment(ctx, &created.id).await {
        ConnectOutcome::Connected
    } else {
        ConnectOutcome::DeployPending
    };

    let phase = if outcome.deployed() {
        ConnectPhase::Connected
    } else {
        ConnectPhase::DeployPending
    };
    info!(user_id = %user_id, account_id = %created.id, phase = %phase, "Broker account linked");

    Ok(outcome.into())
}

fn validate(request: ConnectRequest) -> Result<BrokerCredentials, RelayError> {
    let server = request.broker_server.trim();
    let login = request.mt_login.trim();
    if server.is_empty() || login.is_empty() || request.mt_password.is_empty() {
        return Err(RelayError::InvalidArgument(
            "brokerServer, mtLogin and mtPassword are required".to_string(),
        ));
    }

    let platform = request
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PLATFORM)
        .to_ascii_lowercase();

    Ok(BrokerCredentials {
        server: server.to_string(),
        login: login.to_string(),
        password: request.mt_password,
        platform,
    })
}

fn is_already_exists(error: &RelayError) -> bool {
    match error {
        RelayError::AlreadyExists(_) => true,
        RelayError::Upstream { status, message } => {
            *status == 409 || message.to_ascii_lowercase().contains("already exists")
        }
        _ => false,
    }
}

fn is_transient(error: &RelayError) -> bool {
    match error {
        RelayError::Transport(_) | RelayError::StillProcessing => true,
        RelayError::Upstream { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

/// Look up a previously linked account with single-attempt calls.
///
/// Any definitive rejection (404, or another 4xx apart from 429) means the
/// account is gone. Transient failures are re-checked a few times before
/// giving up on it.
async fn verify_existing(ctx: &WorkflowContext, account_id: &str) -> Option<ProvisionedAccount> {
    let attempts = ctx.verify_poll.max_attempts.max(1);
    for attempt in 1..=attempts {
        match ctx.upstream.get_account(account_id, 1).await {
            Ok(account) => return Some(account),
            Err(e) if is_transient(&e) && attempt < attempts => {
                debug!(account_id = %account_id, attempt = attempt, error = %e, "Transient lookup failure");
                ctx.sleeper.sleep(ctx.verify_poll.interval).await;
            }
            Err(e) => {
                debug!(account_id = %account_id, error = %e, "Linked account lookup failed");
                return None;
            }
        }
    }
    None
}

/// Poll until the account is deployed or connected. Lookup failures count as "not yet".
async fn await_deployment(ctx: &WorkflowContext, account_id: &str) -> bool {
    let hit = poll_until(ctx.deploy_poll, ctx.sleeper.as_ref(), move |attempt| async move {
        match ctx.upstream.get_account(account_id, 1).await {
            Ok(account) => account.is_deployed(),
            Err(e) => {
                debug!(account_id = %account_id, attempt = attempt, error = %e, "Deployment poll failed");
                false
            }
        }
    })
    .await;
    hit.is_some()
}
