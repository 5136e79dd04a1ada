use brokerlink_core::*;
use std::sync::Arc;

use crate::poll::PollPolicy;

/// Default trade-history window when the caller gives no bounds.
pub const DEFAULT_HISTORY_DAYS: i64 = 365;

/// Everything an operation needs, built once at startup and shared by reference.
#[derive(Clone)]
pub struct WorkflowContext {
    pub upstream: Arc<dyn UpstreamApi>,
    pub store: Arc<dyn LinkStore>,
    pub sleeper: Arc<dyn Sleeper>,
    pub clock: Arc<dyn Clock>,
    pub deploy_poll: PollPolicy,
    pub verify_poll: PollPolicy,
    pub history_days: i64,
}

impl WorkflowContext {
    pub fn new(upstream: Arc<dyn UpstreamApi>, store: Arc<dyn LinkStore>) -> Self {
        Self {
            upstream,
            store,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
            deploy_poll: PollPolicy::DEPLOYMENT,
            verify_poll: PollPolicy::VERIFY_EXISTING,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The linked account id for `caller`, or `NotFound` when there is none.
    pub(crate) async fn linked_account(&self, caller: &CallerIdentity) -> Result<String, RelayError> {
        let link = self.store.get(&caller.user_id).await?;
        link.as_ref()
            .and_then(|l| l.active_account_id())
            .map(str::to_string)
            .ok_or_else(|| RelayError::NotFound("No broker account connected".to_string()))
    }
}

/// Reject calls that arrive without a verified identity.
pub(crate) fn require_identity(caller: Option<&CallerIdentity>) -> Result<&CallerIdentity, RelayError> {
    caller
        .filter(|c| !c.user_id.is_empty())
        .ok_or(RelayError::Unauthenticated)
}

/// Map an unrecovered upstream failure to what the caller sees.
///
/// Upstream and transport failures become a generic internal error that keeps
/// the upstream message; every other kind passes through.
pub(crate) fn surface(error: RelayError) -> RelayError {
    match error {
        RelayError::Upstream { .. } | RelayError::Transport(_) => error.into_internal(),
        other => other,
    }
}
