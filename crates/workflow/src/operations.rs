use brokerlink_core::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::context::{require_identity, surface, WorkflowContext};
use crate::history::normalize_sequence;

/// Whether the caller has a linked account, and which one.
pub async fn status(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
) -> Result<StatusResponse, RelayError> {
    let caller = require_identity(caller)?;
    let link = ctx.store.get(&caller.user_id).await?;

    Ok(match link {
        Some(link) if link.is_connected() => StatusResponse {
            connected: true,
            server: link.server,
            login: link.login,
            platform: link.platform,
        },
        _ => StatusResponse::disconnected(),
    })
}

/// Live account snapshot from the trading session, passed through untouched.
pub async fn account_info(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
) -> Result<Value, RelayError> {
    let caller = require_identity(caller)?;
    let account_id = ctx.linked_account(caller).await?;
    ctx.upstream
        .account_information(&account_id)
        .await
        .map_err(surface)
}

/// Performance metrics.
///
/// A 403 means the statistics feature is off for this account: one enable
/// request is fired (its failure ignored) and an "enabling" status returned.
pub async fn metrics(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
) -> Result<MetricsResponse, RelayError> {
    let caller = require_identity(caller)?;
    let account_id = ctx.linked_account(caller).await?;

    match ctx.upstream.metrics(&account_id).await {
        Ok(mut body) => {
            let metrics = match body.get_mut("metrics").map(Value::take) {
                Some(inner) => inner,
                None => body,
            };
            Ok(MetricsResponse::available(metrics))
        }
        Err(e) if e.upstream_status() == Some(403) => {
            info!(account_id = %account_id, "Statistics disabled, requesting enablement");
            if let Err(enable_err) = ctx.upstream.enable_statistics(&account_id).await {
                warn!(account_id = %account_id, error = %enable_err, "Statistics enablement failed");
            }
            Ok(MetricsResponse::enabling())
        }
        Err(e) => Err(surface(e)),
    }
}

/// Daily growth series. Any upstream failure yields an empty series.
pub async fn daily_growth(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
) -> Result<DailyGrowthResponse, RelayError> {
    let caller = require_identity(caller)?;
    let account_id = ctx.linked_account(caller).await?;

    let data = match ctx.upstream.daily_growth(&account_id).await {
        Ok(body) => normalize_sequence(body, &["dailyGrowth", "data"]),
        Err(e) => {
            warn!(account_id = %account_id, error = %e, "Daily growth unavailable");
            Vec::new()
        }
    };
    Ok(DailyGrowthResponse { data })
}

/// Unlink the caller's account. Upstream removal is best effort; a caller
/// without a link gets success and no network traffic.
pub async fn disconnect(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
) -> Result<DisconnectResponse, RelayError> {
    let caller = require_identity(caller)?;
    let link = ctx.store.get(&caller.user_id).await?;

    let Some(account_id) = link.as_ref().and_then(|l| l.active_account_id()) else {
        return Ok(DisconnectResponse { success: true });
    };

    if let Err(e) = ctx.upstream.delete_account(account_id).await {
        warn!(account_id = %account_id, error = %e, "Upstream account removal failed");
    }
    ctx.store
        .clear_account(&caller.user_id, ctx.clock.now())
        .await?;
    info!(user_id = %caller.user_id, account_id = %account_id, "Broker account disconnected");

    Ok(DisconnectResponse { success: true })
}
