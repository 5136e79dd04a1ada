use brokerlink_core::*;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{require_identity, surface, WorkflowContext};

/// Where trade history can come from, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSource {
    /// Statistics API closed trades.
    Statistics,
    /// Trading-session API history deals.
    TradingSession,
}

impl TradeSource {
    pub const FALLBACK_ORDER: [TradeSource; 2] = [TradeSource::Statistics, TradeSource::TradingSession];

    pub fn tag(&self) -> &'static str {
        match self {
            TradeSource::Statistics => SOURCE_METASTATS,
            TradeSource::TradingSession => "trading-session",
        }
    }

    /// The field wrapping the sequence when the source answers with an object.
    fn wrapper_field(&self) -> &'static str {
        match self {
            TradeSource::Statistics => "trades",
            TradeSource::TradingSession => "deals",
        }
    }

    async fn fetch(
        &self,
        upstream: &dyn UpstreamApi,
        account_id: &str,
        range: DateRange,
    ) -> Result<Value, RelayError> {
        match self {
            TradeSource::Statistics => upstream.historical_trades(account_id, range).await,
            TradeSource::TradingSession => upstream.history_deals(account_id, range).await,
        }
    }

    fn normalize(&self, value: Value) -> Vec<Value> {
        normalize_sequence(value, &[self.wrapper_field(), "trades", "deals"])
    }
}

/// Flatten either a raw array or an object carrying the array under one of `fields`.
pub(crate) fn normalize_sequence(value: Value, fields: &[&str]) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => fields
            .iter()
            .find_map(|f| match map.remove(*f) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Closed trades for the caller's linked account.
///
/// The range defaults to the trailing year. Sources are tried in
/// [`TradeSource::FALLBACK_ORDER`]; the next one is consulted only when the
/// previous call fails outright.
pub async fn trade_history(
    ctx: &WorkflowContext,
    caller: Option<&CallerIdentity>,
    request: TradeHistoryRequest,
) -> Result<TradeHistoryResponse, RelayError> {
    let caller = require_identity(caller)?;
    let account_id = ctx.linked_account(caller).await?;
    let range = DateRange::resolve(request.from, request.to, ctx.clock.now(), ctx.history_days);
    if range.from > range.to {
        return Err(RelayError::InvalidArgument(
            "from must not be after to".to_string(),
        ));
    }

    let mut last_error = None;
    for source in TradeSource::FALLBACK_ORDER {
        match source.fetch(ctx.upstream.as_ref(), &account_id, range).await {
            Ok(value) => {
                let trades = source.normalize(value);
                debug!(account_id = %account_id, source = source.tag(), trades = trades.len(), "Loaded trade history");
                return Ok(TradeHistoryResponse {
                    trades,
                    source: source.tag().to_string(),
                });
            }
            Err(e) => {
                warn!(account_id = %account_id, source = source.tag(), error = %e, "Trade history source failed");
                last_error = Some(e);
            }
        }
    }

    Err(surface(last_error.unwrap_or_else(|| {
        RelayError::Internal("No trade history source available".to_string())
    })))
}
