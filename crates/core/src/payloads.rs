//! Request and response shapes of the seven user-facing operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(default)]
    pub broker_server: String,
    #[serde(default)]
    pub mt_login: String,
    #[serde(default)]
    pub mt_password: String,
    #[serde(default)]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub deployed: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl StatusResponse {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            server: None,
            login: None,
            platform: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Source tag reported when metrics came from the statistics API.
pub const SOURCE_METASTATS: &str = "metastats";
/// Source tag reported when no source produced data.
pub const SOURCE_NONE: &str = "none";
/// Reason reported while the statistics feature is being switched on.
pub const REASON_METASTATS_ENABLING: &str = "metastats_enabling";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub ok: bool,
    pub metrics: Value,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MetricsResponse {
    pub fn available(metrics: Value) -> Self {
        Self {
            ok: true,
            metrics,
            source: SOURCE_METASTATS.to_string(),
            reason: None,
        }
    }

    pub fn enabling() -> Self {
        Self {
            ok: false,
            metrics: Value::Null,
            source: SOURCE_NONE.to_string(),
            reason: Some(REASON_METASTATS_ENABLING.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Trade history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryRequest {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHistoryResponse {
    pub trades: Vec<Value>,
    pub source: String,
}

// ---------------------------------------------------------------------------
// Daily growth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGrowthResponse {
    pub data: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Disconnect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectResponse {
    pub success: bool,
}
