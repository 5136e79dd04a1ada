use brokerlink_core::{BrokerCredentials, DateRange, RelayError};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Body of the provisioning create-account request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountBody {
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub login: String,
    pub password: String,
    pub server: String,
    pub platform: String,
    pub magic: u32,
    pub resource_slots: u32,
    pub metastats_api_enabled: bool,
}

impl CreateAccountBody {
    /// Cloud account with one resource slot and statistics collection switched on.
    pub fn cloud(credentials: &BrokerCredentials) -> Self {
        Self {
            name: credentials.account_name(),
            account_type: "cloud".to_string(),
            login: credentials.login.clone(),
            password: credentials.password.clone(),
            server: credentials.server.clone(),
            platform: credentials.platform.clone(),
            magic: 0,
            resource_slots: 1,
            metastats_api_enabled: true,
        }
    }
}

/// Error body returned by the upstream service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Build the error for a non-2xx, non-202 response.
pub fn error_from_response(status: u16, body: &str) -> RelayError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status));
    RelayError::Upstream { status, message }
}

/// Format a time bound the way the upstream paths expect it.
pub fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Base URLs of the three endpoint families.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub provisioning: Url,
    pub client: Url,
    pub metastats: Url,
}

impl Endpoints {
    pub fn parse(provisioning: &str, client: &str, metastats: &str) -> Result<Self, RelayError> {
        Ok(Self {
            provisioning: parse_base(provisioning)?,
            client: parse_base(client)?,
            metastats: parse_base(metastats)?,
        })
    }

    pub fn accounts(&self) -> Result<Url, RelayError> {
        join(&self.provisioning, &["users", "current", "accounts"])
    }

    pub fn account(&self, account_id: &str) -> Result<Url, RelayError> {
        join(&self.provisioning, &["users", "current", "accounts", account_id])
    }

    pub fn enable_metastats(&self, account_id: &str) -> Result<Url, RelayError> {
        join(
            &self.provisioning,
            &["users", "current", "accounts", account_id, "enable-metastats-api"],
        )
    }

    pub fn account_information(&self, account_id: &str) -> Result<Url, RelayError> {
        join(
            &self.client,
            &["users", "current", "accounts", account_id, "account-information"],
        )
    }

    pub fn history_deals(&self, account_id: &str, range: DateRange) -> Result<Url, RelayError> {
        join(
            &self.client,
            &[
                "users",
                "current",
                "accounts",
                account_id,
                "history-deals",
                "time",
                &format_time(range.from),
                &format_time(range.to),
            ],
        )
    }

    pub fn metrics(&self, account_id: &str) -> Result<Url, RelayError> {
        join(
            &self.metastats,
            &["users", "current", "accounts", account_id, "metrics"],
        )
    }

    pub fn historical_trades(&self, account_id: &str, range: DateRange) -> Result<Url, RelayError> {
        join(
            &self.metastats,
            &[
                "users",
                "current",
                "accounts",
                account_id,
                "historical-trades",
                &format_time(range.from),
                &format_time(range.to),
            ],
        )
    }

    pub fn daily_growth(&self, account_id: &str) -> Result<Url, RelayError> {
        join(
            &self.metastats,
            &["users", "current", "accounts", account_id, "daily-growth"],
        )
    }
}

fn parse_base(raw: &str) -> Result<Url, RelayError> {
    let url = Url::parse(raw)
        .map_err(|e| RelayError::Internal(format!("Invalid upstream URL {}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(RelayError::Internal(format!("Invalid upstream URL {}", raw)));
    }
    Ok(url)
}

/// Append percent-encoded path segments to `base`.
fn join(base: &Url, segments: &[&str]) -> Result<Url, RelayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RelayError::Internal(format!("Invalid upstream URL {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn endpoints() -> Endpoints {
        Endpoints::parse(
            "https://prov.example.com",
            "https://client.example.com/",
            "https://stats.example.com",
        )
        .unwrap()
    }

    #[test]
    fn test_account_id_is_percent_encoded() {
        let url = endpoints().account("a/b c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://prov.example.com/users/current/accounts/a%2Fb%20c"
        );
    }

    #[test]
    fn test_history_deals_path() {
        let range = DateRange {
            from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 2, 1, 12, 30, 0).unwrap(),
        };
        let url = endpoints().history_deals("acc", range).unwrap();
        assert_eq!(
            url.as_str(),
            "https://client.example.com/users/current/accounts/acc/history-deals/time/2024-01-01T00:00:00.000Z/2024-02-01T12:30:00.000Z"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        let err = error_from_response(403, r#"{"error":"Forbidden","message":"MetaStats disabled"}"#);
        assert_eq!(
            err,
            RelayError::Upstream {
                status: 403,
                message: "MetaStats disabled".to_string()
            }
        );

        let err = error_from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502");

        let err = error_from_response(404, r#"{"error":"NotFoundError"}"#);
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[test]
    fn test_create_body_shape() {
        let creds = BrokerCredentials {
            server: "Xyz-Live".to_string(),
            login: "12345".to_string(),
            password: "p".to_string(),
            platform: "mt5".to_string(),
        };
        let body = serde_json::to_value(CreateAccountBody::cloud(&creds)).unwrap();
        assert_eq!(body["name"], "mt5-12345");
        assert_eq!(body["type"], "cloud");
        assert_eq!(body["resourceSlots"], 1);
        assert_eq!(body["metastatsApiEnabled"], true);
        assert_eq!(body["server"], "Xyz-Live");
    }
}
