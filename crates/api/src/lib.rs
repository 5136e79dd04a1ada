pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use auth::{AuthConfig, StaticTokenVerifier, TokenEntry};
pub use state::AppState;

/// Build the Axum application router.
pub fn build_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the API server.
pub async fn start_server(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("API server listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use brokerlink_core::*;
    use brokerlink_data::MemoryLinkStore;
    use brokerlink_workflow::WorkflowContext;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Upstream that answers metrics with 403 and rejects everything else.
    struct ForbiddenMetrics;

    fn unavailable() -> RelayError {
        RelayError::Transport("offline".to_string())
    }

    #[async_trait]
    impl UpstreamApi for ForbiddenMetrics {
        async fn create_account(&self, _: &BrokerCredentials) -> Result<CreatedAccount, RelayError> {
            Err(unavailable())
        }
        async fn get_account(&self, _: &str, _: u32) -> Result<ProvisionedAccount, RelayError> {
            Err(unavailable())
        }
        async fn delete_account(&self, _: &str) -> Result<(), RelayError> {
            Err(unavailable())
        }
        async fn enable_statistics(&self, _: &str) -> Result<(), RelayError> {
            Ok(())
        }
        async fn account_information(&self, _: &str) -> Result<Value, RelayError> {
            Err(unavailable())
        }
        async fn history_deals(&self, _: &str, _: DateRange) -> Result<Value, RelayError> {
            Err(unavailable())
        }
        async fn metrics(&self, _: &str) -> Result<Value, RelayError> {
            Err(RelayError::Upstream {
                status: 403,
                message: "MetaStats API is not enabled".to_string(),
            })
        }
        async fn historical_trades(&self, _: &str, _: DateRange) -> Result<Value, RelayError> {
            Err(unavailable())
        }
        async fn daily_growth(&self, _: &str) -> Result<Value, RelayError> {
            Err(unavailable())
        }
    }

    async fn app() -> Router {
        let store = Arc::new(MemoryLinkStore::new());
        let mut link = UserBrokerLink::new("linked-user");
        link.apply(&LinkUpdate {
            account_id: Some("acc-1".to_string()),
            server: Some("Xyz-Live".to_string()),
            login: Some("12345".to_string()),
            platform: Some("mt5".to_string()),
            ..Default::default()
        });
        store.insert(link).await;

        let verifier = StaticTokenVerifier::new(&[
            TokenEntry {
                token: "fresh".to_string(),
                user_id: "fresh-user".to_string(),
                email: None,
            },
            TokenEntry {
                token: "linked".to_string(),
                user_id: "linked-user".to_string(),
                email: None,
            },
        ]);
        let workflow = WorkflowContext::new(Arc::new(ForbiddenMetrics), store);
        build_router(AppState::new(workflow, Arc::new(verifier)))
    }

    async fn call(app: Router, path: &str, token: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let resp = app
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let resp = app()
            .await
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let (status, body) = call(app().await, "/api/status", None, "").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["kind"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthenticated_before_body_checks() {
        let (status, body) = call(app().await, "/api/connect", Some("bogus"), "{not json").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["kind"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_status_for_unlinked_user() {
        let (status, body) = call(app().await, "/api/status", Some("fresh"), "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"connected": false}));
    }

    #[tokio::test]
    async fn test_status_for_linked_user() {
        let (status, body) = call(app().await, "/api/status", Some("linked"), "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"connected": true, "server": "Xyz-Live", "login": "12345", "platform": "mt5"})
        );
    }

    #[tokio::test]
    async fn test_connect_validates_input() {
        let (status, body) = call(
            app().await,
            "/api/connect",
            Some("fresh"),
            r#"{"brokerServer": "Xyz-Live", "mtLogin": ""}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid-argument");
    }

    #[tokio::test]
    async fn test_metrics_requires_link() {
        let (status, body) = call(app().await, "/api/metrics", Some("fresh"), "").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not-found");
    }

    #[tokio::test]
    async fn test_metrics_enabling() {
        let (status, body) = call(app().await, "/api/metrics", Some("linked"), "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"ok": false, "metrics": null, "source": "none", "reason": "metastats_enabling"})
        );
    }

    #[tokio::test]
    async fn test_daily_growth_failure_is_empty() {
        let (status, body) = call(app().await, "/api/daily-growth", Some("linked"), "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_trade_history_both_sources_down() {
        let (status, body) = call(app().await, "/api/trade-history", Some("linked"), "{}").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["kind"], "internal");
    }

    #[tokio::test]
    async fn test_disconnect_without_link() {
        let (status, body) = call(app().await, "/api/disconnect", Some("fresh"), "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
    }
}
