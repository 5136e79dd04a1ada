//! Test doubles for the workflow's collaborators.

use async_trait::async_trait;
use brokerlink_core::*;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::context::WorkflowContext;

#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn count(&self) -> usize {
        self.waits.lock().unwrap().len()
    }

    pub fn total(&self) -> Duration {
        self.waits.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn upstream_error(status: u16, message: &str) -> RelayError {
    RelayError::Upstream {
        status,
        message: message.to_string(),
    }
}

pub fn account(state: &str, connection_status: &str) -> ProvisionedAccount {
    ProvisionedAccount {
        id: Some("acc-1".to_string()),
        state: Some(AccountLifecycle::from(state.to_string())),
        connection_status: Some(ConnectionStatus::from(connection_status.to_string())),
    }
}

/// Scripted upstream. Unscripted lookups answer 404; unscripted data calls answer 500.
pub struct FakeUpstream {
    pub lookups: Mutex<VecDeque<Result<ProvisionedAccount, RelayError>>>,
    pub create: Result<CreatedAccount, RelayError>,
    pub delete: Result<(), RelayError>,
    pub enable: Result<(), RelayError>,
    pub account_information: Result<Value, RelayError>,
    pub history_deals: Result<Value, RelayError>,
    pub metrics: Result<Value, RelayError>,
    pub historical_trades: Result<Value, RelayError>,
    pub daily_growth: Result<Value, RelayError>,
    pub calls: Mutex<Vec<String>>,
    pub ranges: Mutex<Vec<DateRange>>,
}

impl Default for FakeUpstream {
    fn default() -> Self {
        let unscripted = || Err(upstream_error(500, "unscripted"));
        Self {
            lookups: Mutex::new(VecDeque::new()),
            create: Ok(CreatedAccount {
                id: "acc-new".to_string(),
                state: Some(AccountLifecycle::Deploying),
            }),
            delete: Ok(()),
            enable: Ok(()),
            account_information: unscripted(),
            history_deals: unscripted(),
            metrics: unscripted(),
            historical_trades: unscripted(),
            daily_growth: unscripted(),
            calls: Mutex::new(Vec::new()),
            ranges: Mutex::new(Vec::new()),
        }
    }
}

impl FakeUpstream {
    pub fn with_lookups(self, lookups: Vec<Result<ProvisionedAccount, RelayError>>) -> Self {
        *self.lookups.lock().unwrap() = lookups.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn ranges(&self) -> Vec<DateRange> {
        self.ranges.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl UpstreamApi for FakeUpstream {
    async fn create_account(
        &self,
        _credentials: &BrokerCredentials,
    ) -> Result<CreatedAccount, RelayError> {
        self.record("create_account");
        self.create.clone()
    }

    async fn get_account(
        &self,
        _account_id: &str,
        _max_attempts: u32,
    ) -> Result<ProvisionedAccount, RelayError> {
        self.record("get_account");
        self.lookups
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(upstream_error(404, "Account not found")))
    }

    async fn delete_account(&self, _account_id: &str) -> Result<(), RelayError> {
        self.record("delete_account");
        self.delete.clone()
    }

    async fn enable_statistics(&self, _account_id: &str) -> Result<(), RelayError> {
        self.record("enable_statistics");
        self.enable.clone()
    }

    async fn account_information(&self, _account_id: &str) -> Result<Value, RelayError> {
        self.record("account_information");
        self.account_information.clone()
    }

    async fn history_deals(&self, _account_id: &str, range: DateRange) -> Result<Value, RelayError> {
        self.record("history_deals");
        self.ranges.lock().unwrap().push(range);
        self.history_deals.clone()
    }

    async fn metrics(&self, _account_id: &str) -> Result<Value, RelayError> {
        self.record("metrics");
        self.metrics.clone()
    }

    async fn historical_trades(
        &self,
        _account_id: &str,
        range: DateRange,
    ) -> Result<Value, RelayError> {
        self.record("historical_trades");
        self.ranges.lock().unwrap().push(range);
        self.historical_trades.clone()
    }

    async fn daily_growth(&self, _account_id: &str) -> Result<Value, RelayError> {
        self.record("daily_growth");
        self.daily_growth.clone()
    }
}

/// In-memory store that counts writes.
#[derive(Default)]
pub struct FakeStore {
    links: Mutex<std::collections::HashMap<String, UserBrokerLink>>,
    writes: Mutex<usize>,
    fail_writes: bool,
}

impl FakeStore {
    pub fn with_link(self, link: UserBrokerLink) -> Self {
        self.links.lock().unwrap().insert(link.user_id.clone(), link);
        self
    }

    /// Every write is counted, then rejected.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn link(&self, user_id: &str) -> Option<UserBrokerLink> {
        self.links.lock().unwrap().get(user_id).cloned()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    fn record_write(&self) -> Result<(), StoreError> {
        *self.writes.lock().unwrap() += 1;
        if self.fail_writes {
            return Err(StoreError::DatabaseError("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkStore for FakeStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserBrokerLink>, StoreError> {
        Ok(self.link(user_id))
    }

    async fn upsert(&self, user_id: &str, update: &LinkUpdate) -> Result<(), StoreError> {
        self.record_write()?;
        self.links
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert_with(|| UserBrokerLink::new(user_id))
            .apply(update);
        Ok(())
    }

    async fn clear_account(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.record_write()?;
        if let Some(link) = self.links.lock().unwrap().get_mut(user_id) {
            link.clear_account(at);
        }
        Ok(())
    }
}

pub fn linked(user_id: &str, account_id: &str) -> UserBrokerLink {
    let mut link = UserBrokerLink::new(user_id);
    link.apply(&LinkUpdate {
        account_id: Some(account_id.to_string()),
        server: Some("Xyz-Live".to_string()),
        login: Some("12345".to_string()),
        platform: Some("mt5".to_string()),
        ..Default::default()
    });
    link
}

pub fn caller() -> CallerIdentity {
    CallerIdentity::new("user-1").with_email("trader@example.com")
}

/// Harness wiring fakes into a context.
pub struct Harness {
    pub upstream: Arc<FakeUpstream>,
    pub store: Arc<FakeStore>,
    pub sleeper: Arc<RecordingSleeper>,
    pub ctx: WorkflowContext,
}

impl Harness {
    pub fn new(upstream: FakeUpstream, store: FakeStore) -> Self {
        let upstream = Arc::new(upstream);
        let store = Arc::new(store);
        let sleeper = Arc::new(RecordingSleeper::default());
        let ctx = WorkflowContext::new(upstream.clone(), store.clone())
            .with_sleeper(sleeper.clone())
            .with_clock(Arc::new(FixedClock(fixed_now())));
        Self {
            upstream,
            store,
            sleeper,
            ctx,
        }
    }
}
