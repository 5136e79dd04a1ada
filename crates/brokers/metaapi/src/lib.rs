//! MetaApi upstream adapter.
//!
//! Talks to the provisioning, trading-session, and statistics APIs over HTTPS.
//! HTTP 202 is treated as "still processing" and retried under a bounded
//! [`RetryPolicy`].

pub mod client;
pub mod protocol;
pub mod retry;
pub mod transport;

pub use client::{MetaApiClient, MetaApiConfig};
pub use retry::RetryPolicy;
pub use transport::{HttpMethod, HttpTransport, OutboundRequest, RawResponse, ReqwestTransport, RetryableRequest};
