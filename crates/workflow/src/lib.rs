//! The seven user-facing account operations.
//!
//! Each operation takes an explicit [`WorkflowContext`] (upstream client, link
//! store, sleeper, clock) and the verified caller, if any.

pub mod connect;
pub mod context;
pub mod history;
pub mod operations;
pub mod poll;

#[cfg(test)]
mod testing;

pub use connect::{connect, ConnectOutcome};
pub use context::WorkflowContext;
pub use history::{trade_history, TradeSource};
pub use operations::{account_info, daily_growth, disconnect, metrics, status};
pub use poll::PollPolicy;
