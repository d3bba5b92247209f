//! Scheduled collector that snapshots a wallet node over JSON-RPC and appends
//! the results to a relational store. The `rdd-logger` binary wires these
//! pieces to the environment; embedders can drive `run_logger` directly.

pub mod pipeline;
pub mod price;
pub mod provision;
pub mod readiness;
pub mod rpc;
pub mod scheduler;
pub mod shutdown;
pub mod tables;
pub mod worker;

#[cfg(test)]
mod testing;

pub use price::{CryptoCompareClient, PriceQuote, PriceSource};
pub use readiness::{GateState, ReadinessGate, StoreConnector};
pub use rpc::{HttpRpcClient, RpcMethod, RpcSource};
pub use worker::{run_logger, startup_attempt, CollectorError, PriceTask};
