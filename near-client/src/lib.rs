//! # near-client: submit NEAR transactions and make sense of their outcomes
//!
//! Wraps a node's JSON-RPC endpoint with a retrying transport, interprets
//! the outcome tree of submitted transactions into a single success value or
//! a typed failure and manages access key nonces for signing accounts.
#![forbid(missing_docs)]

pub mod account;
pub mod config;
pub mod error;
pub mod outcome;
pub mod rpc;

pub use account::Account;
pub use error::{ClientError, ClientResult};
pub use outcome::TxOutcome;
pub use rpc::{client::RpcClient, WaitUntil};
