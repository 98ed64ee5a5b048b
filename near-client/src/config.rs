//! Configuration of the client and the `near-tx` binary
use std::{fs::File, path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use near_core::{AccountId, Balance, CryptoHash, Gas, InMemorySigner, SecretKey};
use serde::Deserialize;
use url::Url;

use crate::rpc::WaitUntil;

/// Build, sign and submit NEAR transactions
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
	/// Where the config file is located
	#[arg(short, long, value_name = "FILE")]
	pub config_file: PathBuf,

	/// What to do
	#[command(subcommand)]
	pub command: Command,
}

/// Commands of the `near-tx` binary
#[derive(Debug, Subcommand)]
pub enum Command {
	/// Transfer tokens to an account
	Transfer {
		/// Receiving account
		#[arg(long)]
		receiver: AccountId,
		/// Amount in yoctoNEAR
		#[arg(long)]
		amount: Balance,
	},
	/// Call a contract method
	Call {
		/// Contract account
		#[arg(long)]
		contract: AccountId,
		/// Method name
		#[arg(long)]
		method: String,
		/// JSON arguments
		#[arg(long, default_value = "{}")]
		args: String,
		/// Attached gas
		#[arg(long, default_value_t = 30_000_000_000_000)]
		gas: Gas,
		/// Attached deposit in yoctoNEAR
		#[arg(long, default_value_t = 0)]
		deposit: Balance,
	},
	/// Show the configured access key
	AccessKey,
	/// Show the status of a submitted transaction
	Status {
		/// Transaction hash
		#[arg(long)]
		hash: CryptoHash,
	},
}

/// System configuration. This is typically deserialized once and never
/// mutated throughout the systems lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// JSON-RPC endpoint
	pub rpc_url: Url,

	/// Sent as `x-api-key` when set
	#[serde(default)]
	pub api_key: Option<String>,

	/// Retries after the first attempt
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,

	/// Delay before the first retry, doubled on every retry
	#[serde(default = "default_initial_delay_ms")]
	pub initial_delay_ms: u64,

	/// Ceiling for a single attempt
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,

	/// How often a submission is re-signed after a stale nonce
	#[serde(default = "default_max_nonce_retries")]
	pub max_nonce_retries: u32,

	/// How long the node waits before answering a submission
	#[serde(default)]
	pub wait_until: WaitUntil,

	/// Account that signs transactions
	pub account_id: AccountId,

	/// Secret key in `ed25519:<base58>` form
	pub secret_key: String,
}

fn default_max_retries() -> u32 {
	RetryConfig::default().max_retries
}

fn default_initial_delay_ms() -> u64 {
	RetryConfig::default().initial_delay.as_millis() as u64
}

fn default_request_timeout_ms() -> u64 {
	10_000
}

fn default_max_nonce_retries() -> u32 {
	3
}

impl Config {
	/// Read the config file specified in the CLI args
	pub fn from_args(args: &Cli) -> anyhow::Result<Self> {
		Self::from_path(&args.config_file)
	}

	/// Read a config file
	pub fn from_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
		let config_file = File::open(path.into())?;

		Ok(serde_json::from_reader(config_file)?)
	}

	/// Signer for the configured account
	pub fn signer(&self) -> anyhow::Result<InMemorySigner> {
		let secret_key: SecretKey = self.secret_key.parse()?;

		Ok(InMemorySigner::new(self.account_id.clone(), secret_key)?)
	}

	/// Retry settings
	pub fn retry_config(&self) -> RetryConfig {
		RetryConfig {
			max_retries: self.max_retries,
			initial_delay: Duration::from_millis(self.initial_delay_ms),
		}
	}

	/// Transport settings
	pub fn transport_config(&self) -> TransportConfig {
		TransportConfig {
			url: self.rpc_url.clone(),
			api_key: self.api_key.clone(),
			request_timeout: Duration::from_millis(self.request_timeout_ms),
		}
	}
}

/// Retry settings of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
	/// Retries after the first attempt
	pub max_retries: u32,
	/// Delay before the first retry
	pub initial_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_delay: Duration::from_millis(1_000),
		}
	}
}

/// HTTP settings of the transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
	/// JSON-RPC endpoint
	pub url: Url,
	/// Sent as `x-api-key` when set
	pub api_key: Option<String>,
	/// Ceiling for a single attempt
	pub request_timeout: Duration,
}

impl TransportConfig {
	/// Settings for the given endpoint with the default timeout
	pub fn new(url: Url) -> Self {
		Self {
			url,
			api_key: None,
			request_timeout: Duration::from_millis(
				default_request_timeout_ms(),
			),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_fill_in_defaults() {
		let config: Config = serde_json::from_value(serde_json::json!({
			"rpc_url": "https://rpc.testnet.near.org",
			"account_id": "alice.testnet",
			"secret_key": "ed25519:11111111111111111111111111111111"
		}))
		.unwrap();

		assert_eq!(config.retry_config(), RetryConfig::default());
		assert_eq!(config.max_nonce_retries, 3);
		assert_eq!(config.wait_until, WaitUntil::ExecutedOptimistic);
		assert_eq!(
			config.transport_config().request_timeout,
			Duration::from_secs(10)
		);
		assert!(config.api_key.is_none());
	}

	#[test]
	fn should_read_overrides() {
		let config: Config = serde_json::from_value(serde_json::json!({
			"rpc_url": "http://localhost:3030",
			"api_key": "secret",
			"max_retries": 5,
			"initial_delay_ms": 50,
			"wait_until": "FINAL",
			"account_id": "alice.testnet",
			"secret_key": "ed25519:11111111111111111111111111111111"
		}))
		.unwrap();

		assert_eq!(config.retry_config().max_retries, 5);
		assert_eq!(
			config.retry_config().initial_delay,
			Duration::from_millis(50)
		);
		assert_eq!(config.wait_until, WaitUntil::Final);
		assert_eq!(
			config.transport_config().api_key.as_deref(),
			Some("secret")
		);
	}

	#[test]
	fn should_build_signer_from_secret_key() {
		let config: Config = serde_json::from_value(serde_json::json!({
			"rpc_url": "http://localhost:3030",
			"account_id": "alice.testnet",
			"secret_key": "ed25519:11111111111111111111111111111111"
		}))
		.unwrap();

		assert_eq!(
			config.signer().unwrap().account_id.as_str(),
			"alice.testnet"
		);
	}
}
