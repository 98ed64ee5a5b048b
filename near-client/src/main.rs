use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use near_client::{
	config::{Cli, Command, Config},
	outcome::FinalExecutionOutcome,
	Account, RpcClient, TxOutcome,
};
use near_core::Signer;
use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::{
	layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(EnvFilter::from_default_env())
		.init();

	let args = Cli::parse();
	let config = Config::from_args(&args).with_context(|| {
		format!("Could not read config file {:?}", args.config_file)
	})?;

	let output = run(args.command, &config).await.map_err(|err| {
		error!("{:#}", err);
		err
	})?;

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

async fn run(command: Command, config: &Config) -> anyhow::Result<Value> {
	let client = RpcClient::from_config(
		&config.transport_config(),
		config.retry_config(),
	)?;
	let signer = Arc::new(config.signer()?);

	info!("Using {} with key {}", config.account_id, signer.public_key());

	let account = Account::new(
		config.account_id.clone(),
		signer.clone(),
		client.clone(),
	)
	.with_wait_until(config.wait_until)
	.with_max_nonce_retries(config.max_nonce_retries);

	Ok(match command {
		Command::Transfer { receiver, amount } => {
			render(account.transfer(receiver, amount).await?)
		}
		Command::Call {
			contract,
			method,
			args,
			gas,
			deposit,
		} => {
			serde_json::from_str::<Value>(&args)
				.context("Arguments are not valid JSON")?;

			render(
				account
					.function_call(contract, method, args, gas, deposit)
					.await?,
			)
		}
		Command::AccessKey => serde_json::to_value(
			client
				.view_access_key(&config.account_id, &signer.public_key())
				.await?,
		)?,
		Command::Status { hash } => render(
			client
				.tx_status(&hash, &config.account_id, config.wait_until)
				.await?,
		),
	})
}

fn render(outcome: TxOutcome) -> Value {
	match outcome {
		TxOutcome::Pending { status, outcome } => json!({
			"status": "pending",
			"wait_until": status,
			"transaction_hash": outcome
				.as_deref()
				.map(FinalExecutionOutcome::transaction_hash),
		}),
		TxOutcome::Success { value, outcome } => json!({
			"status": "success",
			"transaction_hash": outcome.transaction_hash(),
			"value": value
				.map(|value| String::from_utf8_lossy(&value).into_owned()),
			"logs": outcome.logs(),
		}),
	}
}
