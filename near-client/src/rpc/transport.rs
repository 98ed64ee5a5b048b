//! HTTP boundary of the JSON-RPC client
use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::TransportConfig;

/// Header carrying the API key of hosted RPC providers
pub const API_KEY_HEADER: &str = "x-api-key";

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code
	pub status: u16,
	/// Response body
	pub body: String,
}

impl HttpResponse {
	/// Whether the status is 2xx
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// A request that produced no HTTP response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
	/// The per-attempt timeout elapsed
	#[error("Request timed out: {0}")]
	Timeout(String),
	/// The connection could not be established
	#[error("Connection failed: {0}")]
	Connect(String),
	/// Any other failure before a response arrived
	#[error("Request failed: {0}")]
	Other(String),
}

impl From<reqwest::Error> for TransportError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			Self::Timeout(err.to_string())
		} else if err.is_connect() {
			Self::Connect(err.to_string())
		} else {
			Self::Other(err.to_string())
		}
	}
}

/// Posts JSON documents to the node
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
	/// Sends one request, without any retrying
	async fn post_json(
		&self,
		body: &Value,
	) -> Result<HttpResponse, TransportError>;
}

/// [HttpTransport] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
	http_client: reqwest::Client,
	url: Url,
}

impl ReqwestTransport {
	/// Create a transport from its settings
	pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
		let mut headers = HeaderMap::new();

		if let Some(api_key) = &config.api_key {
			let mut value = HeaderValue::from_str(api_key)
				.map_err(|err| TransportError::Other(err.to_string()))?;
			value.set_sensitive(true);

			headers.insert(API_KEY_HEADER, value);
		}

		let http_client = reqwest::Client::builder()
			.timeout(config.request_timeout)
			.default_headers(headers)
			.build()?;

		Ok(Self {
			http_client,
			url: config.url.clone(),
		})
	}
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
	async fn post_json(
		&self,
		body: &Value,
	) -> Result<HttpResponse, TransportError> {
		let response = self
			.http_client
			.post(self.url.clone())
			.json(body)
			.send()
			.await?;

		let status = response.status().as_u16();
		let body = response.text().await?;

		Ok(HttpResponse { status, body })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_classify_success_statuses() {
		let response = |status| HttpResponse {
			status,
			body: String::new(),
		};

		assert!(response(200).is_success());
		assert!(response(204).is_success());
		assert!(!response(301).is_success());
		assert!(!response(503).is_success());
	}

	#[test]
	fn should_build_with_api_key() {
		let mut config =
			TransportConfig::new("http://localhost:3030".parse().unwrap());
		config.api_key = Some("secret".into());

		assert!(ReqwestTransport::new(&config).is_ok());

		config.api_key = Some("bad\nkey".into());

		assert!(ReqwestTransport::new(&config).is_err());
	}
}
