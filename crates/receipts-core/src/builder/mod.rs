//! Builder for constructing receipt readers.
//!
//! Resolves the configured wallet provider through a map of factory
//! functions, so the binary decides which implementations are available.

use crate::{ReceiptAggregator, ReceiptReader};
use receipts_config::Config;
use receipts_gateway::{ContractGateway, GatewayError, WalletProvider};
use receipts_types::parse_address;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during reader construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for a [`ReceiptReader`].
pub struct ReaderBuilder {
	config: Config,
}

impl ReaderBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the reader, creating the primary wallet provider from
	/// `gateway_factories`. Without a primary provider the reader is built
	/// anyway and every load reports the provider as unavailable.
	pub fn build<GF>(
		self,
		gateway_factories: &HashMap<String, GF>,
	) -> Result<ReceiptReader, BuilderError>
	where
		GF: Fn(&toml::Value) -> Result<Box<dyn WalletProvider>, GatewayError>,
	{
		let provider = match self.config.gateway.primary_implementation() {
			Some((name, implementation_config)) => {
				let factory = gateway_factories.get(name).ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"No factory registered for gateway implementation '{}'",
						name
					))
				})?;

				let provider = factory(implementation_config).map_err(|e| {
					tracing::error!(
						component = "gateway",
						implementation = %name,
						error = %e,
						"Failed to create wallet provider"
					);
					BuilderError::Config(format!(
						"Failed to create gateway implementation '{}': {}",
						name, e
					))
				})?;

				tracing::info!(component = "gateway", implementation = %name, "Loaded");
				Some(Arc::from(provider))
			},
			None => {
				tracing::warn!(
					component = "gateway",
					"No wallet provider configured, loads will fail until one is"
				);
				None
			},
		};

		self.build_with_provider(provider)
	}

	/// Builds the reader around an already constructed provider.
	pub fn build_with_provider(
		self,
		provider: Option<Arc<dyn WalletProvider>>,
	) -> Result<ReceiptReader, BuilderError> {
		let contract_address = parse_address(&self.config.gateway.contract_address)
			.map_err(|e| BuilderError::Config(format!("Invalid contract address: {}", e)))?;

		let gateway = ContractGateway::new(provider, contract_address);
		let aggregator = ReceiptAggregator::new(
			gateway,
			Duration::from_secs(self.config.reader.request_timeout_secs),
		)
		.with_max_receipts(self.config.reader.max_receipts);

		Ok(ReceiptReader::new(self.config, aggregator))
	}
}
