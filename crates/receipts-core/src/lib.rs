//! Receipt aggregation for the fuel receipt reader.
//!
//! [`ReceiptAggregator`] reads the full receipt collection from the contract
//! in one pass: it discovers how many receipts exist, fetches every index
//! concurrently and normalizes the results in index order. [`ReceiptBook`]
//! keeps the outcome of the latest load for display, and [`ReceiptReader`]
//! ties both together.

use futures::future::try_join_all;
use receipts_gateway::{ContractGateway, GatewayError};
use receipts_types::{Receipt, ReceiptCollection};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

pub mod book;
pub mod builder;
pub mod reader;

pub use book::{BookSnapshot, LoadTicket, ReceiptBook};
pub use builder::{BuilderError, ReaderBuilder};
pub use reader::ReceiptReader;

/// Receipt count ceiling used when none is configured.
pub const DEFAULT_MAX_RECEIPTS: u64 = 10_000;

/// Errors that end a load.
#[derive(Debug, Clone, Error)]
pub enum AggregatorError {
	/// No wallet provider is installed or it could not be reached.
	#[error("Wallet provider unavailable: {0}")]
	ProviderUnavailable(String),
	/// The user refused to share an account.
	#[error("Authorization denied: {0}")]
	AuthorizationDenied(String),
	/// The count or one of the receipt reads failed; no receipts are returned.
	#[error("Failed to load receipts: {0}")]
	AggregationFailed(#[source] GatewayError),
}

impl AggregatorError {
	/// Whether running the same load again may succeed without user action.
	pub fn is_retryable(&self) -> bool {
		matches!(self, AggregatorError::AggregationFailed(_))
	}

	/// Machine-readable kind used in API error bodies.
	pub fn kind(&self) -> &'static str {
		match self {
			AggregatorError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
			AggregatorError::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
			AggregatorError::AggregationFailed(_) => "AGGREGATION_FAILED",
		}
	}
}

impl From<GatewayError> for AggregatorError {
	fn from(err: GatewayError) -> Self {
		match err {
			GatewayError::ProviderUnavailable(msg) => AggregatorError::ProviderUnavailable(msg),
			GatewayError::AuthorizationDenied(msg) => AggregatorError::AuthorizationDenied(msg),
			other => AggregatorError::AggregationFailed(other),
		}
	}
}

/// Reads every receipt stored in the contract.
///
/// Stateless between calls: each [`ReceiptAggregator::load`] obtains a fresh
/// contract handle and a fresh receipt count.
pub struct ReceiptAggregator {
	gateway: ContractGateway,
	request_timeout: Duration,
	max_receipts: u64,
}

impl ReceiptAggregator {
	pub fn new(gateway: ContractGateway, request_timeout: Duration) -> Self {
		Self {
			gateway,
			request_timeout,
			max_receipts: DEFAULT_MAX_RECEIPTS,
		}
	}

	/// Rejects loads whose reported count exceeds `max_receipts`.
	pub fn with_max_receipts(mut self, max_receipts: u64) -> Self {
		self.max_receipts = max_receipts;
		self
	}

	pub fn gateway(&self) -> &ContractGateway {
		&self.gateway
	}

	pub fn request_timeout(&self) -> Duration {
		self.request_timeout
	}

	/// Loads the complete, ordered receipt collection.
	///
	/// All reads for indices `0..count` run concurrently. The first failure
	/// aborts the load and no partial collection is returned.
	#[instrument(skip_all, fields(contract = %self.gateway.contract_address()))]
	pub async fn load(&self) -> Result<ReceiptCollection, AggregatorError> {
		let contract = tokio::time::timeout(self.request_timeout, self.gateway.connect())
			.await
			.map_err(|_| {
				AggregatorError::ProviderUnavailable(format!(
					"wallet provider did not respond within {:?}",
					self.request_timeout
				))
			})??;

		let count = self
			.bounded(contract.receipt_count())
			.await
			.map_err(AggregatorError::AggregationFailed)?;
		if count > self.max_receipts {
			tracing::warn!(count, max = self.max_receipts, "Receipt count exceeds ceiling");
			return Err(AggregatorError::AggregationFailed(GatewayError::Decode(format!(
				"receiptCount() returned {}, above the limit of {}",
				count, self.max_receipts
			))));
		}
		tracing::debug!(count, account = %contract.account(), "Fetching receipts");

		let contract = &contract;
		let fetches = (0..count).map(|index| async move {
			let raw = self.bounded(contract.get_receipt(index)).await?;
			Ok::<_, GatewayError>(Receipt::from_raw(index, raw))
		});

		let receipts = try_join_all(fetches).await.map_err(|e| {
			tracing::warn!(error = %e, "Receipt fetch failed, discarding partial results");
			AggregatorError::AggregationFailed(e)
		})?;

		Ok(ReceiptCollection::new(receipts))
	}

	/// Applies the per-request timeout to one contract call.
	async fn bounded<T>(
		&self,
		call: impl Future<Output = Result<T, GatewayError>>,
	) -> Result<T, GatewayError> {
		tokio::time::timeout(self.request_timeout, call)
			.await
			.map_err(|_| GatewayError::Timeout(self.request_timeout))?
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use receipts_gateway::implementations::memory::MemoryWalletProvider;
	use receipts_gateway::WalletProvider;
	use receipts_types::{Address, RawReceipt};
	use std::sync::Arc;

	fn contract() -> Address {
		receipts_types::parse_address("0x22322523620dCa925Cb24890cf184a5224822890").unwrap()
	}

	fn raw(index: u64) -> RawReceipt {
		RawReceipt {
			receipt_number: format!("R-{}", index),
			date: "2024-04-20".to_string(),
			time: "09:00:00".to_string(),
			fuel_type: "diesel".to_string(),
			quantity_units: 45230,
			location_name: "Station".to_string(),
			location_address: "Main Road".to_string(),
			carbon_emissions: 1000 + index,
		}
	}

	fn seeded(count: u64) -> Arc<MemoryWalletProvider> {
		Arc::new(MemoryWalletProvider::new().with_receipts((0..count).map(raw).collect()))
	}

	fn aggregator(provider: Option<Arc<dyn WalletProvider>>) -> ReceiptAggregator {
		ReceiptAggregator::new(
			ContractGateway::new(provider, contract()),
			Duration::from_secs(30),
		)
	}

	#[tokio::test]
	async fn test_load_normalizes_in_index_order() {
		let collection = aggregator(Some(seeded(3))).load().await.unwrap();

		assert_eq!(collection.len(), 3);
		for (position, receipt) in collection.iter().enumerate() {
			assert_eq!(receipt.index, position as u64);
			assert_eq!(receipt.receipt_number, format!("R-{}", position));
			assert!((receipt.quantity_litres - 45.230).abs() < 1e-12);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_order_preserved_when_fetches_finish_out_of_order() {
		let provider = seeded(5);
		for (index, secs) in [(0, 5), (1, 1), (2, 4), (3, 2), (4, 3)] {
			provider
				.delay_receipt(index, Duration::from_secs(secs))
				.await;
		}

		let started = tokio::time::Instant::now();
		let collection = aggregator(Some(provider)).load().await.unwrap();

		let numbers: Vec<_> = collection
			.iter()
			.map(|r| r.receipt_number.as_str())
			.collect();
		assert_eq!(numbers, vec!["R-0", "R-1", "R-2", "R-3", "R-4"]);
		// Fetches overlap, so the load takes as long as the slowest read.
		assert!(started.elapsed() < Duration::from_secs(6));
	}

	#[tokio::test]
	async fn test_single_failure_fails_whole_load() {
		let provider = seeded(5);
		provider.fail_receipt(2).await;

		let err = aggregator(Some(provider)).load().await.unwrap_err();
		assert!(matches!(
			err,
			AggregatorError::AggregationFailed(GatewayError::Call(_))
		));
		assert!(err.is_retryable());
	}

	#[tokio::test]
	async fn test_each_load_reads_fresh_count() {
		let provider = seeded(3);
		let aggregator = aggregator(Some(provider.clone()));

		assert_eq!(aggregator.load().await.unwrap().len(), 3);
		provider.push_receipt(raw(3)).await;
		assert_eq!(aggregator.load().await.unwrap().len(), 4);
	}

	#[tokio::test]
	async fn test_empty_contract() {
		let collection = aggregator(Some(seeded(0))).load().await.unwrap();
		assert!(collection.is_empty());
		assert_eq!(collection.total_carbon_emissions(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_fetch_times_out() {
		let provider = seeded(3);
		provider
			.delay_receipt(1, Duration::from_secs(120))
			.await;

		let aggregator = ReceiptAggregator::new(
			ContractGateway::new(Some(provider), contract()),
			Duration::from_secs(2),
		);

		let err = aggregator.load().await.unwrap_err();
		assert!(matches!(
			err,
			AggregatorError::AggregationFailed(GatewayError::Timeout(_))
		));
	}

	#[tokio::test]
	async fn test_count_revert_fails_load() {
		let provider = seeded(2);
		provider.fail_count(true);

		let err = aggregator(Some(provider)).load().await.unwrap_err();
		assert!(matches!(
			err,
			AggregatorError::AggregationFailed(GatewayError::Call(_))
		));
		assert!(err.is_retryable());
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_count_times_out() {
		let provider = seeded(2);
		provider.delay_count(Duration::from_secs(120)).await;

		let aggregator = ReceiptAggregator::new(
			ContractGateway::new(Some(provider), contract()),
			Duration::from_secs(2),
		);

		let err = aggregator.load().await.unwrap_err();
		assert!(matches!(
			err,
			AggregatorError::AggregationFailed(GatewayError::Timeout(_))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_stalled_wallet_is_unavailable() {
		let provider = seeded(2);
		provider.delay_accounts(Duration::from_secs(120)).await;

		let aggregator = ReceiptAggregator::new(
			ContractGateway::new(Some(provider), contract()),
			Duration::from_secs(2),
		);

		let err = aggregator.load().await.unwrap_err();
		assert!(matches!(err, AggregatorError::ProviderUnavailable(_)));
		assert!(!err.is_retryable());
	}

	#[tokio::test]
	async fn test_count_above_ceiling_is_rejected() {
		let aggregator = aggregator(Some(seeded(4))).with_max_receipts(3);

		let err = aggregator.load().await.unwrap_err();
		assert!(matches!(
			err,
			AggregatorError::AggregationFailed(GatewayError::Decode(_))
		));

		let aggregator = aggregator.with_max_receipts(4);
		assert_eq!(aggregator.load().await.unwrap().len(), 4);
	}

	#[tokio::test]
	async fn test_missing_provider() {
		let err = aggregator(None).load().await.unwrap_err();
		assert!(matches!(err, AggregatorError::ProviderUnavailable(_)));
		assert!(!err.is_retryable());
		assert_eq!(err.kind(), "PROVIDER_UNAVAILABLE");
	}

	#[tokio::test]
	async fn test_denied_authorization() {
		let provider = Arc::new(MemoryWalletProvider::new().denying_authorization());
		let err = aggregator(Some(provider)).load().await.unwrap_err();
		assert!(matches!(err, AggregatorError::AuthorizationDenied(_)));
		assert!(!err.is_retryable());
	}

	#[test]
	fn test_gateway_error_mapping() {
		let err = AggregatorError::from(GatewayError::Decode("overflow".into()));
		assert_eq!(err.kind(), "AGGREGATION_FAILED");

		let err = AggregatorError::from(GatewayError::ProviderUnavailable("gone".into()));
		assert_eq!(err.kind(), "PROVIDER_UNAVAILABLE");
	}
}
