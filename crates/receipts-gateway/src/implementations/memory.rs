//! In-memory wallet provider.
//!
//! Holds receipts and account state locally. Useful for demos and tests:
//! individual reads can be made to fail or stall, and authorization can be
//! granted or refused.

use crate::{GatewayError, ReceiptContract, WalletProvider};
use alloy_primitives::{address, Address};
use async_trait::async_trait;
use receipts_types::{
	hex_address, parse_address, ConfigSchema, Field, FieldType, RawReceipt, Schema,
	ValidationError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Account handed out when authorization is granted and none was configured.
pub const DEFAULT_MEMORY_ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Contract storage shared by every handle bound from one provider.
#[derive(Default)]
struct ReceiptLedger {
	receipts: RwLock<Vec<RawReceipt>>,
	failing: RwLock<HashSet<u64>>,
	delays: RwLock<HashMap<u64, Duration>>,
	count_failing: AtomicBool,
	count_delay: RwLock<Option<Duration>>,
}

/// Wallet provider whose accounts and contract live in memory.
pub struct MemoryWalletProvider {
	/// Accounts returned without prompting.
	authorized: RwLock<Vec<Address>>,
	/// Account granted on an authorization request; `None` refuses.
	grant: Option<Address>,
	connected: AtomicBool,
	/// Stall applied to `eth_accounts` before it answers.
	accounts_delay: RwLock<Option<Duration>>,
	authorization_requests: AtomicUsize,
	ledger: Arc<ReceiptLedger>,
}

impl Default for MemoryWalletProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryWalletProvider {
	/// A provider with no authorized accounts that grants
	/// [`DEFAULT_MEMORY_ACCOUNT`] when asked.
	pub fn new() -> Self {
		Self {
			authorized: RwLock::new(Vec::new()),
			grant: Some(DEFAULT_MEMORY_ACCOUNT),
			connected: AtomicBool::new(true),
			accounts_delay: RwLock::new(None),
			authorization_requests: AtomicUsize::new(0),
			ledger: Arc::new(ReceiptLedger::default()),
		}
	}

	pub fn with_authorized_account(mut self, account: Address) -> Self {
		self.authorized.get_mut().push(account);
		self
	}

	pub fn granting(mut self, account: Address) -> Self {
		self.grant = Some(account);
		self
	}

	pub fn denying_authorization(mut self) -> Self {
		self.grant = None;
		self
	}

	/// Appends `receipts` to the ledger, visible to handles already bound.
	///
	/// Seeding while a handle is mid-read is refused with a warning; use
	/// [`MemoryWalletProvider::push_receipt`] from async code instead.
	pub fn with_receipts(self, receipts: Vec<RawReceipt>) -> Self {
		match self.ledger.receipts.try_write() {
			Ok(mut stored) => stored.extend(receipts),
			Err(_) => tracing::warn!(
				dropped = receipts.len(),
				"Memory ledger is busy, seed receipts not stored"
			),
		}
		self
	}

	/// Number of authorization requests received so far.
	pub fn authorization_requests(&self) -> usize {
		self.authorization_requests.load(Ordering::SeqCst)
	}

	/// Makes every account call fail as if the wallet went away.
	pub fn set_connected(&self, connected: bool) {
		self.connected.store(connected, Ordering::SeqCst);
	}

	/// Replaces the active account, as a wallet does when the user switches.
	pub async fn switch_account(&self, account: Address) {
		*self.authorized.write().await = vec![account];
	}

	/// Appends a receipt at the next index.
	pub async fn push_receipt(&self, receipt: RawReceipt) -> u64 {
		let mut receipts = self.ledger.receipts.write().await;
		receipts.push(receipt);
		receipts.len() as u64 - 1
	}

	/// Makes reads of `index` revert.
	pub async fn fail_receipt(&self, index: u64) {
		self.ledger.failing.write().await.insert(index);
	}

	/// Makes reads of `index` take `delay` before answering.
	pub async fn delay_receipt(&self, index: u64, delay: Duration) {
		self.ledger.delays.write().await.insert(index, delay);
	}

	/// Makes `receiptCount()` revert.
	pub fn fail_count(&self, failing: bool) {
		self.ledger.count_failing.store(failing, Ordering::SeqCst);
	}

	/// Makes `receiptCount()` take `delay` before answering.
	pub async fn delay_count(&self, delay: Duration) {
		*self.ledger.count_delay.write().await = Some(delay);
	}

	/// Makes `eth_accounts` take `delay` before answering.
	pub async fn delay_accounts(&self, delay: Duration) {
		*self.accounts_delay.write().await = Some(delay);
	}

	fn ensure_connected(&self) -> Result<(), GatewayError> {
		if self.connected.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(GatewayError::ProviderUnavailable(
				"memory wallet disconnected".to_string(),
			))
		}
	}
}

#[async_trait]
impl WalletProvider for MemoryWalletProvider {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryWalletSchema)
	}

	async fn accounts(&self) -> Result<Vec<Address>, GatewayError> {
		let delay = *self.accounts_delay.read().await;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		self.ensure_connected()?;
		Ok(self.authorized.read().await.clone())
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, GatewayError> {
		self.ensure_connected()?;
		self.authorization_requests.fetch_add(1, Ordering::SeqCst);

		let account = self.grant.ok_or_else(|| {
			GatewayError::AuthorizationDenied("user rejected the request".to_string())
		})?;

		let mut authorized = self.authorized.write().await;
		if !authorized.contains(&account) {
			authorized.push(account);
		}
		Ok(authorized.clone())
	}

	fn bind(&self, contract: Address, account: Address) -> Arc<dyn ReceiptContract> {
		Arc::new(MemoryReceiptContract {
			ledger: self.ledger.clone(),
			contract,
			account,
		})
	}
}

/// Contract handle over a [`MemoryWalletProvider`]'s ledger.
pub struct MemoryReceiptContract {
	ledger: Arc<ReceiptLedger>,
	contract: Address,
	account: Address,
}

#[async_trait]
impl ReceiptContract for MemoryReceiptContract {
	fn address(&self) -> Address {
		self.contract
	}

	fn account(&self) -> Address {
		self.account
	}

	async fn receipt_count(&self) -> Result<u64, GatewayError> {
		let delay = *self.ledger.count_delay.read().await;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		if self.ledger.count_failing.load(Ordering::SeqCst) {
			return Err(GatewayError::Call("receiptCount() reverted".to_string()));
		}

		Ok(self.ledger.receipts.read().await.len() as u64)
	}

	async fn get_receipt(&self, index: u64) -> Result<RawReceipt, GatewayError> {
		let delay = self.ledger.delays.read().await.get(&index).copied();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		if self.ledger.failing.read().await.contains(&index) {
			return Err(GatewayError::Call(format!(
				"getReceipt({}) reverted",
				index
			)));
		}

		self.ledger
			.receipts
			.read()
			.await
			.get(index as usize)
			.cloned()
			.ok_or_else(|| GatewayError::Call(format!("getReceipt({}): invalid receipt id", index)))
	}
}

/// Configuration schema for the in-memory wallet provider.
pub struct MemoryWalletSchema;

impl MemoryWalletSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}

	fn receipt_schema() -> Schema {
		let units = || FieldType::Integer {
			min: Some(0),
			max: None,
		};

		Schema::new(
			vec![
				Field::new("receipt_number", FieldType::String),
				Field::new("date", FieldType::String),
				Field::new("time", FieldType::String),
				Field::new("fuel_type", FieldType::String),
				Field::new("quantity_units", units()),
				Field::new("location_name", FieldType::String),
				Field::new("location_address", FieldType::String),
				Field::new("carbon_emissions", units()),
			],
			vec![],
		)
	}
}

impl ConfigSchema for MemoryWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("accounts", FieldType::Array(Box::new(FieldType::String))).with_validator(
					|value| {
						value
							.as_array()
							.into_iter()
							.flatten()
							.try_for_each(hex_address)
					},
				),
				Field::new("grant_account", FieldType::String).with_validator(hex_address),
				Field::new("deny_authorization", FieldType::Boolean),
				Field::new(
					"receipts",
					FieldType::Array(Box::new(FieldType::Table(Self::receipt_schema()))),
				),
			],
		);

		schema.validate(config)
	}
}

/// Factory function to create an in-memory wallet provider from configuration.
///
/// Configuration parameters:
/// - `accounts`: accounts authorized up front (optional)
/// - `grant_account`: account granted on request (optional)
/// - `deny_authorization`: refuse every authorization request (optional)
/// - `receipts`: receipts stored in the contract, in index order (optional)
pub fn create_memory_wallet(config: &toml::Value) -> Result<Box<dyn WalletProvider>, GatewayError> {
	MemoryWalletSchema::validate_config(config)
		.map_err(|e| GatewayError::Configuration(format!("Invalid configuration: {}", e)))?;

	let invalid = |e: receipts_types::ConversionError| GatewayError::Configuration(e.to_string());
	let mut provider = MemoryWalletProvider::new();

	for account in config
		.get("accounts")
		.and_then(|v| v.as_array())
		.into_iter()
		.flatten()
		.filter_map(|v| v.as_str())
	{
		provider = provider.with_authorized_account(parse_address(account).map_err(invalid)?);
	}

	if let Some(account) = config.get("grant_account").and_then(|v| v.as_str()) {
		provider = provider.granting(parse_address(account).map_err(invalid)?);
	}

	if config
		.get("deny_authorization")
		.and_then(|v| v.as_bool())
		.unwrap_or(false)
	{
		provider = provider.denying_authorization();
	}

	let receipts = config
		.get("receipts")
		.and_then(|v| v.as_array())
		.into_iter()
		.flatten()
		.map(|entry| {
			entry.clone().try_into::<RawReceipt>().map_err(|e| {
				GatewayError::Configuration(format!("Invalid receipt entry: {}", e))
			})
		})
		.collect::<Result<Vec<_>, _>>()?;

	tracing::debug!(receipts = receipts.len(), "Seeded memory wallet");
	Ok(Box::new(provider.with_receipts(receipts)))
}

/// Registry for the in-memory wallet provider.
pub struct Registry;

impl receipts_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::GatewayFactory;

	fn factory() -> Self::Factory {
		create_memory_wallet
	}
}

impl crate::GatewayRegistry for Registry {}
