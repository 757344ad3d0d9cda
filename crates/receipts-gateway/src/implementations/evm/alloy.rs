//! JSON-RPC wallet provider backed by Alloy.
//!
//! Talks to an Ethereum node or wallet endpoint over HTTP. Accounts come from
//! `eth_accounts`, authorization from `eth_requestAccounts`, and contract
//! reads are plain `eth_call`s issued from the authorized account.

use crate::{GatewayError, ReceiptContract, WalletProvider};
use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_sol_types::sol;
use alloy_transport_http::Http;
use async_trait::async_trait;
use receipts_types::{
	hex_address, http_url, parse_address, u256_to_u64, ConfigSchema, Field, FieldType,
	RawReceipt, Schema, ValidationError,
};
use std::sync::Arc;

sol! {
	/// On-chain fuel receipt registry.
	#[sol(rpc)]
	interface IFuelReceipts {
		event ReceiptStored(
			uint256 receiptId,
			string receiptNumber,
			string date,
			string time,
			string fuelType,
			uint256 quantityGallons,
			string locationName,
			string locationAddress,
			uint256 carbonEmissions
		);

		function storeReceipt(
			string calldata _receiptNumber,
			string calldata _date,
			string calldata _time,
			string calldata _fuelType,
			uint256 _quantityGallons,
			string calldata _locationName,
			string calldata _locationAddress
		) external;

		function getReceipt(uint256 _receiptId) external view returns (
			string memory receiptNumber,
			string memory date,
			string memory time,
			string memory fuelType,
			uint256 quantityGallons,
			string memory locationName,
			string memory locationAddress,
			uint256 carbonEmissions
		);

		function receiptCount() external view returns (uint256);
	}
}

type HttpProvider = RootProvider<Http<reqwest::Client>>;

/// Wallet provider reached over HTTP JSON-RPC.
pub struct AlloyWalletProvider {
	provider: HttpProvider,
	/// Account to use without asking the endpoint, if configured.
	account: Option<Address>,
}

impl AlloyWalletProvider {
	pub fn new(rpc_url: &str, account: Option<Address>) -> Result<Self, GatewayError> {
		let provider = RootProvider::new_http(rpc_url.parse().map_err(|e| {
			GatewayError::Configuration(format!("Invalid RPC URL '{}': {}", rpc_url, e))
		})?);

		Ok(Self { provider, account })
	}
}

#[async_trait]
impl WalletProvider for AlloyWalletProvider {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyWalletSchema)
	}

	async fn accounts(&self) -> Result<Vec<Address>, GatewayError> {
		if let Some(account) = self.account {
			return Ok(vec![account]);
		}

		self.provider
			.get_accounts()
			.await
			.map_err(|e| GatewayError::ProviderUnavailable(format!("eth_accounts failed: {}", e)))
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, GatewayError> {
		self.provider
			.raw_request::<(), Vec<Address>>("eth_requestAccounts".into(), ())
			.await
			.map_err(|e| GatewayError::AuthorizationDenied(e.to_string()))
	}

	fn bind(&self, contract: Address, account: Address) -> Arc<dyn ReceiptContract> {
		Arc::new(AlloyReceiptContract {
			provider: self.provider.clone(),
			contract,
			account,
		})
	}
}

/// Contract handle issuing reads from one account.
pub struct AlloyReceiptContract {
	provider: HttpProvider,
	contract: Address,
	account: Address,
}

#[async_trait]
impl ReceiptContract for AlloyReceiptContract {
	fn address(&self) -> Address {
		self.contract
	}

	fn account(&self) -> Address {
		self.account
	}

	async fn receipt_count(&self) -> Result<u64, GatewayError> {
		let instance = IFuelReceipts::new(self.contract, &self.provider);
		let count = instance
			.receiptCount()
			.from(self.account)
			.call()
			.await
			.map_err(|e| GatewayError::Call(format!("receiptCount() failed: {}", e)))?;

		u256_to_u64("receiptCount", count._0).map_err(|e| GatewayError::Decode(e.to_string()))
	}

	async fn get_receipt(&self, index: u64) -> Result<RawReceipt, GatewayError> {
		let instance = IFuelReceipts::new(self.contract, &self.provider);
		let ret = instance
			.getReceipt(U256::from(index))
			.from(self.account)
			.call()
			.await
			.map_err(|e| GatewayError::Call(format!("getReceipt({}) failed: {}", index, e)))?;

		decode_receipt(ret)
	}
}

/// Converts the ABI return tuple of `getReceipt` into a [`RawReceipt`].
///
/// Numeric fields wider than 64 bits are rejected rather than truncated.
pub fn decode_receipt(ret: IFuelReceipts::getReceiptReturn) -> Result<RawReceipt, GatewayError> {
	let decode = |e: receipts_types::ConversionError| GatewayError::Decode(e.to_string());

	Ok(RawReceipt {
		receipt_number: ret.receiptNumber,
		date: ret.date,
		time: ret.time,
		fuel_type: ret.fuelType,
		quantity_units: u256_to_u64("quantityGallons", ret.quantityGallons).map_err(decode)?,
		location_name: ret.locationName,
		location_address: ret.locationAddress,
		carbon_emissions: u256_to_u64("carbonEmissions", ret.carbonEmissions).map_err(decode)?,
	})
}

/// Configuration schema for the JSON-RPC wallet provider.
pub struct AlloyWalletSchema;

impl AlloyWalletSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for AlloyWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("rpc_url", FieldType::String).with_validator(http_url)],
			vec![Field::new("account", FieldType::String).with_validator(hex_address)],
		);

		schema.validate(config)
	}
}

/// Factory function to create a JSON-RPC wallet provider from configuration.
///
/// Configuration parameters:
/// - `rpc_url`: HTTP endpoint of the node or wallet (required)
/// - `account`: account to read from without requesting authorization (optional)
pub fn create_alloy_wallet(config: &toml::Value) -> Result<Box<dyn WalletProvider>, GatewayError> {
	AlloyWalletSchema::validate_config(config)
		.map_err(|e| GatewayError::Configuration(format!("Invalid configuration: {}", e)))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| GatewayError::Configuration("rpc_url is required".to_string()))?;

	let account = config
		.get("account")
		.and_then(|v| v.as_str())
		.map(parse_address)
		.transpose()
		.map_err(|e| GatewayError::Configuration(e.to_string()))?;

	Ok(Box::new(AlloyWalletProvider::new(rpc_url, account)?))
}

/// Registry for the JSON-RPC wallet provider.
pub struct Registry;

impl receipts_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::GatewayFactory;

	fn factory() -> Self::Factory {
		create_alloy_wallet
	}
}

impl crate::GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_return(quantity: U256, emissions: U256) -> IFuelReceipts::getReceiptReturn {
		IFuelReceipts::getReceiptReturn {
			receiptNumber: "INV-7".to_string(),
			date: "2024-01-09".to_string(),
			time: "12:00:00".to_string(),
			fuelType: "diesel".to_string(),
			quantityGallons: quantity,
			locationName: "Depot".to_string(),
			locationAddress: "4 Dock Road".to_string(),
			carbonEmissions: emissions,
		}
	}

	#[test]
	fn test_call_signatures() {
		use alloy_sol_types::SolCall;

		assert_eq!(
			IFuelReceipts::storeReceiptCall::SIGNATURE,
			"storeReceipt(string,string,string,string,uint256,string,string)"
		);
		assert_eq!(IFuelReceipts::getReceiptCall::SIGNATURE, "getReceipt(uint256)");
		assert_eq!(IFuelReceipts::receiptCountCall::SIGNATURE, "receiptCount()");
	}

	#[test]
	fn test_decode_receipt() {
		let raw = decode_receipt(sample_return(U256::from(45230u64), U256::from(2500u64))).unwrap();
		assert_eq!(raw.receipt_number, "INV-7");
		assert_eq!(raw.fuel_type, "diesel");
		assert_eq!(raw.quantity_units, 45230);
		assert_eq!(raw.carbon_emissions, 2500);
	}

	#[test]
	fn test_decode_rejects_oversized_quantity() {
		let oversized = U256::from(u64::MAX) + U256::from(1u64);
		let err = decode_receipt(sample_return(oversized, U256::ZERO)).unwrap_err();
		assert!(matches!(err, GatewayError::Decode(_)));
		assert!(err.to_string().contains("quantityGallons"));
	}

	#[test]
	fn test_schema_requires_rpc_url() {
		let config: toml::Value =
			toml::from_str(r#"account = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8""#).unwrap();
		assert!(AlloyWalletSchema::validate_config(&config).is_err());
	}

	#[test]
	fn test_schema_rejects_bad_account() {
		let config: toml::Value = toml::from_str(
			r#"
rpc_url = "http://127.0.0.1:7545"
account = "0x1234"
"#,
		)
		.unwrap();
		assert!(AlloyWalletSchema::validate_config(&config).is_err());
	}

	#[tokio::test]
	async fn test_factory_uses_configured_account() {
		let config: toml::Value = toml::from_str(
			r#"
rpc_url = "http://127.0.0.1:7545"
account = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
"#,
		)
		.unwrap();
		let provider = create_alloy_wallet(&config).unwrap();

		let accounts = provider.accounts().await.unwrap();
		assert_eq!(
			accounts,
			vec![parse_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()]
		);
	}
}
