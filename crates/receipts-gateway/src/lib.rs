//! Contract gateway for the fuel receipt contract.
//!
//! The gateway turns a wallet provider into an authorized handle on the
//! receipt contract. The provider is always passed in explicitly, so callers
//! decide where it comes from (an RPC endpoint, an in-memory fake) and the
//! rest of the system never reaches for ambient state.

use alloy_primitives::Address;
use async_trait::async_trait;
use receipts_types::{ConfigSchema, ImplementationRegistry, RawReceipt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod memory;
}

/// Errors that can occur while obtaining or using a contract handle.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
	/// No wallet provider is configured or it cannot be reached.
	#[error("Wallet provider unavailable: {0}")]
	ProviderUnavailable(String),
	/// The provider refused to expose an account.
	#[error("Account authorization denied: {0}")]
	AuthorizationDenied(String),
	/// A contract read failed (transport error or revert).
	#[error("Contract call failed: {0}")]
	Call(String),
	/// The contract answered with a value the reader cannot represent.
	#[error("Failed to decode contract response: {0}")]
	Decode(String),
	/// A contract read did not complete in time.
	#[error("Contract call timed out after {0:?}")]
	Timeout(Duration),
	/// Implementation configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A wallet provider able to expose accounts and bind contract handles.
///
/// Mirrors the two JSON-RPC account methods a browser wallet offers:
/// `eth_accounts` (silent) and `eth_requestAccounts` (may prompt).
#[async_trait]
pub trait WalletProvider: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Accounts already authorized for this client, without prompting.
	async fn accounts(&self) -> Result<Vec<Address>, GatewayError>;

	/// Requests account authorization, which may prompt the user.
	async fn request_accounts(&self) -> Result<Vec<Address>, GatewayError>;

	/// Binds a handle to `contract` that issues calls from `account`.
	fn bind(&self, contract: Address, account: Address) -> Arc<dyn ReceiptContract>;
}

/// Read access to the receipt contract.
#[async_trait]
pub trait ReceiptContract: Send + Sync {
	/// Address of the bound contract.
	fn address(&self) -> Address;

	/// Account the handle was authorized for when it was created.
	fn account(&self) -> Address;

	/// Calls `receiptCount()`.
	async fn receipt_count(&self) -> Result<u64, GatewayError>;

	/// Calls `getReceipt(index)` and decodes the returned tuple.
	async fn get_receipt(&self, index: u64) -> Result<RawReceipt, GatewayError>;
}

/// Type alias for wallet provider factory functions.
pub type GatewayFactory = fn(&toml::Value) -> Result<Box<dyn WalletProvider>, GatewayError>;

/// Registry trait for wallet provider implementations.
pub trait GatewayRegistry: ImplementationRegistry<Factory = GatewayFactory> {}

/// All registered wallet provider implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{evm::alloy, memory};

	vec![
		(alloy::Registry::NAME, alloy::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Produces authorized handles on one fixed contract.
///
/// The gateway itself holds no state beyond the provider and address; each
/// call to [`ContractGateway::connect`] returns a fresh handle bound to the
/// account that is active at that moment.
pub struct ContractGateway {
	provider: Option<Arc<dyn WalletProvider>>,
	contract_address: Address,
}

impl ContractGateway {
	/// Creates a gateway. `provider` is `None` when no wallet is installed.
	pub fn new(provider: Option<Arc<dyn WalletProvider>>, contract_address: Address) -> Self {
		Self {
			provider,
			contract_address,
		}
	}

	pub fn contract_address(&self) -> Address {
		self.contract_address
	}

	pub fn has_provider(&self) -> bool {
		self.provider.is_some()
	}

	/// Obtains an authorized contract handle.
	///
	/// Already-authorized accounts are reused without prompting; otherwise
	/// authorization is requested once. The first account is used.
	pub async fn connect(&self) -> Result<Arc<dyn ReceiptContract>, GatewayError> {
		let provider = self.provider.as_ref().ok_or_else(|| {
			GatewayError::ProviderUnavailable("no wallet provider configured".to_string())
		})?;

		let mut accounts = provider.accounts().await?;
		if accounts.is_empty() {
			tracing::debug!("No authorized account, requesting authorization");
			accounts = provider.request_accounts().await.map_err(|e| match e {
				GatewayError::AuthorizationDenied(_) | GatewayError::ProviderUnavailable(_) => e,
				other => GatewayError::AuthorizationDenied(other.to_string()),
			})?;
		}

		let account = accounts.first().copied().ok_or_else(|| {
			GatewayError::AuthorizationDenied("provider returned no accounts".to_string())
		})?;

		tracing::debug!(
			contract = %self.contract_address,
			account = %account,
			"Bound receipt contract handle"
		);
		Ok(provider.bind(self.contract_address, account))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryWalletProvider;
	use alloy_primitives::address;

	const CONTRACT: Address = address!("22322523620dCa925Cb24890cf184a5224822890");
	const ALICE: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

	#[tokio::test]
	async fn test_missing_provider_is_unavailable() {
		let gateway = ContractGateway::new(None, CONTRACT);
		assert!(!gateway.has_provider());
		let err = gateway.connect().await.err().unwrap();
		assert!(matches!(err, GatewayError::ProviderUnavailable(_)));
	}

	#[tokio::test]
	async fn test_authorized_account_does_not_prompt() {
		let provider = Arc::new(MemoryWalletProvider::new().with_authorized_account(ALICE));
		let gateway = ContractGateway::new(Some(provider.clone()), CONTRACT);

		let handle = gateway.connect().await.unwrap();
		gateway.connect().await.unwrap();

		assert_eq!(handle.account(), ALICE);
		assert_eq!(handle.address(), CONTRACT);
		assert_eq!(provider.authorization_requests(), 0);
	}

	#[tokio::test]
	async fn test_unauthorized_requests_once_then_reuses() {
		let provider = Arc::new(MemoryWalletProvider::new().granting(ALICE));
		let gateway = ContractGateway::new(Some(provider.clone()), CONTRACT);

		let handle = gateway.connect().await.unwrap();
		assert_eq!(handle.account(), ALICE);
		assert_eq!(provider.authorization_requests(), 1);

		gateway.connect().await.unwrap();
		assert_eq!(provider.authorization_requests(), 1);
	}

	#[tokio::test]
	async fn test_denied_authorization() {
		let provider = Arc::new(MemoryWalletProvider::new().denying_authorization());
		let gateway = ContractGateway::new(Some(provider), CONTRACT);

		let err = gateway.connect().await.err().unwrap();
		assert!(matches!(err, GatewayError::AuthorizationDenied(_)));
	}

	#[tokio::test]
	async fn test_handle_keeps_account_after_switch() {
		let provider = Arc::new(MemoryWalletProvider::new().with_authorized_account(ALICE));
		let gateway = ContractGateway::new(Some(provider.clone()), CONTRACT);
		let handle = gateway.connect().await.unwrap();

		let bob = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
		provider.switch_account(bob).await;

		assert_eq!(handle.account(), ALICE);
		assert_eq!(gateway.connect().await.unwrap().account(), bob);
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["evm_alloy", "memory"]);
	}
}
