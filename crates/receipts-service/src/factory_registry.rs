//! Factory registry for wallet provider implementations.
//!
//! Every implementation the gateway crate ships is registered once; the
//! configuration then picks one by name.

use receipts_config::Config;
use receipts_core::{ReaderBuilder, ReceiptReader};
use receipts_gateway::GatewayFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub gateway: HashMap<String, GatewayFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			gateway: HashMap::new(),
		}
	}

	/// Register a wallet provider implementation
	pub fn register_gateway(&mut self, name: impl Into<String>, factory: GatewayFactory) {
		self.gateway.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, initializing it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in receipts_gateway::get_all_implementations() {
			tracing::debug!("Registering gateway implementation: {}", name);
			registry.register_gateway(name, factory);
		}

		registry
	})
}

/// Build a receipt reader using the registry and config.
///
/// Every configured implementation must be known to the registry, even the
/// ones that are not selected as primary.
pub fn build_reader_from_config(
	config: Config,
) -> Result<ReceiptReader, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut factories = HashMap::new();
	for name in config.gateway.implementations.keys() {
		match registry.gateway.get(name) {
			Some(factory) => {
				factories.insert(name.clone(), *factory);
			},
			None => {
				let mut available: Vec<_> = registry.gateway.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown gateway implementation '{}'. Available: [{}]",
					name,
					available.join(", ")
				)
				.into());
			},
		}
	}

	Ok(ReaderBuilder::new(config).build(&factories)?)
}
