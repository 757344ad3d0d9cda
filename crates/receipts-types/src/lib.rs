//! Common types module for the fuel receipt reader.
//!
//! This module defines the data model shared by every crate in the workspace:
//! the raw receipt tuple as stored on-chain, the normalized display model,
//! volume units, API payloads and the configuration validation framework.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Raw and normalized receipt types.
pub mod receipt;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Volume unit preference.
pub mod units;
/// Utility functions for conversions and display formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, U256};
pub use api::*;
pub use receipt::{RawReceipt, Receipt, ReceiptCollection, QUANTITY_SCALE};
pub use registry::ImplementationRegistry;
pub use units::{VolumeUnit, LITRES_PER_GALLON};
pub use utils::{
	format_carbon_emissions, format_quantity, group_thousands, parse_address, u256_to_u64,
	ConversionError,
};
pub use validation::*;
