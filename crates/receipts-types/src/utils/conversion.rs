//! Conversions between on-chain values and native Rust types.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors raised when an on-chain value cannot be represented natively.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
	#[error("Field '{field}' value {value} does not fit in 64 bits")]
	Overflow { field: &'static str, value: String },
	#[error("Invalid address '{0}'")]
	InvalidAddress(String),
}

/// Narrows a `uint256` contract value to `u64`, naming the field on failure.
pub fn u256_to_u64(field: &'static str, value: U256) -> Result<u64, ConversionError> {
	u64::try_from(value).map_err(|_| ConversionError::Overflow {
		field,
		value: value.to_string(),
	})
}

/// Parses a hex address, with or without `0x` prefix.
pub fn parse_address(raw: &str) -> Result<Address, ConversionError> {
	let trimmed = raw.trim();
	let hex_part = trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.unwrap_or(trimmed);

	if hex_part.len() != 40 {
		return Err(ConversionError::InvalidAddress(raw.to_string()));
	}

	hex_part
		.parse::<Address>()
		.map_err(|_| ConversionError::InvalidAddress(raw.to_string()))
}
