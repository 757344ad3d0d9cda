//! Utility functions for type conversions and display formatting.

pub mod conversion;
pub mod formatting;

pub use conversion::{parse_address, u256_to_u64, ConversionError};
pub use formatting::{format_carbon_emissions, format_quantity, group_thousands};
