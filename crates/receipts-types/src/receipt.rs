//! Receipt types for the fuel receipt contract.
//!
//! A receipt exists in two shapes: [`RawReceipt`], the positional tuple the
//! contract returns for `getReceipt(index)`, and [`Receipt`], the normalized
//! record the rest of the system works with.

use serde::{Deserialize, Serialize};

/// Divisor between the contract's stored quantity and litres.
///
/// The contract names its field `quantityGallons`, but every writer stores
/// thousandths of a litre and every reader labels the result litres. The
/// stored unit is treated as millilitres and the field name is left alone.
pub const QUANTITY_SCALE: f64 = 1000.0;

/// A receipt exactly as returned by the contract, before normalization.
///
/// Field order mirrors the ABI return tuple of `getReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReceipt {
	pub receipt_number: String,
	pub date: String,
	pub time: String,
	pub fuel_type: String,
	/// Quantity in thousandths of a litre (`quantityGallons` on-chain).
	pub quantity_units: u64,
	pub location_name: String,
	pub location_address: String,
	/// Carbon emissions in grams of CO₂.
	pub carbon_emissions: u64,
}

/// A normalized, display-ready receipt.
///
/// Receipts have no identity beyond their position in the contract; `index`
/// is that position and is not necessarily related to `receipt_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
	pub index: u64,
	pub receipt_number: String,
	pub date: String,
	pub time: String,
	pub fuel_type: String,
	pub quantity_litres: f64,
	pub location_name: String,
	pub location_address: String,
	pub carbon_emissions: u64,
}

impl Receipt {
	/// Normalizes the raw receipt stored at `index`.
	///
	/// Strings and emissions pass through untouched; only the quantity is
	/// rescaled to litres.
	pub fn from_raw(index: u64, raw: RawReceipt) -> Self {
		Self {
			index,
			receipt_number: raw.receipt_number,
			date: raw.date,
			time: raw.time,
			fuel_type: raw.fuel_type,
			quantity_litres: raw.quantity_units as f64 / QUANTITY_SCALE,
			location_name: raw.location_name,
			location_address: raw.location_address,
			carbon_emissions: raw.carbon_emissions,
		}
	}
}

/// Ordered receipts from a single load, aligned with contract indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptCollection(Vec<Receipt>);

impl ReceiptCollection {
	pub fn new(receipts: Vec<Receipt>) -> Self {
		Self(receipts)
	}

	pub fn receipts(&self) -> &[Receipt] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Receipt> {
		self.0.iter()
	}

	/// Sum of every receipt's emissions in grams.
	///
	/// Accumulated in `u128` so that no realistic collection of `u64` values
	/// can overflow.
	pub fn total_carbon_emissions(&self) -> u128 {
		self.0
			.iter()
			.map(|receipt| receipt.carbon_emissions as u128)
			.sum()
	}
}

impl From<Vec<Receipt>> for ReceiptCollection {
	fn from(receipts: Vec<Receipt>) -> Self {
		Self(receipts)
	}
}

impl IntoIterator for ReceiptCollection {
	type Item = Receipt;
	type IntoIter = std::vec::IntoIter<Receipt>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a ReceiptCollection {
	type Item = &'a Receipt;
	type IntoIter = std::slice::Iter<'a, Receipt>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
