//! Plain-text rendering of a receipt collection for the `list` command.

use receipts_types::{format_carbon_emissions, format_quantity, ReceiptCollection, VolumeUnit};
use std::fmt::Write;

pub const EMPTY_MESSAGE: &str = "No receipts found. Start by adding a new receipt.";

/// Renders the total panel followed by one block per receipt.
///
/// The total panel is omitted when there are no receipts.
pub fn render_receipts(receipts: &ReceiptCollection, unit: VolumeUnit) -> String {
	let mut out = String::new();

	if receipts.is_empty() {
		let _ = writeln!(out, "{}", EMPTY_MESSAGE);
		return out;
	}

	let _ = writeln!(
		out,
		"Total Carbon Emissions: {} CO₂",
		format_carbon_emissions(receipts.total_carbon_emissions())
	);
	let _ = writeln!(out, "Unit: {}", capitalize(unit.label()));

	for receipt in receipts {
		let _ = writeln!(out);
		let _ = writeln!(out, "Receipt #{}", receipt.receipt_number);
		let _ = writeln!(out, "  {} at {}", receipt.date, receipt.time);
		let _ = writeln!(
			out,
			"  {} | {}",
			format_quantity(receipt.quantity_litres, unit),
			capitalize(&receipt.fuel_type)
		);
		let _ = writeln!(out, "  {}", receipt.location_name);
		let _ = writeln!(out, "  {}", receipt.location_address);
		let _ = writeln!(
			out,
			"  Carbon Emissions: {} CO₂",
			format_carbon_emissions(receipt.carbon_emissions)
		);
	}

	out
}

fn capitalize(value: &str) -> String {
	let mut chars = value.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use receipts_types::{RawReceipt, Receipt};

	fn receipt(index: u64, number: &str, carbon_emissions: u64) -> Receipt {
		Receipt::from_raw(
			index,
			RawReceipt {
				receipt_number: number.to_string(),
				date: "2024-03-01".to_string(),
				time: "08:15:00".to_string(),
				fuel_type: "diesel".to_string(),
				quantity_units: 45230,
				location_name: "Harbour Fuels".to_string(),
				location_address: "1 Quay Street".to_string(),
				carbon_emissions,
			},
		)
	}

	#[test]
	fn test_empty_collection_has_no_total() {
		let out = render_receipts(&ReceiptCollection::default(), VolumeUnit::Litres);
		assert_eq!(out.trim_end(), EMPTY_MESSAGE);
		assert!(!out.contains("Total"));
	}

	#[test]
	fn test_renders_total_and_receipts_in_order() {
		let receipts = ReceiptCollection::new(vec![
			receipt(0, "INV-1", 999),
			receipt(1, "INV-2", 1501),
		]);
		let out = render_receipts(&receipts, VolumeUnit::Litres);

		assert!(out.starts_with("Total Carbon Emissions: 2.50 kg CO₂\n"));
		assert!(out.contains("  45.230 litres | Diesel\n"));
		assert!(out.contains("  Carbon Emissions: 999 g CO₂\n"));
		assert!(out.contains("  2024-03-01 at 08:15:00\n"));

		let first = out.find("Receipt #INV-1").unwrap();
		let second = out.find("Receipt #INV-2").unwrap();
		assert!(first < second);
	}

	#[test]
	fn test_renders_gallons() {
		let receipts = ReceiptCollection::new(vec![receipt(0, "INV-1", 10)]);
		let out = render_receipts(&receipts, VolumeUnit::Gallons);
		assert!(out.contains("Unit: Gallons\n"));
		assert!(out.contains("  11.949 gallons | Diesel\n"));
	}

	#[test]
	fn test_capitalize() {
		assert_eq!(capitalize("petrol"), "Petrol");
		assert_eq!(capitalize(""), "");
	}
}
