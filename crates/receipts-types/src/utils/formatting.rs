//! Display formatting for quantities and carbon emissions.
//!
//! These rules are part of the observable output of the reader: quantities
//! always carry exactly three decimals and their unit label, while emissions
//! switch from grams to kilograms at 1000 g.

use crate::units::VolumeUnit;

/// Formats a quantity stored in litres in the requested unit.
///
/// Conversion happens on a copy; the stored litres are never touched.
pub fn format_quantity(litres: f64, unit: VolumeUnit) -> String {
	format!("{:.3} {}", unit.convert(litres), unit.label())
}

/// Formats an emissions value in grams.
///
/// Values of at least 1000 g render as kilograms with two decimals,
/// smaller values as whole grams with thousands separators.
pub fn format_carbon_emissions(grams: impl Into<u128>) -> String {
	let grams = grams.into();
	if grams >= 1000 {
		format!("{:.2} kg", grams as f64 / 1000.0)
	} else {
		format!("{} g", group_thousands(grams))
	}
}

/// Renders an integer with `,` between each group of three digits.
pub fn group_thousands(value: u128) -> String {
	let digits = value.to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, ch) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(ch);
	}
	grouped
}
