//! Volume unit preference used when displaying fuel quantities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Litres in one US gallon.
pub const LITRES_PER_GALLON: f64 = 3.78541;

/// Unit in which quantities are displayed.
///
/// Stored quantities are always litres; this only changes formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeUnit {
	#[default]
	Litres,
	Gallons,
}

impl VolumeUnit {
	/// The label appended to formatted quantities.
	pub fn label(&self) -> &'static str {
		match self {
			VolumeUnit::Litres => "litres",
			VolumeUnit::Gallons => "gallons",
		}
	}

	/// The other unit.
	pub fn toggled(self) -> Self {
		match self {
			VolumeUnit::Litres => VolumeUnit::Gallons,
			VolumeUnit::Gallons => VolumeUnit::Litres,
		}
	}

	/// Converts a quantity in litres into this unit.
	pub fn convert(self, litres: f64) -> f64 {
		match self {
			VolumeUnit::Litres => litres,
			VolumeUnit::Gallons => litres / LITRES_PER_GALLON,
		}
	}

	/// Converts a quantity in this unit back into litres.
	pub fn to_litres(self, value: f64) -> f64 {
		match self {
			VolumeUnit::Litres => value,
			VolumeUnit::Gallons => value * LITRES_PER_GALLON,
		}
	}
}

impl fmt::Display for VolumeUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

impl FromStr for VolumeUnit {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"litres" | "liters" | "litre" | "liter" | "l" => Ok(VolumeUnit::Litres),
			"gallons" | "gallon" | "gal" => Ok(VolumeUnit::Gallons),
			other => Err(format!(
				"Unknown volume unit '{}', expected 'litres' or 'gallons'",
				other
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_toggle() {
		assert_eq!(VolumeUnit::Litres.toggled(), VolumeUnit::Gallons);
		assert_eq!(VolumeUnit::Gallons.toggled(), VolumeUnit::Litres);
		assert_eq!(VolumeUnit::default(), VolumeUnit::Litres);
	}

	#[test]
	fn test_gallon_round_trip_within_tolerance() {
		let litres = 45.230;
		let gallons = VolumeUnit::Gallons.convert(litres);
		assert!((gallons - 11.948507559).abs() < 1e-6);
		let back = VolumeUnit::Gallons.to_litres(gallons);
		assert!((back - litres).abs() < 1e-9);
	}

	#[test]
	fn test_parse() {
		assert_eq!("litres".parse::<VolumeUnit>().unwrap(), VolumeUnit::Litres);
		assert_eq!("Gallons".parse::<VolumeUnit>().unwrap(), VolumeUnit::Gallons);
		assert_eq!("gal".parse::<VolumeUnit>().unwrap(), VolumeUnit::Gallons);
		assert!("barrels".parse::<VolumeUnit>().is_err());
	}

	#[test]
	fn test_serde_lowercase() {
		assert_eq!(
			serde_json::to_string(&VolumeUnit::Gallons).unwrap(),
			"\"gallons\""
		);
	}
}
