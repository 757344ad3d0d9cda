//! API types for the receipt reader HTTP endpoints.
//!
//! These are the JSON shapes returned by the service: per-receipt views with
//! pre-formatted quantity and emission strings, the collection summary, and
//! a uniform error body.

use crate::receipt::{Receipt, ReceiptCollection};
use crate::units::VolumeUnit;
use crate::utils::{format_carbon_emissions, format_quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the receipt collection held by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
	/// No load has completed yet.
	Loading,
	/// At least one load succeeded; receipts are available.
	Loaded,
	/// The first load failed and nothing has been loaded since.
	Failed,
}

/// A receipt with its display strings resolved for one unit preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
	pub index: u64,
	pub receipt_number: String,
	pub date: String,
	pub time: String,
	pub fuel_type: String,
	pub quantity_litres: f64,
	/// Quantity in the requested unit, e.g. `"45.230 litres"`.
	pub quantity: String,
	pub location_name: String,
	pub location_address: String,
	pub carbon_emissions: u64,
	/// Emissions for display, e.g. `"2.50 kg"`.
	pub carbon_emissions_display: String,
}

impl ReceiptView {
	pub fn new(receipt: &Receipt, unit: VolumeUnit) -> Self {
		Self {
			index: receipt.index,
			receipt_number: receipt.receipt_number.clone(),
			date: receipt.date.clone(),
			time: receipt.time.clone(),
			fuel_type: receipt.fuel_type.clone(),
			quantity_litres: receipt.quantity_litres,
			quantity: format_quantity(receipt.quantity_litres, unit),
			location_name: receipt.location_name.clone(),
			location_address: receipt.location_address.clone(),
			carbon_emissions: receipt.carbon_emissions,
			carbon_emissions_display: format_carbon_emissions(receipt.carbon_emissions),
		}
	}
}

/// Aggregate figures over a receipt collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
	pub count: usize,
	pub total_carbon_emissions: u128,
	/// Formatted total; absent for an empty collection, which shows no total.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_carbon_emissions_display: Option<String>,
}

impl ReceiptSummary {
	pub fn new(receipts: &ReceiptCollection) -> Self {
		let total = receipts.total_carbon_emissions();
		Self {
			count: receipts.len(),
			total_carbon_emissions: total,
			total_carbon_emissions_display: (!receipts.is_empty())
				.then(|| format_carbon_emissions(total)),
		}
	}
}

/// Response for `GET /api/receipts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptsResponse {
	pub status: LoadStatus,
	pub unit: VolumeUnit,
	pub receipts: Vec<ReceiptView>,
	pub summary: ReceiptSummary,
	/// Unix timestamp of the load that produced `receipts`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub loaded_at: Option<i64>,
	/// Message of the most recent failed load, if it failed after the last success.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
}

/// Response for `POST /api/unit/toggle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResponse {
	pub unit: VolumeUnit,
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub reader_id: String,
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error kind, e.g. `PROVIDER_UNAVAILABLE`.
	pub error: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retryable: Option<bool>,
}

/// API error with its HTTP status class.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request (400).
	BadRequest { error_type: String, message: String },
	/// The upstream contract read failed (502).
	BadGateway { error_type: String, message: String },
	/// No usable wallet provider or authorization (503).
	ServiceUnavailable {
		error_type: String,
		message: String,
		retryable: bool,
	},
	/// Anything else (500).
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::BadGateway { .. } => 502,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retryable: None,
			},
			APIError::BadGateway {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retryable: Some(true),
			},
			APIError::ServiceUnavailable {
				error_type,
				message,
				retryable,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retryable: Some(*retryable),
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
