//! Receipt endpoints of the reader API.
//!
//! Reads are served from the reader's book, so they never touch the chain.
//! Only an explicit refresh runs a load.

use receipts_core::{AggregatorError, ReceiptReader};
use receipts_types::{
	APIError, LoadStatus, ReceiptSummary, ReceiptsResponse, UnitResponse, VolumeUnit,
};

/// Maps a load failure to its HTTP error.
///
/// Wallet problems are 503 because the reader itself cannot fix them; a
/// failed contract read is 502 and can simply be retried.
pub fn aggregator_error(err: &AggregatorError) -> APIError {
	match err {
		AggregatorError::ProviderUnavailable(_) | AggregatorError::AuthorizationDenied(_) => {
			APIError::ServiceUnavailable {
				error_type: err.kind().to_string(),
				message: err.to_string(),
				retryable: err.is_retryable(),
			}
		},
		AggregatorError::AggregationFailed(_) => APIError::BadGateway {
			error_type: err.kind().to_string(),
			message: err.to_string(),
		},
	}
}

/// Parses the optional `unit` query parameter.
pub fn parse_unit(raw: Option<&str>) -> Result<Option<VolumeUnit>, APIError> {
	raw.map(|value| {
		value.parse().map_err(|e: String| APIError::BadRequest {
			error_type: "INVALID_UNIT".to_string(),
			message: e,
		})
	})
	.transpose()
}

/// Fails when no load has ever succeeded and the last attempt failed.
fn ensure_available(
	status: LoadStatus,
	last_error: Option<&AggregatorError>,
) -> Result<(), APIError> {
	if status != LoadStatus::Failed {
		return Ok(());
	}

	Err(match last_error {
		Some(err) => aggregator_error(err),
		None => APIError::InternalServerError {
			error_type: "LOAD_FAILED".to_string(),
			message: "Receipt load failed".to_string(),
		},
	})
}

/// Returns the most recently loaded receipts.
pub async fn get_receipts(
	reader: &ReceiptReader,
	unit: Option<VolumeUnit>,
) -> Result<ReceiptsResponse, APIError> {
	let snapshot = reader.book().snapshot().await;
	ensure_available(snapshot.status, snapshot.last_error.as_ref())?;
	Ok(snapshot.to_response(unit))
}

/// Returns count and carbon totals of the most recent load.
pub async fn get_summary(reader: &ReceiptReader) -> Result<ReceiptSummary, APIError> {
	let snapshot = reader.book().snapshot().await;
	ensure_available(snapshot.status, snapshot.last_error.as_ref())?;
	Ok(snapshot.summary())
}

/// Runs a load now and returns its outcome.
pub async fn refresh(
	reader: &ReceiptReader,
	unit: Option<VolumeUnit>,
) -> Result<ReceiptsResponse, APIError> {
	reader
		.refresh()
		.await
		.map_err(|e| aggregator_error(&e))?;

	Ok(reader.book().snapshot().await.to_response(unit))
}

/// Flips the default unit used when a request does not name one.
pub async fn toggle_unit(reader: &ReceiptReader) -> UnitResponse {
	UnitResponse {
		unit: reader.book().toggle_unit().await,
	}
}
