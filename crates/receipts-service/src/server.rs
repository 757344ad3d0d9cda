//! HTTP server for the receipt reader API.

use crate::apis::receipts;
use axum::{
	extract::{Query, State},
	response::Json,
	routing::{get, post},
	Router,
};
use receipts_config::ApiConfig;
use receipts_core::ReceiptReader;
use receipts_types::{
	APIError, HealthResponse, ReceiptSummary, ReceiptsResponse, UnitResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub reader: Arc<ReceiptReader>,
}

/// Query string accepted by the receipt endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct UnitQuery {
	pub unit: Option<String>,
}

/// Builds the API router.
pub fn router(reader: Arc<ReceiptReader>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/receipts", get(handle_get_receipts))
				.route("/receipts/summary", get(handle_get_summary))
				.route("/receipts/refresh", post(handle_refresh))
				.route("/unit/toggle", post(handle_toggle_unit)),
		)
		.route("/health", get(handle_health))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { reader })
}

/// Starts the HTTP server and runs until it fails.
pub async fn start_server(
	api_config: ApiConfig,
	reader: Arc<ReceiptReader>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(reader);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Receipt API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/receipts requests.
async fn handle_get_receipts(
	State(state): State<AppState>,
	Query(query): Query<UnitQuery>,
) -> Result<Json<ReceiptsResponse>, APIError> {
	let unit = receipts::parse_unit(query.unit.as_deref())?;
	match receipts::get_receipts(&state.reader, unit).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Receipt listing failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/receipts/summary requests.
async fn handle_get_summary(
	State(state): State<AppState>,
) -> Result<Json<ReceiptSummary>, APIError> {
	receipts::get_summary(&state.reader).await.map(Json)
}

/// Handles POST /api/receipts/refresh requests.
async fn handle_refresh(
	State(state): State<AppState>,
	Query(query): Query<UnitQuery>,
) -> Result<Json<ReceiptsResponse>, APIError> {
	let unit = receipts::parse_unit(query.unit.as_deref())?;
	match receipts::refresh(&state.reader, unit).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Receipt refresh failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/unit/toggle requests.
async fn handle_toggle_unit(State(state): State<AppState>) -> Json<UnitResponse> {
	Json(receipts::toggle_unit(&state.reader).await)
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		reader_id: state.reader.config().reader.id.clone(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use receipts_config::Config;
	use receipts_core::ReaderBuilder;
	use receipts_gateway::implementations::memory::MemoryWalletProvider;
	use receipts_gateway::WalletProvider;
	use receipts_types::{LoadStatus, RawReceipt, VolumeUnit};

	fn state(provider: Option<Arc<dyn WalletProvider>>) -> AppState {
		let config: Config = "[reader]\nid = \"api-test\"\n[gateway]\n".parse().unwrap();
		let reader = ReaderBuilder::new(config)
			.build_with_provider(provider)
			.unwrap();
		AppState {
			reader: Arc::new(reader),
		}
	}

	fn raw(number: &str, carbon_emissions: u64) -> RawReceipt {
		RawReceipt {
			receipt_number: number.to_string(),
			date: "2024-08-15".to_string(),
			time: "18:45:00".to_string(),
			fuel_type: "diesel".to_string(),
			quantity_units: 45230,
			location_name: "Terminal".to_string(),
			location_address: "Gate 2".to_string(),
			carbon_emissions,
		}
	}

	fn unit(value: &str) -> Query<UnitQuery> {
		Query(UnitQuery {
			unit: Some(value.to_string()),
		})
	}

	#[tokio::test]
	async fn test_refresh_then_list() {
		let provider = Arc::new(
			MemoryWalletProvider::new().with_receipts(vec![raw("A", 1200), raw("B", 1300)]),
		);
		let state = state(Some(provider));

		let Json(refreshed) = handle_refresh(State(state.clone()), Query(UnitQuery::default()))
			.await
			.unwrap();
		assert_eq!(refreshed.status, LoadStatus::Loaded);
		assert_eq!(refreshed.receipts.len(), 2);

		let Json(listed) = handle_get_receipts(State(state.clone()), unit("gallons"))
			.await
			.unwrap();
		assert_eq!(listed.unit, VolumeUnit::Gallons);
		assert_eq!(listed.receipts[0].quantity, "11.949 gallons");
		assert_eq!(listed.receipts[1].receipt_number, "B");

		let Json(summary) = handle_get_summary(State(state)).await.unwrap();
		assert_eq!(summary.count, 2);
		assert_eq!(summary.total_carbon_emissions_display.as_deref(), Some("2.50 kg"));
	}

	#[tokio::test]
	async fn test_list_before_first_load_is_loading() {
		let state = state(Some(Arc::new(MemoryWalletProvider::new())));
		let Json(listed) = handle_get_receipts(State(state), Query(UnitQuery::default()))
			.await
			.unwrap();
		assert_eq!(listed.status, LoadStatus::Loading);
		assert!(listed.receipts.is_empty());
	}

	#[tokio::test]
	async fn test_missing_provider_is_service_unavailable() {
		let state = state(None);

		let err = handle_refresh(State(state.clone()), Query(UnitQuery::default()))
			.await
			.unwrap_err();
		assert_eq!(err.status_code(), 503);

		let err = handle_get_receipts(State(state), Query(UnitQuery::default()))
			.await
			.unwrap_err();
		assert_eq!(err.status_code(), 503);
	}

	#[tokio::test]
	async fn test_failed_fetch_is_bad_gateway() {
		let provider = Arc::new(MemoryWalletProvider::new().with_receipts(vec![raw("A", 1)]));
		provider.fail_receipt(0).await;
		let state = state(Some(provider));

		let err = handle_refresh(State(state.clone()), Query(UnitQuery::default()))
			.await
			.unwrap_err();
		assert_eq!(err.status_code(), 502);

		let err = handle_get_summary(State(state)).await.unwrap_err();
		assert_eq!(err.status_code(), 502);
	}

	#[tokio::test]
	async fn test_bad_unit_is_bad_request() {
		let state = state(None);
		let err = handle_get_receipts(State(state), unit("pints"))
			.await
			.unwrap_err();
		assert_eq!(err.status_code(), 400);
	}

	#[tokio::test]
	async fn test_toggle_unit_changes_default() {
		let state = state(Some(Arc::new(MemoryWalletProvider::new())));

		let Json(toggled) = handle_toggle_unit(State(state.clone())).await;
		assert_eq!(toggled.unit, VolumeUnit::Gallons);

		let Json(listed) = handle_get_receipts(State(state), Query(UnitQuery::default()))
			.await
			.unwrap();
		assert_eq!(listed.unit, VolumeUnit::Gallons);
	}

	#[tokio::test]
	async fn test_health() {
		let Json(health) = handle_health(State(state(None))).await;
		assert_eq!(health.status, "ok");
		assert_eq!(health.reader_id, "api-test");
	}
}
