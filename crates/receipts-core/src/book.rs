//! Load-state holder for the receipt collection.
//!
//! Loads may overlap (a periodic refresh and a manual one, say). Every load
//! takes a [`LoadTicket`] when it starts and only the most recently issued
//! ticket may publish its result; anything older is dropped on arrival.

use crate::AggregatorError;
use chrono::{DateTime, Utc};
use receipts_types::{
	LoadStatus, ReceiptCollection, ReceiptSummary, ReceiptView, ReceiptsResponse, VolumeUnit,
};
use tokio::sync::RwLock;

/// Generation number handed to a load when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
	pub fn generation(&self) -> u64 {
		self.0
	}
}

/// Point-in-time copy of the book.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
	pub status: LoadStatus,
	pub receipts: ReceiptCollection,
	pub unit: VolumeUnit,
	pub loaded_at: Option<DateTime<Utc>>,
	/// Most recent failure, cleared by the next successful load.
	pub last_error: Option<AggregatorError>,
}

impl BookSnapshot {
	pub fn summary(&self) -> ReceiptSummary {
		ReceiptSummary::new(&self.receipts)
	}

	/// Renders the snapshot for the API, in `unit` or the book's preference.
	pub fn to_response(&self, unit: Option<VolumeUnit>) -> ReceiptsResponse {
		let unit = unit.unwrap_or(self.unit);
		ReceiptsResponse {
			status: self.status,
			unit,
			receipts: self
				.receipts
				.iter()
				.map(|receipt| ReceiptView::new(receipt, unit))
				.collect(),
			summary: self.summary(),
			loaded_at: self.loaded_at.map(|at| at.timestamp()),
			last_error: self.last_error.as_ref().map(|e| e.to_string()),
		}
	}
}

#[derive(Debug)]
struct BookState {
	status: LoadStatus,
	receipts: ReceiptCollection,
	unit: VolumeUnit,
	loaded_at: Option<DateTime<Utc>>,
	last_error: Option<AggregatorError>,
	issued: u64,
}

/// Latest receipt collection plus its load status and unit preference.
#[derive(Debug)]
pub struct ReceiptBook {
	state: RwLock<BookState>,
}

impl ReceiptBook {
	pub fn new(unit: VolumeUnit) -> Self {
		Self {
			state: RwLock::new(BookState {
				status: LoadStatus::Loading,
				receipts: ReceiptCollection::default(),
				unit,
				loaded_at: None,
				last_error: None,
				issued: 0,
			}),
		}
	}

	/// Starts a load and supersedes every ticket issued before.
	pub async fn begin_load(&self) -> LoadTicket {
		let mut state = self.state.write().await;
		state.issued += 1;
		if state.status == LoadStatus::Failed {
			state.status = LoadStatus::Loading;
		}
		LoadTicket(state.issued)
	}

	/// Publishes the result of the load holding `ticket`.
	///
	/// Returns `false` when the ticket is stale and the result was dropped.
	/// A failure after a successful load keeps the earlier receipts.
	pub async fn complete(
		&self,
		ticket: LoadTicket,
		result: Result<ReceiptCollection, AggregatorError>,
	) -> bool {
		let mut state = self.state.write().await;
		if ticket.0 != state.issued {
			tracing::debug!(
				ticket = ticket.0,
				current = state.issued,
				"Dropping result of superseded load"
			);
			return false;
		}

		match result {
			Ok(receipts) => {
				state.receipts = receipts;
				state.status = LoadStatus::Loaded;
				state.loaded_at = Some(Utc::now());
				state.last_error = None;
			},
			Err(e) => {
				if state.status != LoadStatus::Loaded {
					state.status = LoadStatus::Failed;
				}
				state.last_error = Some(e);
			},
		}
		true
	}

	pub async fn snapshot(&self) -> BookSnapshot {
		let state = self.state.read().await;
		BookSnapshot {
			status: state.status,
			receipts: state.receipts.clone(),
			unit: state.unit,
			loaded_at: state.loaded_at,
			last_error: state.last_error.clone(),
		}
	}

	pub async fn unit(&self) -> VolumeUnit {
		self.state.read().await.unit
	}

	pub async fn set_unit(&self, unit: VolumeUnit) {
		self.state.write().await.unit = unit;
	}

	/// Switches between litres and gallons and returns the new unit.
	pub async fn toggle_unit(&self) -> VolumeUnit {
		let mut state = self.state.write().await;
		state.unit = state.unit.toggled();
		state.unit
	}
}

impl Default for ReceiptBook {
	fn default() -> Self {
		Self::new(VolumeUnit::default())
	}
}
