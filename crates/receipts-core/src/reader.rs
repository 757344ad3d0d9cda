//! The receipt reader: an aggregator plus the book its loads publish to.

use crate::{AggregatorError, ReceiptAggregator, ReceiptBook};
use receipts_config::Config;
use receipts_types::ReceiptCollection;
use std::time::Duration;

pub struct ReceiptReader {
	config: Config,
	aggregator: ReceiptAggregator,
	book: ReceiptBook,
}

impl ReceiptReader {
	pub fn new(config: Config, aggregator: ReceiptAggregator) -> Self {
		let book = ReceiptBook::new(config.reader.default_unit);
		Self {
			config,
			aggregator,
			book,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn aggregator(&self) -> &ReceiptAggregator {
		&self.aggregator
	}

	pub fn book(&self) -> &ReceiptBook {
		&self.book
	}

	/// Runs one load and publishes it to the book.
	///
	/// The result is returned to the caller even when a newer load has
	/// superseded this one in the book.
	pub async fn refresh(&self) -> Result<ReceiptCollection, AggregatorError> {
		let ticket = self.book.begin_load().await;
		let result = self.aggregator.load().await;

		match &result {
			Ok(receipts) => tracing::info!(
				reader = %self.config.reader.id,
				count = receipts.len(),
				"Loaded receipts"
			),
			Err(e) if e.is_retryable() => tracing::warn!(
				reader = %self.config.reader.id,
				error = %e,
				"Receipt load failed"
			),
			Err(e) => tracing::error!(
				reader = %self.config.reader.id,
				error = %e,
				"Receipt load failed"
			),
		}

		self.book.complete(ticket, result.clone()).await;
		result
	}

	/// Reloads receipts every `every` until the future is dropped.
	///
	/// The first load happens immediately. Ticks missed while a load is
	/// still running are skipped.
	pub async fn run_refresh_loop(&self, every: Duration) {
		let mut interval = tokio::time::interval(every);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

		loop {
			interval.tick().await;
			// Failures are already logged and recorded in the book.
			let _ = self.refresh().await;
		}
	}
}
