//! Main entry point for the fuel receipt reader.
//!
//! Reads every receipt stored in the fuel receipt contract and either prints
//! them (`list`) or serves them over HTTP (`serve`).

use clap::{Parser, Subcommand};
use receipts_config::Config;
use receipts_types::VolumeUnit;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod render;
mod server;

/// Command-line arguments for the receipt reader.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "RECEIPTS_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Load all receipts once and print them
	List {
		/// Volume unit (litres or gallons); defaults to the configured unit
		#[arg(short, long)]
		unit: Option<VolumeUnit>,
	},
	/// Serve receipts over the HTTP API
	Serve,
}

/// Main entry point for the receipt reader.
///
/// Without a subcommand the reader serves when the API is enabled in the
/// configuration and lists otherwise.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.reader.id);

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);
	let command = args.command.unwrap_or(if api_enabled {
		Command::Serve
	} else {
		Command::List { unit: None }
	});

	let reader = Arc::new(factory_registry::build_reader_from_config(config)?);

	match command {
		Command::List { unit } => {
			let receipts = reader.refresh().await?;
			let unit = match unit {
				Some(unit) => unit,
				None => reader.book().unit().await,
			};
			print!("{}", render::render_receipts(&receipts, unit));
		},
		Command::Serve => {
			let api_config = reader
				.config()
				.api
				.clone()
				.filter(|api| api.enabled)
				.ok_or("API is not enabled; set [api] enabled = true to serve")?;

			let refresh_every = api_config
				.refresh_interval_secs
				.map(std::time::Duration::from_secs);

			let api_task = server::start_server(api_config, Arc::clone(&reader));

			match refresh_every {
				Some(every) => {
					let refresh_task = reader.run_refresh_loop(every);
					tokio::select! {
						result = api_task => {
							tracing::info!("API server finished");
							result?;
						}
						_ = refresh_task => {}
					}
				},
				None => {
					let initial = Arc::clone(&reader);
					tokio::spawn(async move {
						let _ = initial.refresh().await;
					});
					api_task.await?;
				},
			}
		},
	}

	Ok(())
}
