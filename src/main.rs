//! Binary entry point for the Twitch streams proxy.

// std
use std::sync::Arc;
// crates.io
use tokio::net::TcpListener;
// self
use twitch_streams_proxy::{
	clock::SystemClock,
	config::Config,
	gateway::{self, AppState},
	obs,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	obs::init_tracing();

	let config = match Config::load() {
		Ok(config) => config,
		Err(e) => {
			tracing::error!(error = %e, "Invalid configuration; refusing to start.");

			return Err(e.into());
		},
	};
	let state = AppState::from_config(&config, Arc::new(SystemClock))?;
	let listener = TcpListener::bind(config.bind).await?;

	tracing::info!(addr = %config.bind, "Proxy running on http://{}.", config.bind);
	gateway::serve(listener, state, shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %e, "Failed to listen for Ctrl-C; running until killed.");
		std::future::pending::<()>().await;
	}

	tracing::info!("Shutting down.");
}
