//! Binary entry point serving the key endpoint.

// crates.io
use color_eyre::{Result, eyre::WrapErr};
use tokio::{net::TcpListener, signal};
// self
use tailnet_authkey::{
	config::{Config, ServerConfig},
	obs,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_tracing();

	let server_config = ServerConfig::from_env().wrap_err("Failed to read listener settings.")?;
	let state = AppState::from_config(Config::from_env());

	if state.is_configured() {
		tracing::info!("key issuance enabled");
	}

	let listener = TcpListener::bind(server_config.listen_addr)
		.await
		.wrap_err_with(|| format!("Failed to bind {}.", server_config.listen_addr))?;

	tracing::info!(addr = %listener.local_addr()?, "listening");

	server::serve(listener, state, shutdown_signal()).await.wrap_err("Server terminated.")?;

	tracing::info!("shut down");

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
}
