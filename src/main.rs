use quiz_api::app;
use quiz_api::config::Config;
use quiz_api::server::{forward_signals, shutdown_channel};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(anyhow::Error::new(e).context("Failed to load configuration"));
        }
    };
    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Configuration loaded"
    );

    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let signals = tokio::spawn(forward_signals(shutdown_controller));

    if let Err(e) = app::run(&config, shutdown_signal).await {
        error!(error = %e, "Server terminated with error");
        return Err(anyhow::Error::new(e).context("Server failed"));
    }

    // A clean run means the signal task fired the shutdown, so it has finished
    match signals.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            return Err(anyhow::Error::new(e).context("Failed to register signal handlers"));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Signal task failed")),
    }

    info!("Server exited");
    Ok(())
}
