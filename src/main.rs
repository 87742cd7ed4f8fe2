use std::sync::Arc;

use minnow::broker::Broker;
use minnow::config::BrokerConfig;
use minnow::server::{KafkaServer, ShutdownHandle};
use minnow::telemetry::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BrokerConfig::from_env()?;
    init_logging(config.log_format).map_err(|e| -> Box<dyn std::error::Error> { e })?;

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    info!(
        broker_id = config.broker_id,
        host = %config.host,
        port = config.port,
        advertised_host = %config.advertised_host,
        data_path = %config.data_path.display(),
        fetch_compression = %config.fetch_compression,
        "Starting broker"
    );

    let broker = Arc::new(Broker::open(config.clone()).await);
    let addr = config.bind_addr();
    let server = KafkaServer::with_config(&addr, broker.clone(), config.connection_config())
        .await
        .inspect_err(|e| error!(address = %addr, error = %e, "Failed to bind listener"))?;

    info!(
        broker_id = config.broker_id,
        address = %addr,
        "Server is running. Connect with any Kafka client."
    );

    tokio::spawn(watch_signals(server.shutdown_handle()));
    server.run().await?;
    drop(server);

    if let Err(e) = broker.flush().await {
        error!(error = %e, "Final snapshot failed");
    }
    info!("Broker stopped");
    Ok(())
}

/// Trigger shutdown on the first SIGINT or SIGTERM.
async fn watch_signals(shutdown: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                return;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for ctrl-c");
                    return;
                }
            }
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        return;
    }

    info!("Shutdown signal received");
    shutdown.shutdown();
}
