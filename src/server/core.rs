use anyhow::Context;
use log::{error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::bus::BusAdapter;
use crate::config::ServiceConfig;
use crate::server::http;
use crate::storage::FileStore;

/// The file service: one store shared by every transport.
pub struct Server {
    config: ServiceConfig,
    store: Arc<FileStore>,
}

impl Server {
    /// Opens the storage root, creating it if absent.
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let root = config.storage.root();
        let store = FileStore::open(&root)
            .with_context(|| format!("Failed to create or access storage root {}", root.display()))?;
        info!("Storage root: {}", store.root().display());

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub fn store(&self) -> Arc<FileStore> {
        Arc::clone(&self.store)
    }

    /// Run on a dedicated runtime until SIGINT/SIGTERM. Blocking work still
    /// running once the grace period has passed is abandoned so the process
    /// can exit.
    pub fn run(self) -> anyhow::Result<()> {
        let grace = self.config.server.shutdown_grace();
        block_on_bounded(self.start(), grace)
    }

    /// Run until SIGINT/SIGTERM.
    pub async fn start(self) -> anyhow::Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Run until `signal` resolves, then give in-flight work the configured
    /// grace period before returning.
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> anyhow::Result<()> {
        let addr = self.config.server.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(
            "HTTP adapter listening on {} (routes under {})",
            addr, self.config.server.route_prefix
        );

        let shutdown = CancellationToken::new();
        let app = http::router(self.store(), &self.config.server);
        let mut http_task = tokio::spawn(http::serve(listener, app, shutdown.clone()));

        let bus_task = if self.config.bus.enabled {
            let client = BusAdapter::connect(&self.config.bus)
                .await
                .with_context(|| format!("Failed to connect to bus at {}", self.config.bus.url))?;
            let adapter = BusAdapter::new(client, self.store(), self.config.bus.clone());
            Some(tokio::spawn(adapter.run(shutdown.clone())))
        } else {
            info!("Bus adapter disabled");
            None
        };

        tokio::select! {
            _ = signal => info!("Shutdown requested, no longer accepting requests"),
            result = &mut http_task => {
                shutdown.cancel();
                return match result {
                    Ok(Ok(())) => Err(anyhow::anyhow!("HTTP adapter stopped unexpectedly")),
                    Ok(Err(e)) => Err(e).context("HTTP adapter failed"),
                    Err(e) => Err(e).context("HTTP adapter task panicked"),
                };
            }
        }
        shutdown.cancel();

        let grace = self.config.server.shutdown_grace();
        let drain = async move {
            if let Err(e) = http_task.await {
                error!("HTTP adapter task failed during shutdown: {e}");
            }
            if let Some(bus_task) = bus_task {
                match bus_task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Bus adapter failed: {e}"),
                    Err(e) => error!("Bus adapter task failed during shutdown: {e}"),
                }
            }
        };

        match tokio::time::timeout(grace, drain).await {
            Ok(()) => info!("File service stopped"),
            Err(_) => warn!("In-flight requests still running after {grace:?}; forcing shutdown"),
        }
        Ok(())
    }
}

/// Drive `service` to completion, then stop the runtime waiting at most
/// `stop_timeout` for blocking tasks that are still running.
pub fn block_on_bounded<F>(service: F, stop_timeout: Duration) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let result = runtime.block_on(service);
    runtime.shutdown_timeout(stop_timeout);
    result
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                }
                return;
            }
            Err(e) => warn!("Failed to register SIGTERM handler: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received SIGINT");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn hung_blocking_work_does_not_hold_exit() {
        let started = Instant::now();
        let result = block_on_bounded(
            async {
                let _ = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
                Ok(())
            },
            Duration::from_millis(100),
        );

        assert!(result.is_ok());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn service_error_is_returned() {
        let result = block_on_bounded(
            async { Err(anyhow::anyhow!("bind failed")) },
            Duration::from_millis(100),
        );
        assert_eq!(result.unwrap_err().to_string(), "bind failed");
    }
}
