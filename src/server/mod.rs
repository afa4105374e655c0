//! Probe server.
//!
//! A passive responder: it owns one keypair for the life of the process,
//! remembers which public key each client identity registered, and answers
//! probes on every configured port at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  :80 listener   :8080 listener   ...   (one axum::serve each)│
//! │        │              │                                      │
//! │        └──────┬───────┘                                      │
//! │               ▼                                              │
//! │  ┌─────────────────────────────────────────────────────────┐ │
//! │  │ Router: /v1/kex /v1/config /v1/data /v1/log /           │ │
//! │  └─────────────────────────────────────────────────────────┘ │
//! │        │              │               │              │       │
//! │        ▼              ▼               ▼              ▼       │
//! │  PeerRegistry   CryptoSession    ProbeConfig    ReportSink   │
//! │  (RwLock map)   (server keypair) (canaries)     (tracing)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
mod handlers;
mod metrics;
mod registry;
mod sink;

pub use config::ServerConfig;
pub use handlers::{router, AppState, Rejection, SpechtId};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::PeerRegistry;
pub use sink::{MemorySink, ReportSink, TracingSink};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::crypto::{CryptoSession, PublicKey};
use crate::error::{Error, Result};

/// How long shutdown waits for in-flight requests before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main server instance.
pub struct Server {
    config: ServerConfig,
    crypto: Arc<CryptoSession>,
    registry: Arc<PeerRegistry>,
    sink: Arc<dyn ReportSink>,
    metrics: Arc<ServerMetrics>,
}

impl Server {
    /// Create a new server with the given configuration and a fresh keypair.
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate().map_err(Error::config)?;

        Ok(Self {
            config,
            crypto: Arc::new(CryptoSession::generate()?),
            registry: Arc::new(PeerRegistry::new()),
            sink: Arc::new(TracingSink),
            metrics: Arc::new(ServerMetrics::new()),
        })
    }

    /// Send client reports somewhere other than the tracing log.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The server's public key, as returned by `/v1/kex`.
    pub fn public_key(&self) -> PublicKey {
        self.crypto.public_key()
    }

    /// Bind every configured port and start serving.
    ///
    /// A port that cannot be bound is logged and skipped. Fails only when
    /// no port could be bound at all.
    pub async fn bind(self) -> Result<RunningServer> {
        let mut listeners = Vec::new();
        for port in &self.config.probe.ports {
            let addr = SocketAddr::new(self.config.listen_addr, *port);
            match TcpListener::bind(addr).await {
                Ok(listener) => listeners.push(listener),
                Err(e) => tracing::warn!("listen: {}: {}", addr, e),
            }
        }
        if listeners.is_empty() {
            return Err(Error::config("no configured port could be bound"));
        }

        let local_addrs = listeners
            .iter()
            .map(TcpListener::local_addr)
            .collect::<std::io::Result<Vec<_>>>()?;

        // Advertise the ports actually bound, which differ for port 0
        let mut probe = self.config.probe.clone();
        probe.ports = local_addrs.iter().map(SocketAddr::port).collect();

        let state = AppState::new(
            Arc::clone(&self.crypto),
            Arc::new(probe),
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
            Arc::clone(&self.metrics),
        );
        let app = router(state);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::with_capacity(listeners.len());
        for listener in listeners {
            let app = app.clone();
            let mut rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = rx.changed().await;
                    })
                    .await
            }));
        }

        for addr in &local_addrs {
            tracing::info!("Mauerspecht server listening on {}", addr);
        }

        Ok(RunningServer {
            local_addrs,
            public_key: self.crypto.public_key(),
            registry: self.registry,
            metrics: self.metrics,
            shutdown: shutdown_tx,
            tasks,
        })
    }
}

/// Handle to a server whose listeners are running.
///
/// Dropping it also stops the listeners.
pub struct RunningServer {
    local_addrs: Vec<SocketAddr>,
    public_key: PublicKey,
    registry: Arc<PeerRegistry>,
    metrics: Arc<ServerMetrics>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<std::io::Result<()>>>,
}

impl RunningServer {
    /// Addresses actually bound, one per listener.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// The server's public key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Registered client keys.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Get server metrics.
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    /// Close every listener and wait for the serving tasks to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        for mut task in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => tracing::warn!("listener stopped with error: {}", e),
                Ok(Err(e)) => tracing::warn!("listener task failed: {}", e),
                Err(_) => {
                    tracing::warn!("listener did not stop in time, aborting");
                    task.abort();
                }
            }
        }
        tracing::info!("server stopped\n{}", self.metrics.format_report());
    }
}
