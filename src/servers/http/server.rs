//! Module to handle the HTTP server instances.
//!
//! Same shape as the UDP controller: a state machine over a fixed
//! configuration, starting and stopping an axum listener. TLS is served
//! through `axum-server` with a rustls config when both certificate and
//! key paths are set.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use super::handlers::{self, State};
use crate::core::Tracker;
use crate::servers::signals::{shutdown_signal, Halted};

/// Error that can occur when starting or stopping the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not bind the http listener: {0}")]
    CouldNotBind(std::io::Error),

    #[error("could not load the tls certificate or key: {0}")]
    BadTlsMaterial(std::io::Error),

    #[error("the server task could not be signalled or joined: {0}")]
    ChannelClosed(String),
}

/// A HTTP server instance controller with no listener running.
#[allow(clippy::module_name_repetitions)]
pub type StoppedHttpServer = HttpServer<Stopped>;

/// A HTTP server instance controller with a running listener.
#[allow(clippy::module_name_repetitions)]
pub type RunningHttpServer = HttpServer<Running>;

/// A HTTP server instance controller.
pub struct HttpServer<S> {
    /// The configuration the server is (re)started with.
    pub cfg: swarm_tracker_configuration::HttpTracker,
    /// The state of the server: `running` or `stopped`.
    pub state: S,
}

/// A stopped HTTP server state.
pub struct Stopped;

/// A running HTTP server state.
pub struct Running {
    /// The address the listener is bound to.
    pub bind_address: SocketAddr,
    halt_sender: tokio::sync::oneshot::Sender<Halted>,
    task: JoinHandle<()>,
}

/// Builds the route tree: `/announce` and `/scrape`, nothing else.
pub fn router(tracker: Arc<Tracker>, cfg: &swarm_tracker_configuration::HttpTracker) -> Router {
    let state = State {
        tracker,
        cfg: Arc::new(cfg.clone()),
    };

    Router::new()
        .route("/announce", get(handlers::announce::handle))
        .route("/scrape", get(handlers::scrape::handle))
        .layer(TimeoutLayer::new(cfg.request_timeout))
        .with_state(state)
}

impl HttpServer<Stopped> {
    #[must_use]
    pub fn new(cfg: swarm_tracker_configuration::HttpTracker) -> Self {
        Self { cfg, state: Stopped }
    }

    /// It starts the listener and returns a controller in `running`
    /// state.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the listener cannot be bound or the TLS
    /// material cannot be loaded.
    pub async fn start(self, tracker: Arc<Tracker>) -> Result<HttpServer<Running>, Error> {
        let (halt_sender, halt_receiver) = tokio::sync::oneshot::channel::<Halted>();

        let app = router(tracker, &self.cfg);
        let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

        let (bind_address, task) = if self.cfg.is_tls_enabled() {
            let cert_path = self.cfg.tls_cert_path.clone().expect("tls is enabled");
            let key_path = self.cfg.tls_key_path.clone().expect("tls is enabled");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
                .await
                .map_err(Error::BadTlsMaterial)?;

            let listener = std::net::TcpListener::bind(self.cfg.bind_address).map_err(Error::CouldNotBind)?;
            listener.set_nonblocking(true).map_err(Error::CouldNotBind)?;
            let bind_address = listener.local_addr().map_err(Error::CouldNotBind)?;

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal(halt_receiver).await;
                shutdown_handle.graceful_shutdown(None);
            });

            let task = tokio::spawn(async move {
                if let Err(e) = axum_server::from_tcp_rustls(listener, tls_config)
                    .handle(handle)
                    .serve(make_service)
                    .await
                {
                    tracing::error!("https tracker stopped with an error: {e}");
                }
            });

            (bind_address, task)
        } else {
            let listener = tokio::net::TcpListener::bind(self.cfg.bind_address)
                .await
                .map_err(Error::CouldNotBind)?;
            let bind_address = listener.local_addr().map_err(Error::CouldNotBind)?;

            let task = tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, make_service)
                    .with_graceful_shutdown(shutdown_signal(halt_receiver))
                    .await
                {
                    tracing::error!("http tracker stopped with an error: {e}");
                }
            });

            (bind_address, task)
        };

        info!("http tracker listening on {bind_address}");

        Ok(HttpServer {
            cfg: self.cfg,
            state: Running {
                bind_address,
                halt_sender,
                task,
            },
        })
    }
}

impl HttpServer<Running> {
    /// It stops the listener and returns a controller in `stopped`
    /// state.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the halt channel is already closed or the
    /// server task panicked.
    pub async fn stop(self) -> Result<HttpServer<Stopped>, Error> {
        self.state
            .halt_sender
            .send(Halted::Normal)
            .map_err(|e| Error::ChannelClosed(format!("{e:?}")))?;

        self.state.task.await.map_err(|e| Error::ChannelClosed(e.to_string()))?;

        Ok(HttpServer {
            cfg: self.cfg,
            state: Stopped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use swarm_tracker_configuration::{Configuration, HttpTracker, Storage};

    use crate::core::storage::sharded::ShardedStore;
    use crate::core::Tracker;
    use crate::servers::http::server::HttpServer;

    #[tokio::test]
    async fn it_should_start_on_an_ephemeral_port_and_stop_on_demand() {
        let cfg = HttpTracker {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            ..HttpTracker::default()
        };

        let store = Arc::new(ShardedStore::new(&Storage::default()));
        let tracker = Arc::new(Tracker::new(&Configuration::default(), store).unwrap());

        let running = HttpServer::new(cfg).start(tracker).await.expect("the server should bind");

        assert_ne!(running.state.bind_address.port(), 0);

        running.stop().await.expect("the server should stop");
    }
}
