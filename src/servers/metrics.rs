//! The Prometheus exporter endpoint.
//!
//! A single `GET /metrics` route rendering the process registry in the
//! Prometheus text format, bound on its own address so the scrape
//! surface never shares a port with the tracker routes.
use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::core::statistics;
use crate::servers::signals::{shutdown_signal, Halted};

/// Error that can occur when starting or stopping the exporter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not bind the metrics listener: {0}")]
    CouldNotBind(std::io::Error),

    #[error("the server task could not be signalled or joined: {0}")]
    ChannelClosed(String),
}

/// A metrics exporter controller with no listener running.
pub struct StoppedMetricsServer {
    pub cfg: swarm_tracker_configuration::MetricsApi,
}

/// A metrics exporter controller with a running listener.
pub struct RunningMetricsServer {
    pub bind_address: SocketAddr,
    halt_sender: tokio::sync::oneshot::Sender<Halted>,
    task: JoinHandle<()>,
}

impl StoppedMetricsServer {
    #[must_use]
    pub fn new(cfg: swarm_tracker_configuration::MetricsApi) -> Self {
        Self { cfg }
    }

    /// It starts the exporter.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the listener cannot be bound.
    pub async fn start(self) -> Result<RunningMetricsServer, Error> {
        let (halt_sender, halt_receiver) = tokio::sync::oneshot::channel::<Halted>();

        let app = Router::new().route("/metrics", get(handle_metrics));

        let listener = tokio::net::TcpListener::bind(self.cfg.bind_address)
            .await
            .map_err(Error::CouldNotBind)?;
        let bind_address = listener.local_addr().map_err(Error::CouldNotBind)?;

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(halt_receiver))
                .await
            {
                error!("metrics exporter stopped with an error: {e}");
            }
        });

        info!("metrics exporter listening on {bind_address}");

        Ok(RunningMetricsServer {
            bind_address,
            halt_sender,
            task,
        })
    }
}

impl RunningMetricsServer {
    /// It stops the exporter.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the halt channel is already closed or the
    /// server task panicked.
    pub async fn stop(self) -> Result<(), Error> {
        self.halt_sender
            .send(Halted::Normal)
            .map_err(|e| Error::ChannelClosed(format!("{e:?}")))?;

        self.task.await.map_err(|e| Error::ChannelClosed(e.to_string()))
    }
}

/// Renders the registry for a scrape.
async fn handle_metrics() -> Response {
    match statistics::export() {
        Ok(body) => (StatusCode::OK, [("Content-Type", "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            error!("failed to export metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to export metrics").into_response()
        }
    }
}
