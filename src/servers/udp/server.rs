//! Module to handle the UDP server instances.
//!
//! The [`UdpServer`] is a state machine for a given configuration: it
//! starts and stops the listener while always keeping the same
//! configuration. The receive loop takes one datagram at a time under a
//! short read deadline (so the closing signal is noticed within that
//! window), copies it into a buffer drawn from the [`BufferPool`] and
//! hands it to its own worker task. Response writes go straight back to
//! the originating address; UDP is best-effort, so write errors are
//! swallowed.
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::handlers::handle_packet;
use super::{MAX_PACKET_SIZE, READ_DEADLINE};
use crate::core::Tracker;
use crate::servers::signals::{shutdown_signal, Halted};

/// Error that can occur when starting or stopping the UDP server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not bind the udp socket: {0}")]
    CouldNotBind(std::io::Error),

    #[error("the server task could not be signalled or joined: {0}")]
    ChannelClosed(String),
}

/// A UDP server instance controller with no listener running.
#[allow(clippy::module_name_repetitions)]
pub type StoppedUdpServer = UdpServer<Stopped>;

/// A UDP server instance controller with a running listener.
#[allow(clippy::module_name_repetitions)]
pub type RunningUdpServer = UdpServer<Running>;

/// A UDP server instance controller.
///
/// It's a state machine. Configurations cannot be changed: this struct
/// represents a concrete configuration and state, and allows starting
/// and stopping the server while keeping both.
pub struct UdpServer<S> {
    /// The configuration the server is (re)started with.
    pub cfg: swarm_tracker_configuration::UdpTracker,
    /// The state of the server: `running` or `stopped`.
    pub state: S,
}

/// A stopped UDP server state.
pub struct Stopped;

/// A running UDP server state.
pub struct Running {
    /// The address the listener is bound to.
    pub bind_address: SocketAddr,
    halt_sender: tokio::sync::oneshot::Sender<Halted>,
    task: JoinHandle<()>,
}

impl UdpServer<Stopped> {
    #[must_use]
    pub fn new(cfg: swarm_tracker_configuration::UdpTracker) -> Self {
        Self { cfg, state: Stopped }
    }

    /// It starts the listener and returns a controller in `running`
    /// state.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the socket cannot be bound.
    pub async fn start(self, tracker: Arc<Tracker>, cookie_key: Arc<Vec<u8>>) -> Result<UdpServer<Running>, Error> {
        let socket = UdpSocket::bind(self.cfg.bind_address).await.map_err(Error::CouldNotBind)?;
        let bind_address = socket.local_addr().map_err(Error::CouldNotBind)?;

        let (halt_sender, halt_receiver) = tokio::sync::oneshot::channel::<Halted>();

        let cfg = self.cfg.clone();
        let task = tokio::spawn(async move {
            run(Arc::new(socket), tracker, cfg, cookie_key, shutdown_signal(halt_receiver)).await;
        });

        info!("udp tracker listening on {bind_address}");

        Ok(UdpServer {
            cfg: self.cfg,
            state: Running {
                bind_address,
                halt_sender,
                task,
            },
        })
    }
}

impl UdpServer<Running> {
    /// It stops the listener and returns a controller in `stopped`
    /// state.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the halt channel is already closed or the
    /// server task panicked.
    pub async fn stop(self) -> Result<UdpServer<Stopped>, Error> {
        self.state
            .halt_sender
            .send(Halted::Normal)
            .map_err(|e| Error::ChannelClosed(format!("{e:?}")))?;

        self.state.task.await.map_err(|e| Error::ChannelClosed(e.to_string()))?;

        Ok(UdpServer {
            cfg: self.cfg,
            state: Stopped,
        })
    }
}

/// The receive loop.
async fn run(
    socket: Arc<UdpSocket>,
    tracker: Arc<Tracker>,
    cfg: swarm_tracker_configuration::UdpTracker,
    cookie_key: Arc<Vec<u8>>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let pool = Arc::new(BufferPool::default());
    let cfg = Arc::new(cfg);

    tokio::pin!(shutdown);

    loop {
        let mut buffer = pool.acquire();

        tokio::select! {
            () = &mut shutdown => {
                info!("udp tracker on {} shutting down", socket.local_addr().map(|a| a.to_string()).unwrap_or_default());
                break;
            }
            received = tokio::time::timeout(READ_DEADLINE, socket.recv_from(&mut buffer[..])) => {
                match received {
                    // The read deadline elapsed without a datagram.
                    Err(_) => continue,
                    Ok(Err(e)) => {
                        error!("udp receive failed: {e}");
                        continue;
                    }
                    Ok(Ok((len, from))) => {
                        spawn_worker(buffer, len, from, &socket, &tracker, &cfg, &cookie_key);
                    }
                }
            }
        }
    }
}

/// Hands one datagram to its own worker task. The pooled buffer travels
/// with the task and returns to the pool when the worker exits.
fn spawn_worker(
    buffer: PooledBuffer,
    len: usize,
    from: SocketAddr,
    socket: &Arc<UdpSocket>,
    tracker: &Arc<Tracker>,
    cfg: &Arc<swarm_tracker_configuration::UdpTracker>,
    cookie_key: &Arc<Vec<u8>>,
) {
    let socket = socket.clone();
    let tracker = tracker.clone();
    let cfg = cfg.clone();
    let cookie_key = cookie_key.clone();

    tokio::spawn(async move {
        let response = handle_packet(&buffer[..len], from, &tracker, &cfg, &cookie_key).await;

        if let Some(response) = response {
            let bytes = response.write();
            if let Err(e) = socket.send_to(&bytes, from).await {
                // Best-effort wire: the client will retry on its own.
                debug!("udp send to {from} failed: {e}");
            }
        }

        drop(buffer);
    });
}

/// A pool of fixed-size receive buffers, the only cross-task allocation
/// cache. Buffers are zeroed when they return so a worker never reads
/// another datagram's bytes.
#[derive(Default)]
pub struct BufferPool {
    buffers: Mutex<Vec<Box<[u8; MAX_PACKET_SIZE]>>>,
}

impl BufferPool {
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let buffer = self
            .buffers
            .lock()
            .expect("the buffer pool mutex should not be poisoned")
            .pop()
            .unwrap_or_else(|| Box::new([0u8; MAX_PACKET_SIZE]));

        PooledBuffer {
            pool: self.clone(),
            buffer: Some(buffer),
        }
    }
}

/// A buffer on loan from the pool. Returns on drop.
pub struct PooledBuffer {
    pool: Arc<BufferPool>,
    buffer: Option<Box<[u8; MAX_PACKET_SIZE]>>,
}

impl Deref for PooledBuffer {
    type Target = [u8; MAX_PACKET_SIZE];

    fn deref(&self) -> &Self::Target {
        self.buffer.as_ref().expect("the buffer is only taken on drop")
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buffer.as_mut().expect("the buffer is only taken on drop")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.fill(0);
            if let Ok(mut buffers) = self.pool.buffers.lock() {
                buffers.push(buffer);
            }
        }
    }
}
