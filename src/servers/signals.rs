//! This module contains functions to handle signals.
use derive_more::Display;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

/// This is the message that the "launcher" spawned task receives from the main
/// application process to notify the service to shutdown.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Halted {
    Normal,
    Dropped,
}

/// What the process-level signal wait resolved to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessSignal {
    /// SIGINT or SIGTERM: stop everything.
    Shutdown,
    /// SIGUSR1: restart the frontends against a re-read configuration,
    /// preserving the swarm store.
    Reload,
}

/// Creates a Future to await the terminate signal (unix only).
///
/// # Panics
///
/// Panics if unable to connect to the global signal handle.
#[must_use]
pub fn global_terminate_signal<'a>() -> BoxFuture<'a, ()> {
    #[cfg(unix)]
    let terminate: BoxFuture<'a, ()> = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    }
    .boxed();

    #[cfg(not(unix))]
    let terminate: BoxFuture<'a, ()> = std::future::pending::<()>().boxed();

    terminate
}

/// Creates a Future to await the interrupt, i.e. `ctrl_c` signal.
///
/// # Panics
///
/// Panics if unable to connect to the global signal handle.
#[must_use]
pub fn global_interrupt_signal<'a>() -> BoxFuture<'a, ()> {
    let interrupt: BoxFuture<'a, ()> = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    }
    .boxed();

    interrupt
}

/// Creates a Future to await the reload signal (SIGUSR1 on unix; never
/// resolves elsewhere).
///
/// # Panics
///
/// Panics if unable to connect to the global signal handle.
#[must_use]
pub fn global_reload_signal<'a>() -> BoxFuture<'a, ()> {
    #[cfg(unix)]
    let reload: BoxFuture<'a, ()> = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())
            .expect("failed to install signal handler")
            .recv()
            .await;
    }
    .boxed();

    #[cfg(not(unix))]
    let reload: BoxFuture<'a, ()> = std::future::pending::<()>().boxed();

    reload
}

/// Resolves on `ctrl_c` or the `terminate` signal.
pub async fn global_shutdown_signal() {
    let interrupt = global_interrupt_signal();
    let terminate = global_terminate_signal();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {}
    }
}

/// Resolves when the process receives a shutdown or a reload signal.
pub async fn global_process_signal() -> ProcessSignal {
    let shutdown = global_shutdown_signal();
    let reload = global_reload_signal();

    tokio::select! {
        () = shutdown => ProcessSignal::Shutdown,
        () = reload => ProcessSignal::Reload,
    }
}

/// Resolves when the `rx_halt` channel or the `global_shutdown_signal()` resolves.
pub async fn shutdown_signal(rx_halt: tokio::sync::oneshot::Receiver<Halted>) {
    let halt = async {
        match rx_halt.await {
            Ok(signal) => signal,
            // The sender went away without halting; treat it as a halt.
            Err(_) => Halted::Dropped,
        }
    };

    tokio::select! {
        signal = halt => { info!("Halt signal processed: {signal}") },
        () = global_shutdown_signal() => { info!("Global shutdown signal processed") }
    }
}

/// Same as `shutdown_signal()`, but shows a message when it resolves.
pub async fn shutdown_signal_with_message(rx_halt: tokio::sync::oneshot::Receiver<Halted>, message: String) {
    shutdown_signal(rx_halt).await;

    info!("{message}");
}
