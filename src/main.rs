use std::sync::Arc;

use clap::Parser;
use swarm_tracker::bootstrap::config::Arguments;
use swarm_tracker::core::storage::sharded::ShardedStore;
use swarm_tracker::core::Tracker;
use swarm_tracker::servers::signals::{global_process_signal, ProcessSignal};
use swarm_tracker::{app, bootstrap};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    let mut config = bootstrap::app::setup(&args)?;

    // The swarm store outlives configuration reloads.
    let store = Arc::new(ShardedStore::new(&config.storage));
    store.start_background_tasks();

    loop {
        let tracker = Arc::new(Tracker::new(&config, store.clone())?);
        let running = app::start(&config, tracker, bootstrap::app::cookie_key(&config)).await;

        match global_process_signal().await {
            ProcessSignal::Shutdown => {
                info!("shutdown signal received, stopping services");
                app::stop(running).await;
                store.stop().await;
                break;
            }
            ProcessSignal::Reload => {
                info!("reload signal received, restarting services with a fresh configuration");
                app::stop(running).await;
                config = bootstrap::app::setup(&args)?;
            }
        }
    }

    Ok(())
}
