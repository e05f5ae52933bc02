//! Replay tool: rebuilds the read model from broker history.
//!
//! Pass `--reset-read-model` to drop every projection and ledger row before
//! replaying. Replay always runs to completion (all partitions drained per
//! the empty-read threshold) and reports the processed/partition counts.

use std::sync::Arc;

use messaging::{CodecRegistry, MessagingConfig, provider};
use projections::{OrderProjector, ProjectionStore};

#[tokio::main]
async fn main() {
    worker::init_tracing();

    let reset_read_model = std::env::args()
        .any(|arg| arg.eq_ignore_ascii_case("--reset-read-model"));

    let store = Arc::new(worker::connect_store().await);

    if reset_read_model {
        tracing::info!("resetting read model before replay");
        store.reset().await.expect("failed to reset read model");
    }

    let messaging_config = MessagingConfig::from_env();
    let codecs = CodecRegistry::new(messaging_config.default_format.clone());
    let coordinator = provider::replay_coordinator(&messaging_config)
        .await
        .expect("failed to connect replay coordinator");

    let projector = Arc::new(OrderProjector::new(store, codecs));
    let shutdown = worker::shutdown_token();

    tracing::info!("starting replay");
    match coordinator.replay(projector, shutdown).await {
        Ok(result) => {
            tracing::info!(
                processed_events = result.processed_events,
                partitions_visited = result.partitions_visited,
                "replay finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "replay failed");
            std::process::exit(1);
        }
    }
}
