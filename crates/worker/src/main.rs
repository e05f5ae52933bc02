//! Consumer worker entry point: broker → projection engine → read model.

use std::sync::Arc;

use messaging::{CodecRegistry, MessagingConfig, provider};
use projections::OrderProjector;

#[tokio::main]
async fn main() {
    worker::init_tracing();

    let store = worker::connect_store().await;

    let messaging_config = MessagingConfig::from_env();
    let codecs = CodecRegistry::new(messaging_config.default_format.clone());
    let consumer = provider::consumer(&messaging_config)
        .await
        .expect("failed to connect event consumer");

    let projector = Arc::new(OrderProjector::new(Arc::new(store), codecs));
    let handler = Arc::new(worker::IngressLogging::new(projector));

    let shutdown = worker::shutdown_token();

    tracing::info!("consumer worker started");

    if let Err(e) = consumer.run(handler, shutdown).await {
        tracing::error!(error = %e, "consumer terminated with error");
        std::process::exit(1);
    }

    tracing::info!("consumer worker stopped");
}
