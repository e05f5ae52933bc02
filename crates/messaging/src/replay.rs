//! Replay abstraction for rebuilding read models from broker history.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::consumer::ConsumedEventHandler;
use crate::error::Result;

/// Terminal summary of one replay run. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayResult {
    pub processed_events: u64,
    pub partitions_visited: u32,
}

/// Re-reads the full historical range of the stream and feeds the same
/// handler signature as live consumption.
///
/// Replay runs under an identity (consumer group / read position) isolated
/// from live consumption, so replay progress never perturbs the live
/// consumer's checkpoint or committed offsets. Termination is heuristic: a
/// configurable number of consecutive empty reads ends a partition (or, for
/// group-style transports, the whole run).
#[async_trait]
pub trait ReplayCoordinator: Send + Sync {
    async fn replay(
        &self,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<ReplayResult>;
}
