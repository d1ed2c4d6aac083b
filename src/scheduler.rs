use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{ interval, Duration, MissedTickBehavior };

use crate::services::{ Pipeline, RunOutcome, SyncTrigger };

/// Drives the pipeline. A failed run is logged and the loop carries on.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    sync_interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, sync_interval: Duration) -> Self {
        Self {
            pipeline,
            sync_interval,
        }
    }

    /// Run on a fixed interval, each tick stamped with its own time.
    pub async fn start(self) {
        let mut interval = interval(self.sync_interval);
        // a slow run should not be followed by a burst of catch-up runs
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.run_once(SyncTrigger::now()).await;
        }
    }

    /// Run once per trigger received, until every sender is dropped.
    pub async fn run_triggers(self, mut triggers: mpsc::Receiver<SyncTrigger>) {
        while let Some(trigger) = triggers.recv().await {
            self.run_once(trigger).await;
        }
        tracing::info!("Trigger channel closed, scheduler stopping");
    }

    async fn run_once(&self, trigger: SyncTrigger) -> Option<RunOutcome> {
        match self.pipeline.run(&trigger).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(block = ?trigger.block_number, error = %e, "Scheduled sync failed");
                None
            }
        }
    }
}
