//! The steady-state agent loop: flush stored batches, collect, send, sleep.

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::collector::TelemetryCollector;
use crate::config::AgentConfig;
use crate::queue::OfflineQueue;
use crate::transport::SignedTransport;

pub struct Agent {
    config: AgentConfig,
    collector: TelemetryCollector,
    transport: SignedTransport,
    queue: OfflineQueue,
}

impl Agent {
    /// Assembles an agent from already-built components.
    pub fn new(
        config: AgentConfig,
        collector: TelemetryCollector,
        transport: SignedTransport,
        queue: OfflineQueue,
    ) -> Self {
        Self {
            config,
            collector,
            transport,
            queue,
        }
    }

    /// Builds all components from configuration. This is the only place
    /// where failure is fatal: once the loop is running, everything is
    /// absorbed and retried.
    pub async fn bootstrap(config: AgentConfig) -> anyhow::Result<Self> {
        let queue = OfflineQueue::open(&config.queue_dir)?;
        let transport =
            SignedTransport::new(&config.base_url, &config.api_token, &config.hmac_secret)?;
        let collector = TelemetryCollector::new().await;
        Ok(Self::new(config, collector, transport, queue))
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Runs until the process terminates or ctrl-c is received.
    pub async fn run(mut self) {
        info!(
            agent_id = %self.config.agent_id,
            url = %self.config.base_url,
            queue = %self.config.queue_dir.display(),
            interval_secs = self.config.interval.as_secs(),
            "agent started"
        );
        // Installed once so a signal raised mid-tick is still pending at
        // the next select point instead of being dropped.
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        loop {
            self.tick().await;
            tokio::select! {
                _ = sleep(self.config.interval) => {}
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }
    }

    /// One cycle: replay stored batches, then collect and send a fresh one.
    /// Nothing in here may abort the loop; stale data beats a stuck agent.
    pub async fn tick(&mut self) {
        // Stored batches go first so delivery stays in capture order.
        match self.transport.flush_offline(&self.queue).await {
            Ok(0) => {}
            Ok(n) => info!("flushed {n} stored batches"),
            Err(e) => warn!("flush failed: {e:#}"),
        }

        let batch = self.collector.collect(&self.config.agent_id).await;
        let events = batch.events.len();
        let body = match self.transport.serialize(&batch) {
            Ok(body) => body,
            Err(e) => {
                error!("dropping unserializable batch: {e:#}");
                return;
            }
        };
        match self.transport.send(&body).await {
            Ok(()) => info!("sent {events} events"),
            Err(e) => {
                warn!("send failed, queueing batch: {e}");
                if let Err(qe) = self.queue.enqueue(&body) {
                    // Disk trouble degrades to best-effort live delivery.
                    warn!("could not queue batch: {qe:#}");
                }
            }
        }
    }
}
