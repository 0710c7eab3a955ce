use nsresolv_application::use_cases::{WatchHostResolverUseCase, WatchOutcome};
use nsresolv_domain::HostConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Polls the host resolver file and fans changes out to every namespace.
pub struct HostResolvWatchJob {
    watcher: Arc<WatchHostResolverUseCase>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl HostResolvWatchJob {
    pub fn new(watcher: Arc<WatchHostResolverUseCase>) -> Self {
        Self {
            watcher,
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    /// Job polling at `host.poll_interval_secs`.
    pub fn from_config(watcher: Arc<WatchHostResolverUseCase>, config: &HostConfig) -> Self {
        Self::new(watcher).with_interval(config.poll_interval_secs)
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            interval_secs = self.interval_secs,
            "Starting host resolver watch job"
        );
        tokio::spawn(self.run())
    }

    /// The poll loop itself; returns once the job is cancelled.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("HostResolvWatchJob: shutting down");
                    break;
                }
                _ = interval.tick() => self.poll_once().await,
            }
        }
    }

    async fn poll_once(&self) {
        match self.watcher.check().await {
            WatchOutcome::Unchanged => {}
            WatchOutcome::ReadFailed => {
                debug!("Host resolver check skipped");
            }
            WatchOutcome::Refreshed {
                namespaces,
                written,
                locked,
                failed,
            } => {
                if failed > 0 {
                    warn!(
                        namespaces,
                        written, locked, failed, "Host resolver change applied with failures"
                    );
                } else {
                    info!(namespaces, written, locked, "Host resolver change applied");
                }
            }
        }
    }
}
