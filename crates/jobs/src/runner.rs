use crate::HostResolvWatchJob;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A background job the runner can hand a shared shutdown token to.
pub trait SpawnableJob: Send + Sync + 'static {
    fn attach_shutdown(self, token: CancellationToken) -> Self;
    fn spawn(self: Arc<Self>) -> JoinHandle<()>;
}

impl SpawnableJob for HostResolvWatchJob {
    fn attach_shutdown(self, token: CancellationToken) -> Self {
        self.with_cancellation(token)
    }

    fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.start()
    }
}

/// Starts the engine's background jobs. Every job observes the same shutdown
/// token when one is set.
#[derive(Default)]
pub struct JobRunner {
    host_resolv_watch: Option<HostResolvWatchJob>,
    shutdown: Option<CancellationToken>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host_resolv_watch(mut self, job: HostResolvWatchJob) -> Self {
        self.host_resolv_watch = Some(job);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Spawns the configured jobs. Each handle completes when its job stops.
    pub async fn start(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(job) = self.host_resolv_watch {
            handles.push(launch(job, self.shutdown.as_ref()));
        }
        info!(jobs = handles.len(), "Background jobs started");
        handles
    }
}

fn launch<J: SpawnableJob>(job: J, shutdown: Option<&CancellationToken>) -> JoinHandle<()> {
    let job = match shutdown {
        Some(token) => job.attach_shutdown(token.clone()),
        None => job,
    };
    Arc::new(job).spawn()
}
