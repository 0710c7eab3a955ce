pub mod host_resolv_watch;
pub mod runner;

pub use host_resolv_watch::HostResolvWatchJob;
pub use runner::JobRunner;
