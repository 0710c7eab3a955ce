pub mod watch_host_resolver;

pub use watch_host_resolver::{WatchHostResolverUseCase, WatchOutcome};
