pub mod host_watch;
pub mod namespaces;
pub mod resolv_conf;

pub use host_watch::{WatchHostResolverUseCase, WatchOutcome};
pub use namespaces::{ActiveNamespaces, NamespaceDns};
pub use resolv_conf::{SyncOutcome, SyncResolvConfUseCase};
