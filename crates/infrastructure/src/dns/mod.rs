pub mod cache;
pub mod message;
pub mod proxy;
pub mod registry;
pub mod transport;

pub use cache::{CacheKey, ResponseCache};
pub use proxy::{DnsProxy, ProxyState, QueryHandler};
pub use registry::InMemoryNameRegistry;
