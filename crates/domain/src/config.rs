pub mod errors;
pub mod host;
pub mod proxy;
pub mod root;

pub use errors::ConfigError;
pub use host::HostConfig;
pub use proxy::ProxyConfig;
pub use root::{EngineConfig, HOST_RESOLV_CONF_ENV};
