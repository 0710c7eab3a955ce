//! nsresolv domain layer: host resolver snapshots, effective DNS policy and
//! the container-visible `resolv.conf` rendering.
pub mod config;
pub mod dns_policy;
pub mod errors;
pub mod resolv_conf;
pub mod resolver_snapshot;

pub use config::{ConfigError, EngineConfig, HostConfig, ProxyConfig};
pub use dns_policy::{
    DnsOverrides, EffectivePolicy, ExtServer, OptionSource, OverrideKey, PolicyOption,
    PolicyResolver, Provenance,
};
pub use errors::DomainError;
pub use resolv_conf::ResolvConf;
pub use resolver_snapshot::{ResolverOption, ResolverSnapshot, SourceIdentity};
