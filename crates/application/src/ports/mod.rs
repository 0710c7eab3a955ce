mod host_resolver_source;
mod name_registry;
mod resolv_conf_store;

pub use host_resolver_source::HostResolverSource;
pub use name_registry::NameRegistry;
pub use resolv_conf_store::ResolvConfStore;
