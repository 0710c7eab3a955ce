pub mod host_resolv_reader;
pub mod resolv_conf_store;

pub use host_resolv_reader::HostResolvConfReader;
pub use resolv_conf_store::FsResolvConfStore;
