pub mod active;
pub mod namespace_dns;

pub use active::ActiveNamespaces;
pub use namespace_dns::NamespaceDns;
