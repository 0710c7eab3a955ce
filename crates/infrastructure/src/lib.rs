//! nsresolv infrastructure: filesystem adapters, the embedded DNS proxy and
//! the engine facade that wires namespaces together.
pub mod dns;
pub mod engine;
pub mod system;

pub use engine::{CreatedNamespace, DnsEngine, NamespaceSpec};
