//! nsresolv application layer: ports to external collaborators and the use
//! cases that keep each namespace's policy and `resolv.conf` current.
pub mod ports;
pub mod services;
pub mod use_cases;
