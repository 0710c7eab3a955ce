pub mod handler;
pub mod server;

pub use handler::{reverse_name_to_ip, ClientProtocol, QueryHandler};
pub use server::{DnsProxy, ProxyState};
