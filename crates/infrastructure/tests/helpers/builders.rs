#![allow(dead_code)]
use arc_swap::ArcSwap;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use nsresolv_domain::{
    DnsOverrides, EffectivePolicy, PolicyResolver, ProxyConfig, ResolverSnapshot, SourceIdentity,
};
use nsresolv_infrastructure::dns::transport::{read_with_length_prefix, send_with_length_prefix};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn query(id: u16, name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(name).unwrap(), record_type));
    message
}

pub fn query_with_edns(id: u16, name: &str, record_type: RecordType, payload: u16) -> Message {
    let mut message = query(id, name, record_type);
    let mut edns = Edns::new();
    edns.set_max_payload(payload);
    message.set_edns(edns);
    message
}

pub async fn udp_exchange(server: SocketAddr, request: &Message) -> Message {
    let bind: SocketAddr = if server.is_ipv4() {
        "127.0.0.1:0".parse().unwrap()
    } else {
        "[::1]:0".parse().unwrap()
    };
    let socket = UdpSocket::bind(bind).await.unwrap();
    socket
        .send_to(&request.to_vec().unwrap(), server)
        .await
        .unwrap();

    let mut buf = vec![0u8; 65535];
    let (n, _) = tokio::time::timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
        .await
        .expect("no UDP response")
        .unwrap();
    Message::from_vec(&buf[..n]).unwrap()
}

pub async fn tcp_exchange(server: SocketAddr, request: &Message) -> Message {
    let mut stream = TcpStream::connect(server).await.unwrap();
    send_with_length_prefix(&mut stream, &request.to_vec().unwrap())
        .await
        .unwrap();
    let bytes = tokio::time::timeout(Duration::from_secs(5), read_with_length_prefix(&mut stream))
        .await
        .expect("no TCP response")
        .unwrap();
    Message::from_vec(&bytes).unwrap()
}

/// Policy forwarding to `servers` through a nameserver override.
pub fn policy_for(servers: &[IpAddr], proxy: IpAddr) -> Arc<ArcSwap<EffectivePolicy>> {
    let overrides = DnsOverrides::none().with_nameservers(servers.iter().map(ToString::to_string));
    let snapshot = ResolverSnapshot::empty(SourceIdentity::missing("/etc/resolv.conf"));
    Arc::new(ArcSwap::from_pointee(PolicyResolver::resolve(
        &snapshot,
        &overrides,
        &[proxy],
    )))
}

pub fn proxy_config(upstream_port: u16) -> ProxyConfig {
    ProxyConfig {
        listen_port: 0,
        upstream_port,
        upstream_timeout_ms: 300,
        drain_grace_ms: 300,
        tcp_idle_timeout_ms: 1000,
        ..ProxyConfig::default()
    }
}
