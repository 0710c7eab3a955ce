#![allow(dead_code)]
use hickory_proto::op::{Edns, Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use hickory_proto::serialize::binary::BinEncodable;
use nsresolv_infrastructure::dns::transport::{read_with_length_prefix, send_with_length_prefix};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// One A record for the queried name.
    Answer { ip: Ipv4Addr, ttl: u32 },
    /// `count` A records, enough to overflow a 512-byte datagram.
    ManyAnswers { count: u8, ttl: u32 },
    Rcode(ResponseCode),
    /// Never replies.
    Silent,
    /// Empty TC reply over UDP, full answer over TCP.
    TruncateUdp { ip: Ipv4Addr, ttl: u32 },
}

/// Upstream nameserver answering on UDP and TCP at the same address.
pub struct MockDnsServer {
    addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
    last_payload: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(ip: IpAddr, port: u16, behavior: Behavior) -> std::io::Result<Self> {
        let udp = UdpSocket::bind(SocketAddr::new(ip, port)).await?;
        let addr = udp.local_addr()?;
        let tcp = TcpListener::bind(addr).await?;

        let udp_queries = Arc::new(AtomicUsize::new(0));
        let tcp_queries = Arc::new(AtomicUsize::new(0));
        let last_payload = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let udp_count = Arc::clone(&udp_queries);
        let tcp_count = Arc::clone(&tcp_queries);
        let payload_seen = Arc::clone(&last_payload);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = udp.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            udp_count.fetch_add(1, Ordering::SeqCst);
                            if let Some(response) = respond(&buf[..len], behavior, false, &payload_seen) {
                                let _ = udp.send_to(&response, peer).await;
                            }
                        }
                    }
                    accepted = tcp.accept() => {
                        if let Ok((mut stream, _)) = accepted {
                            let tcp_count = Arc::clone(&tcp_count);
                            let payload_seen = Arc::clone(&payload_seen);
                            tokio::spawn(async move {
                                while let Ok(query) = read_with_length_prefix(&mut stream).await {
                                    tcp_count.fetch_add(1, Ordering::SeqCst);
                                    match respond(&query, behavior, true, &payload_seen) {
                                        Some(response) => {
                                            if send_with_length_prefix(&mut stream, &response).await.is_err() {
                                                break;
                                            }
                                        }
                                        None => break,
                                    }
                                }
                            });
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            udp_queries,
            tcp_queries,
            last_payload,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Starts one server per behavior on 127.0.0.1, 127.0.0.2, ... all
    /// sharing one port, as forwarders address every upstream on the same
    /// port.
    pub async fn start_group(behaviors: &[Behavior]) -> (Vec<Self>, u16) {
        let mut servers = Vec::with_capacity(behaviors.len());
        let mut port = 0;
        for (i, behavior) in behaviors.iter().enumerate() {
            let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, i as u8 + 1));
            let server = Self::start(ip, port, *behavior).await.unwrap();
            port = server.addr.port();
            servers.push(server);
        }
        (servers, port)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }

    /// EDNS0 payload of the last query received, 0 without an OPT record.
    pub fn last_payload(&self) -> usize {
        self.last_payload.load(Ordering::SeqCst)
    }

    pub fn total_queries(&self) -> usize {
        self.udp_queries() + self.tcp_queries()
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn respond(
    query: &[u8],
    behavior: Behavior,
    over_tcp: bool,
    payload_seen: &AtomicUsize,
) -> Option<Vec<u8>> {
    let request = Message::from_vec(query).ok()?;
    let payload = request.extensions().as_ref().map(Edns::max_payload);
    payload_seen.store(payload.map(usize::from).unwrap_or(0), Ordering::SeqCst);
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true);
    response.add_queries(request.queries().iter().cloned());
    if let Some(payload) = payload {
        let mut edns = Edns::new();
        edns.set_max_payload(payload.min(4096));
        response.set_edns(edns);
    }
    let name = request.queries().first()?.name().clone();

    let answer = |ip: Ipv4Addr, ttl: u32| Record::from_rdata(name.clone(), ttl, RData::A(A(ip)));

    match behavior {
        Behavior::Silent => return None,
        Behavior::Answer { ip, ttl } => {
            response.add_answer(answer(ip, ttl));
        }
        Behavior::ManyAnswers { count, ttl } => {
            for i in 0..count {
                response.add_answer(answer(Ipv4Addr::new(10, 0, 0, i), ttl));
            }
        }
        Behavior::Rcode(rcode) => {
            response.set_response_code(rcode);
        }
        Behavior::TruncateUdp { ip, ttl } => {
            if over_tcp {
                response.add_answer(answer(ip, ttl));
            } else {
                response.set_truncated(true);
            }
        }
    }

    response.to_vec().ok()
}
