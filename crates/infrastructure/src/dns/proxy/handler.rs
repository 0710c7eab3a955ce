use crate::dns::cache::{CacheKey, ResponseCache};
use crate::dns::message::{self, response_to};
use crate::dns::transport::{Transport, MAX_UDP_RESPONSE_SIZE};
use arc_swap::ArcSwap;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, PTR};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use nsresolv_application::ports::NameRegistry;
use nsresolv_domain::{DomainError, EffectivePolicy, ProxyConfig};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProtocol {
    Udp,
    Tcp,
}

/// Answers one namespace's queries: local names first, then the response
/// cache, then the external servers of the current policy.
pub struct QueryHandler {
    namespace: String,
    policy: Arc<ArcSwap<EffectivePolicy>>,
    registry: Arc<dyn NameRegistry>,
    cache: ResponseCache,
    upstream_port: u16,
    upstream_timeout: Duration,
    local_ttl: u32,
}

impl QueryHandler {
    pub fn new(
        namespace: impl Into<String>,
        policy: Arc<ArcSwap<EffectivePolicy>>,
        registry: Arc<dyn NameRegistry>,
        config: &ProxyConfig,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            policy,
            registry,
            cache: ResponseCache::new(config.cache_max_entries),
            upstream_port: config.upstream_port,
            upstream_timeout: config.upstream_timeout(),
            local_ttl: config.local_ttl,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Handles raw request bytes and returns the encoded response, or `None`
    /// when nothing should be sent back.
    pub async fn handle(&self, request_bytes: &[u8], protocol: ClientProtocol) -> Option<Vec<u8>> {
        let request = match message::parse(request_bytes) {
            Ok(request) => request,
            Err(e) => {
                debug!(namespace = %self.namespace, error = %e, "Unparsable query");
                return message::format_error_from_raw(request_bytes);
            }
        };

        if request.message_type() != MessageType::Query {
            return None;
        }

        let response = self.respond(&request, protocol).await;
        let encoded = match protocol {
            ClientProtocol::Udp => message::encode_for_udp(&request, &response),
            ClientProtocol::Tcp => message::encode(&response),
        };

        match encoded {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Failed to encode response");
                message::encode(&response_to(&request, ResponseCode::ServFail)).ok()
            }
        }
    }

    async fn respond(&self, request: &Message, protocol: ClientProtocol) -> Message {
        if request.op_code() != OpCode::Query {
            return response_to(request, ResponseCode::NotImp);
        }

        let [query] = request.queries() else {
            return response_to(request, ResponseCode::FormErr);
        };

        debug!(
            namespace = %self.namespace,
            name = %query.name(),
            record_type = ?query.query_type(),
            "Query received"
        );

        if let Some(response) = self.answer_locally(request, query).await {
            return response;
        }

        let key = CacheKey::from_query(query);
        if let Some(cached) = self.cache.get(&key, Instant::now()) {
            debug!(namespace = %self.namespace, name = %query.name(), "Cache hit");
            return message::from_cache(request, cached);
        }

        let response = self.forward(request, protocol).await;
        self.cache.insert(key, &response, Instant::now());
        response
    }

    async fn answer_locally(&self, request: &Message, query: &Query) -> Option<Message> {
        if query.query_class() != DNSClass::IN {
            return None;
        }

        let answers = match query.query_type() {
            RecordType::A | RecordType::AAAA => {
                let addrs = self.registry.lookup_name(&query.name().to_utf8()).await?;
                addrs
                    .into_iter()
                    .filter_map(|addr| match (addr, query.query_type()) {
                        (IpAddr::V4(v4), RecordType::A) => Some(RData::A(A(v4))),
                        (IpAddr::V6(v6), RecordType::AAAA) => Some(RData::AAAA(AAAA(v6))),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            }
            RecordType::PTR => {
                let addr = reverse_name_to_ip(&query.name().to_ascii())?;
                let target = self.registry.lookup_addr(addr).await?;
                let target = Name::from_ascii(format!("{}.", target.trim_end_matches('.'))).ok()?;
                vec![RData::PTR(PTR(target))]
            }
            _ => return None,
        };

        debug!(
            namespace = %self.namespace,
            name = %query.name(),
            answers = answers.len(),
            "Answered from local registry"
        );

        let mut response = response_to(request, ResponseCode::NoError);
        response.set_authoritative(true);
        for rdata in answers {
            response.add_answer(Record::from_rdata(
                query.name().clone(),
                self.local_ttl,
                rdata,
            ));
        }
        Some(response)
    }

    async fn forward(&self, request: &Message, protocol: ClientProtocol) -> Message {
        let policy = self.policy.load_full();
        let targets = policy.forward_targets(self.upstream_port);
        if targets.is_empty() {
            warn!(namespace = %self.namespace, "No external DNS servers configured");
            return response_to(request, ResponseCode::ServFail);
        }

        let upstream_id = fastrand::u16(..);
        let mut upstream_request = request.clone();
        upstream_request.set_id(upstream_id);
        message::clamp_payload(&mut upstream_request, MAX_UDP_RESPONSE_SIZE);
        let bytes = match message::encode(&upstream_request) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Failed to encode upstream query");
                return response_to(request, ResponseCode::ServFail);
            }
        };

        for server in targets {
            match self.exchange(server, &bytes, upstream_id, protocol).await {
                Ok(mut response) => match response.response_code() {
                    ResponseCode::ServFail | ResponseCode::Refused => {
                        debug!(
                            namespace = %self.namespace,
                            server = %server,
                            rcode = ?response.response_code(),
                            "Upstream declined, trying next server"
                        );
                    }
                    _ => {
                        response.set_id(request.id());
                        return response;
                    }
                },
                Err(e) => {
                    debug!(namespace = %self.namespace, server = %server, error = %e, "Upstream failed");
                }
            }
        }

        warn!(
            namespace = %self.namespace,
            servers = ?policy.ext_servers.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "All external DNS servers failed"
        );
        response_to(request, ResponseCode::ServFail)
    }

    async fn exchange(
        &self,
        server: SocketAddr,
        bytes: &[u8],
        upstream_id: u16,
        protocol: ClientProtocol,
    ) -> Result<Message, DomainError> {
        let transport = match protocol {
            ClientProtocol::Udp => Transport::udp(server),
            ClientProtocol::Tcp => Transport::tcp(server),
        };

        let response = self.query(&transport, bytes, upstream_id).await?;
        if response.truncated() && protocol == ClientProtocol::Udp {
            debug!(namespace = %self.namespace, server = %server, "Truncated answer, retrying over TCP");
            return self.query(&Transport::tcp(server), bytes, upstream_id).await;
        }
        Ok(response)
    }

    async fn query(
        &self,
        transport: &Transport,
        bytes: &[u8],
        upstream_id: u16,
    ) -> Result<Message, DomainError> {
        let raw = transport.send(bytes, self.upstream_timeout).await?;
        let response = message::parse(&raw.bytes)?;
        if response.id() != upstream_id {
            return Err(DomainError::Forward(format!(
                "{} response id {} does not match query id {}",
                raw.protocol_used,
                response.id(),
                upstream_id
            )));
        }
        Ok(response)
    }
}

/// Address named by an `in-addr.arpa.` or `ip6.arpa.` reverse name.
pub fn reverse_name_to_ip(name: &str) -> Option<IpAddr> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();

    if let Some(labels) = name.strip_suffix(".in-addr.arpa") {
        let octets = labels
            .split('.')
            .map(|label| label.parse::<u8>().ok())
            .collect::<Option<Vec<_>>>()?;
        let [d, c, b, a] = octets[..] else {
            return None;
        };
        return Some(IpAddr::V4(Ipv4Addr::new(a, b, c, d)));
    }

    if let Some(labels) = name.strip_suffix(".ip6.arpa") {
        let mut nibbles = labels
            .split('.')
            .map(|label| match label.len() {
                1 => u8::from_str_radix(label, 16).ok(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        if nibbles.len() != 32 {
            return None;
        }
        nibbles.reverse();

        let mut octets = [0u8; 16];
        for (octet, pair) in octets.iter_mut().zip(nibbles.chunks_exact(2)) {
            *octet = (pair[0] << 4) | pair[1];
        }
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }

    None
}
