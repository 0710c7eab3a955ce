//! Wire-level helpers shared by the proxy listeners and the query handler.

use hickory_proto::op::{Edns, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::serialize::binary::BinEncodable;
use nsresolv_domain::DomainError;

/// Payload limit for clients that do not send an OPT record (RFC 1035).
pub const CLASSIC_UDP_PAYLOAD: usize = 512;

/// Payload advertised in the proxy's own OPT records (DNS flag day 2020).
const ADVERTISED_PAYLOAD: u16 = 1232;

const HEADER_LEN: usize = 12;

pub fn parse(bytes: &[u8]) -> Result<Message, DomainError> {
    Message::from_vec(bytes).map_err(|e| DomainError::InvalidMessage(e.to_string()))
}

pub fn encode(message: &Message) -> Result<Vec<u8>, DomainError> {
    message
        .to_vec()
        .map_err(|e| DomainError::InvalidMessage(e.to_string()))
}

/// Largest UDP response the client accepts.
pub fn max_udp_payload(request: &Message) -> usize {
    request
        .extensions()
        .as_ref()
        .map(|edns| usize::from(edns.max_payload()).max(CLASSIC_UDP_PAYLOAD))
        .unwrap_or(CLASSIC_UDP_PAYLOAD)
}

/// Response skeleton echoing the request's id, opcode, RD bit and question.
pub fn response_to(request: &Message, rcode: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(rcode);
    response.add_queries(request.queries().iter().cloned());

    if request.extensions().is_some() {
        let mut edns = Edns::new();
        edns.set_max_payload(ADVERTISED_PAYLOAD);
        edns.set_version(0);
        response.set_edns(edns);
    }

    response
}

/// Cached records under a fresh envelope for `request`: its id, question
/// casing and EDNS0 state, never the upstream's.
pub fn from_cache(request: &Message, mut cached: Message) -> Message {
    let mut response = response_to(request, cached.response_code());
    response.set_authoritative(cached.authoritative());
    response.insert_answers(cached.take_answers());
    response.insert_name_servers(cached.take_name_servers());
    response.insert_additionals(cached.take_additionals());
    response
}

/// Caps the advertised EDNS0 payload of a query about to be forwarded.
pub fn clamp_payload(request: &mut Message, limit: u16) {
    if let Some(edns) = request.extensions_mut() {
        if edns.max_payload() > limit {
            edns.set_max_payload(limit);
        }
    }
}

/// FORMERR for bytes that did not parse; `None` when not even a header
/// arrived, since there is no id to answer to.
pub fn format_error_from_raw(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    let id = u16::from_be_bytes([bytes[0], bytes[1]]);
    Message::error_msg(id, OpCode::Query, ResponseCode::FormErr)
        .to_vec()
        .ok()
}

/// Header and question only, TC set, so the client retries over TCP.
pub fn truncated(request: &Message, response: &Message) -> Message {
    let mut truncated = Message::new();
    truncated
        .set_id(response.id())
        .set_message_type(MessageType::Response)
        .set_op_code(response.op_code())
        .set_authoritative(response.authoritative())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(response.recursion_available())
        .set_response_code(response.response_code())
        .set_truncated(true);
    truncated.add_queries(request.queries().iter().cloned());
    truncated
}

/// Encodes `response` for a UDP client, truncating when it exceeds the
/// client's payload limit.
pub fn encode_for_udp(request: &Message, response: &Message) -> Result<Vec<u8>, DomainError> {
    let bytes = encode(response)?;
    if bytes.len() <= max_udp_payload(request) {
        return Ok(bytes);
    }
    encode(&truncated(request, response))
}
