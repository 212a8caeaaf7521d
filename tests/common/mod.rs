//! Shared test infrastructure for capture handler integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use capture_dns::geo::NoGeo;
use capture_dns::store::{keys, MemoryStore};
use capture_dns::{DnsConfig, DnsServer, Override, QueryLogEntry};

// --- Constants ---

pub const SERVER_DOMAIN: &str = "service.test";
pub const SERVER_IP: &str = "10.0.0.1";

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// The response is serialized via `MessageResponse::destructive_emit()` and
/// stored as raw wire-format bytes, parsed back with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Fixture ---

/// A server wired to an in-memory store the test can seed and inspect.
pub struct Fixture {
    pub store: MemoryStore,
    pub server: DnsServer,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(test_dns_config())
    }

    pub fn with_config(config: DnsConfig) -> Self {
        let store = MemoryStore::new();
        let server = DnsServer::new(config, Arc::new(store.clone()), Arc::new(NoGeo));
        Self { store, server }
    }

    /// Store an override the way the web tier does.
    pub fn seed_override(&self, domain: &str, record_type: &str, value: &str) {
        let record = Override {
            domain: domain.to_string(),
            record_type: record_type.to_string(),
            value: value.to_string(),
            id: format!("{domain}-{record_type}"),
        };
        self.store.insert(
            &keys::dns_override(record_type, domain),
            &serde_json::to_string(&record).unwrap(),
        );
    }

    /// Current stored value of an override.
    pub fn override_value(&self, domain: &str, record_type: &str) -> Option<String> {
        self.store
            .value(&keys::dns_override(record_type, domain))
            .map(|raw| serde_json::from_str::<Override>(&raw).unwrap().value)
    }

    /// Logged entries for `uid`, oldest first.
    pub fn log_entries(&self, uid: &str) -> Vec<QueryLogEntry> {
        self.store
            .list(&keys::requests(uid))
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    /// Execute a query through the handler and return the parsed response.
    pub async fn query(&self, name: &str, record_type: RecordType) -> Message {
        self.query_from(name, record_type, client_src()).await
    }

    pub async fn query_from(&self, name: &str, record_type: RecordType, src: SocketAddr) -> Message {
        let request = build_request(name, record_type, src, 4242);
        let handler = TestResponseHandler::new();
        self.server
            .handler()
            .handle_request(&request, handler.clone())
            .await;
        handler.into_message()
    }
}

pub fn test_dns_config() -> DnsConfig {
    let mut config = DnsConfig::new(SERVER_IP.parse().unwrap(), SERVER_DOMAIN);
    config.listen_addr = "127.0.0.1:0".parse().unwrap();
    config
}

pub fn client_src() -> SocketAddr {
    "192.0.2.7:53000".parse().unwrap()
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` with a crafted source address.
pub fn build_request(name: &str, record_type: RecordType, src: SocketAddr, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let msg = parse_message_request(&bytes);
    Request::new(msg, src, Protocol::Udp)
}

// --- Response helpers ---

pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(a.0),
            _ => None,
        })
        .collect()
}

pub fn extract_cnames(msg: &Message) -> Vec<String> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::CNAME(cname) => Some(cname.0.to_string()),
            _ => None,
        })
        .collect()
}

pub fn extract_txt(msg: &Message) -> Vec<String> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::TXT(txt) => Some(
                txt.txt_data()
                    .iter()
                    .map(|part| String::from_utf8_lossy(part).into_owned())
                    .collect::<String>(),
            ),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}
