//! Answer record construction.
//!
//! Every answer is built with a TTL of one second unless told otherwise,
//! since overrides can change between two queries for the same name.

use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, SOA, TXT};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use crate::error::DnsError;

/// TTL used when a caller does not ask for one.
pub const DEFAULT_TTL: u32 = 1;

/// Longest character-string a TXT record can carry.
const TXT_CHUNK_MAX: usize = 255;

pub(crate) static PROCESS_SERIAL: OnceLock<u32> = OnceLock::new();

/// SOA serial for this process: wall-clock seconds at first use.
/// `DnsServer::new` calls this so the serial marks process start.
pub fn process_serial() -> u32 {
    *PROCESS_SERIAL.get_or_init(|| chrono::Utc::now().timestamp() as u32)
}

/// Record kinds this server knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// IPv4 address.
    A,
    /// IPv6 address.
    Aaaa,
    /// Canonical name.
    Cname,
    /// Free text.
    Txt,
    /// Name server.
    Ns,
    /// Mail exchange.
    Mx,
    /// Start of authority.
    Soa,
}

impl RecordKind {
    /// Wire record type for this kind.
    pub fn record_type(self) -> RecordType {
        match self {
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
            RecordKind::Cname => RecordType::CNAME,
            RecordKind::Txt => RecordType::TXT,
            RecordKind::Ns => RecordType::NS,
            RecordKind::Mx => RecordType::MX,
            RecordKind::Soa => RecordType::SOA,
        }
    }

    /// Mnemonic, as used in storage keys.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Cname => "CNAME",
            RecordKind::Txt => "TXT",
            RecordKind::Ns => "NS",
            RecordKind::Mx => "MX",
            RecordKind::Soa => "SOA",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SOA timing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoaTimings {
    /// Zone serial.
    pub serial: u32,
    /// Refresh interval in seconds.
    pub refresh: i32,
    /// Retry interval in seconds.
    pub retry: i32,
    /// Expire time in seconds.
    pub expire: i32,
    /// Minimum TTL in seconds.
    pub minimum: u32,
}

impl Default for SoaTimings {
    fn default() -> Self {
        Self {
            serial: process_serial(),
            refresh: 60 * 60,
            retry: 60 * 60 * 3,
            expire: 60 * 60 * 24,
            minimum: 60 * 60,
        }
    }
}

/// Raw value(s) for a record, shaped by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// One string: an address, a name or text.
    Single(String),
    /// MX preference and exchange host.
    Exchange {
        /// Lower is preferred.
        preference: u16,
        /// Mail host.
        exchange: String,
    },
    /// SOA primary server and owner mailbox, with optional explicit timings.
    Authority {
        /// Primary name server.
        mname: String,
        /// Responsible mailbox in DNS form.
        rname: String,
        /// Timing block; the process defaults when absent.
        timings: Option<SoaTimings>,
    },
}

impl RecordValue {
    fn shape(&self) -> &'static str {
        match self {
            RecordValue::Single(_) => "single",
            RecordValue::Exchange { .. } => "exchange",
            RecordValue::Authority { .. } => "authority",
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Single(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::Single(value)
    }
}

/// A typed answer ready to be attached to a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    kind: RecordKind,
    ttl: u32,
    rdata: RData,
}

impl AnswerRecord {
    /// Build a record of `kind` from `value`.
    ///
    /// Fails when the value shape does not fit the kind, or when an
    /// address or name inside it does not parse.
    pub fn build(
        kind: RecordKind,
        value: impl Into<RecordValue>,
        ttl: Option<u32>,
    ) -> Result<Self, DnsError> {
        let value = value.into();
        let rdata = match (kind, &value) {
            (RecordKind::A, RecordValue::Single(s)) => {
                let ip: Ipv4Addr = s
                    .trim()
                    .parse()
                    .map_err(|_| DnsError::InvalidAddress(s.clone()))?;
                RData::A(A::from(ip))
            }
            (RecordKind::Aaaa, RecordValue::Single(s)) => {
                let ip: Ipv6Addr = s
                    .trim()
                    .parse()
                    .map_err(|_| DnsError::InvalidAddress(s.clone()))?;
                RData::AAAA(AAAA::from(ip))
            }
            (RecordKind::Cname, RecordValue::Single(s)) => RData::CNAME(CNAME(fqdn(s)?)),
            (RecordKind::Ns, RecordValue::Single(s)) => RData::NS(NS(fqdn(s)?)),
            (RecordKind::Txt, RecordValue::Single(s)) => RData::TXT(TXT::new(txt_chunks(s))),
            (
                RecordKind::Mx,
                RecordValue::Exchange {
                    preference,
                    exchange,
                },
            ) => RData::MX(MX::new(*preference, fqdn(exchange)?)),
            (
                RecordKind::Soa,
                RecordValue::Authority {
                    mname,
                    rname,
                    timings,
                },
            ) => {
                let t = timings.unwrap_or_default();
                RData::SOA(SOA::new(
                    fqdn(mname)?,
                    fqdn(rname)?,
                    t.serial,
                    t.refresh,
                    t.retry,
                    t.expire,
                    t.minimum,
                ))
            }
            _ => {
                return Err(DnsError::RecordShape {
                    kind: kind.as_str(),
                    shape: value.shape(),
                })
            }
        };

        Ok(Self {
            kind,
            ttl: ttl.unwrap_or(DEFAULT_TTL),
            rdata,
        })
    }

    /// Kind of this record.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Time to live in seconds.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Rendered record data.
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    /// True when a query of `query_type` should receive this record.
    pub fn matches(&self, query_type: RecordType) -> bool {
        query_type == RecordType::ANY || query_type == self.kind.record_type()
    }

    /// Materialize as a wire record owned by `name`.
    pub fn to_record(&self, name: Name) -> Record {
        let mut record = Record::from_rdata(name, self.ttl, self.rdata.clone());
        record.set_dns_class(DNSClass::IN);
        record
    }
}

/// Split a TXT value into character-strings, cutting only on char
/// boundaries. Clients join them back without a separator.
fn txt_chunks(value: &str) -> Vec<String> {
    if value.len() <= TXT_CHUNK_MAX {
        return vec![value.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::with_capacity(TXT_CHUNK_MAX);
    for c in value.chars() {
        if current.len() + c.len_utf8() > TXT_CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Parse a host name, treating it as fully qualified.
fn fqdn(name: &str) -> Result<Name, DnsError> {
    let name = name.trim();
    if name.ends_with('.') {
        Ok(Name::from_ascii(name)?)
    } else {
        Ok(Name::from_ascii(format!("{name}."))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_is_one() {
        let record = AnswerRecord::build(RecordKind::A, "10.0.0.1", None).unwrap();
        assert_eq!(record.ttl(), 1);
        assert_eq!(record.rdata(), &RData::A(A::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_explicit_ttl_kept() {
        let record = AnswerRecord::build(RecordKind::Txt, "hi", Some(300)).unwrap();
        assert_eq!(record.ttl(), 300);
    }

    fn txt_text(record: &Record) -> String {
        match record.data() {
            RData::TXT(txt) => txt
                .txt_data()
                .iter()
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect(),
            other => panic!("unexpected rdata {other:?}"),
        }
    }

    #[test]
    fn test_long_txt_emits_and_reads_back() {
        use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};

        let value = format!("v=DKIM1; k=rsa; p={}", "A".repeat(380));
        let name = Name::from_ascii("sub1.service.test.").unwrap();
        let record = AnswerRecord::build(RecordKind::Txt, value.as_str(), None)
            .unwrap()
            .to_record(name);

        let bytes = record.to_bytes().expect("long TXT must emit");
        let decoded = Record::from_bytes(&bytes).unwrap();
        assert_eq!(txt_text(&decoded), value);
    }

    #[test]
    fn test_txt_chunks_respect_char_boundaries() {
        let value = "é".repeat(200);
        let chunks = txt_chunks(&value);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() <= TXT_CHUNK_MAX));
        assert_eq!(chunks.concat(), value);
        assert_eq!(txt_chunks("short"), vec!["short".to_string()]);
        assert_eq!(txt_chunks(""), vec![String::new()]);
    }

    #[test]
    fn test_a_rejects_ipv6_text() {
        let err = AnswerRecord::build(RecordKind::A, "fd00::1", None).unwrap_err();
        assert!(matches!(err, DnsError::InvalidAddress(_)));
    }

    #[test]
    fn test_aaaa_from_ipv6() {
        let record = AnswerRecord::build(RecordKind::Aaaa, "fd00::1", None).unwrap();
        assert_eq!(
            record.rdata(),
            &RData::AAAA(AAAA::from("fd00::1".parse::<Ipv6Addr>().unwrap()))
        );
    }

    #[test]
    fn test_cname_is_fully_qualified() {
        let record = AnswerRecord::build(RecordKind::Cname, "service.test", None).unwrap();
        match record.rdata() {
            RData::CNAME(cname) => {
                assert!(cname.0.is_fqdn());
                assert_eq!(cname.0.to_string(), "service.test.");
            }
            other => panic!("unexpected rdata {other:?}"),
        }
    }

    #[test]
    fn test_soa_appends_default_timings() {
        let record = AnswerRecord::build(
            RecordKind::Soa,
            RecordValue::Authority {
                mname: "ns1.service.test".to_string(),
                rname: "admin.service.test".to_string(),
                timings: None,
            },
            None,
        )
        .unwrap();

        match record.rdata() {
            RData::SOA(soa) => {
                assert_eq!(soa.serial(), process_serial());
                assert_eq!(soa.refresh(), 3600);
                assert_eq!(soa.retry(), 10800);
                assert_eq!(soa.expire(), 86400);
                assert_eq!(soa.minimum(), 3600);
            }
            other => panic!("unexpected rdata {other:?}"),
        }
    }

    #[test]
    fn test_serial_is_stable_for_process() {
        assert_eq!(process_serial(), process_serial());
        assert_eq!(SoaTimings::default().serial, process_serial());
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let err = AnswerRecord::build(RecordKind::Soa, "ns1.service.test", None).unwrap_err();
        assert!(matches!(
            err,
            DnsError::RecordShape {
                kind: "SOA",
                shape: "single"
            }
        ));
    }

    #[test]
    fn test_mx_record() {
        let record = AnswerRecord::build(
            RecordKind::Mx,
            RecordValue::Exchange {
                preference: 10,
                exchange: "mail.service.test".to_string(),
            },
            None,
        )
        .unwrap();
        assert_eq!(record.kind().record_type(), RecordType::MX);
    }

    #[test]
    fn test_matches_own_type_and_any() {
        let record = AnswerRecord::build(RecordKind::Txt, "hello", None).unwrap();
        assert!(record.matches(RecordType::TXT));
        assert!(record.matches(RecordType::ANY));
        assert!(!record.matches(RecordType::A));
    }

    #[test]
    fn test_to_record_sets_owner_and_ttl() {
        let name = Name::from_ascii("sub1.service.test.").unwrap();
        let record = AnswerRecord::build(RecordKind::A, "10.0.0.1", None)
            .unwrap()
            .to_record(name.clone());
        assert_eq!(record.name(), &name);
        assert_eq!(record.ttl(), 1);
        assert_eq!(record.record_type(), RecordType::A);
    }
}
