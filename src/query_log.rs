//! Per-owner query log.
//!
//! Each answered query addressed to an owner is appended to
//! `requests:<owner>`, indexed under `request:<owner>:<id>`, then pushed
//! live on `pubsub:<owner>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hickory_proto::op::Header;
use hickory_proto::rr::{Name, Record, RecordType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::geo::GeoLookup;
use crate::metrics;
use crate::store::{keys, Store};
use crate::subdomain::owner_id;

/// The reply as sent, used for the log entry's summary.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Response header.
    pub header: Header,
    /// Queried name.
    pub name: Name,
    /// Queried type.
    pub query_type: RecordType,
    /// Answer section.
    pub answers: Vec<Record>,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        writeln!(
            f,
            ";; ->>HEADER<<- opcode: {:?}, status: {:?}, id: {}",
            h.op_code(),
            h.response_code(),
            h.id()
        )?;

        let mut flags = vec!["qr"];
        if h.authoritative() {
            flags.push("aa");
        }
        if h.truncated() {
            flags.push("tc");
        }
        if h.recursion_desired() {
            flags.push("rd");
        }
        if h.recursion_available() {
            flags.push("ra");
        }
        writeln!(
            f,
            ";; flags: {}; QUERY: 1, ANSWER: {}, AUTHORITY: 0, ADDITIONAL: 0",
            flags.join(" "),
            self.answers.len()
        )?;

        writeln!(f, ";; QUESTION SECTION:")?;
        write!(f, ";{:<30} IN      {}", self.name, self.query_type)?;

        if !self.answers.is_empty() {
            write!(f, "\n;; ANSWER SECTION:")?;
            for record in &self.answers {
                write!(f, "\n{record}")?;
            }
        }
        Ok(())
    }
}

/// One logged query, in the JSON shape the web tier reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// Always "dns".
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix seconds.
    pub date: i64,
    /// Client address.
    pub ip: String,
    /// Client port.
    pub port: u16,
    /// Client country, when the GeoIP lookup knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Queried record type.
    pub dtype: String,
    /// Queried name, fully qualified.
    pub name: String,
    /// Owner identifier.
    pub uid: String,
    /// Rendered reply.
    pub reply: String,
    /// Base64 of the request bytes.
    pub raw: String,
    /// Entry id.
    #[serde(rename = "_id")]
    pub id: String,
}

/// Records answered queries for their owners.
#[derive(Clone)]
pub struct QueryLogger {
    store: Arc<dyn Store>,
    geo: Arc<dyn GeoLookup>,
    config: Arc<DnsConfig>,
}

impl QueryLogger {
    /// Create a logger writing to `store`.
    pub fn new(store: Arc<dyn Store>, geo: Arc<dyn GeoLookup>, config: Arc<DnsConfig>) -> Self {
        Self { store, geo, config }
    }

    /// Log `reply` for the owner of its query name.
    ///
    /// Returns the entry written, or `None` when the name has no owner.
    pub async fn record(
        &self,
        reply: &Reply,
        src: SocketAddr,
        raw: &[u8],
    ) -> Result<Option<QueryLogEntry>, DnsError> {
        let name = reply.name.to_string();
        let Some(uid) = owner_id(&name, &self.config) else {
            trace!(name = %name, "no owner, not logging");
            metrics::record_log_skipped();
            return Ok(None);
        };

        let entry = QueryLogEntry {
            kind: "dns".to_string(),
            date: chrono::Utc::now().timestamp(),
            ip: src.ip().to_string(),
            port: src.port(),
            country: self.geo.country(src.ip()),
            dtype: reply.query_type.to_string(),
            name,
            uid,
            reply: reply.to_string(),
            raw: STANDARD.encode(raw),
            id: Uuid::new_v4().to_string(),
        };
        let payload = serde_json::to_string(&entry)?;

        let len = self.store.append(&keys::requests(&entry.uid), &payload).await?;
        let index = len.saturating_sub(1);
        self.store
            .set(&keys::request_index(&entry.uid, &entry.id), &index.to_string())
            .await?;
        self.store.publish(&keys::pubsub(&entry.uid), &payload).await?;

        debug!(uid = %entry.uid, id = %entry.id, index, "query logged");
        metrics::record_log_written();
        Ok(Some(entry))
    }
}
