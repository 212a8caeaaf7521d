//! Query resolution: overrides first, service defaults otherwise.

use hickory_proto::rr::{Name, RecordType};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::metrics::{self, QueryResult, Timer};
use crate::overrides::{normalize, OverrideStore};
use crate::record::{AnswerRecord, RecordKind};
use crate::rotation;

/// Outcome of resolving one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Attach this record to the reply.
    Answer(AnswerRecord),
    /// Reply without an answer record.
    NoAnswer,
}

impl Resolution {
    /// The answer, if any.
    pub fn answer(&self) -> Option<&AnswerRecord> {
        match self {
            Resolution::Answer(record) => Some(record),
            Resolution::NoAnswer => None,
        }
    }
}

/// Resolves queries against stored overrides. Holds no state of its own;
/// every call reads storage afresh.
#[derive(Clone)]
pub struct Resolver {
    config: Arc<DnsConfig>,
    overrides: OverrideStore,
}

impl Resolver {
    /// Create a resolver.
    pub fn new(config: Arc<DnsConfig>, overrides: OverrideStore) -> Self {
        Self { config, overrides }
    }

    /// Resolve `name` for `record_type`.
    ///
    /// Malformed stored data yields [`Resolution::NoAnswer`]. Storage
    /// failures and caller bugs are returned as errors.
    pub async fn resolve(
        &self,
        name: &Name,
        record_type: RecordType,
    ) -> Result<Resolution, DnsError> {
        let timer = Timer::start();
        let rtype_str = record_type.to_string();
        let domain = normalize(&name.to_string());

        trace!(name = %domain, rtype = %rtype_str, "resolving");

        let outcome = match record_type {
            RecordType::CNAME => self.resolve_cname(&domain).await,
            RecordType::TXT => self.resolve_txt(&domain).await,
            RecordType::A => self.resolve_ip(&domain, RecordKind::A).await,
            RecordType::AAAA => self.resolve_ip(&domain, RecordKind::Aaaa).await,
            _ => Ok((Resolution::NoAnswer, QueryResult::NoAnswer)),
        };

        match outcome {
            Ok((resolution, result)) => {
                metrics::record_query(&rtype_str, result, timer.elapsed());
                Ok(resolution)
            }
            Err(e) => {
                metrics::record_query(&rtype_str, QueryResult::Error, timer.elapsed());
                Err(e)
            }
        }
    }

    async fn resolve_cname(&self, domain: &str) -> Result<(Resolution, QueryResult), DnsError> {
        match self.overrides.get(domain, RecordKind::Cname.as_str()).await {
            Ok(Some(record)) => {
                let built = AnswerRecord::build(RecordKind::Cname, record.value.as_str(), None);
                answer_from_override(domain, RecordKind::Cname, built)
            }
            Ok(None) => {
                let record =
                    AnswerRecord::build(RecordKind::Cname, self.config.server_domain.as_str(), None)?;
                Ok((Resolution::Answer(record), QueryResult::Default))
            }
            Err(e) => degrade(domain, RecordKind::Cname, e),
        }
    }

    async fn resolve_txt(&self, domain: &str) -> Result<(Resolution, QueryResult), DnsError> {
        match self.overrides.get(domain, RecordKind::Txt.as_str()).await {
            Ok(Some(record)) => {
                let built = AnswerRecord::build(RecordKind::Txt, record.value, None);
                answer_from_override(domain, RecordKind::Txt, built)
            }
            Ok(None) => {
                let record =
                    AnswerRecord::build(RecordKind::Txt, self.config.default_txt.as_str(), None)?;
                Ok((Resolution::Answer(record), QueryResult::Default))
            }
            Err(e) => degrade(domain, RecordKind::Txt, e),
        }
    }

    async fn resolve_ip(
        &self,
        domain: &str,
        kind: RecordKind,
    ) -> Result<(Resolution, QueryResult), DnsError> {
        let stored = match self.overrides.get(domain, kind.as_str()).await {
            Ok(stored) => stored,
            Err(e) => return degrade(domain, kind, e),
        };

        let Some(stored) = stored else {
            return Ok(self.default_address(kind));
        };

        if !rotation::is_rotating(&stored.value) {
            let built = AnswerRecord::build(kind, stored.value.as_str(), None);
            return answer_from_override(domain, kind, built);
        }

        let rotated = self
            .overrides
            .rotate(domain, kind.as_str(), |value| {
                let picked = rotation::select(value, &mut rand::thread_rng())?;
                Ok((picked.address, picked.next_value))
            })
            .await;

        match rotated {
            Ok(Some(address)) => {
                debug!(name = %domain, rtype = %kind, address = %address, "rotated override");
                let built = AnswerRecord::build(kind, address, None);
                answer_from_override(domain, kind, built)
            }
            Ok(None) => Ok((Resolution::NoAnswer, QueryResult::NoAnswer)),
            Err(e) => degrade(domain, kind, e),
        }
    }

    fn default_address(&self, kind: RecordKind) -> (Resolution, QueryResult) {
        let address = match kind {
            RecordKind::A => match self.config.server_ip {
                IpAddr::V4(v4) => Some(v4.to_string()),
                IpAddr::V6(_) => None,
            },
            _ => self.config.ipv6_address().map(|v6| v6.to_string()),
        };

        match address.map(|a| AnswerRecord::build(kind, a, None)) {
            Some(Ok(record)) => (Resolution::Answer(record), QueryResult::Default),
            _ => {
                debug!(rtype = %kind, "no default address for this family");
                (Resolution::NoAnswer, QueryResult::NoAnswer)
            }
        }
    }
}

fn answer_from_override(
    domain: &str,
    kind: RecordKind,
    built: Result<AnswerRecord, DnsError>,
) -> Result<(Resolution, QueryResult), DnsError> {
    match built {
        Ok(record) => Ok((Resolution::Answer(record), QueryResult::Override)),
        Err(e) => degrade(domain, kind, e),
    }
}

/// Malformed stored data costs this query its answer; anything else
/// is passed up.
fn degrade(
    domain: &str,
    kind: RecordKind,
    err: DnsError,
) -> Result<(Resolution, QueryResult), DnsError> {
    match err {
        DnsError::Rotation(_)
        | DnsError::Json(_)
        | DnsError::InvalidAddress(_)
        | DnsError::Proto(_) => {
            warn!(name = %domain, rtype = %kind, error = %err, "unusable override, answering empty");
            metrics::record_malformed_override(kind.as_str());
            Ok((Resolution::NoAnswer, QueryResult::NoAnswer))
        }
        DnsError::OverrideMissing(_) => {
            debug!(name = %domain, rtype = %kind, "override removed mid-rotation");
            Ok((Resolution::NoAnswer, QueryResult::NoAnswer))
        }
        other => Err(other),
    }
}
