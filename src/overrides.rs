//! Per-(name, type) override records.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::DnsError;
use crate::metrics;
use crate::store::{keys, Store};

/// Attempts made by [`OverrideStore::rotate`] before giving up on a
/// contended key.
pub const ROTATE_MAX_ATTEMPTS: usize = 8;

/// An answer override stored by the web tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// Lowercase owner name, without the root dot.
    pub domain: String,
    /// Record type mnemonic ("A", "CNAME", ...).
    #[serde(rename = "type")]
    pub record_type: String,
    /// Single value or a `%`/`/` encoded rotation set.
    pub value: String,
    /// Opaque identifier, stable across rewrites.
    #[serde(rename = "_id")]
    pub id: String,
}

/// Read/write access to overrides in the storage collaborator.
#[derive(Clone)]
pub struct OverrideStore {
    store: Arc<dyn Store>,
}

impl OverrideStore {
    /// Wrap a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Fetch the override for `domain` and `record_type`. Absence means
    /// "serve the default".
    pub async fn get(
        &self,
        domain: &str,
        record_type: &str,
    ) -> Result<Option<Override>, DnsError> {
        Ok(self
            .load(domain, record_type)
            .await?
            .map(|(record, _)| record))
    }

    /// Replace the value of an existing override, keeping its id.
    ///
    /// Rewriting an override that is not stored is a caller bug and
    /// returns [`DnsError::OverrideMissing`].
    pub async fn set(&self, domain: &str, record_type: &str, value: &str) -> Result<(), DnsError> {
        self.rotate(domain, record_type, |_| Ok(((), Some(value.to_string()))))
            .await?;
        Ok(())
    }

    /// Atomically derive and persist the next value of an override.
    ///
    /// `next` sees the current stored value and returns the caller's
    /// result together with the replacement value, or `None` in place of
    /// the value to leave storage untouched. On a concurrent write the
    /// current value is re-read and `next` runs again, so each call
    /// advances the stored value exactly once. Errors from `next` are
    /// returned as is. Returns `Ok(None)` only when the key stayed
    /// contended for every attempt.
    pub async fn rotate<T, F>(
        &self,
        domain: &str,
        record_type: &str,
        mut next: F,
    ) -> Result<Option<T>, DnsError>
    where
        F: FnMut(&str) -> Result<(T, Option<String>), DnsError>,
    {
        let key = keys::dns_override(record_type, &normalize(domain));

        for attempt in 1..=ROTATE_MAX_ATTEMPTS {
            let (current, raw) = self
                .load(domain, record_type)
                .await?
                .ok_or_else(|| DnsError::OverrideMissing(key.clone()))?;

            let (result, value) = next(&current.value)?;
            let Some(value) = value else {
                return Ok(Some(result));
            };

            let updated = Override { value, ..current };
            let payload = serde_json::to_string(&updated)?;

            if self.store.compare_and_swap(&key, &raw, &payload).await? {
                debug!(key = %key, attempt, "override rewritten");
                metrics::record_rotation(record_type);
                return Ok(Some(result));
            }

            metrics::record_rotation_conflict();
            debug!(key = %key, attempt, "override changed underneath us, retrying");
        }

        warn!(key = %key, "giving up on contended override");
        Ok(None)
    }

    async fn load(
        &self,
        domain: &str,
        record_type: &str,
    ) -> Result<Option<(Override, String)>, DnsError> {
        let key = keys::dns_override(record_type, &normalize(domain));
        match self.store.get(&key).await? {
            Some(raw) => {
                let record: Override = serde_json::from_str(&raw)?;
                Ok(Some((record, raw)))
            }
            None => Ok(None),
        }
    }
}

/// Lowercase and drop the root label's trailing dot.
pub fn normalize(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}
