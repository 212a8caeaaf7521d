//! Owner identifier derivation.
//!
//! `<anything>.<owner>.<server_domain>` belongs to `<owner>`. Names outside
//! the server domain, or whose owner label fails the configured length
//! and alphabet, belong to nobody and are not logged.

use crate::config::DnsConfig;

/// Owner identifier for `name`, if it has one.
pub fn owner_id(name: &str, config: &DnsConfig) -> Option<String> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let domain = config.server_domain.trim_end_matches('.').to_ascii_lowercase();

    let prefix = name.strip_suffix(&domain)?.strip_suffix('.')?;
    let owner = prefix.rsplit('.').next()?;

    if owner.is_empty() {
        return None;
    }
    if let Some(len) = config.subdomain_length {
        if owner.chars().count() != len {
            return None;
        }
    }
    if !owner.chars().all(|c| config.subdomain_alphabet.contains(c)) {
        return None;
    }

    Some(owner.to_string())
}
