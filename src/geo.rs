//! Client country lookup.

use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::GeoIpConfig;
use crate::error::DnsError;

/// Maps a client address to an ISO country code.
pub trait GeoLookup: Send + Sync {
    /// Country code for `ip`, when known.
    fn country(&self, ip: IpAddr) -> Option<String>;
}

/// Lookup that never knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeo;

impl GeoLookup for NoGeo {
    fn country(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

/// Lookup backed by a MaxMind country or city database.
pub struct MaxMindGeo {
    reader: Reader<Vec<u8>>,
}

impl MaxMindGeo {
    /// Load the database at `path` into memory.
    pub fn open(path: &Path) -> Result<Self, DnsError> {
        let reader = Reader::open_readfile(path)?;
        info!(path = %path.display(), "loaded GeoIP database");
        Ok(Self { reader })
    }
}

impl GeoLookup for MaxMindGeo {
    fn country(&self, ip: IpAddr) -> Option<String> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => record
                .country
                .and_then(|c| c.iso_code)
                .map(|code| code.to_string()),
            Err(e) => {
                debug!(%ip, error = %e, "no GeoIP entry");
                None
            }
        }
    }
}

/// Build the lookup described by `config`.
pub fn from_config(config: &GeoIpConfig) -> Result<Arc<dyn GeoLookup>, DnsError> {
    match &config.database {
        Some(path) => Ok(Arc::new(MaxMindGeo::open(path)?)),
        None => {
            info!("no GeoIP database configured, log entries carry no country");
            Ok(Arc::new(NoGeo))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_geo_knows_nothing() {
        assert_eq!(NoGeo.country("8.8.8.8".parse().unwrap()), None);
    }

    #[test]
    fn test_from_config_without_database() {
        let geo = from_config(&GeoIpConfig::default()).unwrap();
        assert_eq!(geo.country("1.1.1.1".parse().unwrap()), None);
    }

    #[test]
    fn test_open_missing_database_fails() {
        let err = MaxMindGeo::open(Path::new("/nonexistent/GeoLite2-Country.mmdb"));
        assert!(err.is_err());
    }
}
