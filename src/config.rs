//! Configuration types for capture-dns.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::DnsError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// GeoIP configuration.
    #[serde(default)]
    pub geoip: GeoIpConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Address handed out for A queries without an override.
    pub server_ip: IpAddr,

    /// Address handed out for AAAA queries without an override.
    /// Falls back to `server_ip` when that is itself IPv6.
    #[serde(default)]
    pub server_ipv6: Option<Ipv6Addr>,

    /// The service's own domain (e.g. "requestrepo.com").
    /// Owner identifiers are the label directly below it.
    pub server_domain: String,

    /// TXT answer for names without a TXT override.
    #[serde(default = "default_txt")]
    pub default_txt: String,

    /// Idle timeout for TCP connections, in seconds.
    #[serde(default = "default_tcp_timeout_secs")]
    pub tcp_timeout_secs: u64,

    /// Required length of an owner identifier, if any.
    #[serde(default)]
    pub subdomain_length: Option<usize>,

    /// Characters allowed in an owner identifier.
    #[serde(default = "default_subdomain_alphabet")]
    pub subdomain_alphabet: String,
}

impl DnsConfig {
    /// Minimal configuration for the given address and domain.
    pub fn new(server_ip: IpAddr, server_domain: &str) -> Self {
        Self {
            listen_addr: default_listen_addr(),
            server_ip,
            server_ipv6: None,
            server_domain: server_domain.to_string(),
            default_txt: default_txt(),
            tcp_timeout_secs: default_tcp_timeout_secs(),
            subdomain_length: None,
            subdomain_alphabet: default_subdomain_alphabet(),
        }
    }

    /// Address served for default AAAA answers, if one is known.
    pub fn ipv6_address(&self) -> Option<Ipv6Addr> {
        self.server_ipv6.or(match self.server_ip {
            IpAddr::V6(v6) => Some(v6),
            IpAddr::V4(_) => None,
        })
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.server_domain.trim_end_matches('.').is_empty() {
            return Err(DnsError::Config("dns.server_domain must not be empty".into()));
        }
        if self.subdomain_alphabet.is_empty() {
            return Err(DnsError::Config(
                "dns.subdomain_alphabet must not be empty".into(),
            ));
        }
        if self.subdomain_length == Some(0) {
            return Err(DnsError::Config("dns.subdomain_length must be positive".into()));
        }
        Ok(())
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Redis, shared with the web tier.
    Redis,
    /// Process-local memory. Nothing is shared or persisted.
    Memory,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Connection URL for the Redis backend.
    #[serde(default = "default_storage_url")]
    pub url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_storage_url(),
        }
    }
}

/// GeoIP configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// Path to a MaxMind country (or city) database. Without it no
    /// country is attached to log entries.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "capture_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            prometheus_addr: None,
            opentelemetry: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 53))
}

fn default_txt() -> String {
    "Hello!".to_string()
}

fn default_tcp_timeout_secs() -> u64 {
    30
}

fn default_subdomain_alphabet() -> String {
    "0123456789abcdefghijklmnopqrstuvwxyz".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Redis
}

fn default_storage_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "capture-dns".to_string()
}
