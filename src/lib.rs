//! Capture DNS - an authoritative DNS server for subdomain-scoped request capture.
//!
//! Every name under the configured server domain resolves. By default
//! A/AAAA queries get the server's own address, CNAME gets the server
//! domain, and TXT gets a fixed greeting. Overrides stored by the web tier replace these
//! answers, and A/AAAA overrides may encode rotation sets that advance on
//! every query. Each query for a name owned by a capture subdomain is
//! logged for that owner and published live.
//!
//! ## Architecture
//!
//! ```text
//! UDP/TCP :53
//!     │
//!     ▼
//! CaptureHandler ──▶ Resolver ──▶ OverrideStore ──┐
//!     │                 │                          │
//!     │          rotation::select                  ▼
//!     └────────▶ QueryLogger ──────────────────▶ Store (Redis or memory)
//!                (owner_id, GeoLookup)
//! ```
//!
//! ## Storage keys
//!
//! ```text
//! dns:<type>:<domain>        override record (JSON)
//! requests:<uid>             append-only query log
//! request:<uid>:<id>         entry id -> list index
//! pubsub:<uid>               live channel
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use capture_dns::{geo::NoGeo, store::MemoryStore, DnsConfig, DnsServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DnsConfig::new("10.0.0.1".parse().unwrap(), "service.test");
//!     let server = DnsServer::new(config, Arc::new(MemoryStore::new()), Arc::new(NoGeo));
//!     server.run(CancellationToken::new()).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod geo;
pub mod handler;
pub mod metrics;
pub mod overrides;
pub mod query_log;
pub mod record;
pub mod resolver;
pub mod rotation;
pub mod server;
pub mod store;
pub mod subdomain;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, StorageConfig, TelemetryConfig};
pub use error::DnsError;
pub use handler::CaptureHandler;
pub use overrides::{Override, OverrideStore};
pub use query_log::{QueryLogEntry, QueryLogger};
pub use resolver::{Resolution, Resolver};
pub use server::DnsServer;
pub use store::Store;
