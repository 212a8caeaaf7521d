//! DNS server setup and lifecycle management.

use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::geo::GeoLookup;
use crate::handler::CaptureHandler;
use crate::overrides::OverrideStore;
use crate::query_log::QueryLogger;
use crate::record;
use crate::resolver::Resolver;
use crate::store::Store;

/// Run one transport until it fails or `token` is cancelled.
async fn serve(
    transport: &'static str,
    mut server: ServerFuture<CaptureHandler>,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => {
            info!(transport, "DNS listener shutdown requested");
        }
        result = server.block_until_done() => {
            if let Err(e) = result {
                error!(transport, "DNS server error: {}", e);
            }
            return;
        }
    }

    // Stop accepting; queries already dispatched run to completion
    if let Err(e) = server.shutdown_gracefully().await {
        error!(transport, "DNS listener did not stop cleanly: {}", e);
    }
}

/// Authoritative DNS server for capture subdomains.
pub struct DnsServer {
    config: Arc<DnsConfig>,
    handler: CaptureHandler,
}

impl DnsServer {
    /// Create a server over the given storage and GeoIP collaborators.
    pub fn new(config: DnsConfig, store: Arc<dyn Store>, geo: Arc<dyn GeoLookup>) -> Self {
        let serial = record::process_serial();
        debug!(serial, "SOA serial fixed");

        let config = Arc::new(config);
        let resolver = Resolver::new(config.clone(), OverrideStore::new(store.clone()));
        let logger = QueryLogger::new(store, geo, config.clone());

        Self {
            config,
            handler: CaptureHandler::new(resolver, logger),
        }
    }

    /// Get the request handler.
    pub fn handler(&self) -> &CaptureHandler {
        &self.handler
    }

    /// Run UDP and TCP listeners until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> Result<(), DnsError> {
        info!(
            listen_addr = %self.config.listen_addr,
            server_domain = %self.config.server_domain,
            server_ip = %self.config.server_ip,
            "Starting capture-dns server"
        );

        // Bind UDP
        let udp_socket = UdpSocket::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS UDP listening");
        let mut udp = ServerFuture::new(self.handler.clone());
        udp.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS TCP listening");
        let mut tcp = ServerFuture::new(self.handler.clone());
        tcp.register_listener(
            tcp_listener,
            Duration::from_secs(self.config.tcp_timeout_secs),
        );

        let udp_handle = tokio::spawn(serve("udp", udp, token.clone()));
        let tcp_handle = tokio::spawn(serve("tcp", tcp, token.clone()));

        info!(
            server_domain = %self.config.server_domain,
            "DNS server ready to serve queries"
        );

        let (udp_result, tcp_result) = tokio::join!(udp_handle, tcp_handle);
        if let Err(e) = udp_result {
            error!("UDP listener task panicked: {}", e);
        }
        if let Err(e) = tcp_result {
            error!("TCP listener task panicked: {}", e);
        }

        info!("DNS server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::NoGeo;
    use crate::store::MemoryStore;

    fn test_config() -> DnsConfig {
        let mut config = DnsConfig::new("10.0.0.1".parse().unwrap(), "service.test");
        config.listen_addr = "127.0.0.1:0".parse().unwrap();
        config
    }

    #[test]
    fn test_server_creation() {
        let server = DnsServer::new(test_config(), Arc::new(MemoryStore::new()), Arc::new(NoGeo));
        let _handler = server.handler().clone();
    }

    #[test]
    fn test_new_fixes_process_serial() {
        let _server = DnsServer::new(test_config(), Arc::new(MemoryStore::new()), Arc::new(NoGeo));
        let serial = *record::PROCESS_SERIAL.get().expect("serial set at startup");
        assert_eq!(serial, record::process_serial());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let server = DnsServer::new(test_config(), Arc::new(MemoryStore::new()), Arc::new(NoGeo));
        let token = CancellationToken::new();
        let handle = tokio::spawn(server.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
