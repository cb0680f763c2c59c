//! Team Cymru IP-to-ASN lens
//!
//! This module provides the lookup engine: a DNS client for single
//! addresses, a WHOIS bulk client for lists, and the encoders that turn the
//! normalized results into table, CSV or JSON output.
//!
//! Protocol selection follows input size. One address goes through DNS and
//! falls back to WHOIS if DNS fails; two or more go straight to a single
//! WHOIS bulk session. A single deadline covers the whole lookup.

pub mod dns;
pub mod error;
pub mod fields;
pub mod output;
pub mod sort;
pub mod types;
pub mod whois;

pub use dns::{DnsClient, HickoryTxtResolver, TxtResolver};
pub use error::CymruError;
pub use output::{group_by_asn, write_results};
pub use sort::sort_results;
pub use types::{AsnGroup, AsnGroupEntry, CymruResult, LookupMethod, UNKNOWN_ASN};
pub use whois::WhoisClient;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::config::Ip2asnConfig;

/// Default deadline for the whole lookup phase
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

/// Cymru lookup lens
///
/// # Example
///
/// ```rust,ignore
/// use ip2asn::lens::cymru::CymruLens;
/// use ip2asn::Ip2asnConfig;
///
/// let lens = CymruLens::new(&Ip2asnConfig::default());
/// let results = lens
///     .lookup(&["8.8.8.8".to_string()], |e| eprintln!("DNS failed: {e}"))
///     .await?;
/// ```
pub struct CymruLens {
    dns: DnsClient,
    whois: WhoisClient,
    timeout: Duration,
}

impl CymruLens {
    /// Create a lens using the system DNS resolver and the configured endpoints
    pub fn new(config: &Ip2asnConfig) -> Self {
        let dns = DnsClient::new(Arc::new(HickoryTxtResolver::from_system_conf())).with_zones(
            &config.origin_zone,
            &config.origin6_zone,
            &config.asn_zone,
        );
        let whois = WhoisClient::new(config.whois_host.clone(), config.whois_port)
            .with_timeouts(config.dial_timeout(), config.read_timeout());

        Self::with_clients(dns, whois, config.lookup_timeout())
    }

    /// Create a lens from pre-built clients
    pub fn with_clients(dns: DnsClient, whois: WhoisClient, timeout: Duration) -> Self {
        Self {
            dns,
            whois,
            timeout,
        }
    }

    /// Look up canonical addresses and return sorted results
    ///
    /// `on_fallback` is called with the DNS error before a single address is
    /// retried over WHOIS.
    ///
    /// # Errors
    ///
    /// For a single address, the WHOIS fallback error; for several
    /// addresses, the WHOIS bulk error.
    pub async fn lookup<F>(
        &self,
        ips: &[String],
        on_fallback: F,
    ) -> Result<Vec<CymruResult>, CymruError>
    where
        F: FnOnce(&CymruError),
    {
        let deadline = Instant::now() + self.timeout;

        let mut results = match ips {
            [] => Vec::new(),
            [ip] => match self.dns.lookup(ip, deadline).await {
                Ok(results) => results,
                Err(e) => {
                    info!("DNS lookup of {} failed, falling back to WHOIS", ip);
                    on_fallback(&e);
                    self.whois.lookup_bulk(ips, deadline).await?
                }
            },
            _ => self.whois.lookup_bulk(ips, deadline).await?,
        };

        sort_results(&mut results);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct StaticResolver(HashMap<String, String>);

    #[async_trait]
    impl TxtResolver for StaticResolver {
        async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, CymruError> {
            Ok(self.0.get(name).cloned().into_iter().collect())
        }
    }

    fn dns_with(entries: &[(&str, &str)]) -> DnsClient {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DnsClient::new(Arc::new(StaticResolver(map)))
    }

    /// Serve one WHOIS session and report how many request lines arrived
    async fn whois_server(response: &'static str) -> (WhoisClient, tokio::task::JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 512];
            while !request.ends_with(b"end\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8(request).unwrap().lines().count()
        });
        (WhoisClient::new("127.0.0.1".to_string(), port), handle)
    }

    #[tokio::test]
    async fn test_single_address_uses_dns() {
        let dns = dns_with(&[
            (
                "8.8.8.8.origin.asn.cymru.com",
                "15169 | 8.8.8.0/24 | US | arin | 2023-12-28",
            ),
            ("AS15169.asn.cymru.com", "15169 | US | arin | 2000-03-30 | GOOGLE"),
        ]);
        // nothing listens here; WHOIS must not be used
        let whois = WhoisClient::new("127.0.0.1".to_string(), 9);
        let lens = CymruLens::with_clients(dns, whois, DEFAULT_LOOKUP_TIMEOUT);

        let mut fell_back = false;
        let results = lens
            .lookup(&["8.8.8.8".to_string()], |_| fell_back = true)
            .await
            .unwrap();

        assert!(!fell_back);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].method, LookupMethod::Dns);
        assert_eq!(results[0].as_name, "GOOGLE");
    }

    #[tokio::test]
    async fn test_single_address_falls_back_to_whois() {
        let (whois, server) = whois_server(
            "Bulk mode; whois.cymru.com [2024-03-14 15:09:26 +0000]\n\
             64496 | 192.0.2.1 | 192.0.2.0/24 | ZZ | arin | 2020-01-01 | DOC-AS\n",
        )
        .await;
        let lens = CymruLens::with_clients(dns_with(&[]), whois, DEFAULT_LOOKUP_TIMEOUT);

        let mut notice = None;
        let results = lens
            .lookup(&["192.0.2.1".to_string()], |e| notice = Some(e.to_string()))
            .await
            .unwrap();

        assert_eq!(
            notice.as_deref(),
            Some("no TXT records for 1.2.0.192.origin.asn.cymru.com")
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].method, LookupMethod::Whois);
        // begin, verbose, one address, end
        assert_eq!(server.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_many_addresses_use_one_whois_session_and_sort() {
        let (whois, server) = whois_server(
            "15169 | 8.8.8.8 | 8.8.8.0/24 | US | arin | 2023-12-28 | GOOGLE\n\
             13335 | 1.1.1.1 | 1.1.1.0/24 | AU | apnic | 2011-08-11 | CLOUDFLARENET\n\
             15169 | 8.8.4.4 | 8.8.4.0/24 | US | arin | 2023-12-28 | GOOGLE\n",
        )
        .await;
        let lens = CymruLens::with_clients(dns_with(&[]), whois, DEFAULT_LOOKUP_TIMEOUT);
        let ips: Vec<String> = ["8.8.8.8", "1.1.1.1", "8.8.4.4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = lens.lookup(&ips, |_| panic!("no fallback")).await.unwrap();

        let order: Vec<&str> = results.iter().map(|r| r.ip.as_str()).collect();
        assert_eq!(order, vec!["1.1.1.1", "8.8.4.4", "8.8.8.8"]);
        assert!(results.iter().all(|r| r.method == LookupMethod::Whois));
        // begin, verbose, three addresses, end
        assert_eq!(server.await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_returned() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let whois = WhoisClient::new("127.0.0.1".to_string(), port);
        let lens = CymruLens::with_clients(dns_with(&[]), whois, DEFAULT_LOOKUP_TIMEOUT);

        let result = lens.lookup(&["192.0.2.1".to_string()], |_| {}).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let whois = WhoisClient::new("127.0.0.1".to_string(), 9);
        let lens = CymruLens::with_clients(dns_with(&[]), whois, DEFAULT_LOOKUP_TIMEOUT);
        assert!(lens.lookup(&[], |_| {}).await.unwrap().is_empty());
    }
}
