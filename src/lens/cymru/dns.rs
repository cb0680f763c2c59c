//! Team Cymru DNS interface client (single-address path)
//!
//! An address is mapped to its origin by resolving a TXT record under
//! `origin.asn.cymru.com` (IPv4, reversed octets) or `origin6.asn.cymru.com`
//! (IPv6, reversed nibbles):
//!
//! ```text
//! "15169 | 8.8.8.0/24 | US | arin | 2023-12-28"
//! ```
//!
//! The first field may list several origin ASNs. Each one is then resolved
//! under `AS<asn>.asn.cymru.com`, whose last field is the AS name:
//!
//! ```text
//! "15169 | US | arin | 2000-03-30 | GOOGLE - Google LLC, US"
//! ```
//!
//! Every TXT lookup runs on its own task and is raced against the caller's
//! deadline. When the deadline wins, the task is left to finish on its own.

use async_trait::async_trait;
use chrono::Utc;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::CymruError;
use super::fields::{parse_asn, split_fields};
use super::types::{CymruResult, LookupMethod};

pub const DEFAULT_ORIGIN_ZONE: &str = "origin.asn.cymru.com";
pub const DEFAULT_ORIGIN6_ZONE: &str = "origin6.asn.cymru.com";
pub const DEFAULT_ASN_ZONE: &str = "asn.cymru.com";

/// Number of pipe-separated fields in an origin or AS TXT record
const TXT_FIELD_COUNT: usize = 5;

/// Source of TXT records
///
/// Each returned string is one TXT record with its character-strings
/// concatenated. A name without TXT records resolves to an empty vector.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, CymruError>;
}

/// [`TxtResolver`] backed by `hickory-resolver` and the host's resolver configuration
pub struct HickoryTxtResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryTxtResolver {
    /// Build a resolver from `/etc/resolv.conf` (or the platform equivalent)
    ///
    /// Falls back to the resolver crate's default upstreams when the system
    /// configuration cannot be read.
    pub fn from_system_conf() -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!(
                    "unable to read system resolver configuration ({}), using defaults",
                    e
                );
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self { resolver }
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, CymruError> {
        match self.resolver.txt_lookup(name).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|data| String::from_utf8_lossy(data))
                        .collect::<String>()
                })
                .collect()),
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                Ok(Vec::new())
            }
            Err(e) => Err(CymruError::Resolve {
                name: name.to_string(),
                source: e,
            }),
        }
    }
}

/// Client for the Cymru DNS interface
pub struct DnsClient {
    resolver: Arc<dyn TxtResolver>,
    origin_zone: String,
    origin6_zone: String,
    asn_zone: String,
}

impl DnsClient {
    /// Create a client querying the public Cymru zones
    pub fn new(resolver: Arc<dyn TxtResolver>) -> Self {
        Self {
            resolver,
            origin_zone: DEFAULT_ORIGIN_ZONE.to_string(),
            origin6_zone: DEFAULT_ORIGIN6_ZONE.to_string(),
            asn_zone: DEFAULT_ASN_ZONE.to_string(),
        }
    }

    /// Override the zones queried for origins and AS names
    pub fn with_zones(mut self, origin: &str, origin6: &str, asn: &str) -> Self {
        self.origin_zone = origin.trim_matches('.').to_string();
        self.origin6_zone = origin6.trim_matches('.').to_string();
        self.asn_zone = asn.trim_matches('.').to_string();
        self
    }

    /// Build the origin query name for an address
    pub fn origin_query_name(&self, addr: IpAddr) -> String {
        match addr {
            IpAddr::V4(v4) => format!("{}.{}", reverse_ipv4(v4), self.origin_zone),
            IpAddr::V6(v6) => format!("{}.{}", nibble_reverse_ipv6(v6), self.origin6_zone),
        }
    }

    /// Look up one address, returning one result per origin ASN
    ///
    /// # Errors
    ///
    /// - [`CymruError::InvalidIp`] if `ip` does not parse
    /// - [`CymruError::NoTxtRecords`] if the origin name has no TXT record
    /// - [`CymruError::UnexpectedTxtFormat`] if the record has fewer than 5 fields
    /// - [`CymruError::DeadlineExceeded`] if `deadline` passes first
    ///
    /// A failed AS name lookup does not fail the call; the name is left empty.
    pub async fn lookup(
        &self,
        ip: &str,
        deadline: Instant,
    ) -> Result<Vec<CymruResult>, CymruError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| CymruError::InvalidIp(ip.to_string()))?;

        let qname = self.origin_query_name(addr);
        debug!("querying origin TXT {}", qname);

        let txts = self.resolve_txt(&qname, deadline).await?;
        if txts.is_empty() {
            return Err(CymruError::NoTxtRecords(qname));
        }

        let record = txts.join(" ");
        let fields = split_fields(&record);
        if fields.len() < TXT_FIELD_COUNT {
            return Err(CymruError::UnexpectedTxtFormat {
                name: qname,
                record,
            });
        }

        let mut asns: Vec<&str> = fields[0].split_whitespace().collect();
        asns.sort();

        let retrieved = Utc::now();
        let mut results = Vec::with_capacity(asns.len());
        for asn in asns {
            let as_name = match self.lookup_as_name(asn, deadline).await {
                Ok(name) => name,
                Err(e) => {
                    warn!("AS name lookup for AS{} failed: {}", asn, e);
                    String::new()
                }
            };

            results.push(CymruResult {
                asn: parse_asn(asn),
                ip: addr.to_string(),
                bgp_prefix: fields[1].clone(),
                cc: fields[2].clone(),
                registry: fields[3].clone(),
                allocated: fields[4].clone(),
                as_name,
                method: LookupMethod::Dns,
                retrieved,
            });
        }

        Ok(results)
    }

    /// Resolve the AS name published under `AS<asn>.<asn zone>`
    pub async fn lookup_as_name(&self, asn: &str, deadline: Instant) -> Result<String, CymruError> {
        let name = format!("AS{}.{}", asn.trim(), self.asn_zone);
        debug!("querying AS name TXT {}", name);

        let txts = self.resolve_txt(&name, deadline).await?;
        if txts.is_empty() {
            return Err(CymruError::NoTxtRecords(name));
        }

        let record = txts.join(" ");
        let mut fields = split_fields(&record);
        if fields.len() < TXT_FIELD_COUNT {
            return Err(CymruError::UnexpectedTxtFormat { name, record });
        }
        Ok(fields.pop().unwrap_or_default())
    }

    async fn resolve_txt(&self, name: &str, deadline: Instant) -> Result<Vec<String>, CymruError> {
        let resolver = Arc::clone(&self.resolver);
        let query = name.to_string();
        let task = tokio::spawn(async move { resolver.lookup_txt(&query).await });

        match tokio::time::timeout_at(deadline, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                debug!("deadline reached while resolving {}, abandoning lookup", name);
                Err(CymruError::DeadlineExceeded)
            }
        }
    }
}

/// Reverse the octets of an IPv4 address: `1.2.3.4` becomes `4.3.2.1`
pub fn reverse_ipv4(addr: Ipv4Addr) -> String {
    let o = addr.octets();
    format!("{}.{}.{}.{}", o[3], o[2], o[1], o[0])
}

/// Expand an IPv6 address to 32 nibbles and reverse them, dot separated
pub fn nibble_reverse_ipv6(addr: Ipv6Addr) -> String {
    let mut out = String::with_capacity(63);
    for byte in addr.octets().iter().rev() {
        if !out.is_empty() {
            out.push('.');
        }
        let _ = write!(out, "{:x}.{:x}", byte & 0x0f, byte >> 4);
    }
    out
}
