//! Team Cymru WHOIS bulk client
//!
//! All addresses are sent in one TCP session using the verbose bulk framing:
//!
//! ```text
//! begin
//! verbose
//! 8.8.8.8
//! 1.1.1.1
//! end
//! ```
//!
//! The server answers with a `Bulk mode;` banner followed by one line per
//! address:
//!
//! ```text
//! 15169   | 8.8.8.8          | 8.8.8.0/24          | US | arin     | 2023-12-28 | GOOGLE - Google LLC, US
//! ```
//!
//! Some deployments add an `Updated` column before the AS name, so the name
//! is always taken from the last field. Lines with fewer than 7 fields
//! (including `Error:` lines) are skipped.
//!
//! # Protocol Flow
//!
//! 1. Connect (bounded by the dial timeout and the caller's deadline)
//! 2. Send the whole query
//! 3. Read lines until EOF or until the read timeout expires
//!
//! Reaching the read timeout is not an error: whatever was parsed so far is
//! returned.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::CymruError;
use super::fields::{parse_asn, split_fields};
use super::types::{CymruResult, LookupMethod};

pub const DEFAULT_WHOIS_HOST: &str = "whois.cymru.com";
pub const DEFAULT_WHOIS_PORT: u16 = 43;
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(6);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum number of fields in a verbose response line
const MIN_VERBOSE_FIELDS: usize = 7;

const BANNER_PREFIX: &str = "Bulk mode;";

/// Client for the Cymru WHOIS bulk interface
pub struct WhoisClient {
    host: String,
    port: u16,
    dial_timeout: Duration,
    read_timeout: Duration,
}

impl WhoisClient {
    /// Create a new WHOIS client.
    ///
    /// # Arguments
    ///
    /// * `host` - The WHOIS server name (normally `whois.cymru.com`)
    /// * `port` - The WHOIS port (normally 43)
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the connect and read timeouts
    pub fn with_timeouts(mut self, dial_timeout: Duration, read_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self.read_timeout = read_timeout;
        self
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Look up all addresses in one bulk session.
    ///
    /// Results come back in response order, one per accepted line, all
    /// sharing the same `retrieved` timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be opened before the dial
    /// timeout or `deadline`, or if sending the query fails. Read failures
    /// end the session and return the results parsed so far.
    pub async fn lookup_bulk(
        &self,
        ips: &[String],
        deadline: Instant,
    ) -> Result<Vec<CymruResult>, CymruError> {
        if ips.is_empty() {
            return Ok(Vec::new());
        }

        let addr = self.addr();
        info!(
            "Connecting to WHOIS server {} for {} addresses (timeout: {:?})...",
            addr,
            ips.len(),
            self.dial_timeout
        );

        let dial_deadline = deadline.min(Instant::now() + self.dial_timeout);
        let mut stream = match tokio::time::timeout_at(
            dial_deadline,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(CymruError::Connect { addr, source: e }),
            Err(_) => return Err(CymruError::ConnectTimeout(addr)),
        };

        let query = build_bulk_query(ips);
        let write = tokio::time::timeout(self.read_timeout, stream.write_all(query.as_bytes()));
        match write.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(CymruError::Write { addr, source: e }),
            Err(_) => {
                return Err(CymruError::Write {
                    addr,
                    source: std::io::ErrorKind::TimedOut.into(),
                })
            }
        }
        debug!("sent bulk query ({} bytes)", query.len());

        let read_deadline = Instant::now() + self.read_timeout;
        let retrieved = Utc::now();
        let mut reader = BufReader::new(stream);
        let mut results = Vec::with_capacity(ips.len());
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match tokio::time::timeout_at(read_deadline, reader.read_until(b'\n', &mut buf)).await
            {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    let line = String::from_utf8_lossy(&buf);
                    if let Some(result) = parse_whois_line(&line, retrieved) {
                        results.push(result);
                    }
                }
                Ok(Err(e)) => {
                    warn!("error reading from {}: {}", addr, e);
                    break;
                }
                Err(_) => {
                    warn!(
                        "read timeout after {:?} from {}, response may be truncated ({} of {} addresses answered)",
                        self.read_timeout,
                        addr,
                        results.len(),
                        ips.len()
                    );
                    break;
                }
            }
        }

        info!("WHOIS session complete: {} results", results.len());
        Ok(results)
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new(DEFAULT_WHOIS_HOST.to_string(), DEFAULT_WHOIS_PORT)
    }
}

/// Frame addresses as a verbose bulk query
pub fn build_bulk_query(ips: &[String]) -> String {
    let mut query = String::from("begin\nverbose\n");
    for ip in ips {
        query.push_str(ip);
        query.push('\n');
    }
    query.push_str("end\n");
    query
}

/// Parse one verbose response line
///
/// Returns `None` for blank lines, the `Bulk mode;` banner, a column header
/// and anything with fewer than 7 fields.
pub fn parse_whois_line(line: &str, retrieved: DateTime<Utc>) -> Option<CymruResult> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(BANNER_PREFIX) {
        return None;
    }

    let mut fields = split_fields(line);
    if fields.len() < MIN_VERBOSE_FIELDS {
        debug!("skipping WHOIS line: {}", line);
        return None;
    }
    if fields[0] == "AS" && fields[1] == "IP" {
        return None;
    }

    let as_name = fields.pop().unwrap_or_default();
    let ip = match fields[1].parse::<IpAddr>() {
        Ok(addr) => addr.to_string(),
        Err(_) => fields[1].clone(),
    };

    Some(CymruResult {
        asn: parse_asn(&fields[0]),
        ip,
        bgp_prefix: fields[2].clone(),
        cc: fields[3].clone(),
        registry: fields[4].clone(),
        allocated: fields[5].clone(),
        as_name,
        method: LookupMethod::Whois,
        retrieved,
    })
}
