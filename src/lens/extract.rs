//! IP address extraction lens
//!
//! Pulls IPv4 and IPv6 literals out of free-form text (log lines, CSV dumps,
//! pasted reports) and returns them in canonical form.
//!
//! Two patterns are used. The IPv4 pattern is strict (octets bounded to
//! 0-255); the IPv6 pattern is permissive and every candidate is validated by
//! parsing it as an [`IpAddr`]. IPv4 matches are emitted first, then IPv6
//! matches, with duplicates dropped on first sighting.
//!
//! The IPv6 pattern grabs the longest run of colon-separated hex groups, so
//! full (`h:h:h:h:h:h:h:h`), compressed (`::1`, `fe80::`, `2001:db8::1`) and
//! mixed (`::ffff:192.0.2.1`) forms all come out whole. Since `::` may sit at
//! either end of an address, word boundaries are checked by hand instead of
//! with `\b`. A candidate without any hex digit (a bare `::`) is not an
//! address.
//!
//! An IPv6 address glued to a word or to an extra colon (`ip:2001:db8::1`,
//! `2001:db8::1:`) is dropped rather than trimmed, since the run of groups
//! it belongs to does not parse as a whole.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::net::IpAddr;
use tracing::debug;

const IPV4_PATTERN: &str = r"\b(?:(?:25[0-5]|2[0-4][0-9]|1?[0-9]{1,2})\.){3}(?:25[0-5]|2[0-4][0-9]|1?[0-9]{1,2})\b";

// groups may be empty so that `::` is covered; the dotted tail is tried first
const IPV6_PATTERN: &str =
    r"(?i)(?:[0-9a-f]{0,4}:){2,8}(?:(?:[0-9]{1,3}\.){3}[0-9]{1,3}|[0-9a-f]{1,4})?";

/// IP address extraction lens
///
/// # Example
///
/// ```rust,ignore
/// use ip2asn::lens::extract::IpExtractor;
///
/// let extractor = IpExtractor::new()?;
/// let ips = extractor.extract("IPs: 8.8.8.8 and 1.1.1.1");
/// assert_eq!(ips, vec!["8.8.8.8", "1.1.1.1"]);
/// ```
pub struct IpExtractor {
    ipv4: Regex,
    ipv6: Regex,
}

impl IpExtractor {
    /// Create a new extractor, compiling both address patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            ipv4: Regex::new(IPV4_PATTERN)?,
            ipv6: Regex::new(IPV6_PATTERN)?,
        })
    }

    /// Extract unique canonical addresses from a string
    ///
    /// Empty input (or input without any address) yields an empty vector.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        let ipv6 = self
            .ipv6
            .find_iter(text)
            .filter(|m| is_delimited(text, m.start(), m.end()))
            .filter(|m| m.as_str().chars().any(|c| c.is_ascii_hexdigit()));
        let candidates = self.ipv4.find_iter(text).chain(ipv6).map(|m| m.as_str());

        for candidate in candidates {
            let Some(addr) = canonicalize(candidate) else {
                debug!("discarding address-like token {:?}", candidate);
                continue;
            };
            if seen.insert(addr.clone()) {
                found.push(addr);
            }
        }

        found
    }

    /// Read the whole stream and extract addresses from it
    ///
    /// Bytes that are not valid UTF-8 are replaced before matching, so binary
    /// noise around addresses does not abort the extraction.
    pub fn extract_from_reader<R: Read>(&self, mut reader: R) -> Result<Vec<String>> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(self.extract(&String::from_utf8_lossy(&buf)))
    }
}

/// Check that a match is not part of a longer word or colon run
fn is_delimited(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Parse a candidate strictly and return its canonical text form
fn canonicalize(candidate: &str) -> Option<String> {
    candidate
        .trim()
        .parse::<IpAddr>()
        .ok()
        .map(|addr| addr.to_string())
}
