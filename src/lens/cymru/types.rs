//! Cymru lens types
//!
//! This module defines the normalized result record produced by both lookup
//! protocols, and the ASN-grouped shapes used for JSON output.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// ASN value used when the upstream field is not numeric (e.g. `NA`)
pub const UNKNOWN_ASN: i64 = -1;

/// Protocol that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMethod {
    /// `origin[6].asn.cymru.com` TXT records
    Dns,
    /// Bulk verbose query against `whois.cymru.com:43`
    Whois,
}

impl fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMethod::Dns => write!(f, "dns"),
            LookupMethod::Whois => write!(f, "whois"),
        }
    }
}

/// One IP-to-ASN mapping
///
/// Results are created by a client once a TXT record or WHOIS line has been
/// parsed and are not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CymruResult {
    /// Origin AS number, [`UNKNOWN_ASN`] when upstream had none
    pub asn: i64,
    /// Canonical IP address
    pub ip: String,
    /// BGP prefix covering the address (may be empty or `NA`)
    pub bgp_prefix: String,
    /// ISO 3166-1 alpha-2 country code
    pub cc: String,
    /// Regional registry (`arin`, `ripencc`, ...)
    pub registry: String,
    /// Allocation date as provided upstream (`YYYY-MM-DD`)
    pub allocated: String,
    /// AS name/description
    pub as_name: String,
    pub method: LookupMethod,
    /// When the upstream response was parsed
    #[serde(serialize_with = "serialize_rfc3339_nanos")]
    pub retrieved: DateTime<Utc>,
}

/// JSON output group: consecutive results sharing one ASN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnGroup {
    pub asn: i64,
    /// AS name of the first result in the run
    pub as_name: String,
    pub ips: Vec<AsnGroupEntry>,
}

/// Per-IP entry nested under an [`AsnGroup`]
///
/// Equality covers every field, including `retrieved`, so two lookups of the
/// same address at different times are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsnGroupEntry {
    pub ip: String,
    pub bgp_prefix: String,
    pub cc: String,
    pub registry: String,
    pub allocated: String,
    pub method: LookupMethod,
    #[serde(serialize_with = "serialize_rfc3339_nanos")]
    pub retrieved: DateTime<Utc>,
}

impl From<&CymruResult> for AsnGroupEntry {
    fn from(r: &CymruResult) -> Self {
        AsnGroupEntry {
            ip: r.ip.clone(),
            bgp_prefix: r.bgp_prefix.clone(),
            cc: r.cc.clone(),
            registry: r.registry.clone(),
            allocated: r.allocated.clone(),
            method: r.method,
            retrieved: r.retrieved,
        }
    }
}

fn serialize_rfc3339_nanos<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_method_serialization() {
        assert_eq!(
            serde_json::to_string(&LookupMethod::Dns).unwrap(),
            "\"dns\""
        );
        assert_eq!(LookupMethod::Whois.to_string(), "whois");
    }

    #[test]
    fn test_retrieved_is_rfc3339_nanos() {
        let entry = AsnGroupEntry {
            ip: "8.8.8.8".to_string(),
            bgp_prefix: "8.8.8.0/24".to_string(),
            cc: "US".to_string(),
            registry: "arin".to_string(),
            allocated: "2023-12-28".to_string(),
            method: LookupMethod::Whois,
            retrieved: Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["retrieved"], "2024-03-14T15:09:26.000000000Z");
        assert_eq!(value["method"], "whois");
    }
}
