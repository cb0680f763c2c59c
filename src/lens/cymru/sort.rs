//! Deterministic ordering of lookup results
//!
//! Results are sorted by ASN, then by address value. All IPv4 addresses sort
//! before all IPv6 addresses; within a family, addresses compare by their
//! bytes in network order. The sort is stable, so equal keys keep their
//! collection order.

use std::cmp::Ordering;
use std::net::IpAddr;

use super::types::CymruResult;

/// Sort results in place by `(asn, address)`
pub fn sort_results(results: &mut [CymruResult]) {
    results.sort_by(|a, b| a.asn.cmp(&b.asn).then_with(|| compare_ips(&a.ip, &b.ip)));
}

/// Total order over address strings
///
/// Parsed addresses compare numerically and sort before anything that does
/// not parse; two unparseable strings compare lexically.
pub fn compare_ips(a: &str, b: &str) -> Ordering {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
