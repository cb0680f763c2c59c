//! Field handling shared by the DNS and WHOIS clients
//!
//! Both Cymru interfaces return pipe-delimited records. TXT answers may
//! arrive wrapped in quotes.

use super::types::UNKNOWN_ASN;

/// Split a Cymru record on `|`, trimming quotes and whitespace
///
/// ```
/// use ip2asn::lens::cymru::fields::split_fields;
///
/// let fields = split_fields("\"13335 | 1.1.1.0/24 | AU | apnic | 2011-08-11\"");
/// assert_eq!(fields, vec!["13335", "1.1.1.0/24", "AU", "apnic", "2011-08-11"]);
/// ```
pub fn split_fields(record: &str) -> Vec<String> {
    record
        .trim()
        .trim_matches('"')
        .trim()
        .split('|')
        .map(|f| f.trim().to_string())
        .collect()
}

/// Convert an ASN field to an integer, [`UNKNOWN_ASN`] when it is not all digits
pub fn parse_asn(field: &str) -> i64 {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return UNKNOWN_ASN;
    }
    field.parse::<i64>().unwrap_or(UNKNOWN_ASN)
}
