//! Output encoders for lookup results
//!
//! All encoders expect results that have already been through
//! [`sort_results`](super::sort::sort_results); JSON grouping relies on
//! equal ASNs being adjacent.

use std::collections::HashSet;
use std::io::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::error::CymruError;
use super::types::{AsnGroup, AsnGroupEntry, CymruResult};
use crate::lens::utils::{truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};

const HEADERS: [&str; 7] = [
    "AS",
    "IP",
    "BGP Prefix",
    "CC",
    "Registry",
    "Allocated",
    "AS Name",
];

/// Row shape for the bordered table
#[derive(Tabled)]
struct PrettyRow {
    #[tabled(rename = "AS")]
    asn: i64,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "BGP Prefix")]
    bgp_prefix: String,
    #[tabled(rename = "CC")]
    cc: String,
    #[tabled(rename = "Registry")]
    registry: String,
    #[tabled(rename = "Allocated")]
    allocated: String,
    #[tabled(rename = "AS Name")]
    as_name: String,
}

impl From<&CymruResult> for PrettyRow {
    fn from(r: &CymruResult) -> Self {
        PrettyRow {
            asn: r.asn,
            ip: r.ip.clone(),
            bgp_prefix: r.bgp_prefix.clone(),
            cc: r.cc.clone(),
            registry: r.registry.clone(),
            allocated: r.allocated.clone(),
            as_name: truncate_name(&r.as_name, DEFAULT_NAME_MAX_LEN),
        }
    }
}

/// Write the fixed-width, pipe-separated table
pub fn write_table<W: Write>(w: &mut W, results: &[CymruResult]) -> Result<(), CymruError> {
    writeln!(
        w,
        "{:<8} | {:<39} | {:<22} | {:<2} | {:<8} | {:<10} | {}",
        HEADERS[0], HEADERS[1], HEADERS[2], HEADERS[3], HEADERS[4], HEADERS[5], HEADERS[6]
    )?;
    for r in results {
        writeln!(
            w,
            "{:<8} | {:<39} | {:<22} | {:<2} | {:<8} | {:<10} | {}",
            r.asn, r.ip, r.bgp_prefix, r.cc, r.registry, r.allocated, r.as_name
        )?;
    }
    Ok(())
}

/// Write a bordered table with long AS names truncated
pub fn write_pretty_table<W: Write>(w: &mut W, results: &[CymruResult]) -> Result<(), CymruError> {
    let rows: Vec<PrettyRow> = results.iter().map(PrettyRow::from).collect();
    writeln!(w, "{}", Table::new(rows).with(Style::rounded()))?;
    Ok(())
}

/// Write CSV with a header row; the CSV writer handles quoting
pub fn write_csv<W: Write>(w: W, results: &[CymruResult]) -> Result<(), CymruError> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(HEADERS)?;
    for r in results {
        let asn = r.asn.to_string();
        writer.write_record([
            asn.as_str(),
            r.ip.as_str(),
            r.bgp_prefix.as_str(),
            r.cc.as_str(),
            r.registry.as_str(),
            r.allocated.as_str(),
            r.as_name.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Fold sorted results into ASN groups
///
/// A new group starts whenever the ASN changes. Within a group, entries that
/// repeat every per-IP field (including `retrieved`) are dropped.
pub fn group_by_asn(results: &[CymruResult]) -> Vec<AsnGroup> {
    let mut groups: Vec<AsnGroup> = Vec::new();
    let mut seen: HashSet<AsnGroupEntry> = HashSet::new();

    for r in results {
        let starts_group = groups.last().map_or(true, |g| g.asn != r.asn);
        if starts_group {
            groups.push(AsnGroup {
                asn: r.asn,
                as_name: r.as_name.clone(),
                ips: Vec::new(),
            });
            seen.clear();
        }

        let entry = AsnGroupEntry::from(r);
        if !seen.insert(entry.clone()) {
            continue;
        }
        if let Some(group) = groups.last_mut() {
            group.ips.push(entry);
        }
    }

    groups
}

/// Write ASN-grouped JSON with two-space indentation
pub fn write_json<W: Write>(mut w: W, results: &[CymruResult]) -> Result<(), CymruError> {
    let groups = group_by_asn(results);
    serde_json::to_writer_pretty(&mut w, &groups)?;
    writeln!(w)?;
    Ok(())
}

/// Encode results in the requested format
///
/// `pretty` only affects [`OutputFormat::Table`].
pub fn write_results<W: Write>(
    w: &mut W,
    results: &[CymruResult],
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CymruError> {
    match format {
        OutputFormat::Table if pretty => write_pretty_table(w, results),
        OutputFormat::Table => write_table(w, results),
        OutputFormat::Csv => write_csv(&mut *w, results),
        OutputFormat::Json => write_json(&mut *w, results),
    }
}
