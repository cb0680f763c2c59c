//! Lens module
//!
//! This module provides high-level "lens" abstractions that combine business logic
//! with output formatting. Lenses are reusable from the CLI or from other crates.
//!
//! | Lens | Purpose | Dependencies |
//! |------|---------|--------------|
//! | `IpExtractor` | Pull canonical IPv4/IPv6 addresses out of free text | regex |
//! | `CymruLens` | Map addresses to origin ASNs via Team Cymru | hickory-resolver, tokio |
//!
//! # Usage
//!
//! ```rust,ignore
//! use ip2asn::lens::extract::IpExtractor;
//! use ip2asn::lens::cymru::{write_results, CymruLens};
//! use ip2asn::lens::utils::OutputFormat;
//!
//! let ips = IpExtractor::new()?.extract("IPs: 8.8.8.8 and 1.1.1.1");
//! let lens = CymruLens::new(&ip2asn::Ip2asnConfig::default());
//! let results = lens.lookup(&ips, |_| {}).await?;
//! write_results(&mut std::io::stdout(), &results, OutputFormat::Csv, false)?;
//! ```

pub mod utils;

// IpExtractor - address extraction from free text
pub mod extract;

// CymruLens - DNS and WHOIS lookups against Team Cymru
pub mod cymru;
