#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! ip2asn - map IP addresses to origin ASNs
//!
//! ip2asn pulls IPv4 and IPv6 addresses out of arbitrary text and looks up
//! their origin AS, BGP prefix, country, registry, allocation date and AS
//! name using Team Cymru's public services. It can be used as both a
//! command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `cli` (default) | The `ip2asn` binary | `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! ip2asn = { version = "0.3", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - **[`lens`]**: business logic
//!   - `extract`: address extraction from free text
//!   - `cymru`: DNS and WHOIS clients, ordering and output encoders
//!   - `utils`: output format selection
//!
//! - **[`config`]**: configuration management
//!
//! # Lookup protocols
//!
//! A single address is looked up over DNS TXT records
//! (`origin.asn.cymru.com`, `origin6.asn.cymru.com`, `AS<n>.asn.cymru.com`)
//! and falls back to WHOIS on failure. Lists are sent in one WHOIS bulk
//! session to `whois.cymru.com:43`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ip2asn::{CymruLens, Ip2asnConfig, IpExtractor, OutputFormat};
//!
//! let ips = IpExtractor::new()?.extract("IPs: 8.8.8.8 and 1.1.1.1");
//!
//! let lens = CymruLens::new(&Ip2asnConfig::default());
//! let results = lens
//!     .lookup(&ips, |e| eprintln!("DNS lookup failed ({e}). Falling back to WHOIS."))
//!     .await?;
//!
//! ip2asn::lens::cymru::write_results(
//!     &mut std::io::stdout(),
//!     &results,
//!     OutputFormat::Json,
//!     false,
//! )?;
//! ```

pub mod config;
pub mod lens;

pub use config::Ip2asnConfig;

pub use lens::cymru::{
    AsnGroup, AsnGroupEntry, CymruError, CymruLens, CymruResult, DnsClient, LookupMethod,
    WhoisClient, UNKNOWN_ASN,
};
pub use lens::extract::IpExtractor;
pub use lens::utils::OutputFormat;
