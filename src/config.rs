use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lens::cymru::dns::{DEFAULT_ASN_ZONE, DEFAULT_ORIGIN6_ZONE, DEFAULT_ORIGIN_ZONE};
use crate::lens::cymru::DEFAULT_LOOKUP_TIMEOUT;
use crate::lens::cymru::whois::{
    DEFAULT_DIAL_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_WHOIS_HOST, DEFAULT_WHOIS_PORT,
};

/// Runtime settings for the lookup engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ip2asnConfig {
    /// WHOIS bulk server host name
    pub whois_host: String,

    /// WHOIS bulk server port
    pub whois_port: u16,

    /// Deadline covering the whole lookup phase (default: 8 seconds)
    pub lookup_timeout_secs: u64,

    /// Upper bound for the WHOIS TCP dial (default: 6 seconds)
    pub dial_timeout_secs: u64,

    /// WHOIS read deadline (default: 10 seconds)
    pub read_timeout_secs: u64,

    /// DNS zone for IPv4 origin lookups
    pub origin_zone: String,

    /// DNS zone for IPv6 origin lookups
    pub origin6_zone: String,

    /// DNS zone for AS name lookups
    pub asn_zone: String,
}

impl Default for Ip2asnConfig {
    fn default() -> Self {
        Self {
            whois_host: DEFAULT_WHOIS_HOST.to_string(),
            whois_port: DEFAULT_WHOIS_PORT,
            lookup_timeout_secs: DEFAULT_LOOKUP_TIMEOUT.as_secs(),
            dial_timeout_secs: DEFAULT_DIAL_TIMEOUT.as_secs(),
            read_timeout_secs: DEFAULT_READ_TIMEOUT.as_secs(),
            origin_zone: DEFAULT_ORIGIN_ZONE.to_string(),
            origin6_zone: DEFAULT_ORIGIN6_ZONE.to_string(),
            asn_zone: DEFAULT_ASN_ZONE.to_string(),
        }
    }
}

impl Ip2asnConfig {
    /// Build the configuration from an optional TOML file and `IP2ASN_*` variables
    ///
    /// With no explicit path, `$HOME/.ip2asn.toml` is read when it exists.
    /// The file is never created.
    pub fn new(path: &Option<String>) -> Result<Ip2asnConfig> {
        let mut builder = Config::builder();

        match path {
            Some(p) => {
                if !Path::new(p.as_str()).exists() {
                    return Err(anyhow!("Config file {} does not exist", p));
                }
                builder = builder.add_source(config::File::from(Path::new(p.as_str())));
            }
            None => {
                if let Some(p) = Self::config_file_path() {
                    if p.exists() {
                        builder = builder.add_source(config::File::from(p));
                    }
                }
            }
        }

        // E.g., `IP2ASN_WHOIS_HOST=whois.example.net ip2asn ...`
        builder = builder.add_source(config::Environment::with_prefix("IP2ASN"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let map = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_map(&map))
    }

    /// Apply recognized keys over the defaults; bad values are ignored
    fn from_map(map: &HashMap<String, String>) -> Ip2asnConfig {
        let defaults = Ip2asnConfig::default();

        let string_or = |key: &str, default: String| {
            map.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let secs_or = |key: &str, default: u64| {
            map.get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        Ip2asnConfig {
            whois_host: string_or("whois_host", defaults.whois_host),
            whois_port: map
                .get("whois_port")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.whois_port),
            lookup_timeout_secs: secs_or("lookup_timeout_secs", defaults.lookup_timeout_secs),
            dial_timeout_secs: secs_or("dial_timeout_secs", defaults.dial_timeout_secs),
            read_timeout_secs: secs_or("read_timeout_secs", defaults.read_timeout_secs),
            origin_zone: string_or("origin_zone", defaults.origin_zone),
            origin6_zone: string_or("origin6_zone", defaults.origin6_zone),
            asn_zone: string_or("asn_zone", defaults.asn_zone),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Default config file location, `$HOME/.ip2asn.toml`
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ip2asn.toml"))
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("WHOIS Server:       {}:{}", self.whois_host, self.whois_port),
            format!("Lookup Timeout:     {} seconds", self.lookup_timeout_secs),
            format!("Dial Timeout:       {} seconds", self.dial_timeout_secs),
            format!("Read Timeout:       {} seconds", self.read_timeout_secs),
            format!("Origin Zone (v4):   {}", self.origin_zone),
            format!("Origin Zone (v6):   {}", self.origin6_zone),
            format!("AS Name Zone:       {}", self.asn_zone),
        ];
        lines.join("\n")
    }
}
