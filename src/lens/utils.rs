//! Common utility functions for lens modules
//!
//! This module provides shared utility functions used across the lenses,
//! particularly for selecting and describing output formats.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum length for AS name display in pretty tables
pub const DEFAULT_NAME_MAX_LEN: usize = 40;

/// Output format for lookup results
///
/// `Table` is the default and is always written to standard output.
/// `Csv` and `Json` may be redirected to a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Fixed-width, pipe-separated table (default)
    #[default]
    Table,
    /// RFC 4180 CSV with a header row
    Csv,
    /// Pretty-printed JSON grouped by ASN
    Json,
}

impl OutputFormat {
    /// Pick the format from the mutually exclusive `--json` / `--csv` flags
    pub fn from_flags(json: bool, csv: bool) -> Result<Self, String> {
        match (json, csv) {
            (true, true) => Err("--json (-j) and --csv (-c) are mutually exclusive".to_string()),
            (true, false) => Ok(Self::Json),
            (false, true) => Ok(Self::Csv),
            (false, false) => Ok(Self::Table),
        }
    }

    /// Check if this format can be redirected to an output file
    pub fn supports_output_file(&self) -> bool {
        !matches!(self, Self::Table)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Truncate a string to the specified length, adding "..." if truncated
///
/// AS names can be long ("GOOGLE - Google LLC, US"); this keeps bordered
/// tables readable.
///
/// # Examples
///
/// ```
/// use ip2asn::lens::utils::truncate_name;
///
/// // Short name - no truncation
/// assert_eq!(truncate_name("GOOGLE", 20), "GOOGLE");
///
/// // Long name - truncated with ...
/// assert_eq!(truncate_name("CLOUDFLARENET - Cloudflare, Inc., US", 20), "CLOUDFLARENET - C...");
/// ```
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let truncated: String = name.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name_short() {
        assert_eq!(truncate_name("GOOGLE", 20), "GOOGLE");
    }

    #[test]
    fn test_truncate_name_over_limit() {
        assert_eq!(
            truncate_name("AMAZON-02 - Amazon.com, Inc., US", 20),
            "AMAZON-02 - Amazo..."
        );
    }

    #[test]
    fn test_truncate_name_unicode() {
        // counted by char, not bytes
        assert_eq!(
            truncate_name("日本語テスト名前これは長い", 10),
            "日本語テスト名..."
        );
    }

    #[test]
    fn test_output_format_from_flags() {
        assert_eq!(
            OutputFormat::from_flags(false, false).unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_flags(true, false).unwrap(),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from_flags(false, true).unwrap(),
            OutputFormat::Csv
        );

        let err = OutputFormat::from_flags(true, true).unwrap_err();
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_supports_output_file() {
        assert!(!OutputFormat::Table.supports_output_file());
        assert!(OutputFormat::Csv.supports_output_file());
        assert!(OutputFormat::Json.supports_output_file());
    }
}
