#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fs::File;
use std::io::{BufReader, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser};
use ip2asn::lens::cymru::write_results;
use ip2asn::*;
use tracing::{debug, Level};

const EXAMPLES: &str = "\
Examples:
  echo 'IPs: 8.8.8.8 and 1.1.1.1' | ip2asn
  ip2asn --ip 2001:4860:4860::8888 --json
  ip2asn --csv --output out.csv input.txt";

/// Map IP addresses found in text to their origin ASNs using Team Cymru
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(override_usage = "ip2asn [--json|-j | --csv|-c] [--output|-o PATH] [--ip|-i ADDR] [FILE]")]
#[clap(after_help = EXAMPLES)]
struct Cli {
    /// Output JSON grouped by ASN (mutually exclusive with --csv)
    #[clap(short, long)]
    json: bool,

    /// Output CSV (mutually exclusive with --json)
    #[clap(short, long)]
    csv: bool,

    /// Write CSV/JSON output to this file instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Look up a single address over DNS
    #[clap(short, long, value_name = "ADDR")]
    ip: Option<String>,

    /// Render the table format with borders
    #[clap(short, long)]
    pretty: bool,

    /// configuration file path, by default $HOME/.ip2asn.toml is used
    #[clap(long)]
    config: Option<String>,

    /// Print the effective configuration and exit
    #[clap(long)]
    show_config: bool,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Input file; standard input is read when omitted
    file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Ip2asnConfig::new(&cli.config)?;
    if cli.show_config {
        println!("{}", config.summary());
        return Ok(());
    }

    let format = OutputFormat::from_flags(cli.json, cli.csv).map_err(|e| anyhow!(e))?;
    let ips = collect_ips(&cli)?;
    debug!("extracted {} address(es)", ips.len());

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let lens = CymruLens::new(&config);
    let results = runtime
        .block_on(lens.lookup(&ips, |e| {
            eprintln!("DNS lookup failed ({e}). Falling back to WHOIS.")
        }))
        .map_err(|e| match ips.len() {
            1 => anyhow!("WHOIS fallback failed: {e}"),
            _ => anyhow!("WHOIS bulk lookup failed: {e}"),
        })?;

    if results.is_empty() {
        bail!("No results returned from Team Cymru.");
    }

    write_output(&results, format, cli.pretty, cli.output.as_ref())
}

/// Gather canonical addresses from `--ip`, the input file, or piped stdin
fn collect_ips(cli: &Cli) -> Result<Vec<String>> {
    let extractor = IpExtractor::new()?;

    if let Some(ip) = &cli.ip {
        let ips = extractor.extract(ip);
        if ips.len() != 1 {
            bail!("--ip is not a valid IPv4/IPv6 address: {}", ip);
        }
        return Ok(ips);
    }

    let ips = match &cli.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input file {}", path.display()))?;
            extractor
                .extract_from_reader(BufReader::new(file))
                .context("failed to parse IPs")?
        }
        None => {
            let stdin = std::io::stdin();
            if stdin.is_terminal() {
                eprintln!("{}", Cli::command().render_help());
                std::process::exit(2);
            }
            extractor
                .extract_from_reader(stdin.lock())
                .context("failed to parse IPs")?
        }
    };

    if ips.is_empty() {
        bail!("no IPv4/IPv6 addresses were found in the input");
    }
    Ok(ips)
}

fn write_output(
    results: &[CymruResult],
    format: OutputFormat,
    pretty: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) if format.supports_output_file() => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?,
        )),
        Some(_) => {
            eprintln!("--output is ignored for table format; printing to stdout");
            Box::new(std::io::stdout().lock())
        }
        None => Box::new(std::io::stdout().lock()),
    };

    write_results(&mut writer, results, format, pretty)
        .with_context(|| format!("failed to write {} output", format))?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("ip2asn").chain(args.iter().copied()))
    }

    fn input_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn results(count: usize) -> Vec<CymruResult> {
        (0..count)
            .map(|i| CymruResult {
                asn: 64496,
                ip: format!("192.0.2.{}", i),
                bgp_prefix: "192.0.2.0/24".to_string(),
                cc: "ZZ".to_string(),
                registry: "arin".to_string(),
                allocated: "2020-01-01".to_string(),
                as_name: "DOC-AS, Example".to_string(),
                method: LookupMethod::Whois,
                retrieved: Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_ip_flag_single_address() {
        let ips = collect_ips(&cli(&["--ip", "2001:4860:4860:0::8888"])).unwrap();
        assert_eq!(ips, vec!["2001:4860:4860::8888"]);
    }

    #[test]
    fn test_ip_flag_requires_exactly_one_address() {
        for value in ["not-an-ip", "8.8.8.8 1.1.1.1", ""] {
            let err = collect_ips(&cli(&["-i", value])).unwrap_err();
            assert!(
                err.to_string()
                    .starts_with("--ip is not a valid IPv4/IPv6 address"),
                "{value:?}: {err}"
            );
        }
    }

    #[test]
    fn test_file_input() {
        let file = input_file("IPs: 8.8.8.8 and 1.1.1.1\n8.8.8.8 again\n");
        let path = file.path().to_string_lossy().to_string();
        let ips = collect_ips(&cli(&[path.as_str()])).unwrap();
        assert_eq!(ips, vec!["8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn test_file_without_addresses() {
        let file = input_file("not an ip");
        let path = file.path().to_string_lossy().to_string();
        let err = collect_ips(&cli(&[path.as_str()])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no IPv4/IPv6 addresses were found in the input"
        );
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt").to_string_lossy().to_string();
        let err = collect_ips(&cli(&[path.as_str()])).unwrap_err();
        assert!(err.to_string().starts_with("failed to open input file"));
    }

    #[test]
    fn test_json_and_csv_are_mutually_exclusive() {
        let cli = cli(&["--json", "--csv"]);
        let err = OutputFormat::from_flags(cli.json, cli.csv).unwrap_err();
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn test_csv_written_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_output(&results(100), OutputFormat::Csv, false, Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 101);
        assert_eq!(lines[0], "AS,IP,BGP Prefix,CC,Registry,Allocated,AS Name");
        assert_eq!(
            lines[1],
            "64496,192.0.2.0,192.0.2.0/24,ZZ,arin,2020-01-01,\"DOC-AS, Example\""
        );
    }

    #[test]
    fn test_json_written_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        write_output(&results(3), OutputFormat::Json, false, Some(&path)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let groups = value.as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["asn"], 64496);
        assert_eq!(groups[0]["ips"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_output_path_ignored_for_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_output(&results(2), OutputFormat::Table, false, Some(&path)).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_unwritable_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.csv");

        let err = write_output(&results(1), OutputFormat::Csv, false, Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("failed to create output file"));
    }
}
