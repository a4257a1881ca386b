pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use vhunt_common::config::{
    ConnectionMode, MatchCriteria, Protocol, ScanConfig, parse_headers, parse_terms,
};
use vhunt_core::enumerator::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(name = "vhunt", version)]
#[command(about = "Find virtual hosts by probing every address with every hostname.")]
pub struct CommandLine {
    /// File of IPv4 addresses, ranges (a-b) or CIDR blocks, one per line
    #[arg(long, value_name = "FILE")]
    pub ips: PathBuf,

    /// File of hostnames to send in the Host header, one per line
    #[arg(long, value_name = "FILE")]
    pub hosts: PathBuf,

    /// Comma-separated request paths
    #[arg(long, default_value = "/")]
    pub paths: String,

    /// http or https
    #[arg(long, default_value = "http")]
    pub protocol: String,

    /// Port to connect to instead of the protocol default
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of worker tasks
    #[arg(short, long, default_value_t = 100)]
    pub concurrency: usize,

    /// Requests allowed in flight at once [default: concurrency]
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Whole-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub request_timeout: u64,

    /// Connection establishment timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub max_conn_timeout: u64,

    /// Idle pooled connection timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub idle_timeout: u64,

    /// Read timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub read_timeout: u64,

    /// Extra headers as "Name:Value;Name:Value". Names are sent title-cased
    /// (X-Api-Key), except on paths with dot segments, which go out verbatim
    #[arg(long, default_value = "")]
    pub headers: String,

    /// Only report this status code (0 = any)
    #[arg(long = "http-status-is", default_value_t = 0)]
    pub status: u16,

    /// Only report bodies containing one of these comma-separated terms
    #[arg(long = "http-body-includes", default_value = "")]
    pub body_includes: String,

    /// Only scan addresses containing one of these comma-separated substrings
    #[arg(long, default_value = "")]
    pub ip_filter: String,

    /// Only scan hostnames containing one of these comma-separated substrings
    #[arg(long, default_value = "")]
    pub host_filter: String,

    /// Lines read per enumeration chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Reuse idle connections instead of closing after each request
    #[arg(long)]
    pub keep_alive: bool,

    /// Print failed and non-matching requests too
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> ScanConfig {
        let workers = self.concurrency.max(1);
        ScanConfig {
            protocol: Protocol::from_flag(&self.protocol),
            port: self.port,
            workers,
            max_in_flight: self.max_in_flight.unwrap_or(workers).max(1),
            request_timeout: Duration::from_secs(self.request_timeout),
            connect_timeout: Duration::from_secs(self.max_conn_timeout),
            idle_timeout: Duration::from_secs(self.idle_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            connection_mode: if self.keep_alive {
                ConnectionMode::KeepAlive
            } else {
                ConnectionMode::Close
            },
            headers: parse_headers(&self.headers),
            criteria: MatchCriteria::new(self.status, parse_terms(&self.body_includes)),
            chunk_size: self.chunk_size.max(1),
            verbose: self.verbose,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
