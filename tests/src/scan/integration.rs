#![cfg(test)]
use std::fs::File;
use std::io::{BufReader, Write};
use std::time::Duration;

use tempfile::NamedTempFile;
use vhunt_common::config::{ConnectionMode, MatchCriteria, ScanConfig};
use vhunt_common::filter::LineFilter;
use vhunt_common::network::address::load_addresses;
use vhunt_common::target::{Target, parse_paths};
use vhunt_core::ProbeError;
use vhunt_core::enumerator::TargetEnumerator;
use vhunt_core::processor::Finding;
use vhunt_core::scanner::ResultSink;
use vhunt_core::source::{FileSource, MemorySource};
use vhunt_core::{ScanSummary, Scanner};

use crate::responder::Responder;

#[derive(Default)]
struct Collected {
    findings: Vec<Finding>,
    failures: Vec<Target>,
    misses: Vec<Target>,
    last_progress: u64,
}

impl ResultSink for Collected {
    fn progress(&mut self, processed: u64) {
        self.last_progress = processed;
    }

    fn finding(&mut self, finding: &Finding) {
        self.findings.push(finding.clone());
    }

    fn failure(&mut self, target: &Target, _error: &ProbeError) {
        self.failures.push(target.clone());
    }

    fn miss(&mut self, target: &Target, _status: u16, _status_match: bool, _body_match: bool) {
        self.misses.push(target.clone());
    }
}

fn write_lines(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

/// Serves the welcome page to `good.example` only.
async fn welcome_server() -> Responder {
    Responder::start(|host, path| match host {
        "good.example" => (200, format!("<h1>Welcome</h1> you asked for {path}")),
        _ => (404, "<h1>Not here</h1>".to_string()),
    })
    .await
    .unwrap()
}

fn config_for(server: &Responder) -> ScanConfig {
    ScanConfig {
        port: Some(server.port()),
        workers: 4,
        max_in_flight: 4,
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        criteria: MatchCriteria::new(200, vec!["Welcome".to_string()]),
        ..ScanConfig::default()
    }
}

fn address_source(file: &NamedTempFile) -> MemorySource {
    let list = load_addresses(BufReader::new(File::open(file.path()).unwrap())).unwrap();
    assert!(list.invalid.is_empty());
    MemorySource::new("ips", list.addresses)
}

async fn run_scan(
    config: ScanConfig,
    enumerator: TargetEnumerator<MemorySource, FileSource>,
) -> (ScanSummary, Collected) {
    let expected = enumerator.count().unwrap().filtered;
    let scanner = Scanner::new(config).unwrap();
    let mut sink = Collected::default();
    let summary = scanner.run(enumerator, Some(expected), &mut sink).await.unwrap();
    (summary, sink)
}

fn matched_pairs(findings: &[Finding]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = findings
        .iter()
        .map(|f| (f.target.hostname.clone(), f.target.path.clone()))
        .collect();
    pairs.sort();
    pairs
}

#[tokio::test]
async fn only_the_matching_virtual_host_is_reported() {
    let server = welcome_server().await;
    let ips = write_lines(&["127.0.0.1"]);
    let hosts = write_lines(&["good.example", "bad.example"]);

    let enumerator = TargetEnumerator::new(
        address_source(&ips),
        FileSource::new(hosts.path()),
        parse_paths("/,/admin"),
    );
    let (summary, sink) = run_scan(config_for(&server), enumerator).await;

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(sink.last_progress, 4);
    assert_eq!(server.hits(), 4);
    assert_eq!(
        matched_pairs(&sink.findings),
        vec![
            ("good.example".to_string(), "/".to_string()),
            ("good.example".to_string(), "/admin".to_string()),
        ]
    );

    for finding in &sink.findings {
        assert_eq!(finding.status, 200);
        assert_eq!(finding.matched_term.as_deref(), Some("Welcome"));
        assert!(finding.preview.starts_with("<h1>Welcome</h1>"));
    }

    // quiet mode never hands misses to the sink
    assert!(sink.misses.is_empty());
}

#[tokio::test]
async fn verbose_mode_reports_misses() {
    let server = welcome_server().await;
    let ips = write_lines(&["127.0.0.1"]);
    let hosts = write_lines(&["good.example", "bad.example"]);

    let enumerator = TargetEnumerator::new(
        address_source(&ips),
        FileSource::new(hosts.path()),
        parse_paths("/,/admin"),
    );
    let config = ScanConfig {
        verbose: true,
        ..config_for(&server)
    };
    let (summary, sink) = run_scan(config, enumerator).await;

    assert_eq!(summary.matched, 2);
    assert_eq!(sink.misses.len(), 2);
    assert!(sink.misses.iter().all(|t| t.hostname == "bad.example"));
}

#[tokio::test]
async fn keep_alive_mode_finds_the_same_hosts() {
    let server = welcome_server().await;
    let ips = write_lines(&["127.0.0.1"]);
    let hosts = write_lines(&["good.example", "bad.example"]);

    let enumerator = TargetEnumerator::new(
        address_source(&ips),
        FileSource::new(hosts.path()),
        parse_paths("/,/admin"),
    );
    let config = ScanConfig {
        connection_mode: ConnectionMode::KeepAlive,
        ..config_for(&server)
    };
    let (summary, sink) = run_scan(config, enumerator).await;

    assert_eq!(summary.processed, 4);
    assert_eq!(matched_pairs(&sink.findings).len(), 2);
}

#[tokio::test]
async fn filters_shrink_the_scan() {
    let server = welcome_server().await;
    let ips = write_lines(&["127.0.0.1", "# staging", "127.0.0.2"]);
    let hosts = write_lines(&["good.example", "bad.example", "good.internal"]);

    let enumerator = TargetEnumerator::new(
        address_source(&ips),
        FileSource::new(hosts.path()),
        parse_paths("/"),
    )
    .with_address_filter(LineFilter::from_flag("127.0.0.1"))
    .with_hostname_filter(LineFilter::from_flag("good"));

    let count = enumerator.count().unwrap();
    assert_eq!(count.total, 6);
    assert_eq!(count.filtered, 2);

    let (summary, sink) = run_scan(config_for(&server), enumerator).await;

    assert_eq!(summary.processed, 2);
    assert_eq!(server.hits(), 2);
    assert_eq!(
        matched_pairs(&sink.findings),
        vec![("good.example".to_string(), "/".to_string())]
    );
}

#[tokio::test]
async fn unreachable_addresses_do_not_stop_the_scan() {
    let server = welcome_server().await;
    // the responder only listens on 127.0.0.1
    let ips = write_lines(&["127.0.0.1-127.0.0.2"]);
    let hosts = write_lines(&["good.example"]);

    let enumerator = TargetEnumerator::new(
        address_source(&ips),
        FileSource::new(hosts.path()),
        parse_paths("/"),
    );
    let config = ScanConfig {
        verbose: true,
        ..config_for(&server)
    };
    let (summary, sink) = run_scan(config, enumerator).await;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(sink.findings[0].target.address, "127.0.0.1");
    assert_eq!(sink.failures[0].address, "127.0.0.2");
}

#[tokio::test]
async fn first_configured_term_wins() {
    let server = Responder::start(|_, _| (200, "admin panel - welcome back".to_string()))
        .await
        .unwrap();
    let ips = write_lines(&["127.0.0.1"]);
    let hosts = write_lines(&["portal.example"]);

    let enumerator = TargetEnumerator::new(
        address_source(&ips),
        FileSource::new(hosts.path()),
        parse_paths("/"),
    );
    let config = ScanConfig {
        criteria: MatchCriteria::new(0, vec!["missing".into(), "WELCOME".into(), "admin".into()]),
        ..config_for(&server)
    };
    let (summary, sink) = run_scan(config, enumerator).await;

    assert_eq!(summary.matched, 1);
    assert_eq!(sink.findings[0].matched_term.as_deref(), Some("WELCOME"));
}
