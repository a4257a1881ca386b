use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use tracing::{Instrument, info_span};

use crate::commands::CommandLine;
use crate::terminal::{colors, print, progress};
use crate::vprint;
use vhunt_common::config::{ScanConfig, title_case_header};
use vhunt_common::filter::LineFilter;
use vhunt_common::network::address::load_addresses;
use vhunt_common::target::parse_paths;
use vhunt_common::{success, warn};
use vhunt_core::enumerator::{TargetCount, TargetEnumerator};
use vhunt_core::source::{FileSource, MemorySource};
use vhunt_core::{ScanSummary, Scanner};

pub async fn scan(args: &CommandLine) -> anyhow::Result<()> {
    let config: ScanConfig = args.to_config();
    warn_recased_headers(&config);

    print::header("loading targets");
    let addresses: Vec<String> = load_address_file(&args.ips)?;
    let paths: Vec<String> = parse_paths(&args.paths);

    let enumerator = TargetEnumerator::new(
        MemorySource::new(args.ips.display().to_string(), addresses),
        FileSource::new(&args.hosts),
        paths.clone(),
    )
    .with_address_filter(LineFilter::from_flag(&args.ip_filter))
    .with_hostname_filter(LineFilter::from_flag(&args.host_filter))
    .with_chunk_size(config.chunk_size);

    let count: TargetCount = enumerator.count().context("Failed to count targets")?;
    print_plan(&config, &paths, &count);

    if count.filtered == 0 {
        print::header("nothing to scan");
        print::no_results();
        return Ok(());
    }

    let scanner = Scanner::new(config).context("Failed to prepare scanner")?;

    print::header("scanning");
    let span = info_span!("scan", indicatif.pb_show = true);
    progress::attach_bar(&span, count.filtered);
    let mut sink = progress::ConsoleSink::new(span.clone());

    let start_time: Instant = Instant::now();
    let summary: ScanSummary = scanner
        .run(enumerator, Some(count.filtered), &mut sink)
        .instrument(span)
        .await?;

    scan_ends(&summary, start_time.elapsed());
    Ok(())
}

fn load_address_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Error opening address file {}", path.display()))?;
    let list = load_addresses(BufReader::new(file))
        .with_context(|| format!("Error reading address file {}", path.display()))?;

    if !list.invalid.is_empty() {
        warn!(
            "Skipped {} invalid entries in {}",
            list.invalid.len(),
            path.display()
        );
        for invalid in &list.invalid {
            warn!("  line {}: '{}' ({})", invalid.line_no, invalid.line, invalid.error);
        }
    }

    success!("Loaded {} unique addresses", list.addresses.len());
    Ok(list.addresses)
}

fn warn_recased_headers(config: &ScanConfig) {
    for (name, _) in &config.headers {
        let sent = title_case_header(name);
        if &sent != name {
            warn!("Header '{name}' is sent as '{sent}'");
        }
    }
}

fn print_plan(config: &ScanConfig, paths: &[String], count: &TargetCount) {
    print::aligned_line("Protocol", format!("{}:{}", config.protocol, config.port()));
    print::aligned_line("Paths", paths.join(", "));
    print::aligned_line("Workers", config.workers.to_string());
    print::aligned_line("Max in flight", config.max_in_flight.to_string());
    print::aligned_line("Connections", config.connection_mode.to_string());
    print::aligned_line("Total targets", count.total.to_string().color(colors::ACCENT));
    print::aligned_line(
        "Filtered targets",
        count.filtered.to_string().color(colors::ACCENT).bold(),
    );
}

fn scan_ends(summary: &ScanSummary, total_time: Duration) {
    let matched: ColoredString = format!("{} matches", summary.matched).bold().green();
    let processed: ColoredString = format!("{} requests", summary.processed).bold();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();

    vprint!();
    print::fat_separator();
    print::centerln(&format!("Scan Complete: {matched} out of {processed} in {total_time}"));
    if summary.failed > 0 {
        print::centerln(&format!("{}", format!("{} requests failed", summary.failed).red()));
    }
    print::end_of_program();
}
