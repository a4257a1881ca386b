use indicatif::ProgressStyle;
use colored::*;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{format, print};
use vhunt_common::target::Target;
use vhunt_core::ProbeError;
use vhunt_core::processor::Finding;
use vhunt_core::scanner::ResultSink;

const BAR_TEMPLATE: &str =
    "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.green/bright_black}] {pos}/{len} ({per_sec}, eta {eta})";

pub fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Attaches a progress bar of `len` steps to `span`.
pub fn attach_bar(span: &Span, len: u64) {
    span.pb_set_style(&bar_style());
    span.pb_set_length(len);
}

/// Prints results above the progress bar and advances it.
pub struct ConsoleSink {
    span: Span,
}

impl ConsoleSink {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

impl ResultSink for ConsoleSink {
    fn progress(&mut self, _processed: u64) {
        self.span.pb_inc(1);
    }

    fn finding(&mut self, finding: &Finding) {
        print::print("");
        for line in format::finding_lines(finding) {
            print::print(&line);
        }
    }

    fn failure(&mut self, target: &Target, error: &ProbeError) {
        print::print_status(format::failure_line(target, error).red().to_string());
    }

    fn miss(&mut self, target: &Target, status: u16, status_match: bool, body_match: bool) {
        print::print_status(
            format::miss_line(target, status, status_match, body_match)
                .dimmed()
                .to_string(),
        );
    }
}
