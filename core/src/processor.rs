//! # Result Processor
//!
//! Consumes results in completion order, keeps the progress counter moving and
//! decides which results are findings. A result is a finding when its status
//! and its body both satisfy the [`MatchCriteria`]. Errors and misses only
//! reach the sink in verbose mode.

use tokio::sync::mpsc;
use tracing::debug;

use vhunt_common::config::{BodyMatch, MatchCriteria};
use vhunt_common::target::Target;

use crate::error::ProbeError;
use crate::worker::ScanResult;

/// Characters of body kept in a finding's preview.
pub const PREVIEW_LIMIT: usize = 750;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub target: Target,
    pub status: u16,
    pub matched_term: Option<String>,
    pub preview: String,
}

#[derive(Debug)]
pub enum Outcome {
    Matched(Finding),
    Missed {
        target: Target,
        status: u16,
        status_match: bool,
        body_match: bool,
    },
    Failed {
        target: Target,
        error: ProbeError,
    },
}

/// Receives progress and reportable results.
pub trait ResultSink {
    /// Called once per processed result with the running total.
    fn progress(&mut self, processed: u64);

    fn finding(&mut self, finding: &Finding);

    /// Verbose mode only.
    fn failure(&mut self, _target: &Target, _error: &ProbeError) {}

    /// Verbose mode only.
    fn miss(&mut self, _target: &Target, _status: u16, _status_match: bool, _body_match: bool) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub processed: u64,
    pub matched: u64,
    pub failed: u64,
}

pub struct ResultProcessor {
    criteria: MatchCriteria,
    verbose: bool,
    expected: Option<u64>,
}

impl ResultProcessor {
    pub fn new(criteria: MatchCriteria, verbose: bool) -> Self {
        Self {
            criteria,
            verbose,
            expected: None,
        }
    }

    /// Stops processing once `expected` results have been seen, even if the
    /// queue is still open.
    pub fn with_expected(mut self, expected: u64) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn evaluate(&self, result: ScanResult) -> Outcome {
        let ScanResult { target, outcome } = result;
        let response = match outcome {
            Ok(response) => response,
            Err(error) => return Outcome::Failed { target, error },
        };

        let status_match = self.criteria.status_matches(response.status);
        let body = self.criteria.match_body(&response.body);

        if !status_match || !body.is_match() {
            return Outcome::Missed {
                target,
                status: response.status,
                status_match,
                body_match: body.is_match(),
            };
        }

        let matched_term = match body {
            BodyMatch::Matched(term) => Some(term.to_string()),
            BodyMatch::Unfiltered | BodyMatch::Missed => None,
        };

        Outcome::Matched(Finding {
            target,
            status: response.status,
            matched_term,
            preview: body_preview(&response.body),
        })
    }

    pub async fn run<S: ResultSink>(
        &self,
        results: &mut mpsc::Receiver<ScanResult>,
        sink: &mut S,
    ) -> ScanSummary {
        let mut summary = ScanSummary::default();

        if self.expected == Some(0) {
            return summary;
        }

        while let Some(result) = results.recv().await {
            summary.processed += 1;
            sink.progress(summary.processed);

            match self.evaluate(result) {
                Outcome::Matched(finding) => {
                    summary.matched += 1;
                    sink.finding(&finding);
                }
                Outcome::Missed {
                    target,
                    status,
                    status_match,
                    body_match,
                } => {
                    if self.verbose {
                        sink.miss(&target, status, status_match, body_match);
                    }
                }
                Outcome::Failed { target, error } => {
                    summary.failed += 1;
                    if self.verbose {
                        sink.failure(&target, &error);
                    }
                }
            }

            if self.expected.is_some_and(|expected| summary.processed >= expected) {
                debug!(processed = summary.processed, "Expected result count reached");
                break;
            }
        }

        summary
    }
}

/// Body as a single line, cut to [`PREVIEW_LIMIT`] characters.
pub fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut flat = text.chars().filter(|c| *c != '\n' && *c != '\r');

    let mut preview: String = flat.by_ref().take(PREVIEW_LIMIT).collect();
    if flat.next().is_some() {
        preview.push_str("...");
    }
    preview
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::HttpResponse;

    #[derive(Default)]
    struct RecordingSink {
        progress: Vec<u64>,
        findings: Vec<Finding>,
        failures: usize,
        misses: usize,
    }

    impl ResultSink for RecordingSink {
        fn progress(&mut self, processed: u64) {
            self.progress.push(processed);
        }

        fn finding(&mut self, finding: &Finding) {
            self.findings.push(finding.clone());
        }

        fn failure(&mut self, _target: &Target, _error: &ProbeError) {
            self.failures += 1;
        }

        fn miss(&mut self, _target: &Target, _status: u16, _status_match: bool, _body_match: bool) {
            self.misses += 1;
        }
    }

    fn ok(host: &str, status: u16, body: &str) -> ScanResult {
        ScanResult {
            target: Target::new("203.0.113.10", host, "/"),
            outcome: Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
        }
    }

    fn failed(host: &str) -> ScanResult {
        ScanResult {
            target: Target::new("203.0.113.10", host, "/"),
            outcome: Err(ProbeError::Timeout),
        }
    }

    #[test]
    fn match_requires_status_and_body() {
        let processor = ResultProcessor::new(MatchCriteria::new(200, vec!["welcome".into()]), false);

        match processor.evaluate(ok("good.example", 200, "<p>Welcome home</p>")) {
            Outcome::Matched(finding) => {
                assert_eq!(finding.status, 200);
                assert_eq!(finding.matched_term.as_deref(), Some("welcome"));
                assert_eq!(finding.preview, "<p>Welcome home</p>");
            }
            other => panic!("expected a match, got {other:?}"),
        }

        assert!(matches!(
            processor.evaluate(ok("a", 404, "welcome")),
            Outcome::Missed { status_match: false, body_match: true, .. }
        ));
        assert!(matches!(
            processor.evaluate(ok("a", 200, "nothing here")),
            Outcome::Missed { status_match: true, body_match: false, .. }
        ));
        assert!(matches!(processor.evaluate(failed("a")), Outcome::Failed { .. }));
    }

    #[test]
    fn unfiltered_criteria_match_everything_without_term() {
        let processor = ResultProcessor::new(MatchCriteria::default(), false);
        match processor.evaluate(ok("a", 500, "")) {
            Outcome::Matched(finding) => assert_eq!(finding.matched_term, None),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn preview_is_flattened_and_truncated() {
        assert_eq!(body_preview(b"line one\r\nline two\n"), "line oneline two");

        let long = "a\n".repeat(PREVIEW_LIMIT + 10);
        let preview = body_preview(long.as_bytes());
        assert_eq!(preview.len(), PREVIEW_LIMIT + 3);
        assert!(preview.ends_with("a..."));

        let exact = "b".repeat(PREVIEW_LIMIT);
        assert_eq!(body_preview(exact.as_bytes()), exact);
    }

    #[tokio::test]
    async fn run_counts_and_reports() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(ok("good.example", 200, "Welcome")).await.unwrap();
        tx.send(ok("bad.example", 200, "Go away")).await.unwrap();
        tx.send(failed("slow.example")).await.unwrap();
        drop(tx);

        let processor = ResultProcessor::new(MatchCriteria::new(200, vec!["Welcome".into()]), false);
        let mut sink = RecordingSink::default();
        let summary = processor.run(&mut rx, &mut sink).await;

        assert_eq!(summary, ScanSummary { processed: 3, matched: 1, failed: 1 });
        assert_eq!(sink.progress, vec![1, 2, 3]);
        assert_eq!(sink.findings.len(), 1);
        assert_eq!(sink.findings[0].target.hostname, "good.example");
        assert_eq!((sink.failures, sink.misses), (0, 0));
    }

    #[tokio::test]
    async fn verbose_reports_failures_and_misses() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(ok("bad.example", 404, "")).await.unwrap();
        tx.send(failed("slow.example")).await.unwrap();
        drop(tx);

        let processor = ResultProcessor::new(MatchCriteria::new(200, Vec::new()), true);
        let mut sink = RecordingSink::default();
        processor.run(&mut rx, &mut sink).await;

        assert_eq!((sink.failures, sink.misses), (1, 1));
        assert!(sink.findings.is_empty());
    }

    #[tokio::test]
    async fn stops_at_expected_total_while_queue_is_open() {
        let (tx, mut rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.send(ok(&format!("h{i}"), 200, "")).await.unwrap();
        }

        let processor = ResultProcessor::new(MatchCriteria::default(), false).with_expected(3);
        let mut sink = RecordingSink::default();
        let summary = processor.run(&mut rx, &mut sink).await;

        assert_eq!(summary.processed, 3);
        assert_eq!(sink.findings.len(), 3);
        drop(tx);
    }
}
