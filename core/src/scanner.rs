//! Scan orchestration.
//!
//! Wires one run together:
//!
//! ```text
//! enumerator ──targets──▶ worker pool ──results──▶ result processor ──▶ sink
//! ```
//!
//! Both queues are bounded, so a slow stage pushes back on the one before it.
//! Each queue closes when its producer side is gone, which is what ends the
//! run.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use vhunt_common::config::ScanConfig;

use crate::enumerator::TargetEnumerator;
use crate::error::ScanError;
use crate::pool::ConnectionPool;
use crate::processor::ResultProcessor;
use crate::source::LineSource;
use crate::worker::{WorkerContext, WorkerPool};

pub use crate::processor::{ResultSink, ScanSummary};

/// Capacity of the queue between the enumerator and the workers.
const TARGET_QUEUE_DEPTH: usize = 1_024;

pub struct Scanner {
    ctx: Arc<WorkerContext>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let ctx = WorkerContext::new(Arc::new(config))?;
        Ok(Self { ctx: Arc::new(ctx) })
    }

    pub fn config(&self) -> &ScanConfig {
        self.ctx.config()
    }

    pub fn pool(&self) -> &ConnectionPool {
        self.ctx.pool()
    }

    /// Runs a full scan over every target `enumerator` produces.
    ///
    /// `expected` is the filtered target count from [`TargetEnumerator::count`];
    /// when given, processing also stops once that many results are in.
    pub async fn run<A, H, S>(
        &self,
        enumerator: TargetEnumerator<A, H>,
        expected: Option<u64>,
        sink: &mut S,
    ) -> Result<ScanSummary, ScanError>
    where
        A: LineSource + 'static,
        H: LineSource + 'static,
        S: ResultSink,
    {
        let config = self.ctx.config();
        let (target_tx, target_rx) = mpsc::channel(TARGET_QUEUE_DEPTH);
        let (result_tx, mut result_rx) = mpsc::channel(config.workers.max(1) * 2);

        let enumeration = enumerator.spawn(target_tx);
        let workers = WorkerPool::spawn(Arc::clone(&self.ctx), config.workers, target_rx, result_tx);
        debug!(
            workers = workers.len(),
            max_in_flight = self.ctx.admission().capacity(),
            "Scan started"
        );

        let mut processor = ResultProcessor::new(config.criteria.clone(), config.verbose);
        if let Some(expected) = expected {
            processor = processor.with_expected(expected);
        }
        let summary = processor.run(&mut result_rx, sink).await;

        // Workers blocked on a full result queue give up once it is gone.
        drop(result_rx);
        workers.join().await?;
        let emitted = enumeration.await??;

        info!(
            emitted,
            processed = summary.processed,
            matched = summary.matched,
            failed = summary.failed,
            clients = self.pool().len(),
            "Scan finished"
        );
        Ok(summary)
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
