//! # Worker Pool
//!
//! A fixed number of tasks share the target queue. Each worker takes one
//! target at a time, waits for an admission slot, sends the request through
//! the pooled client for the target's address and pushes exactly one
//! [`ScanResult`] downstream. A failed request is recorded in its result and
//! the worker moves on; nothing is retried.

use std::sync::Arc;

use reqwest::header::{CONNECTION, HOST, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use vhunt_common::config::{ConnectionMode, ScanConfig};
use vhunt_common::target::{Target, normalize_path};

use crate::admission::Admission;
use crate::error::{ProbeError, ScanError};
use crate::pool::ConnectionPool;
use crate::verbatim::{self, VerbatimSender};

pub const USER_AGENT_VALUE: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Status and body copied out of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug)]
pub struct ScanResult {
    pub target: Target,
    pub outcome: Result<HttpResponse, ProbeError>,
}

/// Everything a worker needs, shared by all workers of a run.
pub struct WorkerContext {
    config: Arc<ScanConfig>,
    pool: ConnectionPool,
    admission: Admission,
    headers: HeaderMap,
    verbatim: VerbatimSender,
}

impl WorkerContext {
    pub fn new(config: Arc<ScanConfig>) -> Result<Self, ScanError> {
        let headers = extra_headers(&config.headers)?;
        let verbatim = VerbatimSender::new(&config)?;
        Ok(Self {
            pool: ConnectionPool::new(Arc::clone(&config)),
            admission: Admission::new(config.max_in_flight),
            headers,
            verbatim,
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }
}

fn extra_headers(pairs: &[(String, String)]) -> Result<HeaderMap, ScanError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let invalid = |reason: String| ScanError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Sends the request for one target. The caller holds the admission slot.
pub async fn probe(ctx: &WorkerContext, target: Target) -> ScanResult {
    let outcome = send(ctx, &target).await;
    ScanResult { target, outcome }
}

async fn send(ctx: &WorkerContext, target: &Target) -> Result<HttpResponse, ProbeError> {
    let host = ctx.pool.acquire(&target.address)?;
    let path = normalize_path(&target.path);
    let url = host.url(&path);

    if verbatim::is_rewritten(&url, &path) {
        trace!(%target, "Sending path verbatim");
        return ctx.verbatim.send(target).await;
    }

    // The Host header, not the connection address, selects the virtual host.
    let mut request = host
        .client()
        .get(url)
        .header(HOST, target.hostname.as_str())
        .header(USER_AGENT, USER_AGENT_VALUE)
        .headers(ctx.headers.clone())
        .timeout(ctx.config.request_timeout);

    if ctx.config.connection_mode == ConnectionMode::Close {
        request = request.header(CONNECTION, "close");
    }

    let response = request.send().await.map_err(ProbeError::from_send)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(ProbeError::from_body)?;

    Ok(HttpResponse {
        status,
        body: body.to_vec(),
    })
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `workers` tasks. The results queue closes once every worker is
    /// done, which happens when the target queue is closed and drained.
    pub fn spawn(
        ctx: Arc<WorkerContext>,
        workers: usize,
        targets: mpsc::Receiver<Target>,
        results: mpsc::Sender<ScanResult>,
    ) -> Self {
        let targets = Arc::new(Mutex::new(targets));
        let handles = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&ctx),
                    Arc::clone(&targets),
                    results.clone(),
                ))
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub async fn join(self) -> Result<(), ScanError> {
        for handle in self.handles {
            handle.await?;
        }
        Ok(())
    }
}

async fn run_worker(
    id: usize,
    ctx: Arc<WorkerContext>,
    targets: Arc<Mutex<mpsc::Receiver<Target>>>,
    results: mpsc::Sender<ScanResult>,
) {
    let mut handled: u64 = 0;

    loop {
        let next = targets.lock().await.recv().await;
        let Some(target) = next else { break };

        let Ok(slot) = ctx.admission.admit().await else { break };
        trace!(worker = id, %target, "Probing");
        let result = probe(&ctx, target).await;
        drop(slot);

        handled += 1;
        if results.send(result).await.is_err() {
            debug!(worker = id, "Result queue closed, stopping worker");
            break;
        }
    }

    debug!(worker = id, handled, "Worker finished");
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
