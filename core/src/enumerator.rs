//! # Target Enumerator
//!
//! Streams the address × hostname × path cross product without ever holding
//! more than one address chunk and one hostname chunk in memory.
//!
//! For every address chunk the hostname source is read again from its first
//! line, split into hostname chunks, and every combination of the two chunks
//! with every path is emitted. Blank lines and lines rejected by the filters
//! are dropped while reading, before they can multiply.

use std::io;
use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use vhunt_common::filter::LineFilter;
use vhunt_common::target::{Target, normalize_path};

use crate::error::ScanError;
use crate::source::{FilteredLines, LineSource};

pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Number of targets a run would produce, with and without the filters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetCount {
    pub total: u64,
    pub filtered: u64,
}

pub struct TargetEnumerator<A, H> {
    addresses: A,
    hostnames: H,
    paths: Vec<String>,
    address_filter: LineFilter,
    hostname_filter: LineFilter,
    chunk_size: usize,
}

impl<A: LineSource, H: LineSource> TargetEnumerator<A, H> {
    pub fn new(addresses: A, hostnames: H, paths: Vec<String>) -> Self {
        Self {
            addresses,
            hostnames,
            paths: paths.iter().map(|p| normalize_path(p)).collect(),
            address_filter: LineFilter::default(),
            hostname_filter: LineFilter::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_address_filter(mut self, filter: LineFilter) -> Self {
        self.address_filter = filter;
        self
    }

    pub fn with_hostname_filter(mut self, filter: LineFilter) -> Self {
        self.hostname_filter = filter;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Counts targets with one streaming pass per source.
    pub fn count(&self) -> Result<TargetCount, ScanError> {
        let (all_addresses, kept_addresses) = count_source(&self.addresses, &self.address_filter)?;
        let (all_hosts, kept_hosts) = count_source(&self.hostnames, &self.hostname_filter)?;
        let paths = self.paths.len() as u64;

        Ok(TargetCount {
            total: all_addresses * all_hosts * paths,
            filtered: kept_addresses * kept_hosts * paths,
        })
    }

    /// Walks the cross product, handing every target to `emit`.
    ///
    /// Returns how many targets were accepted. Enumeration stops early, without
    /// error, as soon as `emit` breaks.
    pub fn for_each_target<F>(&self, mut emit: F) -> Result<u64, ScanError>
    where
        F: FnMut(Target) -> ControlFlow<()>,
    {
        let mut emitted: u64 = 0;
        let mut address_lines = open(&self.addresses, &self.address_filter)?;

        loop {
            let address_chunk = address_lines
                .next_chunk(self.chunk_size)
                .map_err(|e| input_error(&self.addresses, e))?;
            if address_chunk.is_empty() {
                break;
            }

            let mut host_lines = open(&self.hostnames, &self.hostname_filter)?;
            loop {
                let host_chunk = host_lines
                    .next_chunk(self.chunk_size)
                    .map_err(|e| input_error(&self.hostnames, e))?;
                if host_chunk.is_empty() {
                    break;
                }

                for address in &address_chunk {
                    for hostname in &host_chunk {
                        for path in &self.paths {
                            let target = Target {
                                address: address.clone(),
                                hostname: hostname.clone(),
                                path: path.clone(),
                            };
                            if emit(target).is_break() {
                                debug!(emitted, "Target consumer went away, stopping enumeration");
                                return Ok(emitted);
                            }
                            emitted += 1;
                        }
                    }
                }
            }
        }

        debug!(emitted, "Enumeration finished");
        Ok(emitted)
    }
}

impl<A, H> TargetEnumerator<A, H>
where
    A: LineSource + 'static,
    H: LineSource + 'static,
{
    /// Runs the enumeration on a blocking thread, pushing into `tx`.
    ///
    /// A full queue blocks the enumerator. The sender is dropped when the
    /// thread ends, whatever the outcome, which closes the queue.
    pub fn spawn(self, tx: mpsc::Sender<Target>) -> JoinHandle<Result<u64, ScanError>> {
        tokio::task::spawn_blocking(move || {
            self.for_each_target(|target| match tx.blocking_send(target) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            })
        })
    }
}

fn open<'a, S: LineSource>(source: &'a S, filter: &'a LineFilter) -> Result<FilteredLines<'a>, ScanError> {
    FilteredLines::open(source, filter).map_err(|e| input_error(source, e))
}

fn input_error<S: LineSource>(source: &S, error: io::Error) -> ScanError {
    ScanError::input(source.name(), error)
}

/// Returns (usable lines, usable lines passing the filter).
fn count_source<S: LineSource>(source: &S, filter: &LineFilter) -> Result<(u64, u64), ScanError> {
    let everything = LineFilter::default();
    let mut all: u64 = 0;
    let mut kept: u64 = 0;

    for line in open(source, &everything)? {
        let line = line.map_err(|e| input_error(source, e))?;
        all += 1;
        if filter.passes(&line) {
            kept += 1;
        }
    }

    Ok((all, kept))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
