//! # vhunt core
//!
//! The concurrent scanning engine:
//!
//! * **[`enumerator`]** streams the address × hostname × path cross product in
//!   bounded chunks, reading from restartable [`source`]s.
//! * **[`pool`]** caches one HTTP client per destination address.
//! * **[`admission`]** bounds the number of requests in flight.
//! * **[`worker`]** turns targets into results.
//! * **[`verbatim`]** sends paths the URL parser would rewrite over a raw
//!   HTTP/1.1 exchange.
//! * **[`processor`]** applies the match criteria and reports findings.
//! * **[`scanner`]** wires the stages together for a single run.

pub mod admission;
pub mod enumerator;
pub mod error;
pub mod pool;
pub mod processor;
pub mod scanner;
pub mod source;
pub mod verbatim;
pub mod worker;

pub use error::{ProbeError, ScanError};
pub use scanner::{ScanSummary, Scanner};
