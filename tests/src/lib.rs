//! End-to-end scans against a local HTTP/1.1 responder.

pub mod responder;

#[cfg(test)]
mod scan;
