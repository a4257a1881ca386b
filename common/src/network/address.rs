//! # Address List Expansion
//!
//! Turns the lines of an address file into a deduplicated list of IPv4
//! addresses. Each line holds one of:
//! * A single address (`10.0.0.1`).
//! * An inclusive range of full addresses (`10.0.0.1-10.0.0.20`).
//! * A CIDR block (`10.0.0.0/24`), without network and broadcast address when
//!   the block is larger than two addresses.
//!
//! Invalid lines do not abort loading, they are collected so the caller can
//! warn about them.

use std::collections::HashSet;
use std::io::BufRead;
use std::net::Ipv4Addr;

use thiserror::Error;

use crate::network::range::{self, Ipv4Range};

/// Largest number of addresses a single `start-end` range may expand to.
/// CIDR blocks are not capped.
pub const MAX_EXPANSION: u64 = 65_536;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),

    #[error("invalid IP range format '{0}'")]
    MalformedRange(String),

    #[error("end address {end} is lower than start address {start}")]
    ReversedRange { start: Ipv4Addr, end: Ipv4Addr },

    #[error("range covers {0} addresses, the limit is 65536")]
    RangeTooLarge(u64),

    #[error("invalid CIDR notation '{0}'")]
    InvalidCidr(String),
}

/// An address-file line that could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLine {
    pub line_no: usize,
    pub line: String,
    pub error: AddressError,
}

#[derive(Debug, Default, Clone)]
pub struct AddressList {
    /// Unique addresses in first-seen order.
    pub addresses: Vec<String>,
    pub invalid: Vec<InvalidLine>,
}

/// Expands one address-file entry.
pub fn parse_address_line(line: &str) -> Result<Vec<Ipv4Addr>, AddressError> {
    let line = line.trim();

    let range = if line.contains('/') {
        parse_cidr(line)?
    } else if line.contains('-') {
        parse_range(line)?
    } else {
        let addr = parse_ipv4(line)?;
        Ipv4Range::new(addr, addr)
    };

    Ok(range.iter().collect())
}

/// Reads an address file, expanding and deduplicating every valid entry.
///
/// Blank lines and lines starting with `#` are skipped. Only I/O failures are
/// returned as errors.
pub fn load_addresses<R: BufRead>(reader: R) -> std::io::Result<AddressList> {
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();
    let mut list = AddressList::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_address_line(trimmed) {
            Ok(addrs) => {
                for addr in addrs {
                    if seen.insert(addr) {
                        list.addresses.push(addr.to_string());
                    }
                }
            }
            Err(error) => list.invalid.push(InvalidLine {
                line_no: idx + 1,
                line: trimmed.to_string(),
                error,
            }),
        }
    }

    Ok(list)
}

fn parse_ipv4(s: &str) -> Result<Ipv4Addr, AddressError> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| AddressError::InvalidAddress(s.trim().to_string()))
}

/// Parses a range string like "1.1.1.1-1.1.1.9".
fn parse_range(s: &str) -> Result<Ipv4Range, AddressError> {
    let mut parts = s.split('-');
    let (Some(start_str), Some(end_str), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AddressError::MalformedRange(s.to_string()));
    };

    let start = parse_ipv4(start_str)?;
    let end = parse_ipv4(end_str)?;
    if end < start {
        return Err(AddressError::ReversedRange { start, end });
    }

    let range = Ipv4Range::new(start, end);
    check_size(range.len())?;
    Ok(range)
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr(s: &str) -> Result<Ipv4Range, AddressError> {
    let invalid = || AddressError::InvalidCidr(s.to_string());

    let (ip_str, prefix_str) = s.split_once('/').ok_or_else(invalid)?;
    let ip = ip_str.trim().parse::<Ipv4Addr>().map_err(|_| invalid())?;
    let prefix = prefix_str.trim().parse::<u8>().map_err(|_| invalid())?;

    let block = range::cidr_range(ip, prefix).map_err(|_| invalid())?;
    Ok(block.hosts_only())
}

fn check_size(len: u64) -> Result<(), AddressError> {
    if len > MAX_EXPANSION {
        Err(AddressError::RangeTooLarge(len))
    } else {
        Ok(())
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
