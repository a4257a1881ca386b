//! # vhunt common
//!
//! Shared building blocks for the virtual-host scanner:
//!
//! * **[`config`]**: the read-only run configuration and match criteria.
//! * **[`target`]**: the (address, hostname, path) triple every probe is made of.
//! * **[`filter`]**: substring filters applied to input lines.
//! * **[`network`]**: IPv4 range, CIDR and address-file expansion.

#[doc(hidden)]
pub use tracing;

pub mod macros;

pub mod config;
pub mod filter;
pub mod network;
pub mod target;
