//! # Probe Target Model
//!
//! A [`Target`] is one (address, hostname, path) triple. The address decides
//! where the TCP connection goes, the hostname is sent in the `Host` header and
//! the path is requested on that virtual host.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    pub address: String,
    pub hostname: String,
    pub path: String,
}

impl Target {
    pub fn new(address: impl Into<String>, hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hostname: hostname.into(),
            path: normalize_path(&path.into()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} with host {}", self.address, self.path, self.hostname)
    }
}

/// Makes sure a request path starts with `/`.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Splits a comma-separated path list, normalizing every entry.
///
/// Empty entries are dropped; an input without any usable entry yields `["/"]`.
pub fn parse_paths(raw: &str) -> Vec<String> {
    let paths: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(normalize_path)
        .collect();

    if paths.is_empty() {
        vec![String::from("/")]
    } else {
        paths
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
