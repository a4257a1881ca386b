//! Run configuration.
//!
//! A [`ScanConfig`] is built once by the binary and then shared read-only by
//! every component of the scan.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    /// Lenient parsing for command line values: anything unknown falls back
    /// to plain HTTP with a warning.
    pub fn from_flag(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            warn!("Unknown protocol '{raw}', falling back to http");
            Protocol::Http
        })
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Protocol::Https)
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unsupported protocol: {other}")),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Whether each request asks the server to close the connection afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Send `Connection: close` and keep no idle sockets around.
    #[default]
    Close,
    /// Let the per-address client reuse idle sockets.
    KeepAlive,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Close => f.write_str("close"),
            ConnectionMode::KeepAlive => f.write_str("keep-alive"),
        }
    }
}

/// Outcome of looking for the configured terms in a response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyMatch<'a> {
    /// No body terms configured, every body matches.
    Unfiltered,
    /// The first configured term found in the body.
    Matched(&'a str),
    Missed,
}

impl BodyMatch<'_> {
    pub fn is_match(&self) -> bool {
        !matches!(self, BodyMatch::Missed)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchCriteria {
    /// Expected status code, `None` accepts any.
    pub status: Option<u16>,
    /// Case-insensitive body terms, checked in order.
    pub body_terms: Vec<String>,
}

impl MatchCriteria {
    pub fn new(status: u16, body_terms: Vec<String>) -> Self {
        Self {
            status: (status != 0).then_some(status),
            body_terms,
        }
    }

    pub fn status_matches(&self, status: u16) -> bool {
        self.status.is_none_or(|expected| expected == status)
    }

    pub fn match_body(&self, body: &[u8]) -> BodyMatch<'_> {
        if self.body_terms.is_empty() {
            return BodyMatch::Unfiltered;
        }

        let haystack = String::from_utf8_lossy(body).to_lowercase();
        self.body_terms
            .iter()
            .find(|term| haystack.contains(&term.to_lowercase()))
            .map_or(BodyMatch::Missed, |term| BodyMatch::Matched(term.as_str()))
    }
}

#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub protocol: Protocol,
    /// Overrides the protocol's default port.
    pub port: Option<u16>,
    /// Number of worker tasks pulling targets.
    pub workers: usize,
    /// Upper bound on requests in flight at any moment.
    pub max_in_flight: usize,
    pub request_timeout: Duration,
    /// Bound on establishing a connection, TLS handshake included.
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept in keep-alive mode.
    pub idle_timeout: Duration,
    pub read_timeout: Duration,
    pub connection_mode: ConnectionMode,
    /// Extra request headers, in the order given.
    pub headers: Vec<(String, String)>,
    pub criteria: MatchCriteria,
    /// Lines read per chunk while enumerating targets.
    pub chunk_size: usize,
    pub verbose: bool,
}

impl ScanConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            port: None,
            workers: 100,
            max_in_flight: 100,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            connection_mode: ConnectionMode::Close,
            headers: Vec::new(),
            criteria: MatchCriteria::default(),
            chunk_size: 100,
            verbose: false,
        }
    }
}

/// Parses `Name:Value` pairs separated by `;`.
///
/// The value may itself contain `:`. Pairs without a separator or with an
/// empty name are skipped.
pub fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| match pair.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Some((name.trim().to_string(), value.trim().to_string()))
            }
            _ => {
                warn!("Ignoring malformed header '{pair}', expected Name:Value");
                None
            }
        })
        .collect()
}

/// Splits a comma-separated list of body terms, keeping their order.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// The header name as the pooled HTTP/1 clients write it: first letter and
/// every letter after `-` upper case, the rest lower case.
pub fn title_case_header(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
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

    #[test]
    fn protocol_from_flag() {
        assert_eq!(Protocol::from_flag("https"), Protocol::Https);
        assert_eq!(Protocol::from_flag("HTTP"), Protocol::Http);
        assert_eq!(Protocol::from_flag("gopher"), Protocol::Http);
    }

    #[test]
    fn port_follows_protocol_unless_overridden() {
        let mut cfg = ScanConfig::default();
        assert_eq!(cfg.port(), 80);

        cfg.protocol = Protocol::Https;
        assert_eq!(cfg.port(), 443);

        cfg.port = Some(8443);
        assert_eq!(cfg.port(), 8443);
    }

    #[test]
    fn zero_status_accepts_anything() {
        let criteria = MatchCriteria::new(0, Vec::new());
        assert_eq!(criteria.status, None);
        assert!(criteria.status_matches(200));
        assert!(criteria.status_matches(503));
    }

    #[test]
    fn nonzero_status_requires_equality() {
        let criteria = MatchCriteria::new(200, Vec::new());
        assert!(criteria.status_matches(200));
        assert!(!criteria.status_matches(201));
    }

    #[test]
    fn empty_terms_accept_any_body() {
        let criteria = MatchCriteria::default();
        assert_eq!(criteria.match_body(b""), BodyMatch::Unfiltered);
        assert!(criteria.match_body(b"whatever").is_match());
    }

    #[test]
    fn first_matching_term_wins() {
        let criteria = MatchCriteria::new(0, vec!["admin".into(), "welcome".into()]);
        let body = b"<h1>WELCOME to the Admin panel</h1>";
        assert_eq!(criteria.match_body(body), BodyMatch::Matched("admin"));

        let criteria = MatchCriteria::new(0, vec!["missing".into(), "Welcome".into()]);
        assert_eq!(criteria.match_body(body), BodyMatch::Matched("Welcome"));
    }

    #[test]
    fn no_term_found_is_a_miss() {
        let criteria = MatchCriteria::new(0, vec!["secret".into()]);
        assert_eq!(criteria.match_body(b"public page"), BodyMatch::Missed);
        assert!(!criteria.match_body(b"public page").is_match());
    }

    #[test]
    fn title_case_header_names() {
        assert_eq!(title_case_header("x-api-key"), "X-Api-Key");
        assert_eq!(title_case_header("X-API-key"), "X-Api-Key");
        assert_eq!(title_case_header("Cookie"), "Cookie");
        assert_eq!(title_case_header("dnt"), "Dnt");
    }

    #[test]
    fn parse_headers_pairs() {
        let headers = parse_headers("X-Forwarded-For: 127.0.0.1;Authorization:Basic a:b; broken ;:x");
        assert_eq!(
            headers,
            vec![
                ("X-Forwarded-For".to_string(), "127.0.0.1".to_string()),
                ("Authorization".to_string(), "Basic a:b".to_string()),
            ]
        );
        assert!(parse_headers("").is_empty());
    }

    #[test]
    fn parse_terms_keeps_order() {
        assert_eq!(parse_terms("b, a,,c "), vec!["b", "a", "c"]);
        assert!(parse_terms("").is_empty());
    }
}
