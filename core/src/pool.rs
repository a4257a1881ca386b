//! # Connection Pool
//!
//! One [`HostClient`] per destination address, created on first use and kept
//! for the rest of the run. Workers hit the fast path (a shared read lock)
//! almost every time. A miss takes the write lock and checks the map again
//! before building, so concurrent first use of an address still produces a
//! single client.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::redirect::Policy;
use tracing::debug;

use vhunt_common::config::{ConnectionMode, ScanConfig};

use crate::error::ProbeError;

/// A reusable client bound to one destination address.
#[derive(Debug)]
pub struct HostClient {
    address: String,
    port: u16,
    tls: bool,
    base_url: String,
    client: reqwest::Client,
}

impl HostClient {
    fn build(address: &str, config: &ScanConfig) -> Result<Self, reqwest::Error> {
        let port = config.port();
        let tls = config.protocol.is_tls();

        // Certificates are never validated: targets are arbitrary hosts
        // addressed by IP.
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(true)
            .http1_only()
            .http1_title_case_headers()
            .redirect(Policy::none())
            .no_proxy()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_idle_timeout(config.idle_timeout);

        if config.connection_mode == ConnectionMode::Close {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(Self {
            address: address.to_string(),
            port,
            tls,
            base_url: format!("{}://{}:{}", config.protocol.scheme(), address, port),
            client: builder.build()?,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Absolute URL for `path` on this destination.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Clone)]
pub struct ConnectionPool {
    config: Arc<ScanConfig>,
    clients: Arc<RwLock<HashMap<String, Arc<HostClient>>>>,
}

impl ConnectionPool {
    pub fn new(config: Arc<ScanConfig>) -> Self {
        Self {
            config,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the client for `address`, building it on first use.
    pub fn acquire(&self, address: &str) -> Result<Arc<HostClient>, ProbeError> {
        // The map only ever holds finished, immutable handles, so a poisoned
        // lock still guards consistent data.
        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
        {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(address) {
            return Ok(Arc::clone(client));
        }

        let client = HostClient::build(address, &self.config).map_err(|error| ProbeError::Client {
            address: address.to_string(),
            error,
        })?;
        debug!(address, port = client.port, tls = client.tls, "Created pooled client");

        let client = Arc::new(client);
        clients.insert(address.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Number of distinct addresses with a client.
    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
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
