//! Host rotation.

use std::sync::atomic::{AtomicUsize, Ordering};

use atmos_model::{AtmosError, AtmosResult};

/// Round-robin selection over the configured hosts.
///
/// The only shared state is an atomic counter, so one balancer can serve
/// any number of concurrent calls.
#[derive(Debug)]
pub struct LoadBalancer {
    hosts: Vec<String>,
    next: AtomicUsize,
}

impl LoadBalancer {
    /// Create a balancer over non-empty host names.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] when no usable host is given.
    pub fn new(hosts: impl IntoIterator<Item = String>) -> AtmosResult<Self> {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(AtmosError::Validation("at least one host is required".to_owned()));
        }
        Ok(Self {
            hosts,
            next: AtomicUsize::new(0),
        })
    }

    /// The host for the next request.
    #[must_use]
    pub fn next_host(&self) -> &str {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        &self.hosts[index]
    }

    /// All hosts in rotation order.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}
