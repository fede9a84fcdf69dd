//! # Network Transition Gate
//!
//! Between the public and private phases the operator has to switch networks
//! (connect the VPN). The gate blocks until that has actually happened: it
//! polls a fixed set of private `host:port` endpoints with direct TCP
//! connection attempts and returns only on a round in which **every**
//! endpoint connected. A round stops at its first failing endpoint; the next
//! round starts from the top after the poll interval.
//!
//! There is no overall timeout. Waiting for a human is unbounded. A
//! [`CancelToken`] lets the caller (or a test) stop the wait; it is checked
//! before each round and during the pause between rounds.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::libs::run_log::RunLog;
use crate::schemas::log_record::fields;

/// Granularity of the cancellable sleep between rounds.
const CANCEL_CHECK_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("waiting for the private network was cancelled")]
    Cancelled,
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One reachability attempt against a `host:port` endpoint.
pub trait EndpointProbe {
    fn probe(&self, endpoint: &str, timeout: Duration) -> bool;
}

/// Plain TCP connect; the connection is closed immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl EndpointProbe for TcpProbe {
    fn probe(&self, endpoint: &str, timeout: Duration) -> bool {
        let addrs: Vec<SocketAddr> = match endpoint.to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                tracing::debug!(endpoint, error = %e, "endpoint did not resolve");
                return false;
            }
        };
        addrs.iter().any(|addr| match TcpStream::connect_timeout(addr, timeout) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(endpoint, %addr, error = %e, "connect failed");
                false
            }
        })
    }
}

pub struct NetworkGate<P: EndpointProbe> {
    endpoints: Vec<String>,
    interval: Duration,
    timeout: Duration,
    probe: P,
}

impl<P: EndpointProbe> NetworkGate<P> {
    pub fn new(endpoints: Vec<String>, interval: Duration, timeout: Duration, probe: P) -> Self {
        Self {
            endpoints,
            interval,
            timeout,
            probe,
        }
    }

    /// `true` if every endpoint connects, probing in order and stopping at
    /// the first failure.
    pub fn round(&self) -> bool {
        self.endpoints
            .iter()
            .all(|endpoint| self.probe.probe(endpoint, self.timeout))
    }

    /// Blocks until a full round succeeds or `cancel` fires.
    pub fn wait(&self, cancel: &CancelToken, log: &RunLog) -> Result<(), GateError> {
        log.info_with(
            "vpn_wait",
            "polling for private network connectivity",
            fields(&[("endpoints", self.endpoints.join(","))]),
        );
        let first = self.endpoints.first().map(String::as_str).unwrap_or("private network");
        loop {
            if cancel.is_cancelled() {
                log.warn("vpn_wait", "wait for private network cancelled");
                return Err(GateError::Cancelled);
            }
            if self.round() {
                log.info("vpn_wait", "private network connectivity confirmed");
                return Ok(());
            }
            println!("  [~] Waiting for VPN ({first})...");
            if !sleep_unless_cancelled(self.interval, cancel) {
                log.warn("vpn_wait", "wait for private network cancelled");
                return Err(GateError::Cancelled);
            }
        }
    }
}

/// Sleeps for `duration` in short steps. Returns `false` if cancelled.
fn sleep_unless_cancelled(duration: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(CANCEL_CHECK_STEP.min(deadline - now));
    }
}
