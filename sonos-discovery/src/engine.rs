//! Discovery Engine
//!
//! Layered fallback over four strategies:
//!
//! 1. SSDP M-SEARCH
//! 2. topology from the SSDP responders
//! 3. subnet scan for any single speaker
//! 4. topology from that speaker
//!
//! Stages 1+2 are skipped over to 3+4 on any failure. Every stage runs
//! against the caller's [`CancellationToken`] and its own slice of the
//! overall deadline, so a stalled stage still leaves time for the next.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use soap_client::SoapClient;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::device::DeviceSet;
use crate::error::{DiscoveryError, Result, TopologyError};
use crate::scan;
use crate::ssdp::{self, SsdpResponse};
use crate::topology;

const SSDP_MIN_BUDGET: Duration = Duration::from_millis(500);
const SSDP_MAX_BUDGET: Duration = Duration::from_secs(3);
/// Slack past the SSDP deadline for the search to hand back its replies
const SSDP_GRACE: Duration = Duration::from_millis(100);

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// Overall budget shared by every stage
    pub timeout: Duration,
    /// Keep satellites and hidden stereo-pair halves in the result
    pub include_invisible: bool,
    /// Maximum concurrent probes during the subnet scan
    pub scan_concurrency: usize,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            include_invisible: false,
            scan_concurrency: 32,
        }
    }
}

impl DiscoverOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn include_invisible(mut self, include: bool) -> Self {
        self.include_invisible = include;
        self
    }

    /// Share of the budget given to the SSDP stage
    fn ssdp_budget(&self) -> Duration {
        (self.timeout / 3)
            .clamp(SSDP_MIN_BUDGET, SSDP_MAX_BUDGET)
            .min(self.timeout / 2)
    }
}

/// The four strategies the engine falls back through.
///
/// [`DefaultStrategies`] talks to the network; tests substitute their own.
#[async_trait]
pub trait DiscoveryStrategies: Send + Sync {
    /// Multicast search, collecting replies until `deadline`
    async fn ssdp_probe(&self, deadline: Instant) -> Result<Vec<SsdpResponse>>;

    /// Find any single reachable speaker IP
    async fn network_scan(&self, concurrency: usize) -> Result<String>;

    async fn topology_from_candidates(
        &self,
        candidates: &[SsdpResponse],
        include_invisible: bool,
    ) -> std::result::Result<DeviceSet, TopologyError>;

    async fn topology_from_ip(
        &self,
        ip: &str,
        include_invisible: bool,
    ) -> std::result::Result<DeviceSet, TopologyError>;
}

/// Network-backed strategies.
#[derive(Debug, Clone, Default)]
pub struct DefaultStrategies {
    soap: SoapClient,
}

impl DefaultStrategies {
    pub fn new(soap: SoapClient) -> Self {
        Self { soap }
    }
}

#[async_trait]
impl DiscoveryStrategies for DefaultStrategies {
    async fn ssdp_probe(&self, deadline: Instant) -> Result<Vec<SsdpResponse>> {
        ssdp::search(deadline).await
    }

    async fn network_scan(&self, concurrency: usize) -> Result<String> {
        let hosts = scan::candidate_hosts()
            .into_iter()
            .map(|ip| ip.to_string())
            .collect();
        scan::scan_hosts(self.soap.http(), hosts, self.soap.port(), concurrency).await
    }

    async fn topology_from_candidates(
        &self,
        candidates: &[SsdpResponse],
        include_invisible: bool,
    ) -> std::result::Result<DeviceSet, TopologyError> {
        topology::topology_from_candidates(&self.soap, candidates, include_invisible).await
    }

    async fn topology_from_ip(
        &self,
        ip: &str,
        include_invisible: bool,
    ) -> std::result::Result<DeviceSet, TopologyError> {
        topology::topology_from_ip(&self.soap, ip, include_invisible).await
    }
}

/// Runs the layered discovery with injected strategies.
#[derive(Debug, Clone, Default)]
pub struct Discoverer<S = DefaultStrategies> {
    strategies: S,
}

impl<S: DiscoveryStrategies> Discoverer<S> {
    pub fn new(strategies: S) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &S {
        &self.strategies
    }

    /// Discover the household's devices.
    ///
    /// Intermediate failures are absorbed; when every stage fails the most
    /// informative error is returned, topology errors first.
    pub async fn discover(
        &self,
        cancel: &CancellationToken,
        options: &DiscoverOptions,
    ) -> Result<DeviceSet> {
        let started = Instant::now();
        let deadline = started + options.timeout;
        let mut failure = Failure::default();

        let ssdp_budget = options.ssdp_budget();
        debug!(?ssdp_budget, "Discovery stage: SSDP");
        let ssdp_deadline = started + ssdp_budget;
        let probed = stage(
            cancel,
            (ssdp_deadline + SSDP_GRACE).min(deadline),
            options.timeout,
            self.strategies.ssdp_probe(ssdp_deadline),
        )
        .await;
        match probed {
            Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
            Err(e) => {
                warn!(error = %e, "SSDP stage failed, falling back to subnet scan");
                failure.record(e);
            }
            Ok(candidates) if candidates.is_empty() => failure.record(DiscoveryError::NoDevices),
            Ok(candidates) => {
                debug!(count = candidates.len(), "Discovery stage: topology from SSDP candidates");
                let candidates_deadline = share_of_remaining(deadline, 1, 3);
                let resolved = stage(cancel, candidates_deadline, options.timeout, async {
                    self.strategies
                        .topology_from_candidates(&candidates, options.include_invisible)
                        .await
                        .map_err(DiscoveryError::from)
                })
                .await;
                match resolved {
                    Ok(set) if !set.is_empty() => return Ok(set),
                    Ok(_) => failure.record(DiscoveryError::NoDevices),
                    Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
                    Err(e) => {
                        warn!(error = %e, "Topology from SSDP candidates failed");
                        failure.record(e);
                    }
                }
            }
        }

        debug!("Discovery stage: subnet scan");
        let ip = match stage(
            cancel,
            share_of_remaining(deadline, 2, 3),
            options.timeout,
            self.strategies.network_scan(options.scan_concurrency),
        )
        .await
        {
            Ok(ip) => ip,
            Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
            Err(e) => {
                failure.record(e);
                return Err(failure.into_error());
            }
        };

        debug!(%ip, "Discovery stage: topology from scanned IP");
        let resolved = stage(cancel, deadline, options.timeout, async {
            self.strategies
                .topology_from_ip(&ip, options.include_invisible)
                .await
                .map_err(DiscoveryError::from)
        })
        .await;
        match resolved {
            Ok(set) if !set.is_empty() => Ok(set),
            Ok(_) => {
                failure.record(DiscoveryError::NoDevices);
                Err(failure.into_error())
            }
            Err(DiscoveryError::Cancelled) => Err(DiscoveryError::Cancelled),
            Err(e) => {
                failure.record(e);
                Err(failure.into_error())
            }
        }
    }
}

/// Instant `num/den` of the way from now to `deadline`.
fn share_of_remaining(deadline: Instant, num: u32, den: u32) -> Instant {
    let now = Instant::now();
    now + deadline.saturating_duration_since(now) * num / den
}

/// Race one stage against cancellation and its deadline.
async fn stage<T, F>(
    cancel: &CancellationToken,
    deadline: Instant,
    total: Duration,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(DiscoveryError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DiscoveryError::Cancelled),
        outcome = timeout_at(deadline, fut) => match outcome {
            Ok(result) => result,
            Err(_) => Err(DiscoveryError::Timeout(total)),
        },
    }
}

/// Most informative stage failure seen so far.
#[derive(Default)]
struct Failure(Option<DiscoveryError>);

impl Failure {
    fn record(&mut self, error: DiscoveryError) {
        let replace = match &self.0 {
            Some(current) => error.weight() >= current.weight(),
            None => true,
        };
        if replace {
            self.0 = Some(error);
        }
    }

    fn into_error(self) -> DiscoveryError {
        self.0.unwrap_or(DiscoveryError::NoDevices)
    }
}
