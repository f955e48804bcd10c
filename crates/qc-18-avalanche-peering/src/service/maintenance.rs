use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::AvalancheError;
use crate::ports::{ChainState, PeerNetwork};
use crate::service::AvalancheService;

/// What one maintenance pass cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// `FetchTimeout` for each fetch that went unanswered
    pub fetch_timeouts: Vec<AvalancheError>,
    pub bans_expired: usize,
}

impl<C, N> AvalancheService<C, N>
where
    C: ChainState,
    N: PeerNetwork,
{
    /// Give up on overdue proof fetches. The same peer is never asked for
    /// that proof again; sessions stay verified.
    pub fn expire_fetches(&self) -> Vec<AvalancheError> {
        self.relay
            .expire_fetches(self.now())
            .into_iter()
            .map(|(proof_id, peer)| {
                info!("[qc-18] Fetch of proof {} from peer {} timed out", proof_id, peer);
                AvalancheError::FetchTimeout { proof_id, peer }
            })
            .collect()
    }

    /// Remove expired bans.
    pub fn gc(&self) -> usize {
        self.scorer.gc_expired(self.now())
    }

    pub fn run_maintenance(&self) -> MaintenanceReport {
        MaintenanceReport {
            fetch_timeouts: self.expire_fetches(),
            bans_expired: self.gc(),
        }
    }
}

/// Background task running maintenance every `period`.
pub fn spawn_maintenance<C, N>(
    service: Arc<AvalancheService<C, N>>,
    period: Duration,
) -> tokio::task::JoinHandle<()>
where
    C: ChainState + 'static,
    N: PeerNetwork + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let report = service.run_maintenance();
            if !report.fetch_timeouts.is_empty() || report.bans_expired > 0 {
                debug!(
                    fetch_timeouts = report.fetch_timeouts.len(),
                    bans_expired = report.bans_expired,
                    "[qc-18] Maintenance pass"
                );
            }
        }
    })
}
