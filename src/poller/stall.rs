use crate::error::TrackerError;
use crate::probe::Reachability;
use crate::sink::ProgressSink;
use tracing::{error, warn};

/// Escalation thresholds in poll cycles.
#[derive(Debug, Clone, Copy)]
pub struct StallLimits {
    /// No-change cycles after which an unreachable reference endpoint turns
    /// the stall fatal.
    pub soft_cycles: u32,
    /// No-change cycles after which the stall is fatal regardless of
    /// connectivity.
    pub hard_cycles: u32,
}

impl Default for StallLimits {
    fn default() -> Self {
        Self {
            soft_cycles: 30,
            hard_cycles: 60,
        }
    }
}

/// Counts consecutive cycles without aggregate progress change and escalates
/// once the limits are exceeded.
///
/// The connectivity probe is a secondary signal only: it is consulted after
/// the soft limit is already exceeded, never as the primary trigger. The hard
/// limit is the unconditional upper bound and fires even when connectivity
/// looks fine (dead peer, permissions, full disk).
pub struct StallDetector {
    limits: StallLimits,
    last_total: f64,
    no_change_cycles: u32,
}

impl StallDetector {
    pub fn new(limits: StallLimits) -> Self {
        Self {
            limits,
            last_total: 0.0,
            no_change_cycles: 0,
        }
    }

    pub fn no_change_cycles(&self) -> u32 {
        self.no_change_cycles
    }

    /// Invoked once per poll cycle after progress has been written.
    pub async fn check(
        &mut self,
        sink: &ProgressSink,
        probe: &dyn Reachability,
        reference_url: &str,
    ) -> Result<(), TrackerError> {
        let total = sink.total().await;
        if total != self.last_total {
            self.last_total = total;
            self.no_change_cycles = 0;
            return Ok(());
        }
        self.no_change_cycles += 1;

        if self.no_change_cycles > self.limits.soft_cycles
            && !probe.is_reachable(reference_url).await
        {
            error!(
                cycles = self.no_change_cycles,
                "no progress and reference endpoint unreachable"
            );
            return Err(TrackerError::SoftStall {
                cycles: self.no_change_cycles,
            });
        }
        if self.no_change_cycles > self.limits.hard_cycles {
            error!(cycles = self.no_change_cycles, "no progress, giving up");
            return Err(TrackerError::HardStall {
                cycles: self.no_change_cycles,
            });
        }
        if self.no_change_cycles == self.limits.soft_cycles {
            warn!(
                cycles = self.no_change_cycles,
                "progress unchanged, probing connectivity from next cycle"
            );
        }
        Ok(())
    }
}
