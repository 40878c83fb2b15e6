// crates/genepattern-client/src/backoff.rs
// ============================================================================
// Module: Poll Backoff
// Description: Deterministic doubling backoff for job completion polling.
// Purpose: Share the wait cadence between single-job and batch waits.
// Dependencies: genepattern-config
// ============================================================================

//! ## Overview
//! Waits start at one unit and double after every unfinished round up to a
//! cap: 60 units for a single job and 10 units for a batch. There is no
//! jitter, no attempt limit, and no overall timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use genepattern_config::DEFAULT_BATCH_CAP;
use genepattern_config::DEFAULT_JOB_CAP;
use genepattern_config::DEFAULT_POLL_UNIT_MS;
use genepattern_config::PollingConfig;

// ============================================================================
// SECTION: Poll Policy
// ============================================================================

/// Poll cadence shared by [`crate::Job::wait_until_done`] and
/// [`crate::Connection::wait_until_complete`].
///
/// # Invariants
/// - `unit` is non-zero and both caps are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Length of one backoff unit.
    unit: Duration,
    /// Cap in units for a single job.
    job_cap: u32,
    /// Cap in units for a batch.
    batch_cap: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_millis(DEFAULT_POLL_UNIT_MS),
            job_cap: DEFAULT_JOB_CAP,
            batch_cap: DEFAULT_BATCH_CAP,
        }
    }
}

impl PollPolicy {
    /// Builds a policy, clamping zero values to the smallest legal ones.
    #[must_use]
    pub fn new(unit: Duration, job_cap: u32, batch_cap: u32) -> Self {
        Self {
            unit: if unit.is_zero() { Duration::from_millis(1) } else { unit },
            job_cap: job_cap.max(1),
            batch_cap: batch_cap.max(1),
        }
    }

    /// Builds a policy from the `[polling]` config section.
    #[must_use]
    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.unit(), config.job_cap, config.batch_cap)
    }

    /// Length of one unit.
    #[must_use]
    pub const fn unit(&self) -> Duration {
        self.unit
    }

    /// Cap in units for a single job wait.
    #[must_use]
    pub const fn job_cap(&self) -> u32 {
        self.job_cap
    }

    /// Cap in units for a batch wait.
    #[must_use]
    pub const fn batch_cap(&self) -> u32 {
        self.batch_cap
    }

    /// Converts a wait expressed in units into a sleep duration.
    #[must_use]
    pub fn delay(&self, units: u32) -> Duration {
        self.unit.saturating_mul(units)
    }
}

/// Returns the next wait in units: double the current wait, capped.
#[must_use]
pub const fn next_wait_units(current: u32, cap: u32) -> u32 {
    let doubled = current.saturating_mul(2);
    if doubled < cap { doubled } else { cap }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
