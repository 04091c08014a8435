/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Fixed-capacity record of recent decisions, for diagnostics and simulation.
//!
//! Gated behind `#[cfg(feature = "trace")]`. Storage is a
//! `heapless::HistoryBuffer`, so a trace never allocates and can sit next to
//! the engine on a microcontroller if there is RAM to spare.
//!
//! Lifetime counters (total cycles, ON cycles, corrections, peak variance)
//! cover every recorded decision, not just the retained window.

use heapless::HistoryBuffer;

use crate::engine::CycleDecision;

/// The last `N` decisions plus lifetime counters.
#[derive(Clone, Debug)]
pub struct DecisionTrace<const N: usize> {
    recent: HistoryBuffer<CycleDecision, N>,
    cycles: u64,
    on_cycles: u64,
    corrections: u64,
    peak_variance: i8,
}

impl<const N: usize> DecisionTrace<N> {
    /// An empty trace.
    pub const fn new() -> Self {
        Self {
            recent: HistoryBuffer::new(),
            cycles: 0,
            on_cycles: 0,
            corrections: 0,
            peak_variance: 0,
        }
    }

    /// Record one decision.
    pub fn record(&mut self, decision: CycleDecision) {
        self.cycles += 1;
        self.on_cycles += u64::from(decision.on);
        self.corrections += u64::from(decision.corrected);
        self.peak_variance = self.peak_variance.max(decision.variance.abs());
        self.recent.write(decision);
    }

    /// Number of retained decisions (at most `N`).
    pub fn len(&self) -> usize {
        self.recent.len()
    }

    /// `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.cycles == 0
    }

    /// Most recent decision.
    pub fn last(&self) -> Option<&CycleDecision> {
        self.recent.recent()
    }

    /// Retained decisions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CycleDecision> + '_ {
        self.recent.oldest_ordered()
    }

    /// ON fraction over the retained window.
    pub fn window_on_fraction(&self) -> f64 {
        let len = self.recent.len();
        if len == 0 {
            return 0.0;
        }
        let on = self.iter().filter(|d| d.on).count();
        on as f64 / len as f64
    }

    /// ON fraction over every recorded decision.
    pub fn lifetime_on_fraction(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.on_cycles as f64 / self.cycles as f64
    }

    /// Output transitions within the retained window.
    pub fn transitions(&self) -> usize {
        let mut prev: Option<bool> = None;
        let mut edges = 0;
        for d in self.iter() {
            if prev.is_some_and(|p| p != d.on) {
                edges += 1;
            }
            prev = Some(d.on);
        }
        edges
    }

    /// Total recorded decisions.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Decisions where the variance bound overrode the density controller.
    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    /// Largest `|variance|` seen.
    pub fn peak_variance(&self) -> i8 {
        self.peak_variance
    }
}

impl<const N: usize> Default for DecisionTrace<N> {
    fn default() -> Self {
        Self::new()
    }
}
