/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The per-half-cycle decision engine.
//!
//! [`CycleState::step`] is a delta-sigma density controller with one twist:
//! a signed *variance* accumulator that keeps the non-preferred outcome from
//! piling up on one line polarity.
//!
//! ```text
//! window  = ON cycles among the last frame_size - 1
//! state   = window < frame_on_target            (bang-bang density control)
//! if state is the non-preferred outcome:
//!     if |variance + sign| ≤ MAX_VARIANCE  → variance += sign
//!     else                                 → state = !state
//! record state; sign = -sign
//! ```
//!
//! The correction can only turn a non-preferred cycle into a preferred one,
//! never the reverse, so with [`FavorOn`](crate::FavorOn) the delivered ratio
//! never drops below the achievable ratio because of it, and with
//! [`FavorOff`](crate::FavorOff) it never rises above.
//!
//! # Polarity is a heuristic
//!
//! `sign` simply alternates every cycle. It is not synchronised to the actual
//! AC zero crossing, so the variance bound is a proxy for charge balance, not
//! a measured guarantee. Timer drift against the line can shift which
//! physical polarity a given `sign` corresponds to.
//!
//! # Real-time constraints
//!
//! `step` performs a fixed amount of work, never allocates and never blocks.
//! It is safe to call from an interrupt handler.

use core::marker::PhantomData;

use crate::config::{Bias, DefaultBias, FramePair, MAX_VARIANCE};
use crate::history::{HistoryRing, OnCount};

/// Outcome of one half-cycle decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleDecision {
    /// Output level for this half-cycle.
    pub on: bool,
    /// Polarity heuristic used for this cycle (+1 or -1).
    pub sign: i8,
    /// Variance after this cycle, in `[-MAX_VARIANCE, MAX_VARIANCE]`.
    pub variance: i8,
    /// `true` if the variance bound overrode the density decision.
    pub corrected: bool,
    /// ON count over the full frame ending with this cycle.
    pub frame_on_count: OnCount,
    /// Frame size the decision was made against.
    pub frame_size: u8,
}

/// State owned exclusively by the decision engine.
///
/// Never shared with the control plane and never locked.
#[derive(Clone, Debug)]
pub struct CycleState<B: Bias = DefaultBias> {
    history: HistoryRing,
    sign: i8,
    variance: i8,
    last_frame_on_count: OnCount,
    _bias: PhantomData<B>,
}

impl<B: Bias> CycleState<B> {
    /// Fresh state: all-zero history, `sign = +1`, zero variance.
    pub const fn new() -> Self {
        Self {
            history: HistoryRing::new(),
            sign: 1,
            variance: 0,
            last_frame_on_count: 0,
            _bias: PhantomData,
        }
    }

    /// Decide the next half-cycle against `pair` and record it.
    pub fn step(&mut self, pair: FramePair) -> CycleDecision {
        let window = self.history.window_on_count(usize::from(pair.frame_size));
        let mut on = window < pair.frame_on_target;
        let mut corrected = false;

        if on != B::PREFER_ON {
            let candidate = self.variance + self.sign;
            if (-MAX_VARIANCE..=MAX_VARIANCE).contains(&candidate) {
                self.variance = candidate;
            } else {
                on = !on;
                corrected = true;
            }
        }

        self.history.record(on);
        self.last_frame_on_count = window + OnCount::from(on);

        let decision = CycleDecision {
            on,
            sign: self.sign,
            variance: self.variance,
            corrected,
            frame_on_count: self.last_frame_on_count,
            frame_size: pair.frame_size,
        };
        self.sign = -self.sign;
        decision
    }

    /// Current variance accumulator.
    pub fn variance(&self) -> i8 {
        self.variance
    }

    /// Polarity heuristic for the *next* cycle.
    pub fn sign(&self) -> i8 {
        self.sign
    }

    /// ON count over the most recently completed frame-length window.
    pub fn last_frame_on_count(&self) -> OnCount {
        self.last_frame_on_count
    }

    /// The cumulative history ring.
    pub fn history(&self) -> &HistoryRing {
        &self.history
    }
}

impl<B: Bias> Default for CycleState<B> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
