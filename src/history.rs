/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Cumulative ON-count ring used for O(1) windowed ON counts.
//!
//! Every slot holds the running total of ON half-cycles up to and including
//! the cycle written there. The count over any window is the difference of
//! two slots:
//!
//! ```text
//!  slot:    ...  k-3  k-2  k-1   k  (newest)
//!  total:   ...   41   41   42  43
//!  state:          -   off  on  on
//!
//!  ON cycles in the last 3 = total[k] - total[k-3] = 43 - 41 = 2
//! ```
//!
//! Totals are stored in [`OnCount`] and are allowed to wrap. Subtraction is
//! done with `wrapping_sub` in the same width, which recovers the exact count
//! for any window shorter than `OnCount::MAX + 1` cycles. The ring capacity is
//! [`MAX_FRAME_SIZE`], so every window the engine asks for qualifies.
//!
//! The initial all-zero ring is load-bearing: it makes the very first windows
//! report zero ON cycles.

use crate::config::MAX_FRAME_SIZE;

/// Counter width for the cumulative totals. Wraps by design.
pub type OnCount = u8;

// A window of up to MAX_FRAME_SIZE cycles must be unambiguous modulo 2^bits.
const _: () = assert!(MAX_FRAME_SIZE <= OnCount::MAX as usize);

/// Fixed-capacity ring of wrapping cumulative ON counts.
#[derive(Clone, Debug)]
pub struct HistoryRing {
    totals: [OnCount; MAX_FRAME_SIZE],
    /// Slot of the most recently recorded cycle.
    last: usize,
}

impl HistoryRing {
    /// An all-zero ring.
    pub const fn new() -> Self {
        Self {
            totals: [0; MAX_FRAME_SIZE],
            last: 0,
        }
    }

    /// ON cycles among the `frame_size - 1` most recently recorded cycles.
    ///
    /// This is the window the next decision completes: adding the next cycle's
    /// state gives the ON count over a full frame. `frame_size` is clamped to
    /// `[1, MAX_FRAME_SIZE]`.
    #[inline]
    pub fn window_on_count(&self, frame_size: usize) -> OnCount {
        let span = frame_size.clamp(1, MAX_FRAME_SIZE);
        // Slot exactly `span` cycles behind the one about to be written.
        let prior = (self.last + 1 + MAX_FRAME_SIZE - span) % MAX_FRAME_SIZE;
        self.totals[self.last].wrapping_sub(self.totals[prior])
    }

    /// Advance one slot and record whether the cycle was ON.
    #[inline]
    pub fn record(&mut self, on: bool) {
        let next = (self.last + 1) % MAX_FRAME_SIZE;
        self.totals[next] = self.totals[self.last].wrapping_add(OnCount::from(on));
        self.last = next;
    }

    /// Running total at the newest slot (wraps).
    pub fn total(&self) -> OnCount {
        self.totals[self.last]
    }

    /// Index of the newest slot.
    pub fn position(&self) -> usize {
        self.last
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new()
    }
}
