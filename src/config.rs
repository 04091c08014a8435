/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Configuration store: frame size, ON target, and the rounding bias.
//!
//! - [`Bias`]: build-time preference for ON-heavy ([`FavorOn`]) or OFF-heavy
//!   ([`FavorOff`]) approximation when a ratio is not representable.
//! - [`FramePair`]: the `(frame_size, frame_on_target)` pair the decision engine
//!   consumes each cycle.
//! - [`ConfigStore`]: the shared store, written by the control plane and read
//!   by the decision engine.
//! - [`ModulatorConfig`]: plain value form of the control-plane settings, for
//!   callers that persist them.
//!
//! # Invariants
//!
//! - **Clamped inputs**: `MIN_FRAME_SIZE ≤ frame_size ≤ MAX_FRAME_SIZE` and
//!   `0.0 ≤ target_ratio ≤ 1.0` after every write. NaN ratios become 0.0.
//! - **Bounded target**: `0 ≤ frame_on_target ≤ frame_size`.
//! - **Pair atomicity**: the pair is packed into one `AtomicU32` word. Readers
//!   see either the old pair or the new pair, never a mix.
//! - **Consistency**: every publish recomputes `frame_on_target` from the stored
//!   ratio inside a compare-and-swap loop, so racing setters always converge on
//!   a pair that matches the last stored ratio.

use core::marker::PhantomData;
use portable_atomic::{AtomicU32, AtomicU64, Ordering};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Smallest accepted frame size, in half-cycles.
pub const MIN_FRAME_SIZE: usize = 6;

/// Largest accepted frame size, in half-cycles. Also the history ring capacity.
pub const MAX_FRAME_SIZE: usize = 128;

/// Frame size used when the caller has no stored preference.
pub const DEFAULT_FRAME_SIZE: usize = 100;

/// Bound on the signed variance accumulator: `|variance| ≤ MAX_VARIANCE`.
pub const MAX_VARIANCE: i8 = 5;

// Frame sizes and ON targets are stored as `u8` inside the packed pair word.
const _: () = assert!(MAX_FRAME_SIZE <= u8::MAX as usize);
const _: () = assert!(MIN_FRAME_SIZE >= 1 && MIN_FRAME_SIZE <= MAX_FRAME_SIZE);

// ─── Bias ───────────────────────────────────────────────────────────────────

/// Rounding and correction preference, fixed at build time.
///
/// When `ratio × frame_size` is not an integer the ON target must be rounded.
/// The preferred outcome is rounded toward, and the variance correction in the
/// decision engine only ever suppresses the *non-preferred* outcome.
pub trait Bias: Send + Sync + 'static {
    /// `true` to favor ON cycles (round up), `false` to favor OFF (round down).
    const PREFER_ON: bool;
}

/// Favor ON cycles: the ON target is `ceil(ratio × frame_size)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FavorOn;

impl Bias for FavorOn {
    const PREFER_ON: bool = true;
}

/// Favor OFF cycles: the ON target is `floor(ratio × frame_size)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FavorOff;

impl Bias for FavorOff {
    const PREFER_ON: bool = false;
}

/// The crate-wide build-time bias. [`FavorOn`] unless the `favor-off` feature is enabled.
#[cfg(not(feature = "favor-off"))]
pub type DefaultBias = FavorOn;

/// The crate-wide build-time bias. [`FavorOff`] because the `favor-off` feature is enabled.
#[cfg(feature = "favor-off")]
pub type DefaultBias = FavorOff;

// ─── Clamping and rounding ──────────────────────────────────────────────────

/// Clamp a requested ratio to `[0.0, 1.0]`. NaN maps to `0.0`.
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Clamp a requested frame size to `[MIN_FRAME_SIZE, MAX_FRAME_SIZE]`.
pub const fn clamp_frame_size(frame_size: i32) -> u8 {
    if frame_size < MIN_FRAME_SIZE as i32 {
        MIN_FRAME_SIZE as u8
    } else if frame_size > MAX_FRAME_SIZE as i32 {
        MAX_FRAME_SIZE as u8
    } else {
        frame_size as u8
    }
}

/// Number of ON half-cycles per frame that best approximates `ratio` under bias `B`.
///
/// `ratio` is expected to be clamped already. The result is clamped to
/// `[0, frame_size]` in case floating-point rounding lands one past the edge.
pub fn frame_on_target<B: Bias>(ratio: f64, frame_size: u8) -> u8 {
    let raw = clamp_ratio(ratio) * f64::from(frame_size);
    // raw is non-negative, so truncation is floor; core has no float rounding.
    let floor = raw as u32;
    let rounded = if B::PREFER_ON && f64::from(floor) < raw {
        floor + 1
    } else {
        floor
    };
    rounded.min(u32::from(frame_size)) as u8
}

// ─── FramePair ──────────────────────────────────────────────────────────────

/// The `(frame_size, frame_on_target)` pair, only meaningful together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FramePair {
    /// Half-cycles per modulation frame, in `[MIN_FRAME_SIZE, MAX_FRAME_SIZE]`.
    pub frame_size: u8,
    /// ON half-cycles wanted per frame, in `[0, frame_size]`.
    pub frame_on_target: u8,
}

impl FramePair {
    /// Build the pair for `ratio` at `frame_size` under bias `B`.
    pub fn for_ratio<B: Bias>(ratio: f64, frame_size: u8) -> Self {
        Self {
            frame_size,
            frame_on_target: frame_on_target::<B>(ratio, frame_size),
        }
    }

    /// `frame_on_target / frame_size` — the ratio this pair actually produces.
    pub fn achievable_ratio(&self) -> f64 {
        f64::from(self.frame_on_target) / f64::from(self.frame_size)
    }

    const fn pack(self, sequence: u16) -> u32 {
        (self.frame_size as u32) | ((self.frame_on_target as u32) << 8) | ((sequence as u32) << 16)
    }

    const fn unpack(word: u32) -> (Self, u16) {
        let pair = Self {
            frame_size: (word & 0xFF) as u8,
            frame_on_target: ((word >> 8) & 0xFF) as u8,
        };
        (pair, (word >> 16) as u16)
    }
}

// ─── ModulatorConfig ────────────────────────────────────────────────────────

/// Control-plane settings as a plain value.
///
/// The modulator never persists anything itself; callers load this from their
/// own storage at boot and hand it to [`crate::CycleModulator::apply_config`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModulatorConfig {
    /// Requested frame size (clamped when applied).
    pub frame_size: i32,
    /// Requested ON ratio (clamped when applied).
    pub target_ratio: f64,
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE as i32,
            target_ratio: 0.0,
        }
    }
}

// ─── ConfigStore ────────────────────────────────────────────────────────────

/// Shared configuration, safe to write from the control plane while the
/// decision engine reads it from interrupt context.
///
/// The pair word layout is `frame_size | frame_on_target << 8 | sequence << 16`.
/// The sequence number changes on every publish so a setter whose view of the
/// stored ratio went stale always loses its compare-and-swap and retries.
pub struct ConfigStore<B: Bias = DefaultBias> {
    pair: AtomicU32,
    ratio_bits: AtomicU64,
    _bias: PhantomData<B>,
}

impl<B: Bias> ConfigStore<B> {
    /// Construct a store at `default_frame_size` (clamped) with a zero ratio.
    pub const fn new(default_frame_size: i32) -> Self {
        let pair = FramePair {
            frame_size: clamp_frame_size(default_frame_size),
            frame_on_target: 0,
        };
        Self {
            pair: AtomicU32::new(pair.pack(0)),
            // 0.0f64 has an all-zero bit pattern.
            ratio_bits: AtomicU64::new(0),
            _bias: PhantomData,
        }
    }

    /// Consistent snapshot of the pair. Lock-free; safe from interrupt context.
    #[inline]
    pub fn snapshot(&self) -> FramePair {
        FramePair::unpack(self.pair.load(Ordering::Acquire)).0
    }

    /// Clamp and store `ratio`, republish the pair. Returns the applied ratio.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn set_target_ratio(&self, ratio: f64) -> f64 {
        let applied = clamp_ratio(ratio);
        self.ratio_bits.store(applied.to_bits(), Ordering::SeqCst);
        let pair = self.publish(None);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            requested = ratio,
            applied,
            frame_size = pair.frame_size,
            frame_on_target = pair.frame_on_target,
            "target ratio updated"
        );
        applied
    }

    /// The last applied ratio.
    pub fn target_ratio(&self) -> f64 {
        f64::from_bits(self.ratio_bits.load(Ordering::Relaxed))
    }

    /// Clamp `frame_size`, republish the pair against the stored ratio.
    /// Returns the applied size.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn set_frame_size(&self, frame_size: i32) -> u8 {
        let applied = clamp_frame_size(frame_size);
        let pair = self.publish(Some(applied));
        #[cfg(feature = "tracing")]
        tracing::debug!(
            requested = frame_size,
            frame_size = pair.frame_size,
            frame_on_target = pair.frame_on_target,
            "frame size updated"
        );
        applied
    }

    /// Read-modify-write of the whole pair. `frame_size = None` keeps the current size.
    ///
    /// The ratio is reloaded on every attempt, so a retry after losing the
    /// race always recomputes against the latest stored ratio.
    fn publish(&self, frame_size: Option<u8>) -> FramePair {
        let mut word = self.pair.load(Ordering::SeqCst);
        loop {
            let (current, sequence) = FramePair::unpack(word);
            let ratio = f64::from_bits(self.ratio_bits.load(Ordering::SeqCst));
            let next = FramePair::for_ratio::<B>(ratio, frame_size.unwrap_or(current.frame_size));
            match self.pair.compare_exchange_weak(
                word,
                next.pack(sequence.wrapping_add(1)),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => word = actual,
            }
        }
    }
}

impl<B: Bias> Default for ConfigStore<B> {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_SIZE as i32)
    }
}

impl<B: Bias> core::fmt::Debug for ConfigStore<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("pair", &self.snapshot())
            .field("target_ratio", &self.target_ratio())
            .field("prefer_on", &B::PREFER_ON)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
