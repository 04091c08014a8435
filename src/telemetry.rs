/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Read-only monitoring of a running modulator.
//!
//! The decision engine publishes a few scalars after every cycle with plain
//! atomic stores. Readers never block the engine and never feed these values
//! back into the control loop; they exist for dashboards and logs.
//!
//! - [`Telemetry`]: the engine-side publisher.
//! - [`ModulatorStatus`]: a point-in-time snapshot for the control plane.
//! - [`PowerReport`]: the same ratios expressed in watts for a given load.

use portable_atomic::{AtomicI8, AtomicU16, AtomicU32, Ordering};

use crate::engine::CycleDecision;

/// Per-cycle telemetry written by the decision engine.
///
/// The last frame ON count and the frame size it was measured over share one
/// word, so [`Telemetry::last_achieved_ratio`] never divides a count by a
/// frame size it was not measured against.
#[derive(Debug)]
pub struct Telemetry {
    /// `frame_on_count | frame_size << 8`.
    last_frame: AtomicU16,
    variance: AtomicI8,
    cycles: AtomicU32,
}

impl Telemetry {
    /// Zeroed telemetry for a modulator that has not run yet.
    pub const fn new(frame_size: u8) -> Self {
        Self {
            last_frame: AtomicU16::new((frame_size as u16) << 8),
            variance: AtomicI8::new(0),
            cycles: AtomicU32::new(0),
        }
    }

    /// Publish one decision. Engine side only.
    #[inline]
    pub fn record(&self, decision: &CycleDecision) {
        let word = u16::from(decision.frame_on_count) | (u16::from(decision.frame_size) << 8);
        self.last_frame.store(word, Ordering::Relaxed);
        self.variance.store(decision.variance, Ordering::Relaxed);
        // Single writer: load + store instead of an RMW the target may lack.
        let cycles = self.cycles.load(Ordering::Relaxed).wrapping_add(1);
        self.cycles.store(cycles, Ordering::Relaxed);
    }

    /// `(frame_on_count, frame_size)` of the most recent full-frame window.
    pub fn last_frame(&self) -> (u8, u8) {
        let word = self.last_frame.load(Ordering::Relaxed);
        ((word & 0xFF) as u8, (word >> 8) as u8)
    }

    /// ON fraction over the most recently completed frame window.
    pub fn last_achieved_ratio(&self) -> f64 {
        let (on, size) = self.last_frame();
        if size == 0 {
            return 0.0;
        }
        f64::from(on) / f64::from(size)
    }

    /// Variance after the most recent cycle.
    pub fn variance(&self) -> i8 {
        self.variance.load(Ordering::Relaxed)
    }

    /// Half-cycles decided so far. Wraps.
    pub fn cycles(&self) -> u32 {
        self.cycles.load(Ordering::Relaxed)
    }
}

// ─── Status snapshot ────────────────────────────────────────────────────────

/// Point-in-time view of a modulator, for status pages and periodic logs.
///
/// Fields are read one at a time without a lock. A snapshot taken while the
/// engine runs may mix values from adjacent cycles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModulatorStatus {
    /// Active frame size.
    pub frame_size: u8,
    /// ON target for the active frame.
    pub frame_on_target: u8,
    /// Last applied target ratio.
    pub target_ratio: f64,
    /// `frame_on_target / frame_size`.
    pub achievable_ratio: f64,
    /// ON fraction over the last completed frame window.
    pub last_achieved_ratio: f64,
    /// Variance after the most recent cycle.
    pub variance: i8,
    /// Half-cycles decided so far (wraps).
    pub cycles: u32,
}

impl ModulatorStatus {
    /// Express the ratios as power for a load drawing `full_power_w` when fully on.
    pub fn power_report(&self, full_power_w: f64) -> PowerReport {
        let full = effective_full_power(full_power_w);
        PowerReport {
            full_power_w: full,
            target_w: full * self.target_ratio,
            achievable_w: full * self.achievable_ratio,
            last_achieved_w: full * self.last_achieved_ratio,
        }
    }
}

/// Modulator ratios converted to watts.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerReport {
    /// Load power at 100% duty, after flooring at 1 W.
    pub full_power_w: f64,
    /// Requested power.
    pub target_w: f64,
    /// Best power obtainable at the current frame size.
    pub achievable_w: f64,
    /// Power delivered over the last frame window.
    pub last_achieved_w: f64,
}

/// Target ratio that asks a `full_power_w` load for `target_w`.
///
/// The result is not clamped; pass it through
/// [`crate::CycleModulator::set_target_ratio`], which does.
pub fn ratio_for_power(target_w: f64, full_power_w: f64) -> f64 {
    target_w / effective_full_power(full_power_w)
}

/// Loads below 1 W (or NaN) are treated as 1 W to keep the ratio finite.
fn effective_full_power(full_power_w: f64) -> f64 {
    if full_power_w >= 1.0 {
        full_power_w
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(frame_on_count: u8, frame_size: u8, variance: i8) -> CycleDecision {
        CycleDecision {
            on: true,
            sign: 1,
            variance,
            corrected: false,
            frame_on_count,
            frame_size,
        }
    }

    #[test]
    fn test_fresh_telemetry_reads_zero() {
        let t = Telemetry::new(100);
        assert_eq!(t.last_frame(), (0, 100));
        assert_eq!(t.last_achieved_ratio(), 0.0);
        assert_eq!(t.cycles(), 0);
    }

    #[test]
    fn test_record_publishes_count_with_its_frame() {
        let t = Telemetry::new(100);
        t.record(&decision(7, 13, -2));
        assert_eq!(t.last_frame(), (7, 13));
        assert!((t.last_achieved_ratio() - 7.0 / 13.0).abs() < 1e-12);
        assert_eq!(t.variance(), -2);
        assert_eq!(t.cycles(), 1);
    }

    #[test]
    fn test_power_report_scales_ratios() {
        let status = ModulatorStatus {
            frame_size: 13,
            frame_on_target: 10,
            target_ratio: 0.7,
            achievable_ratio: 10.0 / 13.0,
            last_achieved_ratio: 0.5,
            variance: 0,
            cycles: 0,
        };
        let report = status.power_report(2_000.0);
        assert!((report.target_w - 1_400.0).abs() < 1e-9);
        assert!((report.last_achieved_w - 1_000.0).abs() < 1e-9);
        assert!((report.achievable_w - 2_000.0 * 10.0 / 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_power_floored_at_one_watt() {
        assert_eq!(ratio_for_power(0.5, 0.0), 0.5);
        assert_eq!(ratio_for_power(0.5, -300.0), 0.5);
        assert_eq!(ratio_for_power(0.5, f64::NAN), 0.5);
        assert_eq!(ratio_for_power(500.0, 2_000.0), 0.25);
    }
}
