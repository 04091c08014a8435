/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The cycle modulator: public control-plane API and the alarm-driven engine.
//!
//! ```text
//!  control plane                      alarm @ 2 × AC frequency
//!  ─────────────                      ────────────────────────
//!  set_target_ratio ─┐                DecisionEngine::on_alarm
//!  set_frame_size  ──┼─▶ ConfigStore ──▶ snapshot (one atomic load)
//!  apply_config    ──┘                   CycleState::step
//!                                        DigitalOutput::set_level
//!  status / getters ◀──── Telemetry ◀─── Telemetry::record
//! ```
//!
//! A [`CycleModulator`] is an ordinary value. On bare metal it usually lives in
//! a `static` (its constructor is `const`), and [`CycleModulator::start`] hands
//! a reference to the platform alarm. In tests and simulations the engine can
//! be driven by hand through [`CycleModulator::engine`].

use portable_atomic::{AtomicBool, Ordering};

use crate::config::{Bias, ConfigStore, DefaultBias, FramePair, ModulatorConfig};
use crate::engine::{CycleDecision, CycleState};
use crate::error::StartError;
use crate::hal::{AlarmHandler, AlarmPeriod, DigitalOutput, PeriodicAlarm};
use crate::telemetry::{ModulatorStatus, Telemetry};

// ─── CycleModulator ─────────────────────────────────────────────────────────

/// AC cycle ratio modulator.
///
/// All control-plane methods take `&self`, are lock-free, and never fail:
/// out-of-range inputs are clamped.
///
/// # Example
///
/// ```
/// use acr_core::{CycleModulator, FavorOn};
///
/// let acr: CycleModulator<FavorOn> = CycleModulator::new(100);
/// acr.set_frame_size(13);
/// assert_eq!(acr.set_target_ratio(0.7), 0.7);
/// assert!((acr.achievable_ratio() - 10.0 / 13.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct CycleModulator<B: Bias = DefaultBias> {
    config: ConfigStore<B>,
    telemetry: Telemetry,
    engine_claimed: AtomicBool,
}

impl<B: Bias> CycleModulator<B> {
    /// A modulator at `default_frame_size` (clamped), target ratio 0, empty history.
    pub const fn new(default_frame_size: i32) -> Self {
        let config = ConfigStore::new(default_frame_size);
        let frame_size = crate::config::clamp_frame_size(default_frame_size);
        Self {
            config,
            telemetry: Telemetry::new(frame_size),
            engine_claimed: AtomicBool::new(false),
        }
    }

    // ── Control plane ─────────────────────────────────────────────────────

    /// Request an ON ratio. Clamped to `[0, 1]`, NaN → 0. Returns the applied ratio.
    pub fn set_target_ratio(&self, ratio: f64) -> f64 {
        self.config.set_target_ratio(ratio)
    }

    /// The last applied target ratio.
    pub fn target_ratio(&self) -> f64 {
        self.config.target_ratio()
    }

    /// Set the frame size. Clamped to `[MIN_FRAME_SIZE, MAX_FRAME_SIZE]`.
    /// Returns the applied size.
    pub fn set_frame_size(&self, frame_size: i32) -> u8 {
        self.config.set_frame_size(frame_size)
    }

    /// The active frame size.
    pub fn frame_size(&self) -> u8 {
        self.config.snapshot().frame_size
    }

    /// The active `(frame_size, frame_on_target)` pair.
    pub fn frame_pair(&self) -> FramePair {
        self.config.snapshot()
    }

    /// `frame_on_target / frame_size`: the best ratio obtainable right now.
    pub fn achievable_ratio(&self) -> f64 {
        self.config.snapshot().achievable_ratio()
    }

    /// ON fraction over the most recently completed frame window.
    pub fn last_achieved_ratio(&self) -> f64 {
        self.telemetry.last_achieved_ratio()
    }

    /// Apply a stored configuration: frame size first, then ratio.
    ///
    /// Returns the configuration as applied (both fields clamped).
    pub fn apply_config(&self, config: &ModulatorConfig) -> ModulatorConfig {
        let frame_size = self.set_frame_size(config.frame_size);
        let target_ratio = self.set_target_ratio(config.target_ratio);
        let applied = ModulatorConfig {
            frame_size: i32::from(frame_size),
            target_ratio,
        };
        #[cfg(feature = "tracing")]
        tracing::info!(
            frame_size = applied.frame_size,
            target_ratio = applied.target_ratio,
            "configuration applied"
        );
        applied
    }

    /// The current settings, in the form [`CycleModulator::apply_config`] accepts.
    pub fn config(&self) -> ModulatorConfig {
        ModulatorConfig {
            frame_size: i32::from(self.frame_size()),
            target_ratio: self.target_ratio(),
        }
    }

    /// Snapshot for status pages and logs.
    pub fn status(&self) -> ModulatorStatus {
        let pair = self.config.snapshot();
        ModulatorStatus {
            frame_size: pair.frame_size,
            frame_on_target: pair.frame_on_target,
            target_ratio: self.target_ratio(),
            achievable_ratio: pair.achievable_ratio(),
            last_achieved_ratio: self.telemetry.last_achieved_ratio(),
            variance: self.telemetry.variance(),
            cycles: self.telemetry.cycles(),
        }
    }

    /// Engine-side telemetry.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    // ── Engine ────────────────────────────────────────────────────────────

    /// Claim the decision engine, driving `output`.
    ///
    /// Only one engine may exist per modulator: the first call succeeds and
    /// every later call returns `None`.
    pub fn engine<O: DigitalOutput>(&self, output: O) -> Option<DecisionEngine<'_, B, O>> {
        if !self.claim_engine() {
            return None;
        }
        Some(DecisionEngine {
            modulator: self,
            state: CycleState::new(),
            output,
        })
    }

    /// Take the single engine slot. `true` if this call got it.
    pub(crate) fn claim_engine(&self) -> bool {
        !self.engine_claimed.swap(true, Ordering::AcqRel)
    }

    /// Whether the decision engine has been claimed.
    pub fn is_started(&self) -> bool {
        self.engine_claimed.load(Ordering::Acquire)
    }

    /// Decide one half-cycle with caller-owned state and drive `output`.
    ///
    /// Callers must hold the engine claim: telemetry assumes a single writer.
    #[inline]
    pub(crate) fn run_cycle<O: DigitalOutput>(
        &self,
        state: &mut CycleState<B>,
        output: &mut O,
    ) -> CycleDecision {
        let decision = state.step(self.config.snapshot());
        output.set_level(decision.on);
        self.telemetry.record(&decision);
        decision
    }
}

impl<B: Bias> CycleModulator<B> {
    /// Start modulating: claim the engine and arm `alarm` at twice `ac_frequency_hz`.
    ///
    /// Must be called once. Any error is a boot-time configuration failure.
    pub fn start<O, A>(
        &'static self,
        ac_frequency_hz: u32,
        output: O,
        alarm: &mut A,
    ) -> Result<(), StartError<A::Error>>
    where
        O: DigitalOutput + Send + 'static,
        A: PeriodicAlarm,
    {
        let Some(period) = AlarmPeriod::from_ac_frequency(ac_frequency_hz) else {
            #[cfg(feature = "tracing")]
            tracing::error!(ac_frequency_hz, "cannot derive half-cycle alarm period");
            return Err(StartError::InvalidFrequency(ac_frequency_hz));
        };
        let Some(engine) = self.engine(output) else {
            #[cfg(feature = "tracing")]
            tracing::error!("modulator already started");
            return Err(StartError::AlreadyStarted);
        };
        alarm.start(period, engine).map_err(|e| {
            #[cfg(feature = "tracing")]
            tracing::error!(error = ?e, "periodic alarm failed to start");
            StartError::Alarm(e)
        })?;
        #[cfg(feature = "tracing")]
        {
            let pair = self.config.snapshot();
            tracing::info!(
                ac_frequency_hz,
                alarm_rate_hz = period.rate_hz(),
                interval_us = period.interval_ticks(),
                frame_size = pair.frame_size,
                frame_on_target = pair.frame_on_target,
                "cycle modulator started"
            );
        }
        Ok(())
    }
}

impl<B: Bias> Default for CycleModulator<B> {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_FRAME_SIZE as i32)
    }
}

// ─── DecisionEngine ─────────────────────────────────────────────────────────

/// The real-time half of a modulator: exclusive cycle state plus the output line.
///
/// Created by [`CycleModulator::engine`]; runs one decision per
/// [`AlarmHandler::on_alarm`]. This is the only way to decide cycles, so the
/// modulator never has two engines writing telemetry:
///
/// ```compile_fail
/// use acr_core::{CycleModulator, CycleState, DigitalOutput, FavorOn};
///
/// struct Pin;
/// impl DigitalOutput for Pin {
///     fn set_level(&mut self, _on: bool) {}
/// }
///
/// let acr: CycleModulator<FavorOn> = CycleModulator::new(10);
/// let mut state: CycleState<FavorOn> = CycleState::new();
/// acr.run_cycle(&mut state, &mut Pin);
/// ```
#[derive(Debug)]
pub struct DecisionEngine<'a, B: Bias, O> {
    modulator: &'a CycleModulator<B>,
    state: CycleState<B>,
    output: O,
}

impl<'a, B: Bias, O: DigitalOutput> DecisionEngine<'a, B, O> {
    /// Decide, drive the output, publish telemetry.
    #[inline]
    pub fn on_cycle(&mut self) -> CycleDecision {
        self.modulator.run_cycle(&mut self.state, &mut self.output)
    }

    /// Engine-owned cycle state.
    pub fn state(&self) -> &CycleState<B> {
        &self.state
    }

    /// The output line.
    pub fn output(&self) -> &O {
        &self.output
    }
}

impl<'a, B: Bias, O: DigitalOutput> AlarmHandler for DecisionEngine<'a, B, O> {
    #[inline]
    fn on_alarm(&mut self) {
        self.on_cycle();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
