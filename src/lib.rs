//! # acr-core
//!
//! AC Cycle Ratio modulation: approximate a continuous power level on a
//! resistive AC load using nothing but a relay that is either ON or OFF for
//! each half-cycle of the mains.
//!
//! ---
//!
//! ## The problem
//!
//! A solid-state relay switching at zero crossings can only deliver whole
//! half-cycles. To ask a 2 kW heater for 1.4 kW, the relay must be ON for 70%
//! of half-cycles, spread as evenly as possible. Two things make this harder
//! than a counter:
//!
//! **Density** — the ON fraction over any recent window should track the
//! target, so the load sees a smooth average rather than long bursts.
//!
//! **Balance** — if ON half-cycles pile up on one polarity the line carries a
//! net DC component, which residual-current devices can trip on. A signed
//! *variance* accumulator keeps that imbalance within `±MAX_VARIANCE`.
//!
//! ## The pipeline
//!
//! ```text
//!  set_target_ratio / set_frame_size
//!            │
//!            ▼
//!      ConfigStore ──(frame_size, frame_on_target) one atomic word──┐
//!                                                                   ▼
//!  alarm @ 2×f ─▶ DecisionEngine ─▶ CycleState::step ─▶ DigitalOutput
//!                                        │  ▲
//!                                        ▼  │
//!                                    HistoryRing (wrapping u8 totals)
//!                                        │
//!                                        ▼
//!                                    Telemetry ─▶ status / getters
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`config`] | [`ConfigStore`], [`FramePair`], [`Bias`] | Clamped settings, rounding bias, atomic pair publication |
//! | [`history`] | [`HistoryRing`] | O(1) windowed ON counts over a wrapping cumulative ring |
//! | [`engine`] | [`CycleState`], [`CycleDecision`] | Per-half-cycle density control with the variance bound |
//! | [`modulator`] | [`CycleModulator`], [`DecisionEngine`] | Public API; binds engine, output and alarm |
//! | [`hal`] | [`DigitalOutput`], [`PeriodicAlarm`] | Platform seams for the relay line and the timer |
//! | [`telemetry`] | [`ModulatorStatus`], [`PowerReport`] | Lock-free monitoring |
//! | [`error`] | [`StartError`] | The only fallible operation: startup |
//! | `trace` | `DecisionTrace` | Fixed-capacity decision log (requires `trace` feature) |
//!
//! ## Quick start
//!
//! ```
//! use acr_core::{CycleModulator, DigitalOutput, FavorOn};
//!
//! struct Relay(bool);
//! impl DigitalOutput for Relay {
//!     fn set_level(&mut self, on: bool) { self.0 = on; }
//! }
//!
//! let acr: CycleModulator<FavorOn> = CycleModulator::new(10);
//! acr.set_target_ratio(0.5);
//!
//! let mut engine = acr.engine(Relay(false)).unwrap();
//! let on = (0..10).filter(|_| engine.on_cycle().on).count();
//! assert_eq!(on, 5);
//! ```
//!
//! On hardware, put the modulator in a `static` and call
//! [`CycleModulator::start`] with the relay GPIO and a timer implementing
//! [`PeriodicAlarm`].
//!
//! ## Known limitation
//!
//! The polarity used by the variance bound alternates every alarm and is not
//! synchronised to the real AC waveform. The bound is a proxy for charge
//! balance, not a measurement.
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default with no heap required. Shared state
//! uses `portable-atomic`, so 64-bit values work on 32-bit parts and targets
//! without native compare-and-swap can fall back to a critical section:
//!
//! | Target | Example part | Build with |
//! |--------|--------------|------------|
//! | `thumbv7em-none-eabihf` | Cortex-M4/M7 | default features |
//! | `xtensa-esp32-none-elf` | ESP32 | default features |
//! | `riscv32imc-unknown-none-elf` | ESP32-C3 | `--no-default-features --features critical-section` |
//! | `thumbv6m-none-eabi` | Cortex-M0+ | `--no-default-features --features critical-section` |
//!
//! Parts without compare-and-swap take the `critical-section` route and must
//! link a `critical-section` implementation. The `tracing` feature (on by
//! default) is dropped there because `tracing-core` itself needs CAS.
//!
//! Enable `std` for the thread-backed `hal::ThreadAlarm` and
//! `std::error::Error` support. Enable `serde` for serialisable configuration
//! and status types.
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Pull in std when the feature is enabled (host alarm, std::error::Error)
#[cfg(any(feature = "std", feature = "python-ffi"))]
extern crate std;

pub mod config;
pub mod engine;
pub mod error;
pub mod hal;
pub mod history;
pub mod modulator;
pub mod telemetry;

/// Fixed-capacity decision trace.
///
/// Enabled by `features = ["trace"]`. Compiles to nothing when the feature is
/// absent.
#[cfg(feature = "trace")]
pub mod trace;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use config::{
    Bias, ConfigStore, DefaultBias, FavorOff, FavorOn, FramePair, ModulatorConfig,
    DEFAULT_FRAME_SIZE, MAX_FRAME_SIZE, MAX_VARIANCE, MIN_FRAME_SIZE,
};
pub use engine::{CycleDecision, CycleState};
pub use error::StartError;
pub use hal::{AlarmHandler, AlarmPeriod, DigitalOutput, PeriodicAlarm};
pub use history::{HistoryRing, OnCount};
pub use modulator::{CycleModulator, DecisionEngine};
pub use telemetry::{ratio_for_power, ModulatorStatus, PowerReport, Telemetry};
