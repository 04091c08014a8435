//! Python FFI bindings via PyO3.
//!
//! Exposes an offline modulator for tuning frame sizes and ratios from Python.
//! No alarm and no hardware: each call to `step` or `run` decides half-cycles
//! immediately and returns the output levels.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from acr_core import CycleModulator
//!
//! acr = CycleModulator(frame_size=13)
//! acr.set_target_ratio(0.7)
//! print(acr.achievable_ratio)      # 0.769...
//! levels = acr.run(1300)           # list[bool], one per half-cycle
//! print(sum(levels) / len(levels))
//! print(acr.last_achieved_ratio, acr.variance)
//! ```

use pyo3::prelude::*;

use crate::config::{DefaultBias, MAX_FRAME_SIZE, MAX_VARIANCE, MIN_FRAME_SIZE};
use crate::engine::CycleState;
use crate::hal::DigitalOutput;
use crate::modulator::CycleModulator;

/// Output that only remembers its level.
#[derive(Default)]
struct Latch(bool);

impl DigitalOutput for Latch {
    fn set_level(&mut self, on: bool) {
        self.0 = on;
    }
}

// ── CycleModulator ────────────────────────────────────────────────────────────

/// AC cycle ratio modulator, stepped by hand.
#[pyclass(name = "CycleModulator")]
pub struct PyCycleModulator {
    inner: CycleModulator<DefaultBias>,
    state: CycleState<DefaultBias>,
    output: Latch,
}

#[pymethods]
impl PyCycleModulator {
    /// Construct a modulator at `frame_size` (clamped) with a zero ratio.
    #[new]
    #[pyo3(signature = (frame_size=100))]
    pub fn new(frame_size: i32) -> Self {
        let inner = CycleModulator::new(frame_size);
        // Fresh modulator, so the claim always succeeds. This object is the
        // engine from here on.
        let claimed = inner.claim_engine();
        debug_assert!(claimed);
        Self {
            inner,
            state: CycleState::new(),
            output: Latch::default(),
        }
    }

    /// Request an ON ratio. Returns the applied (clamped) ratio.
    pub fn set_target_ratio(&self, ratio: f64) -> f64 {
        self.inner.set_target_ratio(ratio)
    }

    /// Set the frame size. Returns the applied (clamped) size.
    pub fn set_frame_size(&self, frame_size: i32) -> u8 {
        self.inner.set_frame_size(frame_size)
    }

    /// Last applied target ratio.
    #[getter]
    pub fn target_ratio(&self) -> f64 {
        self.inner.target_ratio()
    }

    /// Active frame size.
    #[getter]
    pub fn frame_size(&self) -> u8 {
        self.inner.frame_size()
    }

    /// ON half-cycles wanted per frame.
    #[getter]
    pub fn frame_on_target(&self) -> u8 {
        self.inner.frame_pair().frame_on_target
    }

    /// `frame_on_target / frame_size`.
    #[getter]
    pub fn achievable_ratio(&self) -> f64 {
        self.inner.achievable_ratio()
    }

    /// ON fraction over the last completed frame window.
    #[getter]
    pub fn last_achieved_ratio(&self) -> f64 {
        self.inner.last_achieved_ratio()
    }

    /// Current variance accumulator.
    #[getter]
    pub fn variance(&self) -> i8 {
        self.state.variance()
    }

    /// Half-cycles decided so far.
    #[getter]
    pub fn cycles(&self) -> u32 {
        self.inner.telemetry().cycles()
    }

    /// Decide one half-cycle. Returns the output level.
    pub fn step(&mut self) -> bool {
        self.inner.run_cycle(&mut self.state, &mut self.output).on
    }

    /// Decide `cycles` half-cycles. Returns the output levels in order.
    pub fn run(&mut self, cycles: usize) -> Vec<bool> {
        (0..cycles).map(|_| self.step()).collect()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        let pair = self.inner.frame_pair();
        format!(
            "CycleModulator(frame_size={}, frame_on_target={}, target_ratio={:.4})",
            pair.frame_size,
            pair.frame_on_target,
            self.inner.target_ratio(),
        )
    }
}

// ── Module entry point ────────────────────────────────────────────────────────

/// ACR — AC cycle ratio modulator Python bindings.
#[pymodule]
pub fn acr_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCycleModulator>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("MIN_FRAME_SIZE", MIN_FRAME_SIZE)?;
    m.add("MAX_FRAME_SIZE", MAX_FRAME_SIZE)?;
    m.add("MAX_VARIANCE", MAX_VARIANCE)?;
    Ok(())
}
