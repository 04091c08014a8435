//! Decision trace fed from a live engine.
//!
//! Run with `cargo test --features trace`.

#![cfg(feature = "trace")]

use acr_core::trace::DecisionTrace;
use acr_core::{CycleModulator, CycleState, DigitalOutput, FavorOn, FramePair, MAX_VARIANCE};

// ─── helpers ─────────────────────────────────────────────────────────────────

struct Sink;

impl DigitalOutput for Sink {
    fn set_level(&mut self, _on: bool) {}
}

// ─── tests ───────────────────────────────────────────────────────────────────

#[test]
fn test_trace_window_matches_frame_density() {
    let acr: CycleModulator<FavorOn> = CycleModulator::new(20);
    acr.set_target_ratio(0.35);
    let mut engine = acr.engine(Sink).unwrap();
    let mut trace: DecisionTrace<20> = DecisionTrace::new();

    for _ in 0..400 {
        trace.record(engine.on_cycle());
    }
    assert_eq!(trace.len(), 20);
    assert_eq!(trace.cycles(), 400);
    let on = trace.iter().filter(|d| d.on).count();
    assert!((6..=8).contains(&on), "{} ON in last frame", on);
    assert!((trace.lifetime_on_fraction() - 0.35).abs() < 0.01);
}

#[test]
fn test_trace_last_agrees_with_engine_state() {
    let pair = FramePair::for_ratio::<FavorOn>(0.5, 10);
    let mut state: CycleState<FavorOn> = CycleState::new();
    let mut trace: DecisionTrace<8> = DecisionTrace::default();
    for _ in 0..37 {
        trace.record(state.step(pair));
    }
    let last = trace.last().unwrap();
    assert_eq!(last.variance, state.variance());
    assert_eq!(last.frame_on_count, state.last_frame_on_count());
    assert_eq!(last.sign, -state.sign());
}

#[test]
fn test_trace_counts_variance_corrections() {
    let pair = FramePair::for_ratio::<FavorOn>(0.5, 6);
    let mut state: CycleState<FavorOn> = CycleState::new();
    let mut trace: DecisionTrace<64> = DecisionTrace::new();
    for _ in 0..120 {
        trace.record(state.step(pair));
    }
    assert!(trace.corrections() > 0);
    assert_eq!(trace.peak_variance(), MAX_VARIANCE);
    assert!(trace.transitions() > 0);
}
