//! # ACR Heater Simulation
//!
//! Drives a 2 kW resistive heater on 50 Hz mains through one evening of
//! thermostat requests. Shows frame quantisation, the density pattern the
//! relay produces, the variance bound at work, and the effect of changing the
//! frame size mid-run.
//!
//! Run with `cargo run --example simulation --features trace`.

use acr_core::trace::DecisionTrace;
use acr_core::{ratio_for_power, CycleModulator, DefaultBias, DigitalOutput};

const FULL_POWER_W: f64 = 2_000.0;
const HALF_CYCLES_PER_SECOND: usize = 100;

// ── Relay ─────────────────────────────────────────────────────────────────────

/// Stand-in for the SSR GPIO: counts switching events.
#[derive(Default)]
struct Relay {
    level: bool,
    switches: u64,
}

impl DigitalOutput for Relay {
    fn set_level(&mut self, on: bool) {
        if on != self.level {
            self.switches += 1;
        }
        self.level = on;
    }
}

// ── Display helpers ───────────────────────────────────────────────────────────

fn bar(v: f64) -> String {
    let filled = (v * 20.0).round() as usize;
    let empty = 20usize.saturating_sub(filled);
    format!("[{}{}] {:.3}", "█".repeat(filled), "░".repeat(empty), v)
}

fn waveform(trace: &DecisionTrace<64>) -> String {
    trace.iter().map(|d| if d.on { '█' } else { '·' }).collect()
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║  ACR Heater Simulation — 2 kW load, 50 Hz mains                      ║");
    println!("╚══════════════════════════════════════════════════════════════════════╝\n");

    let acr: CycleModulator<DefaultBias> = CycleModulator::default();
    let mut engine = acr.engine(Relay::default()).expect("fresh modulator");

    // (label, requested watts, frame size, seconds)
    let schedule: [(&str, f64, i32, usize); 6] = [
        ("warm-up", 2_000.0, 100, 5),
        ("hold", 1_400.0, 100, 10),
        ("eco", 450.0, 100, 10),
        ("eco, short frame", 450.0, 13, 10),
        ("trickle", 30.0, 100, 10),
        ("off", 0.0, 100, 5),
    ];

    for (label, watts, frame_size, seconds) in schedule {
        let applied_frame = acr.set_frame_size(frame_size);
        let applied_ratio = acr.set_target_ratio(ratio_for_power(watts, FULL_POWER_W));
        let mut trace: DecisionTrace<64> = DecisionTrace::new();

        for _ in 0..seconds * HALF_CYCLES_PER_SECOND {
            trace.record(engine.on_cycle());
        }

        let status = acr.status();
        let power = status.power_report(FULL_POWER_W);
        println!(
            "▶  {:<18} frame {:>3}  request {:>6.0} W  (ratio {:.3})",
            label, applied_frame, watts, applied_ratio
        );
        println!(
            "   achievable {:>6.0} W   delivered {}   last frame {:>6.0} W",
            power.achievable_w,
            bar(trace.lifetime_on_fraction()),
            power.last_achieved_w,
        );
        println!(
            "   corrections {:>4}   peak |variance| {}   final variance {:+}",
            trace.corrections(),
            trace.peak_variance(),
            status.variance,
        );
        println!("   {}\n", waveform(&trace));
    }

    let relay = engine.output();
    let cycles = acr.telemetry().cycles();
    println!("Summary: {} half-cycles decided, {} relay switches.", cycles, relay.switches);
}
