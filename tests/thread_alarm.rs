//! Host alarm driving a real engine thread.
//!
//! Run with `cargo test --features std`.

#![cfg(feature = "std")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use acr_core::hal::ThreadAlarm;
use acr_core::{AlarmHandler, AlarmPeriod, CycleModulator, DigitalOutput, FavorOn, PeriodicAlarm};

#[derive(Clone, Default)]
struct Counter(Arc<AtomicUsize>);

impl DigitalOutput for Counter {
    fn set_level(&mut self, _on: bool) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

impl AlarmHandler for Counter {
    fn on_alarm(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn wait_for(count: &AtomicUsize, at_least: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if count.load(Ordering::Relaxed) >= at_least {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_thread_alarm_fires_repeatedly() {
    let hits = Counter::default();
    let mut alarm = ThreadAlarm::new();
    let period = AlarmPeriod::from_ac_frequency(500).unwrap();
    alarm.start(period, hits.clone()).unwrap();
    assert!(wait_for(&hits.0, 20));
}

#[test]
fn test_thread_alarm_arms_once() {
    let mut alarm = ThreadAlarm::new();
    let period = AlarmPeriod::from_ac_frequency(50).unwrap();
    alarm.start(period, Counter::default()).unwrap();
    let err = alarm.start(period, Counter::default()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
}

#[test]
fn test_modulator_runs_on_thread_alarm() {
    let acr: &'static CycleModulator<FavorOn> = Box::leak(Box::new(CycleModulator::new(10)));
    acr.set_target_ratio(0.5);
    let writes = Counter::default();
    acr.start(500, writes.clone(), &mut ThreadAlarm::new())
        .unwrap();

    assert!(wait_for(&writes.0, 50));
    assert!(acr.telemetry().cycles() >= 50);
    assert!((acr.last_achieved_ratio() - 0.5).abs() <= 0.1 + 1e-12);
}
