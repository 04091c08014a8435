//! Startup and cross-context behaviour of `CycleModulator`.
//!
//! Covers the start-once contract, frequency validation, alarm failures, and
//! control-plane setters racing the decision engine on another thread.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use acr_core::config::frame_on_target;
use acr_core::{
    AlarmHandler, AlarmPeriod, CycleModulator, DigitalOutput, FavorOff, FavorOn, PeriodicAlarm,
    StartError, MAX_VARIANCE,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

/// Output line shared with the test through an `Arc`.
#[derive(Clone, Default)]
struct SharedLine {
    on_count: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl DigitalOutput for SharedLine {
    fn set_level(&mut self, on: bool) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if on {
            self.on_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Alarm that stores the handler and fires it only when the test asks.
#[derive(Default)]
struct ManualAlarm {
    period: Option<AlarmPeriod>,
    handler: Option<Box<dyn AlarmHandler + Send>>,
}

impl ManualAlarm {
    fn fire(&mut self, times: usize) {
        let handler = self.handler.as_mut().expect("alarm not armed");
        for _ in 0..times {
            handler.on_alarm();
        }
    }
}

impl PeriodicAlarm for ManualAlarm {
    type Error = &'static str;

    fn start<H>(&mut self, period: AlarmPeriod, handler: H) -> Result<(), Self::Error>
    where
        H: AlarmHandler + Send + 'static,
    {
        self.period = Some(period);
        self.handler = Some(Box::new(handler));
        Ok(())
    }
}

/// Alarm whose hardware is never available.
struct BrokenAlarm;

impl PeriodicAlarm for BrokenAlarm {
    type Error = &'static str;

    fn start<H>(&mut self, _period: AlarmPeriod, _handler: H) -> Result<(), Self::Error>
    where
        H: AlarmHandler + Send + 'static,
    {
        Err("no free timer")
    }
}

fn leak<B: acr_core::Bias>(acr: CycleModulator<B>) -> &'static CycleModulator<B> {
    Box::leak(Box::new(acr))
}

// ─── start ───────────────────────────────────────────────────────────────────

#[test]
fn test_start_arms_alarm_at_twice_ac_frequency() {
    let acr = leak(CycleModulator::<FavorOn>::new(10));
    acr.set_target_ratio(0.5);
    let line = SharedLine::default();
    let mut alarm = ManualAlarm::default();

    acr.start(50, line.clone(), &mut alarm).unwrap();
    assert!(acr.is_started());
    let period = alarm.period.unwrap();
    assert_eq!(period.rate_hz(), 100);
    assert_eq!(period.interval_ticks(), 10_000);

    alarm.fire(10);
    assert_eq!(line.writes.load(Ordering::Relaxed), 10);
    assert_eq!(line.on_count.load(Ordering::Relaxed), 5);
    assert_eq!(acr.telemetry().cycles(), 10);
    assert!((acr.last_achieved_ratio() - 0.5).abs() < 1e-12);
}

#[test]
fn test_second_start_is_rejected() {
    let acr = leak(CycleModulator::<FavorOn>::new(10));
    let mut alarm = ManualAlarm::default();
    acr.start(60, SharedLine::default(), &mut alarm).unwrap();

    let mut other = ManualAlarm::default();
    let err = acr.start(60, SharedLine::default(), &mut other).unwrap_err();
    assert_eq!(err, StartError::AlreadyStarted);
    assert!(other.handler.is_none());
}

#[test]
fn test_start_rejects_invalid_frequency_without_claiming_engine() {
    let acr = leak(CycleModulator::<FavorOn>::new(10));
    let mut alarm = ManualAlarm::default();

    let err = acr.start(0, SharedLine::default(), &mut alarm).unwrap_err();
    assert_eq!(err, StartError::InvalidFrequency(0));
    assert!(!acr.is_started());
    assert!(alarm.handler.is_none());

    acr.start(50, SharedLine::default(), &mut alarm).unwrap();
    assert!(acr.is_started());
}

#[test]
fn test_start_reports_alarm_failure() {
    let acr = leak(CycleModulator::<FavorOn>::new(10));
    let err = acr
        .start(50, SharedLine::default(), &mut BrokenAlarm)
        .unwrap_err();
    assert_eq!(err, StartError::Alarm("no free timer"));
    assert_eq!(err.to_string(), "periodic alarm failed: \"no free timer\"");
}

#[test]
fn test_setter_after_start_reaches_engine() {
    let acr = leak(CycleModulator::<FavorOff>::new(20));
    let line = SharedLine::default();
    let mut alarm = ManualAlarm::default();
    acr.start(50, line.clone(), &mut alarm).unwrap();

    alarm.fire(100);
    assert_eq!(line.on_count.load(Ordering::Relaxed), 0);

    acr.set_target_ratio(1.0);
    alarm.fire(100);
    assert_eq!(line.on_count.load(Ordering::Relaxed), 100);
}

// ─── cross-thread ────────────────────────────────────────────────────────────

/// Two setter threads race an engine thread. The engine must only ever see
/// pairs that some ratio/size combination could have produced, and the final
/// pair must match the final settings exactly.
#[test]
fn test_setters_racing_engine_publish_consistent_pairs() {
    let acr: &'static CycleModulator<FavorOn> = leak(CycleModulator::new(100));
    let stop = Arc::new(AtomicBool::new(false));
    let line = SharedLine::default();

    let engine_thread = {
        let stop = Arc::clone(&stop);
        let line = line.clone();
        thread::spawn(move || {
            let mut engine = acr.engine(line).unwrap();
            let mut decided = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let d = engine.on_cycle();
                assert!(d.frame_on_count <= d.frame_size);
                assert!(d.variance.abs() <= MAX_VARIANCE);
                let pair = acr.frame_pair();
                assert!(pair.frame_on_target <= pair.frame_size);
                decided += 1;
            }
            decided
        })
    };

    let ratio_thread = thread::spawn(move || {
        for i in 0..20_000u32 {
            acr.set_target_ratio(f64::from(i % 101) / 100.0);
        }
    });
    let size_thread = thread::spawn(move || {
        for i in 0..20_000i32 {
            acr.set_frame_size(6 + i % 123);
        }
    });

    ratio_thread.join().unwrap();
    size_thread.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    let decided = engine_thread.join().unwrap();
    assert!(decided > 0);

    let pair = acr.frame_pair();
    let ratio = acr.target_ratio();
    assert_eq!(pair.frame_size, acr.frame_size());
    assert_eq!(
        pair.frame_on_target,
        frame_on_target::<FavorOn>(ratio, pair.frame_size)
    );
}

/// Status snapshots taken concurrently never report an impossible frame.
#[test]
fn test_status_readable_while_engine_runs() {
    let acr: &'static CycleModulator<FavorOn> = leak(CycleModulator::new(13));
    acr.set_target_ratio(0.7);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let engine_thread = thread::spawn(move || {
        let mut engine = acr.engine(SharedLine::default()).unwrap();
        for _ in 0..50_000 {
            engine.on_cycle();
        }
    });
    let reader = {
        let seen = Arc::clone(&seen);
        thread::spawn(move || {
            for _ in 0..5_000 {
                let status = acr.status();
                assert!((0.0..=1.0).contains(&status.last_achieved_ratio));
                assert!(status.variance.abs() <= MAX_VARIANCE);
                seen.lock().unwrap().push(status.cycles);
            }
        })
    };

    engine_thread.join().unwrap();
    reader.join().unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "cycle count went backwards");
    assert_eq!(acr.telemetry().cycles(), 50_000);
}
