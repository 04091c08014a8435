/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Platform seams: the relay output line and the periodic half-cycle alarm.
//!
//! The modulator does not talk to hardware directly. A board support layer
//! implements [`DigitalOutput`] for the relay GPIO and [`PeriodicAlarm`] for a
//! hardware timer, and [`crate::CycleModulator::start`] wires them together.
//!
//! With the `std` feature, [`ThreadAlarm`] drives the handler from a host
//! thread, which is handy for bench rigs and soak simulations.

use core::fmt;

/// Timer resolution assumed when converting the AC frequency to alarm ticks.
pub const TIMER_RESOLUTION_HZ: u32 = 1_000_000;

/// A digital output line, e.g. the GPIO driving a solid-state relay.
///
/// Called from interrupt context once per half-cycle. Implementations must not
/// block or allocate.
pub trait DigitalOutput {
    /// Drive the line high (`true`) or low (`false`).
    fn set_level(&mut self, on: bool);
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for &mut T {
    fn set_level(&mut self, on: bool) {
        (**self).set_level(on)
    }
}

/// Callback invoked on every alarm expiry.
pub trait AlarmHandler {
    /// Handle one alarm. Runs in interrupt context on embedded targets.
    fn on_alarm(&mut self);
}

/// Period of the half-cycle alarm derived from the AC line frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmPeriod {
    ac_frequency_hz: u32,
}

impl AlarmPeriod {
    /// Alarm period for a line at `ac_frequency_hz`.
    ///
    /// Returns `None` for 0 Hz, or for frequencies so high that a half-cycle is
    /// shorter than one timer tick.
    pub const fn from_ac_frequency(ac_frequency_hz: u32) -> Option<Self> {
        if ac_frequency_hz == 0 || ac_frequency_hz > TIMER_RESOLUTION_HZ / 2 {
            None
        } else {
            Some(Self { ac_frequency_hz })
        }
    }

    /// The AC line frequency.
    pub const fn ac_frequency_hz(&self) -> u32 {
        self.ac_frequency_hz
    }

    /// Alarm rate: two half-cycles per AC period.
    pub const fn rate_hz(&self) -> u32 {
        2 * self.ac_frequency_hz
    }

    /// Alarm interval in ticks of a [`TIMER_RESOLUTION_HZ`] timer (microseconds).
    pub const fn interval_ticks(&self) -> u32 {
        TIMER_RESOLUTION_HZ / self.rate_hz()
    }

    /// Alarm interval as a `Duration`.
    #[cfg(feature = "std")]
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros(u64::from(self.interval_ticks()))
    }
}

impl fmt::Display for AlarmPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz ({} µs)", self.rate_hz(), self.interval_ticks())
    }
}

/// An auto-reloading periodic alarm.
///
/// Implementations register `handler`, arm the alarm to fire every
/// `period.interval_ticks()` microseconds, and keep it running. There is no
/// stop operation: once started the handler runs for the life of the process.
pub trait PeriodicAlarm {
    /// Error reported when the timer cannot be acquired or configured.
    type Error: fmt::Debug;

    /// Arm the alarm and start invoking `handler`.
    fn start<H>(&mut self, period: AlarmPeriod, handler: H) -> Result<(), Self::Error>
    where
        H: AlarmHandler + Send + 'static;
}

// ─── Host alarm ─────────────────────────────────────────────────────────────

/// Host-side [`PeriodicAlarm`] that runs the handler on a dedicated thread.
///
/// Each alarm sleeps until the next deadline on a fixed schedule, so late
/// wakeups do not accumulate drift. Jitter is whatever the OS scheduler gives.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct ThreadAlarm {
    started: bool,
}

#[cfg(feature = "std")]
impl ThreadAlarm {
    /// A fresh, unarmed alarm.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "std")]
impl PeriodicAlarm for ThreadAlarm {
    type Error = std::io::Error;

    fn start<H>(&mut self, period: AlarmPeriod, mut handler: H) -> Result<(), Self::Error>
    where
        H: AlarmHandler + Send + 'static,
    {
        if self.started {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "alarm already armed",
            ));
        }
        let interval = period.interval();
        std::thread::Builder::new()
            .name("acr-alarm".into())
            .spawn(move || {
                let mut deadline = std::time::Instant::now() + interval;
                loop {
                    let now = std::time::Instant::now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    }
                    handler.on_alarm();
                    deadline += interval;
                }
            })?;
        self.started = true;
        Ok(())
    }
}
