/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Startup errors.
//!
//! Starting the modulator is the only fallible operation. Everything on the
//! control plane clamps its inputs, and the decision engine cannot fail.

use core::fmt;

/// Reasons [`crate::CycleModulator::start`] can fail.
///
/// All of them are configuration errors: the caller is expected to treat them
/// as fatal at boot rather than retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError<E> {
    /// The modulator already has a running decision engine.
    AlreadyStarted,
    /// The AC frequency cannot be turned into a half-cycle alarm period.
    InvalidFrequency(u32),
    /// The platform alarm could not be acquired or armed.
    Alarm(E),
}

impl<E: fmt::Debug> fmt::Display for StartError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => write!(f, "modulator already started"),
            Self::InvalidFrequency(hz) => write!(f, "invalid AC frequency: {} Hz", hz),
            Self::Alarm(e) => write!(f, "periodic alarm failed: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for StartError<E> {}
