//! Fault and limit bitflag types.
//!
//! All flag types use the `bitflags` crate. Any set fault bit forces the
//! controller into state E and withdraws PWM and relay outputs; bits in
//! `AUTO_CLEAR` recover after a wait window, the rest persist until the
//! operator toggles available off and on again or the unit restarts.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Sticky hardware fault flags.
    ///
    /// AUTO_CLEAR flags recover after the error wait window expires.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorFlags: u32 {
        /// Pilot voltage outside any valid band for the current state.
        const PILOT_FAULT         = 1 << 0;
        /// Negative pilot rail missing while PWM active (vehicle diode shorted).
        const DIODE_SHORT         = 1 << 1;
        /// Socket lock failed to engage within the retry budget.
        const LOCK_FAULT          = 1 << 2;
        /// Socket lock failed to release within the retry budget.
        const UNLOCK_FAULT        = 1 << 3;
        /// Residual current monitor tripped.
        const RCM_TRIGGERED       = 1 << 4;
        /// Residual current monitor self-test did not trip.
        const RCM_SELFTEST_FAULT  = 1 << 5;
        /// Temperature above the configured threshold.
        const TEMPERATURE_HIGH    = 1 << 6;
        /// Temperature sensor unreadable.
        const TEMPERATURE_FAULT   = 1 << 7;
    }
}

impl ErrorFlags {
    /// Mask of flags that recover after the error wait window.
    pub const AUTO_CLEAR: Self = Self::from_bits_truncate(
        Self::PILOT_FAULT.bits()
            | Self::DIODE_SHORT.bits()
            | Self::RCM_TRIGGERED.bits()
            | Self::RCM_SELFTEST_FAULT.bits(),
    );

    /// Returns true if any auto-clearing flag is set.
    #[inline]
    pub const fn has_auto_clear(&self) -> bool {
        self.intersects(Self::AUTO_CLEAR)
    }
}

impl Default for ErrorFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Session limit flags. Not faults: reaching a limit soft-stops
    /// charging without touching [`ErrorFlags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LimitFlags: u8 {
        /// Session consumption reached the consumption limit.
        const CONSUMPTION   = 1 << 0;
        /// Charging time reached the time limit.
        const CHARGING_TIME = 1 << 1;
        /// Power stayed under the under-power limit past the grace window.
        const UNDER_POWER   = 1 << 2;
    }
}

impl Default for LimitFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rejection reason for a configuration setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Value outside the accepted range.
    #[error("value out of range")]
    OutOfRange,
    /// The board lacks the required peripheral.
    #[error("not supported by this board")]
    NotSupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_clear_mask_covers_transient_faults() {
        for flag in [
            ErrorFlags::PILOT_FAULT,
            ErrorFlags::DIODE_SHORT,
            ErrorFlags::RCM_TRIGGERED,
            ErrorFlags::RCM_SELFTEST_FAULT,
        ] {
            assert!(flag.has_auto_clear(), "{flag:?} should auto-clear");
        }
        for flag in [
            ErrorFlags::LOCK_FAULT,
            ErrorFlags::UNLOCK_FAULT,
            ErrorFlags::TEMPERATURE_HIGH,
            ErrorFlags::TEMPERATURE_FAULT,
        ] {
            assert!(!flag.has_auto_clear(), "{flag:?} should be sticky");
        }
    }

    #[test]
    fn error_flags_insert_remove() {
        let mut e = ErrorFlags::empty();
        e.insert(ErrorFlags::PILOT_FAULT);
        e.insert(ErrorFlags::LOCK_FAULT);
        assert!(e.contains(ErrorFlags::PILOT_FAULT));

        e.remove(ErrorFlags::AUTO_CLEAR);
        assert_eq!(e, ErrorFlags::LOCK_FAULT);
    }

    #[test]
    fn error_flags_bits_roundtrip() {
        let combo = ErrorFlags::DIODE_SHORT | ErrorFlags::TEMPERATURE_HIGH;
        assert_eq!(ErrorFlags::from_bits(combo.bits()).unwrap(), combo);
        assert_eq!(ErrorFlags::empty().bits(), 0);
    }

    #[test]
    fn limit_flags_independent() {
        let mut l = LimitFlags::empty();
        l.insert(LimitFlags::UNDER_POWER);
        assert!(!l.contains(LimitFlags::CONSUMPTION));
        assert!(!l.is_empty());
        l.remove(LimitFlags::UNDER_POWER);
        assert!(l.is_empty());
    }
}
