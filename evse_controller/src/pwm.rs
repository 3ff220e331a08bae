//! IEC 61851-1 duty-cycle computation.
//!
//! Two-segment piecewise-linear mapping from advertised current to PWM
//! duty: up to 51 A the duty is current/0.6, above it current/2.5 + 64 %.
//! Duty values are in 0.1 % units on a 1 kHz carrier.

use evse_common::consts::{CHARGING_CURRENT_MAX, CHARGING_CURRENT_MIN, DUTY_LINEAR_MAX};

/// Duty [0.1 %] advertising the given current [0.1 A], or `None` when the
/// current cannot be encoded.
pub fn duty_for_current(current: u16) -> Option<u16> {
    if !(CHARGING_CURRENT_MIN..=CHARGING_CURRENT_MAX).contains(&current) {
        return None;
    }
    if current <= DUTY_LINEAR_MAX {
        // duty% = A / 0.6
        Some((current as u32 * 10 / 6) as u16)
    } else {
        // duty% = A / 2.5 + 64
        Some((current as u32 * 2 / 5 + 640) as u16)
    }
}

/// Effective advertised current [0.1 A]: the requested current clamped by
/// the configured maximum [A] and the cable rating [A].
#[inline]
pub fn effective_current(requested: u16, max_charging_current: u8, cable_rating: u8) -> u16 {
    requested
        .min(max_charging_current as u16 * 10)
        .min(cable_rating as u16 * 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_segment() {
        assert_eq!(duty_for_current(60), Some(100)); // 6 A → 10 %
        assert_eq!(duty_for_current(160), Some(266)); // 16 A → 26.6 %
        assert_eq!(duty_for_current(320), Some(533)); // 32 A → 53.3 %
        assert_eq!(duty_for_current(510), Some(850)); // 51 A → 85 %
    }

    #[test]
    fn high_current_segment() {
        assert_eq!(duty_for_current(630), Some(892)); // 63 A → 89.2 %
        assert_eq!(duty_for_current(800), Some(960)); // 80 A → 96 %
    }

    #[test]
    fn out_of_range_rejected() {
        assert_eq!(duty_for_current(0), None);
        assert_eq!(duty_for_current(59), None);
        assert_eq!(duty_for_current(801), None);
    }

    #[test]
    fn effective_current_is_min_of_all() {
        assert_eq!(effective_current(320, 32, 63), 320);
        assert_eq!(effective_current(320, 16, 63), 160);
        assert_eq!(effective_current(320, 32, 20), 200);
        assert_eq!(effective_current(100, 32, 13), 100);
    }
}
