//! IEC 61851-1 controller states.
//!
//! A = no vehicle, B = connected, C = charging, D = charging with
//! ventilation, E = fault, F = unavailable. The x1/x2 split separates
//! "requested but not granted" from "granted" (PWM advertised / relay
//! closed).

/// Connection/charging state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum EvseState {
    /// No vehicle connected, pilot at steady +12 V.
    #[default]
    A,
    /// Vehicle connected, charging gate not yet satisfied.
    B1,
    /// Vehicle connected, PWM advertised, ready to charge.
    B2,
    /// Charge requested but not allowed, relay opening after grace.
    C1,
    /// Charging, relay closed.
    C2,
    /// Charge with ventilation requested but not allowed.
    D1,
    /// Charging with ventilation, relay closed.
    D2,
    /// Fault, terminal until the fault mask clears.
    E,
    /// Disabled by operator, terminal until re-enabled.
    F,
}

impl EvseState {
    /// A vehicle is connected (B1..=D2).
    #[inline]
    pub const fn is_session(self) -> bool {
        matches!(
            self,
            Self::B1 | Self::B2 | Self::C1 | Self::C2 | Self::D1 | Self::D2
        )
    }

    /// Current is flowing (relay closed).
    #[inline]
    pub const fn is_charging(self) -> bool {
        matches!(self, Self::C2 | Self::D2)
    }

    /// Short string form for protocol adapters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::D1 => "D1",
            Self::D2 => "D2",
            Self::E => "E",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for EvseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_states() {
        assert!(!EvseState::A.is_session());
        assert!(EvseState::B1.is_session());
        assert!(EvseState::B2.is_session());
        assert!(EvseState::C1.is_session());
        assert!(EvseState::C2.is_session());
        assert!(EvseState::D1.is_session());
        assert!(EvseState::D2.is_session());
        assert!(!EvseState::E.is_session());
        assert!(!EvseState::F.is_session());
    }

    #[test]
    fn charging_states() {
        for state in [
            EvseState::A,
            EvseState::B1,
            EvseState::B2,
            EvseState::C1,
            EvseState::D1,
            EvseState::E,
            EvseState::F,
        ] {
            assert!(!state.is_charging(), "{state} should not be charging");
        }
        assert!(EvseState::C2.is_charging());
        assert!(EvseState::D2.is_charging());
    }

    #[test]
    fn default_is_a() {
        assert_eq!(EvseState::default(), EvseState::A);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(EvseState::B2.to_string(), "B2");
        assert_eq!(format!("{}", EvseState::E), "E");
    }
}
