//! Authorization gate for the B1→B2 transition.
//!
//! A grant issued by `authorize()` stays valid for a window of ticks, so
//! an operator can swipe before plugging in. Once a connected vehicle
//! consumes the grant it holds for the rest of the session; disconnecting
//! always demands a fresh grant.

/// Authorization state tracker.
#[derive(Debug, Clone)]
pub struct AuthGate {
    require_auth: bool,
    authorized: bool,
    /// Remaining validity of a pending grant [ticks], 0 = none.
    grant_ticks: u32,
    grant_window_ticks: u32,
}

impl AuthGate {
    pub const fn new(require_auth: bool, grant_window_ticks: u32) -> Self {
        Self {
            require_auth,
            authorized: false,
            grant_ticks: 0,
            grant_window_ticks,
        }
    }

    #[inline]
    pub const fn is_require_auth(&self) -> bool {
        self.require_auth
    }

    pub fn set_require_auth(&mut self, require_auth: bool) {
        self.require_auth = require_auth;
    }

    /// Charging is authorized for the current session.
    #[inline]
    pub const fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Issue a grant valid for the configured window.
    pub fn authorize(&mut self) {
        self.grant_ticks = self.grant_window_ticks;
    }

    /// Age the pending grant by one tick.
    pub fn tick(&mut self) {
        self.grant_ticks = self.grant_ticks.saturating_sub(1);
    }

    /// Evaluate the gate while the vehicle sits in B1. A pending grant is
    /// consumed whether or not it is still fresh; a stale one does not
    /// authorize.
    pub fn evaluate(&mut self) {
        if self.authorized {
            return;
        }
        if self.require_auth {
            self.authorized = self.grant_ticks > 0;
            self.grant_ticks = 0;
        } else {
            self.authorized = true;
        }
    }

    /// Drop the session authorization (vehicle disconnected).
    pub fn reset(&mut self) {
        self.authorized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_auth_required_authorizes_immediately() {
        let mut gate = AuthGate::new(false, 240);
        gate.evaluate();
        assert!(gate.is_authorized());
    }

    #[test]
    fn pending_until_authorized() {
        let mut gate = AuthGate::new(true, 240);
        gate.evaluate();
        assert!(!gate.is_authorized());

        gate.authorize();
        gate.evaluate();
        assert!(gate.is_authorized());
    }

    #[test]
    fn grant_survives_within_window() {
        let mut gate = AuthGate::new(true, 240);
        gate.authorize();
        for _ in 0..100 {
            gate.tick();
        }
        gate.evaluate();
        assert!(gate.is_authorized());
    }

    #[test]
    fn stale_grant_does_not_authorize() {
        let mut gate = AuthGate::new(true, 240);
        gate.authorize();
        for _ in 0..240 {
            gate.tick();
        }
        gate.evaluate();
        assert!(!gate.is_authorized());
    }

    #[test]
    fn grant_is_consumed_once() {
        let mut gate = AuthGate::new(true, 240);
        gate.authorize();
        gate.evaluate();
        assert!(gate.is_authorized());

        // Disconnect: a new session needs a fresh grant.
        gate.reset();
        gate.evaluate();
        assert!(!gate.is_authorized());
    }

    #[test]
    fn toggling_requirement_keeps_session_grant() {
        let mut gate = AuthGate::new(false, 240);
        gate.evaluate();
        assert!(gate.is_authorized());

        gate.set_require_auth(true);
        // Already-granted session is unaffected.
        gate.evaluate();
        assert!(gate.is_authorized());
    }
}
