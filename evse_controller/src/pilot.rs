//! Pilot sampler: peak detection, band classification, debounce, diode check.
//!
//! The board driver delivers one oversampled buffer per tick; the sampler
//! peak-detects the positive and negative rails, classifies the positive
//! peak against descending thresholds, and debounces band changes so that
//! signal noise at a band boundary cannot flap the state machine.

use evse_common::hal::types::PilotBuffer;

use crate::config::{PilotConfig, ProximityConfig};

/// Classified control-pilot voltage band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotBand {
    /// ≥ 12 V band: no vehicle.
    Volt12,
    /// 9 V band: vehicle connected.
    Volt9,
    /// 6 V band: charge requested.
    Volt6,
    /// 3 V band: charge with ventilation requested.
    Volt3,
    /// Below every valid band.
    Fault,
}

/// One tick's sampler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PilotReading {
    /// Debounced voltage band.
    pub band: PilotBand,
    /// Negative rail reached −12 V during the PWM low half. Always true
    /// while no PWM is generated.
    pub diode_ok: bool,
}

/// Debouncing band classifier.
#[derive(Debug, Clone)]
pub struct PilotSampler {
    thresholds: PilotConfig,
    band: PilotBand,
    candidate: PilotBand,
    candidate_ticks: u8,
}

impl PilotSampler {
    pub fn new(config: &PilotConfig) -> Self {
        Self {
            thresholds: config.clone(),
            band: PilotBand::Volt12,
            candidate: PilotBand::Volt12,
            candidate_ticks: 0,
        }
    }

    /// Currently accepted band.
    #[inline]
    pub const fn band(&self) -> PilotBand {
        self.band
    }

    /// Process one tick's sample buffer.
    ///
    /// `pwm_active` enables the diode check: while PWM is generated the
    /// negative half must reach the −12 V rail through the vehicle diode.
    pub fn sample(&mut self, samples: &PilotBuffer, pwm_active: bool) -> PilotReading {
        let Some((high, low)) = peaks(samples) else {
            return PilotReading {
                band: self.band,
                diode_ok: true,
            };
        };

        let classified = self.classify(high);
        if classified == self.band {
            self.candidate = classified;
            self.candidate_ticks = 0;
        } else if classified == self.candidate {
            self.candidate_ticks = self.candidate_ticks.saturating_add(1);
            if self.candidate_ticks >= self.thresholds.debounce_ticks {
                self.band = classified;
                self.candidate_ticks = 0;
            }
        } else {
            self.candidate = classified;
            self.candidate_ticks = 1;
            if self.candidate_ticks >= self.thresholds.debounce_ticks {
                self.band = classified;
                self.candidate_ticks = 0;
            }
        }

        PilotReading {
            band: self.band,
            diode_ok: !pwm_active || low <= self.thresholds.threshold_diode,
        }
    }

    fn classify(&self, high_mv: i16) -> PilotBand {
        let t = &self.thresholds;
        if high_mv >= t.threshold_12 {
            PilotBand::Volt12
        } else if high_mv >= t.threshold_9 {
            PilotBand::Volt9
        } else if high_mv >= t.threshold_6 {
            PilotBand::Volt6
        } else if high_mv >= t.threshold_3 {
            PilotBand::Volt3
        } else {
            PilotBand::Fault
        }
    }
}

/// Highest and lowest sample of a buffer.
fn peaks(samples: &PilotBuffer) -> Option<(i16, i16)> {
    let mut iter = samples.iter();
    let first = *iter.next()?;
    let mut high = first;
    let mut low = first;
    for &s in iter {
        if s > high {
            high = s;
        }
        if s < low {
            low = s;
        }
    }
    Some((high, low))
}

/// Map a proximity (PP) level to the cable current rating [A].
pub fn cable_rating_from_mv(mv: u16, config: &ProximityConfig) -> u8 {
    if mv >= config.threshold_13 {
        13
    } else if mv >= config.threshold_20 {
        20
    } else if mv >= config.threshold_32 {
        32
    } else {
        63
    }
}
