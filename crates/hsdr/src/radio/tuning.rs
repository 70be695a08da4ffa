// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Tuning arithmetic.
//!
//! The user-visible carrier frequency is always the algebraic sum of the
//! oscillators:
//!
//! ```text
//! freq = first_LO * (1 + calibration) + second_LO + doppler
//! ```
//!
//! (the post-detection shift moves audio, not the carrier). The control
//! layer preserves this identity by choosing which term to move when the
//! user adjusts another: a direct frequency command moves the second LO
//! when it can, and requests a hardware retune only when the target falls
//! outside the aliasing-safe IF band. The hardware answer arrives later on
//! the metadata channel, at which point the second LO is recomputed to
//! land exactly on the requested carrier.

use super::state::Demod;

/// Outcome of a tuning operation: whether the hardware LO must move, and
/// to what frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Retune {
    /// Fully handled in software.
    Done,
    /// Caller must command the front end to this first-LO frequency.
    FirstLo(f64),
}

impl Demod {
    /// Effective first LO, corrected for TCXO calibration.
    pub fn first_lo(&self) -> f64 {
        self.sdr.first_lo * (1.0 + self.sdr.calibration)
    }

    /// The frequency identity evaluated from the oscillator terms.
    pub fn derived_freq(&self) -> f64 {
        self.first_lo() + self.tune.second_lo + self.tune.doppler
    }

    /// Is `lo2` inside the aliasing-safe IF band?
    ///
    /// Until the front end has reported a usable band the limits are
    /// degenerate (min == max); any second LO is accepted then, since
    /// rejecting a tune on unknown hardware limits would be worse.
    pub fn lo2_in_range(&self, lo2: f64) -> bool {
        if self.sdr.max_if <= self.sdr.min_if {
            return true;
        }
        lo2 >= f64::from(self.sdr.min_if) && lo2 <= f64::from(self.sdr.max_if)
    }

    /// Tune the user-visible carrier to `freq`.
    ///
    /// An admissible explicit `lo2` pins the IF placement, so the hardware
    /// LO must land on `(freq - lo2)` — unless it is already there, which
    /// is the tune-around-with-fixed-LO1 case. Without a usable `lo2` the
    /// second LO is derived from the current first LO when that falls in
    /// the IF band; otherwise the hardware moves and the signal is parked
    /// mid-band until the front end reports the settled frequency (see
    /// [`Demod::on_first_lo_settled`]).
    pub fn set_freq(&mut self, freq: f64, lo2: Option<f64>) -> Retune {
        self.tune.freq = freq;
        if let Some(lo2) = lo2 {
            if self.lo2_in_range(lo2) {
                self.tune.second_lo = lo2;
                let lo1 = (freq - lo2 - self.tune.doppler) / (1.0 + self.sdr.calibration);
                if (lo1 - self.sdr.first_lo).abs() < 1e-3 || self.tune.lock {
                    return Retune::Done;
                }
                return Retune::FirstLo(lo1);
            }
        }
        let wanted = freq - self.first_lo() - self.tune.doppler;
        if self.lo2_in_range(wanted) {
            self.tune.second_lo = wanted;
            return Retune::Done;
        }
        // Out of the IF band: park the signal mid-band and move the hardware.
        let preferred = f64::from(self.sdr.min_if + self.sdr.max_if) / 2.0;
        let lo1 = (freq - preferred - self.tune.doppler) / (1.0 + self.sdr.calibration);
        // Interim second LO, clamped so the channel keeps producing audio
        // while the tuner settles.
        self.tune.second_lo = wanted
            .max(f64::from(self.sdr.min_if))
            .min(f64::from(self.sdr.max_if));
        if self.tune.lock {
            // Tuner pinned: best effort with the clamped second LO.
            return Retune::Done;
        }
        Retune::FirstLo(lo1)
    }

    /// The front end reported a (possibly new) first LO. Recompute the
    /// second LO so the user-visible carrier stays put. Returns true when
    /// anything changed.
    pub fn on_first_lo_settled(&mut self, reported_lo1: f64) -> bool {
        if self.sdr.first_lo == reported_lo1 {
            return false;
        }
        self.sdr.first_lo = reported_lo1;
        let lo2 = self.tune.freq - self.first_lo() - self.tune.doppler;
        if self.lo2_in_range(lo2) {
            self.tune.second_lo = lo2;
        }
        true
    }

    /// Set the TCXO calibration and rebalance the oscillators so the
    /// user-visible frequency stays put (a large correction at a high
    /// carrier can push the second LO out of band, hence the retune path).
    pub fn set_cal(&mut self, cal: f64) -> Retune {
        self.sdr.calibration = cal;
        self.set_freq(self.tune.freq, None)
    }

    /// Set the doppler correction terms and rebalance the second LO.
    pub fn set_doppler(&mut self, freq: f64, rate: f64) -> Retune {
        self.tune.doppler = freq;
        self.tune.doppler_rate = rate;
        self.set_freq(self.tune.freq, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::state::Demod;

    fn demod() -> Demod {
        let mut d = Demod::default();
        d.sdr.first_lo = 14_300_000.0;
        d.sdr.min_if = -96_000.0;
        d.sdr.max_if = 96_000.0;
        d.input.samprate = 192_000;
        d
    }

    #[test]
    fn test_set_freq_in_band_moves_lo2_only() {
        let mut d = demod();
        let r = d.set_freq(14_250_000.0, None);
        assert_eq!(r, Retune::Done);
        assert_eq!(d.tune.second_lo, -50_000.0);
        assert!((d.derived_freq() - 14_250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_freq_honors_admissible_lo2() {
        let mut d = demod();
        // Explicit LO2 pins the IF; the hardware is asked to make up the
        // difference, and the identity holds once it settles.
        match d.set_freq(14_250_000.0, Some(-48_000.0)) {
            Retune::FirstLo(lo1) => {
                assert_eq!(d.tune.second_lo, -48_000.0);
                assert!((lo1 - 14_298_000.0).abs() < 1e-6);
                d.on_first_lo_settled(lo1);
                assert!((d.derived_freq() - 14_250_000.0).abs() < 1e-6);
            }
            Retune::Done => panic!("explicit LO2 off the current LO1 must retune"),
        }
    }

    #[test]
    fn test_set_freq_out_of_band_requests_retune() {
        let mut d = demod();
        match d.set_freq(7_100_000.0, None) {
            Retune::FirstLo(lo1) => {
                assert!((lo1 - 7_100_000.0).abs() < 96_000.0 + 1.0);
            }
            Retune::Done => panic!("expected a hardware retune"),
        }
        // Interim LO2 stays inside the admissible band
        assert!(d.lo2_in_range(d.tune.second_lo));
    }

    #[test]
    fn test_identity_after_lo1_settles() {
        let mut d = demod();
        let lo1 = match d.set_freq(7_100_000.0, None) {
            Retune::FirstLo(f) => f,
            Retune::Done => panic!("expected retune"),
        };
        assert!(d.on_first_lo_settled(lo1));
        assert!(
            (d.derived_freq() - 7_100_000.0).abs() < 1e-6,
            "identity violated: derived {} wanted 7.1e6",
            d.derived_freq()
        );
    }

    #[test]
    fn test_identity_with_calibration() {
        let mut d = demod();
        d.set_cal(10e-6);
        let r = d.set_freq(14_250_000.0, None);
        assert_eq!(r, Retune::Done);
        assert!((d.derived_freq() - 14_250_000.0).abs() < 1e-6);
        // freq = lo1*(1+cal) + lo2 exactly
        let lhs = d.tune.freq;
        let rhs = d.sdr.first_lo * (1.0 + d.sdr.calibration) + d.tune.second_lo;
        assert!((lhs - rhs).abs() < 1e-6);
    }

    #[test]
    fn test_locked_tuner_never_requests_retune() {
        let mut d = demod();
        d.tune.lock = true;
        assert_eq!(d.set_freq(7_100_000.0, None), Retune::Done);
        assert!(d.lo2_in_range(d.tune.second_lo));
    }

    #[test]
    fn test_doppler_enters_identity() {
        let mut d = demod();
        d.set_doppler(1_500.0, -3.0);
        let r = d.set_freq(14_250_000.0, None);
        assert_eq!(r, Retune::Done);
        assert!((d.derived_freq() - 14_250_000.0).abs() < 1e-6);
    }
}
