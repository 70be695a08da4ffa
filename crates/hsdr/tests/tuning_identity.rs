// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors
//
// The frequency identity freq = first_LO*(1+cal) + second_LO + doppler must
// survive any legal sequence of tuning operations, to floating point error.

#![allow(clippy::float_cmp)]
#![allow(clippy::unreadable_literal)]

use hsdr::radio::state::Demod;
use hsdr::radio::Retune;

fn fresh() -> Demod {
    let mut d = Demod::default();
    d.sdr.first_lo = 100.0e6;
    d.sdr.min_if = -96_000.0;
    d.sdr.max_if = 96_000.0;
    d.input.samprate = 192_000;
    d
}

/// Settle any requested hardware move as an ideal front end would.
fn settle(d: &mut Demod, retune: Retune) {
    if let Retune::FirstLo(lo1) = retune {
        d.on_first_lo_settled(lo1);
    }
}

#[test]
fn test_identity_over_random_tuning_sequence() {
    let mut d = fresh();
    let mut rng = fastrand::Rng::with_seed(0x1dea);
    for step in 0..500 {
        match rng.u32(0..4) {
            0 => {
                // Random absolute frequency, 100 kHz .. 2 GHz
                let f = 1.0e5 + f64::from(rng.f32()) * 2.0e9;
                let r = d.set_freq(f, None);
                settle(&mut d, r);
            }
            1 => {
                // Small step around the current frequency
                let f = d.tune.freq + f64::from(rng.i32(-50_000..50_000));
                let r = d.set_freq(f.max(1.0e5), None);
                settle(&mut d, r);
            }
            2 => {
                // Explicit second LO preference
                let lo2 = f64::from(rng.i32(-90_000..90_000));
                let f = d.tune.freq;
                let r = d.set_freq(f, Some(lo2));
                settle(&mut d, r);
            }
            _ => {
                // Calibration jitter, +/-20 ppm
                let cal = f64::from(rng.i32(-20..20)) * 1.0e-6;
                let r = d.set_cal(cal);
                settle(&mut d, r);
            }
        }
        let err = (d.derived_freq() - d.tune.freq).abs();
        assert!(
            err <= 1e-6,
            "step {step}: identity error {err} Hz (freq {})",
            d.tune.freq
        );
        assert!(
            d.lo2_in_range(d.tune.second_lo),
            "step {step}: second LO {} out of band",
            d.tune.second_lo
        );
    }
}

#[test]
fn test_identity_with_doppler_sweep() {
    let mut d = fresh();
    let r = d.set_doppler(2_400.0, -12.0);
    settle(&mut d, r);
    let r = d.set_freq(437.5e6, None);
    settle(&mut d, r);
    assert!((d.derived_freq() - 437.5e6).abs() <= 1e-6);

    // Doppler flips sign mid-pass; the second LO rebalances and the
    // user-visible frequency stays put
    let r = d.set_doppler(-2_400.0, -12.0);
    settle(&mut d, r);
    assert!((d.derived_freq() - 437.5e6).abs() <= 1e-6);
}
