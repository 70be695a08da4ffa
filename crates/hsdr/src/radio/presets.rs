// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Mode preset table.
//!
//! A flat text file maps short mode names to a demodulator kind and a
//! bundle of defaults. One mode per line, whitespace-separated, `#` starts
//! a comment:
//!
//! ```text
//! # name demod  low   high  shift attack recovery hang options...
//! usb    Linear 100   3000  0     -50    +6       1.1
//! cwu    Linear 300   700   500   -50    +20      0.2  mono
//! am     AM     -5000 5000  0     -50    +6       1.1
//! fm     FM     -8000 8000  0     -50    +6       1.1  square
//! isb    Linear -3000 3000  0     -50    +6       1.1  isb
//! ```
//!
//! Attack/recovery are dB/s (sign conventional, magnitude used), hang time
//! is seconds. `preset_mode` converts to per-sample ratios against the
//! output sample rate when it applies a preset to the state record.

use std::fs;
use std::path::Path;

use super::state::{Demod, DemodKind};
use crate::error::{RadioError, Result};

/// One line of the preset table.
#[derive(Debug, Clone)]
pub struct Mode {
    pub name: String,
    pub kind: DemodKind,
    pub low: f32,
    pub high: f32,
    pub shift: f64,
    /// dB/s, stored positive.
    pub attack_rate: f32,
    /// dB/s, stored positive.
    pub recovery_rate: f32,
    /// Seconds.
    pub hangtime: f32,
    pub isb: bool,
    pub flat: bool,
    pub square: bool,
    pub pll: bool,
    pub channels: u8,
}

/// The loaded preset table.
#[derive(Debug, Clone, Default)]
pub struct ModeTable {
    modes: Vec<Mode>,
}

impl ModeTable {
    /// Load the table from a preset file.
    pub fn load(path: &Path) -> Result<ModeTable> {
        let text = fs::read_to_string(path)
            .map_err(|e| RadioError::PresetFile(format!("{}: {e}", path.display())))?;
        let mut modes = Vec::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(i) => &raw[..i],
                None => raw,
            };
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else { continue };
            let Some(demod_name) = fields.next() else {
                continue;
            };
            let Some(kind) = DemodKind::from_name(demod_name) else {
                log::warn!(
                    "[MODES] line {}: unknown demodulator {:?}, skipped",
                    lineno + 1,
                    demod_name
                );
                continue;
            };

            let mut next_f64 = || fields.next().and_then(|s| s.parse::<f64>().ok());
            let (Some(low), Some(high), Some(shift), Some(attack), Some(recovery), Some(hang)) = (
                next_f64(),
                next_f64(),
                next_f64(),
                next_f64(),
                next_f64(),
                next_f64(),
            ) else {
                log::warn!("[MODES] line {}: short or unparsable line, skipped", lineno + 1);
                continue;
            };

            // low > high is a convenience in the file; normalize by swap
            let (low, high) = if low > high { (high, low) } else { (low, high) };

            let mut mode = Mode {
                name: name.to_string(),
                kind,
                low: low as f32,
                high: high as f32,
                shift,
                attack_rate: attack.abs() as f32,
                recovery_rate: recovery.abs() as f32,
                hangtime: hang.abs() as f32,
                isb: false,
                flat: false,
                square: false,
                pll: false,
                channels: 2,
            };
            for option in fields {
                match option.to_ascii_lowercase().as_str() {
                    "isb" | "conj" => mode.isb = true,
                    "flat" => mode.flat = true,
                    "square" => {
                        // Square implies PLL
                        mode.square = true;
                        mode.pll = true;
                    }
                    "coherent" | "pll" => mode.pll = true,
                    "mono" => mode.channels = 1,
                    other => {
                        log::warn!("[MODES] line {}: unknown option {:?}", lineno + 1, other);
                    }
                }
            }
            modes.push(mode);
        }
        log::info!("[MODES] loaded {} modes from {}", modes.len(), path.display());
        Ok(ModeTable { modes })
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Mode> {
        self.modes.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Copy a preset bundle into the state record and flag the demodulator
    /// change. Returns the unknown-mode error if `name` is not in the table.
    pub fn preset_mode(&self, ds: &mut Demod, name: &str) -> Result<()> {
        let mode = self
            .get(name)
            .ok_or_else(|| RadioError::UnknownMode(name.to_string()))?;
        ds.filter.low = mode.low;
        ds.filter.high = mode.high;
        ds.filter.isb = mode.isb;
        ds.tune.shift = mode.shift;
        ds.opt.flat = mode.flat;
        ds.opt.pll = mode.pll;
        ds.opt.square = mode.square;
        ds.opt.agc = true;
        ds.output.channels = mode.channels;
        let rate = f64::from(ds.output.samprate.max(1));
        ds.agc.attack_rate = db_per_sec_to_ratio(-f64::from(mode.attack_rate), rate);
        ds.agc.recovery_rate = db_per_sec_to_ratio(f64::from(mode.recovery_rate), rate);
        ds.agc.hangtime = mode.hangtime * ds.output.samprate as f32;
        ds.demod_type = mode.kind;
        Ok(())
    }
}

/// dB/s to amplitude ratio per output sample. Negative dB/s gives a ratio
/// below one (attack), positive above one (recovery).
pub fn db_per_sec_to_ratio(db_per_sec: f64, samprate: f64) -> f32 {
    10f64.powf(db_per_sec / 20.0 / samprate) as f32
}

/// Inverse of [`db_per_sec_to_ratio`], for status emission.
pub fn ratio_to_db_per_sec(ratio: f32, samprate: f64) -> f32 {
    (20.0 * f64::from(ratio).log10() * samprate) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(contents: &str) -> ModeTable {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        ModeTable::load(f.path()).unwrap()
    }

    const SAMPLE: &str = "\
# test modes
usb  Linear  100   3000  0    -50 +6  1.1
lsb  Linear -3000  -100  0    -50 +6  1.1
cwu  Linear  300    700  500  -50 +20 0.2 mono
am   AM     -5000  5000  0    -50 +6  1.1
fm   FM      8000 -8000  0    -50 +6  1.1 flat
dsb  Linear -3000  3000  0    -50 +6  1.1 square
isb  Linear -3000  3000  0    -50 +6  1.1 conj
";

    #[test]
    fn test_load_and_lookup() {
        let t = table(SAMPLE);
        assert_eq!(t.len(), 7);
        assert!(t.get("USB").is_some(), "lookup is case-insensitive");
        assert!(t.get("nosuch").is_none());
    }

    #[test]
    fn test_swapped_edges_normalized() {
        let t = table(SAMPLE);
        let fm = t.get("fm").unwrap();
        assert_eq!(fm.low, -8000.0);
        assert_eq!(fm.high, 8000.0);
        assert!(fm.flat);
    }

    #[test]
    fn test_square_implies_pll() {
        let t = table(SAMPLE);
        let dsb = t.get("dsb").unwrap();
        assert!(dsb.square);
        assert!(dsb.pll);
        let usb = t.get("usb").unwrap();
        assert!(!usb.pll);
    }

    #[test]
    fn test_conj_is_isb_alias_and_mono_channels() {
        let t = table(SAMPLE);
        assert!(t.get("isb").unwrap().isb);
        assert_eq!(t.get("cwu").unwrap().channels, 1);
        assert_eq!(t.get("usb").unwrap().channels, 2);
    }

    #[test]
    fn test_preset_mode_converts_agc_units() {
        let t = table(SAMPLE);
        let mut ds = Demod::default();
        ds.output.samprate = 24_000;
        t.preset_mode(&mut ds, "usb").unwrap();
        assert_eq!(ds.demod_type, DemodKind::Linear);
        assert!(ds.agc.attack_rate < 1.0, "attack is a decay ratio");
        assert!(ds.agc.recovery_rate > 1.0, "recovery is a growth ratio");
        assert_eq!(ds.agc.hangtime, 1.1 * 24_000.0);
        // -50 dB/s at 24 kHz: ratio^samprate == -50 dB over one second
        let db_back = ratio_to_db_per_sec(ds.agc.attack_rate, 24_000.0);
        assert!((db_back + 50.0).abs() < 0.5, "round trip {db_back}");
    }

    #[test]
    fn test_unknown_mode_is_error() {
        let t = table(SAMPLE);
        let mut ds = Demod::default();
        assert!(matches!(
            t.preset_mode(&mut ds, "wspr"),
            Err(RadioError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let t = table("# nothing\n\n   \nam AM -5000 5000 0 -50 6 1.1\n");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(matches!(
            ModeTable::load(Path::new("/nonexistent/modes.txt")),
            Err(RadioError::PresetFile(_))
        ));
    }
}
