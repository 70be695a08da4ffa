// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Status service: the one thread that speaks the TLV protocol.
//!
//! Each cycle waits (poll, ~120 ms) on two sockets: the front end's
//! metadata group and our own control group. Front-end status updates the
//! SDR side of the state record and may retune the second LO to keep the
//! user-visible frequency fixed; commands update the command side, with the
//! tuning logic deciding which oscillator moves. Every cycle ends with a
//! status emission — full on boot, every tenth cycle and right after any
//! command, delta otherwise.
//!
//! This thread is the sole writer of the SDR- and command-side fields; the
//! demodulator only reads them (and writes the measurements this thread
//! only reads). Hardware retunes leave here as TLV commands on the front
//! end's control group.

use mio::net::UdpSocket as MioUdpSocket;
use mio::{Events, Interest, Poll, Token};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{FULL_STATUS_INTERVAL, STATUS_BUFSIZE, STATUS_POLL_MS};
use crate::error::Result;
use crate::protocol::{split_packet, Decoder, Encoder, PacketType, StatusCache, StatusTag};
use crate::radio::state::{Demod, DemodKind, RadioState};
use crate::radio::tuning::Retune;

const SDR_TOKEN: Token = Token(0);
const CTL_TOKEN: Token = Token(1);

fn power_db(x: f32) -> f32 {
    10.0 * x.log10()
}

fn voltage_db(x: f32) -> f32 {
    20.0 * x.log10()
}

/// Build one full status packet from the state record.
pub fn build_status(ds: &Demod) -> Vec<u8> {
    let mut e = Encoder::new(PacketType::Response);
    e.int(StatusTag::CommandTag, ds.output.command_tag)
        .int(StatusTag::Commands, ds.output.commands);
    if !ds.input.description.is_empty() {
        e.string(StatusTag::Description, &ds.input.description);
    }
    e.int(StatusTag::GpsTime, ds.sdr.gps_time);

    // Socket identities
    if let Some(s) = ds.input.data_source {
        e.socket(StatusTag::InputDataSourceSocket, &s);
    }
    if let Some(s) = ds.input.data_dest {
        e.socket(StatusTag::InputDataDestSocket, &s);
    }
    if let Some(s) = ds.input.metadata_source {
        e.socket(StatusTag::InputMetadataSourceSocket, &s);
    }
    if let Some(s) = ds.input.metadata_dest {
        e.socket(StatusTag::InputMetadataDestSocket, &s);
    }
    e.int(StatusTag::InputSsrc, u64::from(ds.input.rtp.ssrc))
        .int(StatusTag::InputSamprate, u64::from(ds.input.samprate))
        .int(StatusTag::InputMetadataPackets, ds.input.metadata_packets)
        .int(StatusTag::InputDataPackets, ds.input.rtp.packets)
        .int(StatusTag::InputSamples, ds.input.samples)
        .int(StatusTag::InputDrops, ds.input.rtp.drops)
        .int(StatusTag::InputDupes, ds.input.rtp.dupes);

    if let Some(s) = ds.output.data_source {
        e.socket(StatusTag::OutputDataSourceSocket, &s);
    }
    if let Some(s) = ds.output.data_dest {
        e.socket(StatusTag::OutputDataDestSocket, &s);
    }
    e.int(StatusTag::OutputSsrc, u64::from(ds.output.ssrc))
        .int(StatusTag::OutputTtl, u64::from(ds.output.ttl))
        .int(StatusTag::OutputSamprate, u64::from(ds.output.samprate))
        .int(StatusTag::OutputDataPackets, ds.output.rtp_packets)
        .int(StatusTag::OutputMetadataPackets, ds.output.metadata_packets);

    // Tuning
    e.double(StatusTag::RadioFrequency, ds.tune.freq)
        .double(StatusTag::SecondLoFrequency, ds.tune.second_lo)
        .double(StatusTag::ShiftFrequency, ds.tune.shift)
        .double(StatusTag::FirstLoFrequency, ds.sdr.first_lo)
        .double(StatusTag::DopplerFrequency, ds.tune.doppler)
        .double(StatusTag::DopplerFrequencyRate, ds.tune.doppler_rate)
        .double(StatusTag::Calibrate, ds.sdr.calibration);

    // Filtering
    e.float(StatusTag::LowEdge, ds.filter.low)
        .float(StatusTag::HighEdge, ds.filter.high)
        .float(StatusTag::KaiserBeta, ds.filter.kaiser_beta)
        .int(StatusTag::FilterBlocksize, ds.filter.l as u64)
        .int(StatusTag::FilterFirLength, ds.filter.m as u64);
    if ds.filter.noise_bandwidth > 0.0 {
        e.float(StatusTag::NoiseBandwidth, ds.filter.noise_bandwidth);
    }

    // Signals; these move every block
    e.float(StatusTag::IfPower, power_db(ds.sig.if_power))
        .float(StatusTag::BasebandPower, power_db(ds.sig.bb_power))
        .float(StatusTag::NoiseDensity, power_db(ds.sig.n0));

    e.int(StatusTag::DemodType, ds.demod_type as u64)
        .int(StatusTag::OutputChannels, u64::from(ds.output.channels));
    match ds.demod_type {
        DemodKind::Fm => {
            e.int(StatusTag::FmFlat, u64::from(ds.opt.flat))
                .float(StatusTag::DemodSnr, power_db(ds.sig.snr))
                .float(StatusTag::FreqOffset, ds.sig.foffset)
                .float(StatusTag::PeakDeviation, ds.sig.pdeviation);
        }
        DemodKind::Linear => {
            e.int(StatusTag::IndependentSideband, u64::from(ds.filter.isb))
                .int(StatusTag::PllEnable, u64::from(ds.opt.pll));
            if ds.opt.pll {
                e.int(StatusTag::PllLock, u64::from(ds.sig.pll_lock))
                    .int(StatusTag::PllSquare, u64::from(ds.opt.square))
                    .float(StatusTag::PllPhase, ds.sig.cphase)
                    .int(StatusTag::Envelope, u64::from(ds.opt.env))
                    .float(StatusTag::DemodSnr, power_db(ds.sig.snr))
                    .float(StatusTag::FreqOffset, ds.sig.foffset);
            }
            let rate = f64::from(ds.output.samprate.max(1));
            e.float(StatusTag::Gain, voltage_db(ds.agc.gain))
                .int(StatusTag::AgcEnable, u64::from(ds.opt.agc))
                .float(StatusTag::Headroom, voltage_db(ds.agc.headroom))
                .float(StatusTag::AgcHangtime, ds.agc.hangtime / rate as f32)
                .float(
                    StatusTag::AgcRecoveryRate,
                    crate::radio::presets::ratio_to_db_per_sec(ds.agc.recovery_rate, rate),
                )
                .float(
                    StatusTag::AgcAttackRate,
                    crate::radio::presets::ratio_to_db_per_sec(ds.agc.attack_rate, rate),
                );
        }
        DemodKind::Am => {}
    }
    e.float(StatusTag::OutputLevel, power_db(ds.output.level))
        .int(StatusTag::OutputSamples, ds.output.samples);
    e.finish()
}

/// Side effects of a command packet that must leave the state record.
#[derive(Debug, Default)]
pub struct CommandEffects {
    /// The front end must be asked to move its LO to this frequency.
    pub lo1_request: Option<f64>,
    /// The demodulator kind changed; wake the demod thread.
    pub demod_changed: bool,
}

/// Apply one command packet body (without the direction byte) to the state
/// record. This is the whole control surface: tuning, filter, options, AGC.
pub fn apply_commands(ds: &mut Demod, body: &[u8]) -> CommandEffects {
    let mut fx = CommandEffects::default();
    let mut nrf: Option<f64> = None;
    let mut nlo1: Option<f64> = None;
    let mut nlo2: Option<f64> = None;
    let mut new_low = ds.filter.low;
    let mut new_high = ds.filter.high;
    let mut fset = false;
    let mut doppler: Option<f64> = None;
    let mut doppler_rate: Option<f64> = None;
    let out_rate = f64::from(ds.output.samprate.max(1));

    for item in Decoder::new(body) {
        let Some(tag) = item.tag else { continue };
        match tag {
            StatusTag::DemodType => {
                if let Some(kind) = DemodKind::from_u8(item.as_int() as u8) {
                    if kind != ds.demod_type {
                        ds.demod_type = kind;
                        fx.demod_changed = true;
                    }
                }
            }
            StatusTag::RadioFrequency => {
                let f = item.as_double();
                if !f.is_nan() {
                    nrf = Some(f);
                }
            }
            StatusTag::FirstLoFrequency => {
                let f = item.as_double();
                if !f.is_nan() {
                    nlo1 = Some(f);
                }
            }
            StatusTag::SecondLoFrequency => {
                let f = item.as_double();
                if !f.is_nan() {
                    nlo2 = Some(f);
                }
            }
            StatusTag::ShiftFrequency => {
                let f = item.as_double();
                if !f.is_nan() {
                    ds.tune.shift = f;
                }
            }
            StatusTag::DopplerFrequency => {
                let f = item.as_double();
                if !f.is_nan() {
                    doppler = Some(f);
                }
            }
            StatusTag::DopplerFrequencyRate => {
                let f = item.as_double();
                if !f.is_nan() {
                    doppler_rate = Some(f);
                }
            }
            StatusTag::LowEdge => {
                let f = item.as_float();
                if !f.is_nan() {
                    new_low = f;
                    fset = true;
                }
            }
            StatusTag::HighEdge => {
                let f = item.as_float();
                if !f.is_nan() {
                    new_high = f;
                    fset = true;
                }
            }
            StatusTag::KaiserBeta => {
                let f = item.as_float();
                if !f.is_nan() {
                    ds.filter.kaiser_beta = f.max(0.0);
                    fset = true;
                }
            }
            StatusTag::IndependentSideband => ds.filter.isb = item.as_int() != 0,
            StatusTag::PllEnable => ds.opt.pll = item.as_int() != 0,
            StatusTag::PllSquare => {
                ds.opt.square = item.as_int() != 0;
                if ds.opt.square {
                    ds.opt.pll = true;
                }
            }
            StatusTag::FmFlat => ds.opt.flat = item.as_int() != 0,
            StatusTag::AgcEnable => ds.opt.agc = item.as_int() != 0,
            StatusTag::Envelope => ds.opt.env = item.as_int() != 0,
            StatusTag::OutputChannels => {
                let c = item.as_int();
                if c == 1 || c == 2 {
                    ds.output.channels = c as u8;
                }
            }
            StatusTag::CommandTag => ds.output.command_tag = item.as_int(),
            StatusTag::Calibrate => {
                let f = item.as_double();
                if !f.is_nan() {
                    if let Retune::FirstLo(lo1) = ds.set_cal(f) {
                        fx.lo1_request = Some(lo1);
                    }
                }
            }
            StatusTag::Gain => {
                // dB -> amplitude ratio
                let f = item.as_float();
                if !f.is_nan() {
                    ds.agc.gain = 10f32.powf(f / 20.0);
                }
            }
            StatusTag::Headroom => {
                // dB -> amplitude ratio below one
                let f = item.as_float();
                if !f.is_nan() {
                    ds.agc.headroom = 10f32.powf(-f.abs() / 20.0);
                }
            }
            StatusTag::AgcHangtime => {
                // seconds -> output samples
                let f = item.as_float();
                if !f.is_nan() {
                    ds.agc.hangtime = f.abs() * out_rate as f32;
                }
            }
            StatusTag::AgcRecoveryRate => {
                // dB/s -> ratio/sample above one
                let f = item.as_float();
                if !f.is_nan() {
                    ds.agc.recovery_rate =
                        crate::radio::presets::db_per_sec_to_ratio(f64::from(f.abs()), out_rate);
                }
            }
            StatusTag::AgcAttackRate => {
                // dB/s -> ratio/sample below one
                let f = item.as_float();
                if !f.is_nan() {
                    ds.agc.attack_rate =
                        crate::radio::presets::db_per_sec_to_ratio(-f64::from(f.abs()), out_rate);
                }
            }
            _ => {}
        }
    }

    if fset && new_high >= new_low {
        ds.filter.low = new_low;
        ds.filter.high = new_high;
    }
    if doppler.is_some() || doppler_rate.is_some() {
        let f = doppler.unwrap_or(ds.tune.doppler);
        let r = doppler_rate.unwrap_or(ds.tune.doppler_rate);
        if let Retune::FirstLo(lo1) = ds.set_doppler(f, r) {
            fx.lo1_request = Some(lo1);
        }
    }

    // Tuning: a direct frequency always wins; an admissible second LO tunes
    // around a fixed first LO; a first-LO request goes to the hardware and
    // the second LO is recomputed when it settles.
    if let Some(f) = nrf {
        if let Retune::FirstLo(lo1) = ds.set_freq(f, nlo2) {
            fx.lo1_request = Some(lo1);
        }
    } else if let Some(lo2) = nlo2 {
        if ds.lo2_in_range(lo2) {
            // Hold LO1: moving the second LO by delta moves the carrier by
            // the same delta under freq = LO1 + LO2
            let f = ds.tune.freq + (lo2 - ds.tune.second_lo);
            if let Retune::FirstLo(lo1) = ds.set_freq(f, Some(lo2)) {
                fx.lo1_request = Some(lo1);
            }
        }
    } else if let Some(lo1) = nlo1 {
        if !ds.tune.lock {
            fx.lo1_request = Some(lo1);
        }
    }
    fx
}

/// Apply one front-end status packet body. Returns true when the first LO
/// moved (the sdr-status condition should be broadcast either way; the
/// flag is for logging).
pub fn apply_sdr_status(ds: &mut Demod, body: &[u8]) -> bool {
    let mut nfreq: Option<f64> = None;
    for item in Decoder::new(body) {
        let Some(tag) = item.tag else { continue };
        match tag {
            StatusTag::Description => ds.input.description = item.as_string(),
            StatusTag::OutputDataDestSocket => {
                // Where the front end sends I/Q: our data input group
                ds.input.data_dest = item.as_socket();
            }
            StatusTag::RadioFrequency => {
                let f = item.as_double();
                if !f.is_nan() {
                    nfreq = Some(f);
                }
            }
            StatusTag::OutputSamprate => {
                let rate = item.as_int() as u32;
                if rate != 0 && rate != ds.input.samprate {
                    ds.input.samprate = rate;
                    // Until told otherwise, the usable IF is the whole
                    // aliasing-safe band
                    ds.sdr.min_if = -(rate as f32) / 2.0;
                    ds.sdr.max_if = rate as f32 / 2.0;
                    if ds.output.samprate != 0 {
                        ds.filter.decimate = (rate / ds.output.samprate).max(1);
                    }
                }
            }
            StatusTag::GpsTime => ds.sdr.gps_time = item.as_int(),
            StatusTag::LowEdge => {
                let f = item.as_float();
                if !f.is_nan() {
                    ds.sdr.min_if = f;
                }
            }
            StatusTag::HighEdge => {
                let f = item.as_float();
                if !f.is_nan() {
                    ds.sdr.max_if = f;
                }
            }
            StatusTag::LnaGain => ds.sdr.lna_gain = item.as_int() as u8,
            StatusTag::MixerGain => ds.sdr.mixer_gain = item.as_int() as u8,
            StatusTag::IfGain => ds.sdr.if_gain = item.as_int() as u8,
            StatusTag::DcIOffset => ds.sdr.dc_i = item.as_float(),
            StatusTag::DcQOffset => ds.sdr.dc_q = item.as_float(),
            StatusTag::IqImbalance => ds.sdr.imbalance = item.as_float(),
            StatusTag::IqPhase => ds.sdr.sinphi = item.as_float(),
            StatusTag::Gain => {
                // Overall analog gain in dB; invert to normalize levels
                let f = item.as_float();
                if !f.is_nan() {
                    ds.sdr.gain_factor = 10f32.powf(-f / 20.0);
                }
            }
            StatusTag::DirectConversion => ds.sdr.direct_conversion = item.as_int() != 0,
            StatusTag::Calibrate => {
                let f = item.as_double();
                if !f.is_nan() {
                    ds.sdr.calibration = f;
                }
            }
            _ => {}
        }
    }
    match nfreq {
        Some(f) if ds.input.samprate != 0 => ds.on_first_lo_settled(f),
        _ => false,
    }
}

/// The status-service thread.
pub struct StatusService {
    state: Arc<RadioState>,
    sdr_status: MioUdpSocket,
    sdr_ctl: UdpSocket,
    ctl: MioUdpSocket,
    status_out: UdpSocket,
    cache: StatusCache,
    full_countdown: u32,
}

impl StatusService {
    /// Wire up the four sockets. `sdr_status` and `ctl` must be bound,
    /// joined input sockets; `sdr_ctl` and `status_out` connected outputs.
    pub fn new(
        state: Arc<RadioState>,
        sdr_status: UdpSocket,
        sdr_ctl: UdpSocket,
        ctl: UdpSocket,
        status_out: UdpSocket,
    ) -> Result<StatusService> {
        sdr_status.set_nonblocking(true)?;
        ctl.set_nonblocking(true)?;
        Ok(StatusService {
            state,
            sdr_status: MioUdpSocket::from_std(sdr_status),
            sdr_ctl,
            ctl: MioUdpSocket::from_std(ctl),
            status_out,
            cache: StatusCache::new(),
            full_countdown: 0,
        })
    }

    /// Thread body.
    pub fn run(&mut self) -> Result<()> {
        let mut poll = Poll::new()?;
        poll.registry()
            .register(&mut self.sdr_status, SDR_TOKEN, Interest::READABLE)?;
        poll.registry()
            .register(&mut self.ctl, CTL_TOKEN, Interest::READABLE)?;
        let mut events = Events::with_capacity(8);

        // Solicit an immediate full status from the front end
        let poke = Encoder::new(PacketType::Command).finish();
        if let Err(e) = self.sdr_ctl.send(&poke) {
            log::warn!("[STATUS] cannot poke front end: {e}");
        }

        log::info!("[STATUS] status thread running");
        while !self.state.is_terminated() {
            match poll.poll(&mut events, Some(Duration::from_millis(STATUS_POLL_MS))) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
            for ev in events.iter() {
                match ev.token() {
                    SDR_TOKEN => self.drain_sdr(),
                    CTL_TOKEN => self.drain_ctl(),
                    _ => {}
                }
            }
            self.emit_status();
        }
        log::info!("[STATUS] status thread exiting");
        Ok(())
    }

    fn drain_sdr(&mut self) {
        let mut buf = [0u8; STATUS_BUFSIZE];
        loop {
            let (len, from) = match self.sdr_status.recv_from(&mut buf) {
                Ok(r) => r,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("[STATUS] sdr metadata recv: {e}");
                    return;
                }
            };
            let Some((pt, body)) = split_packet(&buf[..len]) else {
                continue;
            };
            if pt == PacketType::Command {
                continue; // our own pokes looped back
            }
            let mut ds = self.state.ds.lock();
            ds.input.metadata_packets += 1;
            ds.input.metadata_source = Some(from);
            if apply_sdr_status(&mut ds, body) {
                log::debug!(
                    "[STATUS] first LO now {} Hz, second LO {} Hz",
                    ds.sdr.first_lo,
                    ds.tune.second_lo
                );
            }
            drop(ds);
            // Wake anyone waiting on fresh front-end state
            self.state.sdr_status.notify_all();
        }
    }

    fn drain_ctl(&mut self) {
        let mut buf = [0u8; STATUS_BUFSIZE];
        loop {
            let len = match self.ctl.recv_from(&mut buf) {
                Ok((len, _from)) => len,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("[STATUS] control recv: {e}");
                    return;
                }
            };
            let Some((pt, body)) = split_packet(&buf[..len]) else {
                continue;
            };
            if pt == PacketType::Response {
                continue; // our own status looped back
            }
            let fx = {
                let mut ds = self.state.ds.lock();
                ds.output.commands += 1;
                apply_commands(&mut ds, body)
            };
            if let Some(lo1) = fx.lo1_request {
                self.request_first_lo(lo1);
            }
            if fx.demod_changed {
                self.state.demod_change.notify_all();
            }
            self.full_countdown = 0; // answer with a full status
        }
    }

    /// Ask the front end to move its LO: a one-item command on its group.
    fn request_first_lo(&self, lo1: f64) {
        let mut e = Encoder::new(PacketType::Command);
        e.double(StatusTag::RadioFrequency, lo1);
        let pkt = e.finish();
        log::debug!("[STATUS] requesting first LO {lo1} Hz");
        if let Err(e) = self.sdr_ctl.send(&pkt) {
            log::warn!("[STATUS] first-LO request failed: {e}");
        }
    }

    fn emit_status(&mut self) {
        let full = self.full_countdown == 0;
        if full {
            self.full_countdown = FULL_STATUS_INTERVAL;
        }
        self.full_countdown -= 1;

        let packet = {
            let ds = self.state.ds.lock();
            build_status(&ds)
        };
        let wire = self.cache.compact(&packet, full);
        match self.status_out.send(&wire) {
            Ok(_) => {
                self.state.ds.lock().output.metadata_packets += 1;
            }
            Err(e) => log::warn!("[STATUS] status send failed: {e}"),
        }
    }
}
