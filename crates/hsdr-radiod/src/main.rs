// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! hsdr-radiod - multicast SDR demodulator daemon
//!
//! Subscribes to a front end's I/Q and metadata groups, runs one
//! demodulator, publishes PCM audio and a TLV status/command channel.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use hsdr::config::{self, RadioConfig};
use hsdr::radio::{demod, input, IqRing, PcmOutput, RadioState};
use hsdr::radio::presets::ModeTable;
use hsdr::radio::state::Demod;
use hsdr::status::StatusService;
use hsdr::transport::multicast;

/// Multicast SDR demodulator daemon
#[derive(Parser, Debug)]
#[command(name = "hsdr-radiod")]
#[command(version = hsdr::VERSION)]
#[command(about = "Demodulate a multicast I/Q stream to multicast PCM")]
struct Args {
    /// Multicast group carrying I/Q RTP data
    #[arg(short = 'I', long)]
    iq: String,

    /// Multicast group carrying front-end metadata (TLV)
    #[arg(short = 'S', long)]
    sdr_status: String,

    /// Multicast group for PCM output
    #[arg(short = 'R', long)]
    pcm: String,

    /// Multicast group for our status/command channel
    #[arg(short = 'T', long)]
    status: String,

    /// Initial mode preset name
    #[arg(short, long, default_value = "am")]
    mode: String,

    /// Directory holding modes.txt
    #[arg(long, default_value = config::DEFAULT_LIBDIR)]
    libdir: String,

    /// Multicast TTL for output sockets
    #[arg(long, default_value_t = config::DEFAULT_MCAST_TTL)]
    ttl: u32,

    /// SSRC for the PCM output stream
    #[arg(long, default_value_t = 0)]
    ssrc: u32,

    /// Nominal input sample rate until the front end reports one, Hz
    #[arg(long, default_value_t = 192_000)]
    samprate: u32,

    /// Output (audio) sample rate, Hz
    #[arg(long, default_value_t = 24_000)]
    audio_rate: u32,

    /// Do not join multicast groups we only send to
    #[arg(long)]
    no_passive_join: bool,
}

fn run(args: &Args) -> hsdr::Result<()> {
    let cfg = RadioConfig {
        iq_target: args.iq.clone(),
        sdr_status_target: args.sdr_status.clone(),
        pcm_target: args.pcm.clone(),
        status_target: args.status.clone(),
        mcast_ttl: args.ttl,
        passive_join: !args.no_passive_join,
        libdir: args.libdir.clone().into(),
        output_ssrc: args.ssrc,
    };

    let modes = ModeTable::load(&cfg.libdir.join(config::MODE_FILE))?;

    // Seed the state record
    let mut ds = Demod::default();
    ds.input.samprate = args.samprate;
    ds.output.samprate = args.audio_rate;
    ds.output.ssrc = cfg.output_ssrc;
    ds.output.ttl = cfg.mcast_ttl;
    ds.filter.decimate = (args.samprate / args.audio_rate.max(1)).max(1);
    ds.sdr.min_if = -(args.samprate as f32) / 2.0;
    ds.sdr.max_if = args.samprate as f32 / 2.0;
    modes.preset_mode(&mut ds, &args.mode)?;

    // Sockets for the four streams
    let iq_sock = multicast::listen(&cfg.iq_target)?;
    let sdr_status_sock = multicast::listen(&cfg.sdr_status_target)?;
    let sdr_ctl_sock = multicast::connect(&cfg.sdr_status_target, cfg.mcast_ttl, cfg.passive_join)?;
    let ctl_sock = multicast::listen(&cfg.status_target)?;
    let status_sock = multicast::connect(&cfg.status_target, cfg.mcast_ttl, cfg.passive_join)?;
    let pcm_sock = multicast::connect(&cfg.pcm_target, cfg.mcast_ttl, cfg.passive_join)?;

    ds.input.data_dest = multicast::resolve_target(&cfg.iq_target, config::DEFAULT_RTP_PORT).ok();
    ds.input.metadata_dest =
        multicast::resolve_target(&cfg.sdr_status_target, config::DEFAULT_STATUS_PORT).ok();
    ds.output.data_dest = multicast::resolve_target(&cfg.pcm_target, config::DEFAULT_RTP_PORT).ok();
    ds.output.data_source = pcm_sock.local_addr().ok();

    let state = Arc::new(RadioState::new(ds));
    let ring = Arc::new(IqRing::new(config::RING_SIZE));

    // Signal handlers only raise the flag; threads notice at their next
    // block/poll boundary
    {
        let state = state.clone();
        ctrlc::set_handler(move || {
            log::info!("interrupt: shutting down");
            state.terminate();
        })
        .map_err(|e| hsdr::RadioError::Io(std::io::Error::other(e)))?;
    }

    let mut status = StatusService::new(
        state.clone(),
        sdr_status_sock,
        sdr_ctl_sock,
        ctl_sock,
        status_sock,
    )?;

    let ingress = {
        let ring = ring.clone();
        let state = state.clone();
        std::thread::Builder::new()
            .name("hsdr-input".into())
            .spawn(move || input::run(&iq_sock, &ring, &state))?
    };
    let status_thread = {
        let state = state.clone();
        std::thread::Builder::new()
            .name("hsdr-status".into())
            .spawn(move || {
                if let Err(e) = status.run() {
                    // A radio nobody can see or steer is down, not limping
                    log::error!("[STATUS] fatal: {e}");
                    state.terminate();
                }
            })?
    };
    let demod_thread = {
        let ring = ring.clone();
        let state = state.clone();
        std::thread::Builder::new()
            .name("hsdr-demod".into())
            .spawn(move || {
                let mut out = PcmOutput::new(pcm_sock, cfg.output_ssrc);
                demod::run(&state, &ring, &mut out);
            })?
    };

    demod_thread.join().ok();
    state.terminate();
    ingress.join().ok();
    status_thread.join().ok();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hsdr-radiod: {e}");
            ExitCode::FAILURE
        }
    }
}
