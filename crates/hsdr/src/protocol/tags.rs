// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Status/command TLV tag catalog.
//!
//! One tag per tunable or measurable quantity in the demodulator state.
//! Discriminants are wire format: they must stay stable across versions.
//! New tags are appended; decoders skip anything they do not recognize.

/// Packet direction byte, first octet of every status-channel datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Status broadcast by the radio (or the front end).
    Response = 0,
    /// Command toward the radio (or the front end).
    Command = 1,
}

/// TLV tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusTag {
    /// End of list; a bare type byte with no length.
    Eol = 0,

    // Bookkeeping
    CommandTag = 1,
    Commands = 2,
    GpsTime = 3,
    Description = 4,

    // Input (I/Q ingress) side
    InputDataSourceSocket = 10,
    InputDataDestSocket = 11,
    InputMetadataSourceSocket = 12,
    InputMetadataDestSocket = 13,
    InputSsrc = 14,
    InputSamprate = 15,
    InputMetadataPackets = 16,
    InputDataPackets = 17,
    InputSamples = 18,
    InputDrops = 19,
    InputDupes = 20,

    // Output (PCM egress) side
    OutputDataSourceSocket = 30,
    OutputDataDestSocket = 31,
    OutputSsrc = 32,
    OutputTtl = 33,
    OutputSamprate = 34,
    OutputMetadataPackets = 35,
    OutputDataPackets = 36,
    OutputSamples = 37,
    OutputChannels = 38,
    OutputLevel = 39,

    // Front end (SDR) state
    Calibrate = 50,
    LnaGain = 51,
    MixerGain = 52,
    IfGain = 53,
    DcIOffset = 54,
    DcQOffset = 55,
    IqImbalance = 56,
    IqPhase = 57,
    DirectConversion = 58,

    // Tuning
    RadioFrequency = 70,
    FirstLoFrequency = 71,
    SecondLoFrequency = 72,
    ShiftFrequency = 73,
    DopplerFrequency = 74,
    DopplerFrequencyRate = 75,

    // Filtering
    LowEdge = 90,
    HighEdge = 91,
    KaiserBeta = 92,
    FilterBlocksize = 93,
    FilterFirLength = 94,
    NoiseBandwidth = 95,

    // Signals
    IfPower = 110,
    BasebandPower = 111,
    NoiseDensity = 112,
    DemodSnr = 113,
    FreqOffset = 114,
    PeakDeviation = 115,
    PlTone = 116,

    // Demodulation
    DemodType = 130,
    IndependentSideband = 131,
    FmFlat = 132,
    Envelope = 133,
    PllEnable = 134,
    PllLock = 135,
    PllSquare = 136,
    PllPhase = 137,

    // AGC
    AgcEnable = 150,
    Gain = 151,
    Headroom = 152,
    AgcHangtime = 153,
    AgcRecoveryRate = 154,
    AgcAttackRate = 155,
}

impl StatusTag {
    /// Map a wire byte back to a tag; `None` for anything unrecognized
    /// (the caller skips it by its length byte).
    pub fn from_u8(v: u8) -> Option<StatusTag> {
        use StatusTag::*;
        Some(match v {
            0 => Eol,
            1 => CommandTag,
            2 => Commands,
            3 => GpsTime,
            4 => Description,
            10 => InputDataSourceSocket,
            11 => InputDataDestSocket,
            12 => InputMetadataSourceSocket,
            13 => InputMetadataDestSocket,
            14 => InputSsrc,
            15 => InputSamprate,
            16 => InputMetadataPackets,
            17 => InputDataPackets,
            18 => InputSamples,
            19 => InputDrops,
            20 => InputDupes,
            30 => OutputDataSourceSocket,
            31 => OutputDataDestSocket,
            32 => OutputSsrc,
            33 => OutputTtl,
            34 => OutputSamprate,
            35 => OutputMetadataPackets,
            36 => OutputDataPackets,
            37 => OutputSamples,
            38 => OutputChannels,
            39 => OutputLevel,
            50 => Calibrate,
            51 => LnaGain,
            52 => MixerGain,
            53 => IfGain,
            54 => DcIOffset,
            55 => DcQOffset,
            56 => IqImbalance,
            57 => IqPhase,
            58 => DirectConversion,
            70 => RadioFrequency,
            71 => FirstLoFrequency,
            72 => SecondLoFrequency,
            73 => ShiftFrequency,
            74 => DopplerFrequency,
            75 => DopplerFrequencyRate,
            90 => LowEdge,
            91 => HighEdge,
            92 => KaiserBeta,
            93 => FilterBlocksize,
            94 => FilterFirLength,
            95 => NoiseBandwidth,
            110 => IfPower,
            111 => BasebandPower,
            112 => NoiseDensity,
            113 => DemodSnr,
            114 => FreqOffset,
            115 => PeakDeviation,
            116 => PlTone,
            130 => DemodType,
            131 => IndependentSideband,
            132 => FmFlat,
            133 => Envelope,
            134 => PllEnable,
            135 => PllLock,
            136 => PllSquare,
            137 => PllPhase,
            150 => AgcEnable,
            151 => Gain,
            152 => Headroom,
            153 => AgcHangtime,
            154 => AgcRecoveryRate,
            155 => AgcAttackRate,
            _ => return None,
        })
    }
}
