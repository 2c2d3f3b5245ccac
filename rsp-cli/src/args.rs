use std::{
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use color_eyre::eyre::bail;
use rsp::DcOffsetMode;
use serde::Deserialize;

use crate::{
    Error,
    util::Frequency,
};

#[derive(Debug, Parser)]
pub struct Args {
    /// Driver to receive from.
    #[clap(long, default_value = "simulated")]
    pub driver: DriverKind,

    /// Receiver profile (TOML). Defaults to `receiver.toml` in the config
    /// directory, if it exists.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Center frequency. Accepts k, M and G suffixes.
    #[clap(short, long)]
    pub frequency: Option<Frequency>,

    /// Sample rate. Accepts k, M and G suffixes.
    #[clap(short, long = "samplerate")]
    pub sample_rate: Option<Frequency>,

    /// IF bandwidth. Rounded up to the next supported bandwidth.
    #[clap(short, long)]
    pub bandwidth: Option<Frequency>,

    /// Gain in dB, or "auto"
    #[clap(short, long)]
    pub gain: Option<Gain>,

    /// DC offset correction: off, manual or auto
    #[clap(long)]
    pub dc_offset: Option<DcOffset>,

    /// Number of samples pulled from the receiver at once.
    #[clap(long)]
    pub chunk_size: Option<usize>,

    /// Stop after this many samples.
    #[clap(short, long)]
    pub num_samples: Option<usize>,

    /// Output file for the samples (interleaved little-endian f32). "-"
    /// writes to stdout.
    #[clap(short, long, default_value = "-")]
    pub output: String,

    /// Deliver simulated samples at the configured sample rate.
    #[clap(long)]
    pub realtime: bool,

    /// Don't read retune commands from stdin.
    #[clap(long)]
    pub no_control: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverKind {
    Simulated,
    #[cfg(feature = "mirsdr")]
    MirSdr,
}

impl FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulated" => Ok(Self::Simulated),
            #[cfg(feature = "mirsdr")]
            "mirsdr" => Ok(Self::MirSdr),
            _ => bail!("Unknown driver: {s}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "GainRepr")]
pub enum Gain {
    Value(f64),
    Auto,
}

impl FromStr for Gain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            _ => Ok(Self::Value(s.parse()?)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GainRepr {
    Value(f64),
    Text(String),
}

impl TryFrom<GainRepr> for Gain {
    type Error = Error;

    fn try_from(value: GainRepr) -> Result<Self, Self::Error> {
        match value {
            GainRepr::Value(gain) => Ok(Self::Value(gain)),
            GainRepr::Text(s) => s.parse(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DcOffset {
    Off,
    Manual,
    #[serde(alias = "automatic")]
    Auto,
}

impl FromStr for DcOffset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "manual" => Ok(Self::Manual),
            "auto" | "automatic" => Ok(Self::Auto),
            _ => bail!("Invalid DC offset mode: {s}"),
        }
    }
}

impl From<DcOffset> for DcOffsetMode {
    fn from(value: DcOffset) -> Self {
        match value {
            DcOffset::Off => Self::Off,
            DcOffset::Manual => Self::Manual,
            DcOffset::Auto => Self::Automatic,
        }
    }
}
