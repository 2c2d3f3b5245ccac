//! Retune commands, read from stdin while streaming.

use std::{
    io::BufRead,
    str::FromStr,
    sync::Arc,
    thread::JoinHandle,
};

use color_eyre::eyre::{
    bail,
    eyre,
};
use rsp::{
    Driver,
    Receiver,
    gain::Band,
};

use crate::{
    Error,
    args::{
        DcOffset,
        Gain,
    },
    util::Frequency,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Frequency(Frequency),
    SampleRate(Frequency),
    Bandwidth(Frequency),
    Gain(Gain),
    DcOffset(DcOffset),
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let Some(command) = words.next()
        else {
            bail!("Empty command");
        };
        let argument = words.next();
        if words.next().is_some() {
            bail!("Too many arguments for {command}");
        }
        let required = || argument.ok_or_else(|| eyre!("Missing argument for {command}"));

        let command = match command {
            "freq" | "f" => Self::Frequency(required()?.parse()?),
            "rate" => Self::SampleRate(required()?.parse()?),
            "bw" => Self::Bandwidth(required()?.parse()?),
            "gain" | "g" => Self::Gain(required()?.parse()?),
            "dc" => Self::DcOffset(required()?.parse()?),
            "status" => Self::Status,
            "quit" | "q" => Self::Quit,
            _ => bail!("Unknown command: {command}"),
        };

        Ok(command)
    }
}

impl Command {
    /// Applies the command and logs the effective value.
    pub fn apply<D: Driver>(&self, receiver: &Receiver<D>) -> Result<(), rsp::Error> {
        match *self {
            Self::Frequency(Frequency(requested)) => {
                let effective = receiver.set_center_frequency(requested)?;
                tracing::info!(requested, effective, "center frequency");
            }
            Self::SampleRate(Frequency(requested)) => {
                let effective = receiver.set_sample_rate(requested)?;
                tracing::info!(requested, effective, "sample rate");
            }
            Self::Bandwidth(Frequency(requested)) => {
                let effective = receiver.set_bandwidth(requested)?;
                tracing::info!(requested, effective, "bandwidth");
            }
            Self::Gain(Gain::Auto) => {
                let automatic = receiver.set_gain_mode(true);
                tracing::info!(automatic, "gain mode");
            }
            Self::Gain(Gain::Value(requested)) => {
                receiver.set_gain_mode(false);
                let effective = receiver.set_gain(requested)?;
                tracing::info!(requested, effective, "gain");
            }
            Self::DcOffset(mode) => {
                let effective = receiver.set_dc_offset_mode(mode.into())?;
                tracing::info!(?effective, "DC offset mode");
            }
            Self::Status => {
                let params = receiver.parameters();
                let band = Band::for_frequency(params.center_frequency())
                    .map_or("out of range", |band| band.name());
                tracing::info!(
                    sample_rate = params.sample_rate(),
                    center_frequency = params.center_frequency(),
                    band,
                    bandwidth = params.bandwidth().hz(),
                    gain = params.gain(),
                    gain_reduction = params.gain_reduction(),
                    automatic_gain = params.automatic_gain(),
                    dc_offset_mode = ?params.dc_offset_mode(),
                    packet_samples = receiver.packet_samples(),
                    running = receiver.is_running(),
                    stream = ?receiver.stream_state(),
                    "status"
                );
            }
            Self::Quit => {
                tracing::info!("Stopping stream");
                receiver.close_stream();
            }
        }

        Ok(())
    }
}

/// Spawns a thread that reads commands from stdin and applies them to
/// `receiver`. The thread exits on `quit` or when stdin is closed.
pub fn spawn<D: Driver + 'static>(receiver: Arc<Receiver<D>>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("control".to_owned())
        .spawn(move || run(&receiver))
}

fn run<D: Driver>(receiver: &Receiver<D>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                tracing::error!(%error, "Reading stdin failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if let Err(error) = command.apply(receiver) {
                    tracing::error!(?error, line, "Command failed");
                }
                if command == Command::Quit {
                    break;
                }
            }
            Err(error) => tracing::warn!(%error, line, "Invalid command"),
        }
    }

    tracing::debug!("Control thread exiting");
}
