pub mod args;
pub mod config;
pub mod control;
pub mod util;

use std::{
    fs::File,
    io::{
        BufWriter,
        Write,
    },
    sync::Arc,
};

use clap::Parser;
use color_eyre::eyre::{
    Error,
    WrapErr,
    bail,
};
use rsp::{
    Driver,
    Receiver,
    driver::simulated::SimulatedDriver,
    io::forward,
    sink::RawWriter,
};
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
};

use crate::{
    args::{
        Args,
        DriverKind,
    },
    config::ReceiverProfile,
};

const DEFAULT_CHUNK_SIZE: usize = 16384;

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;

    // stdout may carry samples, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting rsp-cli");
    let args = Args::parse();
    tracing::debug!(?args);

    let profile = ReceiverProfile::load(args.config.as_deref())?.merge(&args);
    tracing::debug!(?profile);

    let result = match args.driver {
        DriverKind::Simulated => {
            run(
                &args,
                &profile,
                SimulatedDriver::default().realtime(args.realtime),
            )
        }
        #[cfg(feature = "mirsdr")]
        DriverKind::MirSdr => run(&args, &profile, rsp::driver::mirsdr::MirSdr::new()),
    };

    if let Err(error) = &result {
        tracing::error!(?error);
    }
    else {
        tracing::info!("Program exiting");
    }

    result
}

fn run<D: Driver + 'static>(
    args: &Args,
    profile: &ReceiverProfile,
    driver: D,
) -> Result<(), Error> {
    let chunk_size = profile.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
    if chunk_size == 0 {
        bail!("Chunk size must be greater than 0");
    }

    let receiver = Arc::new(Receiver::new(driver));
    for command in profile.commands() {
        command.apply(&receiver)?;
    }

    if !args.no_control {
        // detached, since it blocks on stdin until the user types something.
        control::spawn(receiver.clone())?;
    }

    let output: Box<dyn Write> = if args.output == "-" {
        Box::new(std::io::stdout().lock())
    }
    else {
        let file = File::create(&args.output)
            .wrap_err_with(|| format!("Could not create output file {}", args.output))?;
        Box::new(file)
    };
    let sink = RawWriter::new(BufWriter::new(output));

    let num_samples = forward(&*receiver, sink, chunk_size, args.num_samples)?;
    tracing::info!(num_samples, "Stream ended");

    receiver.close_stream();

    Ok(())
}
