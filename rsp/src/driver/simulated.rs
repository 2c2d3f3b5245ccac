//! A software tuner that produces a test tone in noise.

use std::{
    f64::consts::TAU,
    time::{
        Duration,
        Instant,
    },
};

use parking_lot::Mutex;
use rand::{
    Rng,
    SeedableRng,
    distributions::Uniform,
    rngs::SmallRng,
};

use crate::{
    driver::{
        Driver,
        DriverError,
        DriverStatus,
        InitParams,
        MAX_PACKET_SAMPLES,
        PacketInfo,
    },
    params::DEFAULT_CENTER_FREQUENCY,
};

/// Full scale of the 12 bit samples.
const FULL_SCALE: f64 = 2047.0;

/// Packets are half as large below this sample rate.
const SMALL_PACKET_SAMPLE_RATE: f64 = 6e6;

#[derive(Debug)]
struct Stream {
    sample_rate: f64,
    center_frequency: f64,
    gain_reduction: i32,
    packet_samples: usize,
    phase: f64,
    sample_num: u32,
    started: Instant,
    samples_since_start: u64,
}

#[derive(derive_more::Debug)]
struct State {
    stream: Option<Stream>,
    #[debug(skip)]
    rng: SmallRng,
}

/// Simulated tuner.
///
/// Emits a tone at an absolute frequency, so it moves in the baseband when
/// the receiver is retuned, plus uniform noise. The tone's amplitude follows
/// the gain reduction. With [`realtime`](SimulatedDriver::realtime) enabled,
/// `read_packet` blocks to deliver samples at the configured rate.
#[derive(Debug)]
pub struct SimulatedDriver {
    tone_frequency: f64,
    noise_amplitude: f64,
    realtime: bool,
    state: Mutex<State>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER_FREQUENCY + 100e3)
    }
}

impl SimulatedDriver {
    pub fn new(tone_frequency: f64) -> Self {
        Self {
            tone_frequency,
            noise_amplitude: 0.01,
            realtime: false,
            state: Mutex::new(State {
                stream: None,
                rng: SmallRng::from_entropy(),
            }),
        }
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_noise(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.state.lock().rng = SmallRng::seed_from_u64(seed);
        self
    }

    fn tone_amplitude(gain_reduction: i32) -> f64 {
        // 0.5 full scale at the default gain reduction of 60 dB
        (0.5 * 10f64.powf((60 - gain_reduction) as f64 / 20.0)).min(1.0)
    }

    fn with_stream<T>(&self, f: impl FnOnce(&mut Stream) -> T) -> Result<T, DriverError> {
        let mut state = self.state.lock();
        let stream = state
            .stream
            .as_mut()
            .ok_or(DriverError::new(DriverStatus::NotInitialised))?;
        Ok(f(stream))
    }
}

impl Driver for SimulatedDriver {
    fn init(&self, params: InitParams) -> Result<usize, DriverError> {
        let mut state = self.state.lock();
        if state.stream.is_some() {
            return Err(DriverError::new(DriverStatus::AlreadyInitialised));
        }

        let sample_rate = params.sample_rate_mhz * 1e6;
        if sample_rate <= 0.0 {
            return Err(DriverError::new(DriverStatus::InvalidParam));
        }
        let packet_samples = if sample_rate < SMALL_PACKET_SAMPLE_RATE {
            MAX_PACKET_SAMPLES / 2
        }
        else {
            MAX_PACKET_SAMPLES
        };

        state.stream = Some(Stream {
            sample_rate,
            center_frequency: params.center_frequency_mhz * 1e6,
            gain_reduction: params.gain_reduction,
            packet_samples,
            phase: 0.0,
            sample_num: 0,
            started: Instant::now(),
            samples_since_start: 0,
        });

        Ok(packet_samples)
    }

    fn uninit(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state
            .stream
            .take()
            .map(|_| ())
            .ok_or(DriverError::new(DriverStatus::NotInitialised))
    }

    fn read_packet(&self, i: &mut [i16], q: &mut [i16]) -> Result<PacketInfo, DriverError> {
        let (deadline, info) = {
            let mut state = self.state.lock();
            let State { stream, rng } = &mut *state;
            let stream = stream
                .as_mut()
                .ok_or(DriverError::new(DriverStatus::NotInitialised))?;
            if i.len() != stream.packet_samples || q.len() != stream.packet_samples {
                return Err(DriverError::new(DriverStatus::InvalidParam));
            }

            let step =
                (TAU * (self.tone_frequency - stream.center_frequency) / stream.sample_rate)
                    .rem_euclid(TAU);
            let amplitude = Self::tone_amplitude(stream.gain_reduction);
            let noise = Uniform::new_inclusive(-self.noise_amplitude, self.noise_amplitude);

            for (i, q) in i.iter_mut().zip(q.iter_mut()) {
                let re = amplitude * stream.phase.cos() + rng.sample(&noise);
                let im = amplitude * stream.phase.sin() + rng.sample(&noise);
                *i = (re.clamp(-1.0, 1.0) * FULL_SCALE) as i16;
                *q = (im.clamp(-1.0, 1.0) * FULL_SCALE) as i16;

                stream.phase += step;
                if stream.phase > TAU {
                    stream.phase -= TAU;
                }
            }

            let first_sample_num = stream.sample_num;
            stream.sample_num = stream.sample_num.wrapping_add(i.len() as u32);
            stream.samples_since_start += i.len() as u64;

            let deadline = self.realtime.then(|| {
                stream.started
                    + Duration::from_secs_f64(
                        stream.samples_since_start as f64 / stream.sample_rate,
                    )
            });

            (
                deadline,
                PacketInfo {
                    first_sample_num,
                    ..Default::default()
                },
            )
        };

        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }

        Ok(info)
    }

    fn set_sample_rate_delta(&self, delta: f64) -> Result<(), DriverError> {
        self.with_stream(|stream| {
            stream.sample_rate += delta;
            stream.started = Instant::now();
            stream.samples_since_start = 0;
        })
    }

    fn set_rf_delta(&self, delta: f64) -> Result<(), DriverError> {
        self.with_stream(|stream| stream.center_frequency += delta)
    }

    fn set_gain_reduction(&self, gain_reduction: i32) -> Result<(), DriverError> {
        self.with_stream(|stream| stream.gain_reduction = gain_reduction)
    }

    fn set_dc_mode(&self, _automatic: bool) -> Result<(), DriverError> {
        // there is no DC offset to correct
        self.with_stream(|_| ())
    }
}
