use std::{
    ops::RangeInclusive,
    sync::Arc,
};

use num_complex::Complex;
use parking_lot::Mutex;

use crate::{
    Error,
    GetCenterFrequency,
    GetSampleRate,
    bandwidth::Bandwidth,
    driver::Driver,
    gain::Band,
    params::{
        DcOffsetMode,
        DeviceParameters,
        SAMPLE_RATE_RANGE,
    },
    session::PeripheralSession,
    stream::{
        self,
        Pull,
        StreamReassembler,
    },
};

/// Frequency and sample rate changes smaller than this are applied to the
/// running tuner. Larger ones reinitialize it.
pub const IN_PLACE_THRESHOLD: f64 = 10e3;

pub const ANTENNA: &str = "RX";
pub const GAIN_NAME: &str = "LNA_MIX_BB";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Samples can be pulled. The tuner is initialized on the first pull.
    Ready,
    /// A packet read failed. The stream must be reopened.
    Failed,
    Closed,
}

/// Everything guarded by the receiver's lock.
#[derive(derive_more::Debug)]
pub(crate) struct Core<D: Driver> {
    pub(crate) params: DeviceParameters,
    pub(crate) session: PeripheralSession<D>,
    pub(crate) reassembler: StreamReassembler,
    pub(crate) stream: StreamState,
    /// Incremented whenever the stream is closed or opened.
    pub(crate) epoch: u64,
}

impl<D: Driver> Core<D> {
    fn reinit(&mut self) -> Result<(), Error> {
        tracing::info!(
            sample_rate = self.params.sample_rate(),
            center_frequency = self.params.center_frequency(),
            bandwidth = %self.params.bandwidth(),
            "reinit started"
        );

        self.reassembler.reset();
        let result = self.session.open(&mut self.params);
        self.reassembler.reset();

        if result.is_ok() {
            tracing::info!(
                packet_samples = self.params.packet_samples(),
                "reinit completed"
            );
        }
        result.map(|_| ())
    }

    /// Uninitializes the tuner. The negotiated packet size no longer applies.
    pub(crate) fn close_session(&mut self) {
        self.session.close();
        self.params.set_packet_samples(0);
    }

    /// Applies a frequency or sample rate change to an open session, in
    /// place if it's small enough.
    fn retune(
        &mut self,
        delta: f64,
        adjust: impl FnOnce(&PeripheralSession<D>, f64) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if !self.session.is_open() {
            Ok(())
        }
        else if delta.abs() < IN_PLACE_THRESHOLD {
            if delta != 0.0 {
                adjust(&self.session, delta)?;
            }
            Ok(())
        }
        else {
            self.reinit()
        }
    }
}

/// An RSP receiver.
///
/// Samples are pulled with [`pull`](Receiver::pull) while tuning parameters
/// may be changed from other threads at any time. All methods take `&self`;
/// share the receiver with an [`Arc`] to control it from multiple threads.
///
/// Setters never reject a value. Out of range requests are clamped or
/// quantized and the setter returns the value that is actually in effect.
#[derive(derive_more::Debug)]
pub struct Receiver<D: Driver> {
    #[debug(skip)]
    driver: Arc<D>,
    core: Mutex<Core<D>>,
}

impl<D: Driver> Receiver<D> {
    pub fn new(driver: D) -> Self {
        let driver = Arc::new(driver);
        Self {
            driver: driver.clone(),
            core: Mutex::new(Core {
                params: DeviceParameters::default(),
                session: PeripheralSession::new(driver),
                reassembler: StreamReassembler::new(),
                stream: StreamState::Ready,
                epoch: 0,
            }),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Makes a closed or failed stream ready again. The tuner is initialized
    /// on the next pull.
    pub fn open_stream(&self) {
        let mut core = self.core.lock();
        if core.stream != StreamState::Ready {
            core.reassembler = StreamReassembler::new();
            core.stream = StreamState::Ready;
            core.epoch += 1;
            tracing::debug!("stream opened");
        }
    }

    /// Stops the stream: uninitializes the tuner, releases the sample buffer
    /// and resets all parameters to their defaults. Pulls report
    /// [`Pull::EndOfStream`] until the stream is opened again.
    pub fn close_stream(&self) {
        let mut core = self.core.lock();
        core.close_session();
        core.reassembler = StreamReassembler::released();
        core.params = DeviceParameters::default();
        core.stream = StreamState::Closed;
        core.epoch += 1;
        tracing::debug!("stream closed");
    }

    pub fn stream_state(&self) -> StreamState {
        self.core.lock().stream
    }

    /// Whether the tuner is currently initialized.
    pub fn is_running(&self) -> bool {
        self.core.lock().session.is_open()
    }

    /// Fills all of `output` with samples.
    ///
    /// Samples are delivered without gaps or repetitions across calls,
    /// regardless of how `output.len()` relates to the packet size. A read
    /// error is terminal: the tuner is closed and later pulls return
    /// [`Pull::EndOfStream`] until [`open_stream`](Receiver::open_stream) is
    /// called.
    pub fn pull(&self, output: &mut [Complex<f32>]) -> Result<Pull, Error> {
        let mut core = self.core.lock();
        stream::pull(&mut core, output)
    }

    /// A snapshot of the current parameters.
    pub fn parameters(&self) -> DeviceParameters {
        self.core.lock().params.clone()
    }

    pub fn packet_samples(&self) -> usize {
        self.core.lock().session.packet_samples()
    }

    pub fn set_sample_rate(&self, sample_rate: f64) -> Result<f64, Error> {
        let mut core = self.core.lock();
        let delta = core.params.apply_sample_rate(sample_rate);
        tracing::debug!(sample_rate = core.params.sample_rate(), delta, "set sample rate");
        core.retune(delta, |session, delta| session.adjust_sample_rate(delta))?;
        Ok(core.params.sample_rate())
    }

    pub fn sample_rate(&self) -> f64 {
        self.core.lock().params.sample_rate()
    }

    pub fn set_center_frequency(&self, frequency: f64) -> Result<f64, Error> {
        let mut core = self.core.lock();
        let gain_reduction = core.params.gain_reduction();
        let delta = core.params.apply_frequency(frequency);
        tracing::debug!(frequency, delta, "set center frequency");

        let in_place = core.session.is_open() && delta.abs() < IN_PLACE_THRESHOLD;
        core.retune(delta, |session, delta| session.adjust_center_frequency(delta))?;

        // a retune across bands may have moved the gain reduction
        if in_place && core.params.gain_reduction() != gain_reduction {
            core.session
                .adjust_gain_reduction(core.params.gain_reduction())?;
        }

        Ok(core.params.center_frequency())
    }

    pub fn center_frequency(&self) -> f64 {
        self.core.lock().params.center_frequency()
    }

    /// Frequency correction isn't supported. Always returns 0.
    pub fn set_freq_corr(&self, _ppm: f64) -> f64 {
        self.freq_corr()
    }

    pub fn freq_corr(&self) -> f64 {
        0.0
    }

    pub fn set_bandwidth(&self, bandwidth: f64) -> Result<f64, Error> {
        let mut core = self.core.lock();
        let changed = core.params.apply_bandwidth(bandwidth);
        tracing::debug!(bandwidth, effective = %core.params.bandwidth(), "set bandwidth");

        // the tuner can't change its bandwidth while running
        if changed && core.session.is_open() {
            core.reinit()?;
        }

        Ok(core.params.bandwidth().hz())
    }

    pub fn bandwidth(&self) -> f64 {
        self.core.lock().params.bandwidth().hz()
    }

    pub fn set_gain(&self, gain: f64) -> Result<f64, Error> {
        let mut core = self.core.lock();
        let effective = core.params.apply_gain(gain);
        tracing::debug!(gain, effective, "set gain");

        if core.session.is_open() {
            core.session
                .adjust_gain_reduction(core.params.gain_reduction())?;
        }

        Ok(effective)
    }

    pub fn gain(&self) -> f64 {
        self.core.lock().params.gain()
    }

    /// Records whether automatic gain control is wanted. There is no AGC
    /// loop, so enabling it has no effect on the tuner.
    pub fn set_gain_mode(&self, automatic: bool) -> bool {
        let mut core = self.core.lock();
        if automatic {
            tracing::warn!("automatic gain control not implemented");
        }
        core.params.apply_gain_mode(automatic)
    }

    pub fn gain_mode(&self) -> bool {
        self.core.lock().params.automatic_gain()
    }

    pub fn set_dc_offset_mode(&self, mode: DcOffsetMode) -> Result<DcOffsetMode, Error> {
        let mut core = self.core.lock();
        if mode == DcOffsetMode::Manual {
            tracing::warn!("manual DC offset correction not implemented, turning it off");
        }
        let effective = core.params.apply_dc_mode(mode);

        if core.session.is_open() {
            core.session.set_dc_mode(core.params.dc_offset_auto())?;
        }

        Ok(effective)
    }

    pub fn dc_offset_mode(&self) -> DcOffsetMode {
        self.core.lock().params.dc_offset_mode()
    }

    pub fn set_dc_offset(&self, _offset: Complex<f64>) -> Result<(), Error> {
        Err(Error::Unsupported("manual DC offset correction"))
    }

    pub fn set_antenna(&self, _antenna: &str) -> &'static str {
        ANTENNA
    }

    pub fn antenna(&self) -> &'static str {
        ANTENNA
    }

    pub fn antennas(&self) -> Vec<&'static str> {
        vec![ANTENNA]
    }

    pub fn gain_names(&self) -> Vec<&'static str> {
        vec![GAIN_NAME]
    }

    pub fn sample_rate_range(&self) -> RangeInclusive<f64> {
        SAMPLE_RATE_RANGE
    }

    pub fn frequency_ranges(&self) -> Vec<RangeInclusive<f64>> {
        Band::ALL.iter().map(Band::frequency_range).collect()
    }

    /// Gain range of the band the receiver is tuned to.
    pub fn gain_range(&self) -> RangeInclusive<f64> {
        self.core.lock().params.gain_limits().range()
    }

    pub fn bandwidths(&self) -> Vec<f64> {
        Bandwidth::ALL.iter().map(Bandwidth::hz).collect()
    }
}

impl<D: Driver> GetSampleRate for Receiver<D> {
    #[inline]
    fn sample_rate(&self) -> f64 {
        Receiver::sample_rate(self)
    }
}

impl<D: Driver> GetCenterFrequency for Receiver<D> {
    #[inline]
    fn center_frequency(&self) -> f64 {
        Receiver::center_frequency(self)
    }
}
