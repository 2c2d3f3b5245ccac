use std::sync::Arc;

use crate::{
    Error,
    driver::{
        Driver,
        DriverError,
        DriverStatus,
        InitParams,
        MAX_PACKET_SAMPLES,
        PacketInfo,
    },
    params::DeviceParameters,
    stream::PacketBuffer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Initializing,
    Open,
}

/// The connection to the tuner.
///
/// Opening the session initializes the tuner with the full parameter set and
/// negotiates the packet size. Every (re)initialization starts a new
/// generation, which packet readers use to tell whether the session was
/// reinitialized while they were blocked in a read.
#[derive(derive_more::Debug)]
pub struct PeripheralSession<D: Driver> {
    #[debug(skip)]
    driver: Arc<D>,
    state: SessionState,
    packet_samples: usize,
    generation: u64,
}

impl<D: Driver> PeripheralSession<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            state: SessionState::Closed,
            packet_samples: 0,
            generation: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    #[inline]
    pub fn packet_samples(&self) -> usize {
        self.packet_samples
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Initializes the tuner, closing it first if it's open. Returns the
    /// number of samples per packet.
    pub fn open(&mut self, params: &mut DeviceParameters) -> Result<usize, Error> {
        self.close();
        params.set_packet_samples(0);
        self.state = SessionState::Initializing;

        let init_params = InitParams::from(&*params);
        tracing::debug!(?init_params, "initializing tuner");

        let packet_samples = match self.init(init_params) {
            Ok(packet_samples) => packet_samples,
            Err(error) => {
                tracing::error!(%error, "tuner initialization failed");
                self.state = SessionState::Closed;
                return Err(Error::Init(error));
            }
        };

        self.state = SessionState::Open;
        self.packet_samples = packet_samples;
        self.generation += 1;
        params.set_packet_samples(packet_samples);

        if params.dc_offset_auto() {
            if let Err(error) = self.driver.set_dc_mode(true) {
                tracing::error!(%error, "enabling DC offset correction failed");
                self.close();
                return Err(Error::Init(error));
            }
        }

        tracing::debug!(packet_samples, generation = self.generation, "tuner initialized");
        Ok(packet_samples)
    }

    fn init(&self, init_params: InitParams) -> Result<usize, DriverError> {
        let packet_samples = self.driver.init(init_params)?;

        if packet_samples == 0 || packet_samples > MAX_PACKET_SAMPLES {
            tracing::error!(packet_samples, "tuner negotiated an unsupported packet size");
            if let Err(error) = self.driver.uninit() {
                tracing::warn!(%error, "tuner uninitialization failed");
            }
            return Err(DriverError::new(DriverStatus::OutOfRange));
        }

        Ok(packet_samples)
    }

    /// Uninitializes the tuner. Does nothing if the session isn't open.
    pub fn close(&mut self) {
        if self.state == SessionState::Open {
            if let Err(error) = self.driver.uninit() {
                tracing::warn!(%error, "tuner uninitialization failed");
            }
            tracing::debug!(generation = self.generation, "tuner closed");
        }

        self.state = SessionState::Closed;
        self.packet_samples = 0;
    }

    /// Returns a handle to read packets from the current generation, if the
    /// session is open.
    pub fn reader(&self) -> Option<PacketReader<D>> {
        self.is_open().then(|| self.make_reader())
    }

    /// Like [`reader`](Self::reader), but initializes the tuner first if the
    /// session is closed.
    pub fn open_reader(&mut self, params: &mut DeviceParameters) -> Result<PacketReader<D>, Error> {
        if !self.is_open() {
            self.open(params)?;
        }
        Ok(self.make_reader())
    }

    fn make_reader(&self) -> PacketReader<D> {
        PacketReader {
            driver: self.driver.clone(),
            packet_samples: self.packet_samples,
            generation: self.generation,
        }
    }

    pub fn adjust_sample_rate(&self, delta: f64) -> Result<(), Error> {
        self.adjust("sample rate", |driver| driver.set_sample_rate_delta(delta))
    }

    pub fn adjust_center_frequency(&self, delta: f64) -> Result<(), Error> {
        self.adjust("center frequency", |driver| driver.set_rf_delta(delta))
    }

    pub fn adjust_gain_reduction(&self, gain_reduction: i32) -> Result<(), Error> {
        self.adjust("gain reduction", |driver| {
            driver.set_gain_reduction(gain_reduction)
        })
    }

    pub fn set_dc_mode(&self, automatic: bool) -> Result<(), Error> {
        self.adjust("DC offset mode", |driver| driver.set_dc_mode(automatic))
    }

    fn adjust(
        &self,
        parameter: &'static str,
        f: impl FnOnce(&D) -> Result<(), DriverError>,
    ) -> Result<(), Error> {
        debug_assert!(self.is_open());
        tracing::debug!(parameter, "in-place adjustment");

        f(&self.driver).map_err(|error| {
            tracing::warn!(parameter, %error, "in-place adjustment failed");
            Error::Adjust(error)
        })
    }
}

impl<D: Driver> Drop for PeripheralSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads packets from one generation of a session without borrowing it.
#[derive(derive_more::Debug)]
pub struct PacketReader<D> {
    #[debug(skip)]
    driver: Arc<D>,
    packet_samples: usize,
    generation: u64,
}

impl<D: Driver> PacketReader<D> {
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn packet_samples(&self) -> usize {
        self.packet_samples
    }

    /// Blocks until the tuner delivers a packet. On error the buffer is left
    /// empty.
    pub fn read_packet(&self, packet: &mut PacketBuffer) -> Result<PacketInfo, DriverError> {
        packet.read_from(&*self.driver, self.packet_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::test::RampDriver;

    #[test]
    fn open_negotiates_packet_size() {
        let driver = Arc::new(RampDriver::new(336));
        let mut session = PeripheralSession::new(driver.clone());
        let mut params = DeviceParameters::default();

        assert_eq!(session.open(&mut params).unwrap(), 336);
        assert!(session.is_open());
        assert_eq!(params.packet_samples(), 336);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn reopen_closes_first() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        let mut params = DeviceParameters::default();

        session.open(&mut params).unwrap();
        session.open(&mut params).unwrap();

        let stats = driver.stats();
        assert_eq!(stats.inits, 2);
        assert_eq!(stats.uninits, 1);
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn close_is_idempotent() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        session.close();
        session.open(&mut DeviceParameters::default()).unwrap();
        session.close();
        session.close();
        assert_eq!(driver.stats().uninits, 1);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.reader().is_none());
    }

    #[test]
    fn open_reader_opens_lazily() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        let mut params = DeviceParameters::default();

        let reader = session.open_reader(&mut params).unwrap();
        assert_eq!(reader.generation(), 1);
        assert_eq!(reader.packet_samples(), 252);

        let reader = session.open_reader(&mut params).unwrap();
        assert_eq!(reader.generation(), 1);
        assert_eq!(driver.stats().inits, 1);
    }

    #[test]
    fn failed_init_leaves_session_closed() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        driver.fail_next_init();

        let result = session.open(&mut DeviceParameters::default());
        assert!(matches!(result, Err(Error::Init(_))));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn failed_reopen_clears_packet_size() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        let mut params = DeviceParameters::default();
        session.open(&mut params).unwrap();
        assert_eq!(params.packet_samples(), 252);

        driver.fail_next_init();
        assert!(session.open(&mut params).is_err());
        assert_eq!(params.packet_samples(), 0);
        assert_eq!(session.packet_samples(), 0);
    }

    #[test]
    fn oversized_packets_are_rejected() {
        let driver = Arc::new(RampDriver::new(MAX_PACKET_SAMPLES + 1));
        let mut session = PeripheralSession::new(driver.clone());

        let result = session.open(&mut DeviceParameters::default());
        assert!(matches!(
            result,
            Err(Error::Init(DriverError {
                status: DriverStatus::OutOfRange
            }))
        ));
        assert!(!driver.is_initialized());
        assert_eq!(driver.stats().uninits, 1);
    }

    #[test]
    fn automatic_dc_mode_is_applied_after_init() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        let mut params = DeviceParameters::default();
        params.apply_dc_mode(crate::params::DcOffsetMode::Automatic);

        session.open(&mut params).unwrap();
        assert_eq!(driver.stats().dc_modes, vec![true]);
    }

    #[test]
    fn drop_uninitializes() {
        let driver = Arc::new(RampDriver::new(252));
        let mut session = PeripheralSession::new(driver.clone());
        session.open(&mut DeviceParameters::default()).unwrap();
        drop(session);
        assert!(!driver.is_initialized());
    }
}
