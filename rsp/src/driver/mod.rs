//! The capability set the receiver needs from the tuner's driver.

#[cfg(feature = "mirsdr")]
pub mod mirsdr;
pub mod simulated;

use std::{
    fmt::Display,
    sync::Arc,
};

use crate::{
    bandwidth::{
        Bandwidth,
        IfMode,
    },
    params::DeviceParameters,
};

/// Hardware ceiling for the number of samples in one packet.
pub const MAX_PACKET_SAMPLES: usize = 504;

/// Parameters the tuner is initialized with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitParams {
    pub gain_reduction: i32,
    pub sample_rate_mhz: f64,
    pub center_frequency_mhz: f64,
    pub bandwidth: Bandwidth,
    pub if_mode: IfMode,
}

impl From<&DeviceParameters> for InitParams {
    fn from(params: &DeviceParameters) -> Self {
        Self {
            gain_reduction: params.gain_reduction(),
            sample_rate_mhz: params.sample_rate() / 1e6,
            center_frequency_mhz: params.center_frequency() / 1e6,
            bandwidth: params.bandwidth(),
            if_mode: params.if_mode(),
        }
    }
}

/// Metadata the driver returns with every packet.
///
/// The `*_changed` flags signal that the tuner adjusted a setting on its
/// own. They are passed along but the receiver doesn't reconcile its
/// parameters with them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketInfo {
    pub first_sample_num: u32,
    pub gain_changed: bool,
    pub rf_changed: bool,
    pub sample_rate_changed: bool,
}

impl PacketInfo {
    #[inline]
    pub fn any_changed(&self) -> bool {
        self.gain_changed || self.rf_changed || self.sample_rate_changed
    }
}

/// Status codes reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    Fail,
    InvalidParam,
    OutOfRange,
    GainUpdateError,
    RfUpdateError,
    SampleRateUpdateError,
    HardwareError,
    AliasingError,
    AlreadyInitialised,
    NotInitialised,
    Unknown(i32),
}

impl DriverStatus {
    /// Converts a raw status code. `0` is success and maps to `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            0 => return None,
            1 => Self::Fail,
            2 => Self::InvalidParam,
            3 => Self::OutOfRange,
            4 => Self::GainUpdateError,
            5 => Self::RfUpdateError,
            6 => Self::SampleRateUpdateError,
            7 => Self::HardwareError,
            8 => Self::AliasingError,
            9 => Self::AlreadyInitialised,
            10 => Self::NotInitialised,
            code => Self::Unknown(code),
        };
        Some(status)
    }
}

impl Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "failure"),
            Self::InvalidParam => write!(f, "invalid parameter"),
            Self::OutOfRange => write!(f, "out of range"),
            Self::GainUpdateError => write!(f, "gain update error"),
            Self::RfUpdateError => write!(f, "rf update error"),
            Self::SampleRateUpdateError => write!(f, "sample rate update error"),
            Self::HardwareError => write!(f, "hardware error"),
            Self::AliasingError => write!(f, "aliasing error"),
            Self::AlreadyInitialised => write!(f, "already initialised"),
            Self::NotInitialised => write!(f, "not initialised"),
            Self::Unknown(code) => write!(f, "unknown status {code}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("driver error: {status}")]
pub struct DriverError {
    pub status: DriverStatus,
}

impl DriverError {
    #[inline]
    pub fn new(status: DriverStatus) -> Self {
        Self { status }
    }

    /// Turns a raw status code into a `Result`.
    #[inline]
    pub fn check(code: i32) -> Result<(), Self> {
        match DriverStatus::from_code(code) {
            None => Ok(()),
            Some(status) => Err(Self::new(status)),
        }
    }
}

/// Tuner driver primitives.
///
/// All methods take `&self`: the receiver blocks in
/// [`read_packet`](Driver::read_packet) without holding its own lock, so a
/// configuration change may call into the driver while a read is in
/// progress. Implementations synchronize internally.
pub trait Driver: Send + Sync {
    /// Initializes the tuner and returns the number of samples per packet.
    fn init(&self, params: InitParams) -> Result<usize, DriverError>;

    fn uninit(&self) -> Result<(), DriverError>;

    /// Blocks until a packet is available and writes it into `i` and `q`,
    /// which are exactly as long as the negotiated packet size.
    fn read_packet(&self, i: &mut [i16], q: &mut [i16]) -> Result<PacketInfo, DriverError>;

    fn set_sample_rate_delta(&self, delta: f64) -> Result<(), DriverError>;

    fn set_rf_delta(&self, delta: f64) -> Result<(), DriverError>;

    fn set_gain_reduction(&self, gain_reduction: i32) -> Result<(), DriverError>;

    fn set_dc_mode(&self, automatic: bool) -> Result<(), DriverError>;
}

macro_rules! impl_driver_for_pointer {
    ($($pointer:ident),*) => {
        $(
            impl<D: Driver + ?Sized> Driver for $pointer<D> {
                #[inline]
                fn init(&self, params: InitParams) -> Result<usize, DriverError> {
                    (**self).init(params)
                }

                #[inline]
                fn uninit(&self) -> Result<(), DriverError> {
                    (**self).uninit()
                }

                #[inline]
                fn read_packet(
                    &self,
                    i: &mut [i16],
                    q: &mut [i16],
                ) -> Result<PacketInfo, DriverError> {
                    (**self).read_packet(i, q)
                }

                #[inline]
                fn set_sample_rate_delta(&self, delta: f64) -> Result<(), DriverError> {
                    (**self).set_sample_rate_delta(delta)
                }

                #[inline]
                fn set_rf_delta(&self, delta: f64) -> Result<(), DriverError> {
                    (**self).set_rf_delta(delta)
                }

                #[inline]
                fn set_gain_reduction(&self, gain_reduction: i32) -> Result<(), DriverError> {
                    (**self).set_gain_reduction(gain_reduction)
                }

                #[inline]
                fn set_dc_mode(&self, automatic: bool) -> Result<(), DriverError> {
                    (**self).set_dc_mode(automatic)
                }
            }
        )*
    };
}

impl_driver_for_pointer!(Box, Arc);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(DriverError::check(0), Ok(()));
        assert_eq!(
            DriverError::check(7),
            Err(DriverError::new(DriverStatus::HardwareError))
        );
        assert_eq!(DriverStatus::from_code(42), Some(DriverStatus::Unknown(42)));
    }

    #[test]
    fn init_params_use_mhz() {
        let params = DeviceParameters::default();
        let init = InitParams::from(&params);
        assert_eq!(init.sample_rate_mhz, 2.048);
        assert_eq!(init.center_frequency_mhz, 200.0);
        assert_eq!(init.gain_reduction, 60);
        assert_eq!(init.bandwidth.khz(), 1536);
    }
}
