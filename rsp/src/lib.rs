//! Streaming IQ samples from SDRplay RSP tuners.
//!
//! The tuner delivers samples in packets whose size is negotiated when it's
//! initialized. [`Receiver`] stitches them into reads of any length, while
//! its tuning parameters can be changed from other threads at any time.

pub mod bandwidth;
pub mod driver;
pub mod gain;
pub mod io;
pub mod params;
pub mod receiver;
pub mod session;
pub mod sink;
pub mod stream;

pub use crate::{
    bandwidth::Bandwidth,
    driver::{
        Driver,
        DriverError,
    },
    params::{
        DcOffsetMode,
        DeviceParameters,
    },
    receiver::{
        Receiver,
        StreamState,
    },
    stream::Pull,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tuner initialization failed")]
    Init(#[source] DriverError),
    #[error("reading packet from tuner failed")]
    Read(#[source] DriverError),
    #[error("adjusting tuner failed")]
    Adjust(#[source] DriverError),
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    #[error("another pull is in progress")]
    Busy,
}

pub trait GetSampleRate {
    fn sample_rate(&self) -> f64;
}

impl<T: GetSampleRate> GetSampleRate for &T {
    #[inline]
    fn sample_rate(&self) -> f64 {
        (&**self).sample_rate()
    }
}

impl<T: GetSampleRate> GetSampleRate for std::sync::Arc<T> {
    #[inline]
    fn sample_rate(&self) -> f64 {
        (&**self).sample_rate()
    }
}

pub trait GetCenterFrequency {
    fn center_frequency(&self) -> f64;
}

impl<T: GetCenterFrequency> GetCenterFrequency for &T {
    #[inline]
    fn center_frequency(&self) -> f64 {
        (&**self).center_frequency()
    }
}

impl<T: GetCenterFrequency> GetCenterFrequency for std::sync::Arc<T> {
    #[inline]
    fn center_frequency(&self) -> f64 {
        (&**self).center_frequency()
    }
}
