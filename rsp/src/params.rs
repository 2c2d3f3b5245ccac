use std::ops::RangeInclusive;

use crate::{
    bandwidth::{
        Bandwidth,
        IfMode,
    },
    gain::{
        Band,
        GainLimits,
        gain_limits_for,
    },
};

pub const DEFAULT_SAMPLE_RATE: f64 = 2.048e6;
pub const DEFAULT_CENTER_FREQUENCY: f64 = 200e6;
pub const DEFAULT_GAIN_REDUCTION: i32 = 60;

pub const SAMPLE_RATE_RANGE: RangeInclusive<f64> = 2e6..=12e6;

/// DC offset correction modes a host may ask for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DcOffsetMode {
    #[default]
    Off,
    /// Not supported by the tuner. Treated as [`DcOffsetMode::Off`].
    Manual,
    Automatic,
}

/// Tuning parameters of the receiver.
///
/// All mutation goes through the `apply_*` methods, which keep the derived
/// fields consistent: the gain always lies within the limits of the current
/// band and the gain reduction register value is always `round(max - gain)`.
/// Non-finite requests leave the setting unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceParameters {
    sample_rate: f64,
    center_frequency: f64,
    bandwidth: Bandwidth,
    if_mode: IfMode,
    gain_reduction: i32,
    gain: f64,
    gain_limits: GainLimits,
    automatic_gain: bool,
    dc_offset_auto: bool,
    packet_samples: usize,
}

impl Default for DeviceParameters {
    fn default() -> Self {
        let gain_limits = gain_limits_for(DEFAULT_CENTER_FREQUENCY)
            .unwrap_or(Band::BandIII.gain_limits());

        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            center_frequency: DEFAULT_CENTER_FREQUENCY,
            bandwidth: Bandwidth::default(),
            if_mode: IfMode::default(),
            gain_reduction: DEFAULT_GAIN_REDUCTION,
            gain: (gain_limits.max - DEFAULT_GAIN_REDUCTION) as f64,
            gain_limits,
            automatic_gain: false,
            dc_offset_auto: false,
            packet_samples: 0,
        }
    }
}

impl DeviceParameters {
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    #[inline]
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    #[inline]
    pub fn if_mode(&self) -> IfMode {
        self.if_mode
    }

    #[inline]
    pub fn gain_reduction(&self) -> i32 {
        self.gain_reduction
    }

    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    pub fn gain_limits(&self) -> GainLimits {
        self.gain_limits
    }

    #[inline]
    pub fn automatic_gain(&self) -> bool {
        self.automatic_gain
    }

    #[inline]
    pub fn dc_offset_auto(&self) -> bool {
        self.dc_offset_auto
    }

    /// Samples per packet as negotiated at the last initialization. 0 before
    /// the first one.
    #[inline]
    pub fn packet_samples(&self) -> usize {
        self.packet_samples
    }

    /// Sets the center frequency and returns the change from the previous
    /// one.
    ///
    /// If the frequency falls into a band with different gain limits, the
    /// gain is clamped into the new limits and the gain reduction is
    /// recomputed.
    pub fn apply_frequency(&mut self, frequency: f64) -> f64 {
        if !frequency.is_finite() {
            return 0.0;
        }

        let delta = frequency - self.center_frequency;
        self.center_frequency = frequency;

        if let Some(gain_limits) = gain_limits_for(frequency) {
            self.gain_limits = gain_limits;
        }
        self.apply_gain(self.gain);

        delta
    }

    /// Sets the sample rate, clamped to the supported range, and returns the
    /// change from the previous one.
    pub fn apply_sample_rate(&mut self, sample_rate: f64) -> f64 {
        if !sample_rate.is_finite() {
            return 0.0;
        }

        let sample_rate =
            sample_rate.clamp(*SAMPLE_RATE_RANGE.start(), *SAMPLE_RATE_RANGE.end());
        let delta = sample_rate - self.sample_rate;
        self.sample_rate = sample_rate;
        delta
    }

    /// Quantizes and sets the bandwidth. Returns `true` if the setting
    /// changed.
    pub fn apply_bandwidth(&mut self, bandwidth: f64) -> bool {
        if !bandwidth.is_finite() {
            return false;
        }

        let bandwidth = Bandwidth::from_hz(bandwidth);
        let changed = bandwidth != self.bandwidth;
        self.bandwidth = bandwidth;
        changed
    }

    /// Sets the gain, saturating at the limits of the current band.
    pub fn apply_gain(&mut self, gain: f64) -> f64 {
        if gain.is_finite() {
            self.gain = self.gain_limits.clamp(gain);
        }
        self.gain_reduction = (self.gain_limits.max as f64 - self.gain).round() as i32;
        self.gain
    }

    pub fn apply_gain_mode(&mut self, automatic: bool) -> bool {
        self.automatic_gain = automatic;
        automatic
    }

    /// Sets the DC offset correction mode and returns the mode that is
    /// actually in effect.
    pub fn apply_dc_mode(&mut self, mode: DcOffsetMode) -> DcOffsetMode {
        self.dc_offset_auto = mode == DcOffsetMode::Automatic;
        self.dc_offset_mode()
    }

    pub fn dc_offset_mode(&self) -> DcOffsetMode {
        if self.dc_offset_auto {
            DcOffsetMode::Automatic
        }
        else {
            DcOffsetMode::Off
        }
    }

    pub(crate) fn set_packet_samples(&mut self, packet_samples: usize) {
        self.packet_samples = packet_samples;
    }
}
