//! Binding to the vendor's `mir_sdr` API (`libmirsdrapi-rsp`).
//!
//! The vendor API is a set of process-global functions operating on a single
//! device. Calls are serialized through a mutex, except for
//! `mir_sdr_ReadPacket`, which may block for a whole packet and is allowed to
//! run concurrently with the in-place adjustment calls.

use std::os::raw::{
    c_double,
    c_int,
    c_short,
    c_uint,
};

use parking_lot::Mutex;

use crate::driver::{
    Driver,
    DriverError,
    DriverStatus,
    InitParams,
    PacketInfo,
};

/// DC offset correction mode for continuous correction.
const DC_MODE_CONTINUOUS: c_int = 4;
const DC_MODE_STATIC: c_int = 0;

unsafe extern "C" {
    fn mir_sdr_Init(
        gain_reduction: c_int,
        sample_rate_mhz: c_double,
        rf_mhz: c_double,
        bandwidth: c_int,
        if_type: c_int,
        samples_per_packet: *mut c_int,
    ) -> c_int;

    fn mir_sdr_Uninit() -> c_int;

    fn mir_sdr_ReadPacket(
        xi: *mut c_short,
        xq: *mut c_short,
        first_sample_num: *mut c_uint,
        gain_changed: *mut c_int,
        rf_changed: *mut c_int,
        sample_rate_changed: *mut c_int,
    ) -> c_int;

    fn mir_sdr_SetFs(delta_hz: c_double, absolute: c_int, sync_update: c_int, recal: c_int)
    -> c_int;

    fn mir_sdr_SetRf(delta_hz: c_double, absolute: c_int, sync_update: c_int) -> c_int;

    fn mir_sdr_SetGr(gain_reduction: c_int, absolute: c_int, sync_update: c_int) -> c_int;

    fn mir_sdr_SetDcMode(dc_mode: c_int, speed_up: c_int) -> c_int;
}

#[derive(Debug)]
struct State {
    packet_samples: usize,
}

/// The RSP tuner, accessed through the vendor library.
///
/// Only one instance should exist per process, since the vendor API only
/// drives one device.
#[derive(Debug)]
pub struct MirSdr {
    state: Mutex<State>,
}

impl MirSdr {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State { packet_samples: 0 }),
        }
    }
}

impl Default for MirSdr {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MirSdr {
    fn init(&self, params: InitParams) -> Result<usize, DriverError> {
        let mut state = self.state.lock();
        let mut samples_per_packet: c_int = 0;

        let status = unsafe {
            mir_sdr_Init(
                params.gain_reduction,
                params.sample_rate_mhz,
                params.center_frequency_mhz,
                params.bandwidth.khz(),
                params.if_mode.khz(),
                &mut samples_per_packet,
            )
        };
        DriverError::check(status)?;

        state.packet_samples = samples_per_packet.max(0) as usize;
        Ok(state.packet_samples)
    }

    fn uninit(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.packet_samples = 0;
        DriverError::check(unsafe { mir_sdr_Uninit() })
    }

    fn read_packet(&self, i: &mut [i16], q: &mut [i16]) -> Result<PacketInfo, DriverError> {
        // the library writes a full packet, so the buffers must hold one.
        let packet_samples = self.state.lock().packet_samples;
        if i.len() < packet_samples || q.len() < packet_samples {
            return Err(DriverError::new(DriverStatus::InvalidParam));
        }

        let mut first_sample_num: c_uint = 0;
        let mut gain_changed: c_int = 0;
        let mut rf_changed: c_int = 0;
        let mut sample_rate_changed: c_int = 0;

        let status = unsafe {
            mir_sdr_ReadPacket(
                i.as_mut_ptr(),
                q.as_mut_ptr(),
                &mut first_sample_num,
                &mut gain_changed,
                &mut rf_changed,
                &mut sample_rate_changed,
            )
        };
        DriverError::check(status)?;

        Ok(PacketInfo {
            first_sample_num,
            gain_changed: gain_changed != 0,
            rf_changed: rf_changed != 0,
            sample_rate_changed: sample_rate_changed != 0,
        })
    }

    fn set_sample_rate_delta(&self, delta: f64) -> Result<(), DriverError> {
        let _state = self.state.lock();
        DriverError::check(unsafe { mir_sdr_SetFs(delta, 0, 0, 0) })
    }

    fn set_rf_delta(&self, delta: f64) -> Result<(), DriverError> {
        let _state = self.state.lock();
        DriverError::check(unsafe { mir_sdr_SetRf(delta, 0, 0) })
    }

    fn set_gain_reduction(&self, gain_reduction: i32) -> Result<(), DriverError> {
        let _state = self.state.lock();
        DriverError::check(unsafe { mir_sdr_SetGr(gain_reduction, 1, 0) })
    }

    fn set_dc_mode(&self, automatic: bool) -> Result<(), DriverError> {
        let _state = self.state.lock();
        let mode = if automatic {
            DC_MODE_CONTINUOUS
        }
        else {
            DC_MODE_STATIC
        };
        DriverError::check(unsafe { mir_sdr_SetDcMode(mode, 1) })
    }
}
