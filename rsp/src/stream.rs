//! Reassembly of tuner packets into arbitrarily sized reads.

use std::ops::Range;

use num_complex::Complex;
use parking_lot::MutexGuard;

use crate::{
    Error,
    driver::{
        Driver,
        DriverError,
        MAX_PACKET_SAMPLES,
        PacketInfo,
    },
    receiver::{
        Core,
        StreamState,
    },
};

/// The tuner delivers 12 bit samples in 16 bit fields.
pub const SAMPLE_SCALE: f32 = 1.0 / 2048.0;

#[inline]
pub fn convert_iq(i: i16, q: i16) -> Complex<f32> {
    Complex {
        re: i as f32 * SAMPLE_SCALE,
        im: q as f32 * SAMPLE_SCALE,
    }
}

/// Result of a [`Receiver::pull`](crate::Receiver::pull).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    /// The whole output buffer was filled with this many samples.
    Samples(usize),
    /// The stream was closed, or failed earlier. No samples were written.
    EndOfStream,
}

/// One packet worth of raw samples.
///
/// The arrays have room for the largest packet the tuner can negotiate;
/// `len` says how much of it holds the last packet read.
#[derive(Clone, Debug)]
pub struct PacketBuffer {
    i: [i16; MAX_PACKET_SAMPLES],
    q: [i16; MAX_PACKET_SAMPLES],
    len: usize,
}

impl PacketBuffer {
    pub fn new() -> Box<Self> {
        Box::new(Self {
            i: [0; MAX_PACKET_SAMPLES],
            q: [0; MAX_PACKET_SAMPLES],
            len: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn read_from<D: Driver + ?Sized>(
        &mut self,
        driver: &D,
        packet_samples: usize,
    ) -> Result<PacketInfo, DriverError> {
        assert!(packet_samples <= MAX_PACKET_SAMPLES);

        self.len = 0;
        let info = driver.read_packet(&mut self.i[..packet_samples], &mut self.q[..packet_samples])?;
        self.len = packet_samples;

        Ok(info)
    }

    fn copy_to(&self, range: Range<usize>, output: &mut [Complex<f32>]) {
        assert!(range.end <= self.len);

        for ((i, q), output) in self.i[range.clone()]
            .iter()
            .zip(&self.q[range])
            .zip(output)
        {
            *output = convert_iq(*i, *q);
        }
    }
}

/// Holds the last packet read and how much of it was consumed.
///
/// `carry_over` is the index of the first unconsumed sample of the packet,
/// or 0 if there is nothing left in it.
#[derive(Debug)]
pub struct StreamReassembler {
    /// `None` while a read is in progress, or after the stream was closed.
    packet: Option<Box<PacketBuffer>>,
    carry_over: usize,
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self {
            packet: Some(PacketBuffer::new()),
            carry_over: 0,
        }
    }

    /// A reassembler without a buffer.
    pub fn released() -> Self {
        Self {
            packet: None,
            carry_over: 0,
        }
    }

    #[inline]
    pub fn carry_over(&self) -> usize {
        self.carry_over
    }

    /// Number of samples left over from the last packet.
    pub fn buffered(&self) -> usize {
        match &self.packet {
            Some(packet) if self.carry_over > 0 => packet.len() - self.carry_over,
            _ => 0,
        }
    }

    /// Forgets any carry-over.
    #[inline]
    pub fn reset(&mut self) {
        self.carry_over = 0;
    }

    /// Copies carried-over samples into `output` and returns how many were
    /// copied.
    pub fn emit_carry_over(&mut self, output: &mut [Complex<f32>]) -> usize {
        let Some(packet) = &self.packet
        else {
            return 0;
        };
        if self.carry_over == 0 {
            return 0;
        }

        let n = (packet.len() - self.carry_over).min(output.len());
        packet.copy_to(self.carry_over..self.carry_over + n, &mut output[..n]);

        self.carry_over += n;
        if self.carry_over == packet.len() {
            self.carry_over = 0;
        }

        n
    }

    /// Takes the packet buffer out for a read. Returns `None` if another read
    /// is in progress or the stream was closed.
    fn take_packet(&mut self) -> Option<Box<PacketBuffer>> {
        debug_assert_eq!(self.carry_over, 0);
        self.packet.take()
    }

    /// Puts a freshly read packet back and copies its head into `output`.
    /// With `keep_tail` the rest of the packet is kept as carry-over,
    /// otherwise it is dropped.
    fn emit_packet(
        &mut self,
        packet: Box<PacketBuffer>,
        output: &mut [Complex<f32>],
        keep_tail: bool,
    ) -> usize {
        let n = packet.len().min(output.len());
        packet.copy_to(0..n, &mut output[..n]);

        self.carry_over = if keep_tail && n < packet.len() { n } else { 0 };
        self.packet = Some(packet);

        n
    }

    /// Puts the packet buffer back without using its contents.
    fn discard_packet(&mut self, packet: Box<PacketBuffer>) {
        self.carry_over = 0;
        self.packet = Some(packet);
    }
}

/// Fills `output` from the tuner, starting with carried-over samples.
///
/// The lock is released while blocked in the driver's packet read. If the
/// session was reinitialized in the meantime, the packet is still emitted
/// but its unconsumed tail is dropped, since the carry-over was reset by the
/// reinitialization. A read that fails because of the reinitialization is
/// retried.
pub(crate) fn pull<D: Driver>(
    core: &mut MutexGuard<'_, Core<D>>,
    output: &mut [Complex<f32>],
) -> Result<Pull, Error> {
    if core.stream != StreamState::Ready {
        return Ok(Pull::EndOfStream);
    }
    let epoch = core.epoch;

    let mut filled = core.reassembler.emit_carry_over(output);

    while filled < output.len() {
        let reader = {
            let Core { session, params, .. } = &mut **core;
            session.open_reader(params)?
        };
        let Some(mut packet) = core.reassembler.take_packet()
        else {
            return Err(Error::Busy);
        };

        let result = MutexGuard::unlocked(core, || reader.read_packet(&mut packet));

        if core.stream != StreamState::Ready || core.epoch != epoch {
            // the stream was closed (and maybe reopened) during the read.
            return Ok(Pull::EndOfStream);
        }
        let current = core.session.is_open() && core.session.generation() == reader.generation();

        match result {
            Ok(info) => {
                if info.any_changed() {
                    // TODO: decide whether to resync the parameters with the tuner's
                    // own adjustments. For now they're only logged.
                    tracing::trace!(?info, "tuner changed settings on its own");
                }

                filled += core
                    .reassembler
                    .emit_packet(packet, &mut output[filled..], current);
            }
            Err(error) if !current => {
                tracing::debug!(%error, "read interrupted by reinit");
                core.reassembler.discard_packet(packet);
            }
            Err(error) => {
                tracing::error!(%error, "read failed");
                core.reassembler.discard_packet(packet);
                core.close_session();
                core.stream = StreamState::Failed;
                return Err(Error::Read(error));
            }
        }
    }

    Ok(Pull::Samples(filled))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::driver::test::RampDriver;

    fn packet_from_ramp(driver: &RampDriver, packet_samples: usize) -> Box<PacketBuffer> {
        let mut packet = PacketBuffer::new();
        packet.read_from(driver, packet_samples).unwrap();
        packet
    }

    fn indices(samples: &[Complex<f32>]) -> Vec<u64> {
        samples.iter().copied().map(RampDriver::index_of).collect()
    }

    fn opened_ramp(packet_samples: usize) -> Arc<RampDriver> {
        let driver = Arc::new(RampDriver::new(packet_samples));
        driver
            .init(crate::driver::InitParams::from(
                &crate::params::DeviceParameters::default(),
            ))
            .unwrap();
        driver
    }

    #[test]
    fn scaling() {
        assert_abs_diff_eq!(convert_iq(2047, -2048).re, 0.99951171875);
        assert_abs_diff_eq!(convert_iq(2047, -2048).im, -1.0);
        assert_eq!(convert_iq(0, 1024), Complex::new(0.0, 0.5));
    }

    #[test]
    fn partial_packet_is_carried_over() {
        let driver = opened_ramp(8);
        let mut reassembler = StreamReassembler::new();
        let packet = reassembler.take_packet().unwrap();
        assert!(packet.is_empty());
        let packet = packet_from_ramp(&driver, 8);

        let mut output = [Complex::default(); 3];
        assert_eq!(reassembler.emit_packet(packet, &mut output, true), 3);
        assert_eq!(indices(&output), vec![0, 1, 2]);
        assert_eq!(reassembler.carry_over(), 3);
        assert_eq!(reassembler.buffered(), 5);

        let mut output = [Complex::default(); 2];
        assert_eq!(reassembler.emit_carry_over(&mut output), 2);
        assert_eq!(indices(&output), vec![3, 4]);
        assert_eq!(reassembler.carry_over(), 5);

        let mut output = [Complex::default(); 10];
        assert_eq!(reassembler.emit_carry_over(&mut output), 3);
        assert_eq!(indices(&output[..3]), vec![5, 6, 7]);
        assert_eq!(reassembler.carry_over(), 0);
        assert_eq!(reassembler.emit_carry_over(&mut output), 0);
    }

    #[test]
    fn whole_packet_leaves_no_carry_over() {
        let driver = opened_ramp(8);
        let mut reassembler = StreamReassembler::new();
        reassembler.take_packet().unwrap();

        let mut output = [Complex::default(); 8];
        let packet = packet_from_ramp(&driver, 8);
        assert_eq!(reassembler.emit_packet(packet, &mut output, true), 8);
        assert_eq!(reassembler.carry_over(), 0);
    }

    #[test]
    fn stale_tail_is_dropped() {
        let driver = opened_ramp(8);
        let mut reassembler = StreamReassembler::new();
        reassembler.take_packet().unwrap();

        let mut output = [Complex::default(); 3];
        let packet = packet_from_ramp(&driver, 8);
        assert_eq!(reassembler.emit_packet(packet, &mut output, false), 3);
        assert_eq!(reassembler.carry_over(), 0);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn only_one_read_at_a_time() {
        let mut reassembler = StreamReassembler::new();
        let packet = reassembler.take_packet().unwrap();
        assert!(reassembler.take_packet().is_none());
        reassembler.discard_packet(packet);
        assert!(reassembler.take_packet().is_some());

        assert!(StreamReassembler::released().take_packet().is_none());
    }
}
