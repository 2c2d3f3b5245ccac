//! Blocking sample I/O.

use std::convert::Infallible;

use num_complex::Complex;

use crate::{
    Error,
    driver::Driver,
    receiver::Receiver,
    stream::Pull,
};

pub trait ReadSamples<S> {
    type Error;

    /// Reads samples into `buffer` and returns how many were read. Returning
    /// `Ok(0)` for a non-empty buffer signals the end of the stream.
    fn read_samples(&mut self, buffer: &mut [S]) -> Result<usize, Self::Error>;
}

impl<S, R: ReadSamples<S> + ?Sized> ReadSamples<S> for &mut R {
    type Error = R::Error;

    #[inline]
    fn read_samples(&mut self, buffer: &mut [S]) -> Result<usize, Self::Error> {
        (**self).read_samples(buffer)
    }
}

impl<S: Copy> ReadSamples<S> for &[S] {
    type Error = Infallible;

    fn read_samples(&mut self, buffer: &mut [S]) -> Result<usize, Self::Error> {
        let n = buffer.len().min(self.len());
        let (head, tail) = self.split_at(n);
        buffer[..n].copy_from_slice(head);
        *self = tail;
        Ok(n)
    }
}

impl<D: Driver> ReadSamples<Complex<f32>> for &Receiver<D> {
    type Error = Error;

    fn read_samples(&mut self, buffer: &mut [Complex<f32>]) -> Result<usize, Self::Error> {
        match self.pull(buffer)? {
            Pull::Samples(n) => Ok(n),
            Pull::EndOfStream => Ok(0),
        }
    }
}

impl<D: Driver> ReadSamples<Complex<f32>> for Receiver<D> {
    type Error = Error;

    #[inline]
    fn read_samples(&mut self, buffer: &mut [Complex<f32>]) -> Result<usize, Self::Error> {
        (&*self).read_samples(buffer)
    }
}

pub trait WriteSamples<S> {
    type Error;

    /// Writes samples from `buffer` and returns how many were consumed.
    fn write_samples(&mut self, buffer: &[S]) -> Result<usize, Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<S, W: WriteSamples<S> + ?Sized> WriteSamples<S> for &mut W {
    type Error = W::Error;

    #[inline]
    fn write_samples(&mut self, buffer: &[S]) -> Result<usize, Self::Error> {
        (**self).write_samples(buffer)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}

impl<S: Clone> WriteSamples<S> for Vec<S> {
    type Error = Infallible;

    fn write_samples(&mut self, buffer: &[S]) -> Result<usize, Self::Error> {
        self.extend_from_slice(buffer);
        Ok(buffer.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError<R, W> {
    #[error("reading from source failed")]
    Source(#[source] R),
    #[error("writing to sink failed")]
    Sink(#[source] W),
    #[error("sink stopped accepting samples")]
    SinkFull,
}

/// Reads from `source` and writes to `sink` until the source ends or `limit`
/// samples were forwarded. Returns the number of samples forwarded.
pub fn forward<S, R, W>(
    mut source: R,
    mut sink: W,
    buffer_size: usize,
    limit: Option<usize>,
) -> Result<usize, ForwardError<R::Error, W::Error>>
where
    S: Copy + Default,
    R: ReadSamples<S>,
    W: WriteSamples<S>,
{
    let mut buffer = vec![S::default(); buffer_size];
    let mut num_samples_written = 0;

    loop {
        let num_samples = limit.map_or(buffer_size, |limit| {
            (limit - num_samples_written).min(buffer_size)
        });
        if num_samples == 0 {
            break;
        }

        let num_samples_read = source
            .read_samples(&mut buffer[..num_samples])
            .map_err(ForwardError::Source)?;
        if num_samples_read == 0 {
            break;
        }

        let mut remaining = &buffer[..num_samples_read];
        while !remaining.is_empty() {
            let n = sink.write_samples(remaining).map_err(ForwardError::Sink)?;
            if n == 0 {
                return Err(ForwardError::SinkFull);
            }
            remaining = &remaining[n..];
        }

        num_samples_written += num_samples_read;
    }

    sink.flush().map_err(ForwardError::Sink)?;
    Ok(num_samples_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::test::RampDriver;

    #[test]
    fn forward_until_end_of_source() {
        let input: Vec<u32> = (0..100).collect();
        let mut output = vec![];
        let n = forward(&input[..], &mut output, 7, None).unwrap();
        assert_eq!(n, 100);
        assert_eq!(output, input);
    }

    #[test]
    fn forward_stops_at_limit() {
        let input: Vec<u32> = (0..100).collect();
        let mut output = vec![];
        let n = forward(&input[..], &mut output, 16, Some(40)).unwrap();
        assert_eq!(n, 40);
        assert_eq!(output, input[..40]);
    }

    #[test]
    fn receiver_end_of_stream_reads_zero() {
        let receiver = Receiver::new(RampDriver::new(252));
        let mut buffer = [Complex::default(); 100];
        assert_eq!((&receiver).read_samples(&mut buffer).unwrap(), 100);

        receiver.close_stream();
        assert_eq!((&receiver).read_samples(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn forward_from_receiver() {
        let receiver = Receiver::new(RampDriver::new(252));
        let mut output: Vec<Complex<f32>> = vec![];
        let n = forward(&receiver, &mut output, 1000, Some(2500)).unwrap();
        assert_eq!(n, 2500);

        let indices: Vec<u64> = output.into_iter().map(RampDriver::index_of).collect();
        assert_eq!(indices, (0..2500).collect::<Vec<u64>>());
    }
}
