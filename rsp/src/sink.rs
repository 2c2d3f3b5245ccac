use std::io::Write;

use num_complex::Complex;

use crate::io::WriteSamples;

#[derive(Debug, thiserror::Error)]
#[error("raw sample writer error")]
pub struct RawWriterError(#[from] std::io::Error);

/// Writes complex samples as interleaved little-endian `f32` pairs ("cf32").
#[derive(Debug)]
pub struct RawWriter<W> {
    writer: W,
    #[cfg(target_endian = "big")]
    buffer: Vec<u8>,
}

impl<W> RawWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            #[cfg(target_endian = "big")]
            buffer: vec![],
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> WriteSamples<Complex<f32>> for RawWriter<W> {
    type Error = RawWriterError;

    fn write_samples(&mut self, buffer: &[Complex<f32>]) -> Result<usize, Self::Error> {
        #[cfg(target_endian = "little")]
        self.writer.write_all(bytemuck::cast_slice(buffer))?;

        #[cfg(target_endian = "big")]
        {
            self.buffer.clear();
            for sample in buffer {
                self.buffer.extend_from_slice(&sample.re.to_le_bytes());
                self.buffer.extend_from_slice(&sample.im.to_le_bytes());
            }
            self.writer.write_all(&self.buffer)?;
        }

        Ok(buffer.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_interleaved_le_floats() {
        let mut writer = RawWriter::new(vec![]);
        let n = writer
            .write_samples(&[Complex::new(1.0, -0.5), Complex::new(0.25, 0.0)])
            .unwrap();
        assert_eq!(n, 2);

        let bytes = writer.into_inner();
        let mut expected = vec![];
        for x in [1.0f32, -0.5, 0.25, 0.0] {
            expected.extend_from_slice(&x.to_le_bytes());
        }
        assert_eq!(bytes, expected);
    }
}
