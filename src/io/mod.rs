//! Sample sources and sinks at the radio / file boundary
//!
//! Every call moves exactly one frame. Conditions met while filling a frame
//! travel upward as [`RxStatus`] flags; the receiver never retries. Sources
//! backed by recorded data rewind at the end of it, which closed-loop
//! simulation relies on, and say so with the `rewound` flag.
//!
//! Binary files hold interleaved little-endian `f32` I/Q pairs.

use num_complex::Complex64;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{PhyError, PhyResult};
use crate::traits::{SampleSink, SampleSource};

/// Bytes per complex sample on the wire
pub const BYTES_PER_SAMPLE: usize = 8;

/// Flags raised while receiving one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxStatus {
    /// No more data; the rest of the frame is zeros
    pub end_of_stream: bool,
    /// Samples were dropped upstream
    pub overflow: bool,
    /// Frames arrived out of order
    pub sequence_error: bool,
    /// Nothing arrived in time
    pub timeout: bool,
    /// The source wrapped to the start of its data
    pub rewound: bool,
}

impl RxStatus {
    /// Any condition other than an expected rewind
    pub fn is_error(&self) -> bool {
        self.end_of_stream || self.overflow || self.sequence_error || self.timeout
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Encode samples as interleaved little-endian `f32`
pub fn encode_iq_f32(samples: &[Complex64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for s in samples {
        out.extend_from_slice(&(s.re as f32).to_le_bytes());
        out.extend_from_slice(&(s.im as f32).to_le_bytes());
    }
    out
}

/// Decode interleaved little-endian `f32` pairs
pub fn decode_iq_f32(bytes: &[u8]) -> PhyResult<Vec<Complex64>> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(PhyError::InvalidGeometry(format!(
            "{} bytes is not a whole number of I/Q pairs",
            bytes.len()
        )));
    }
    Ok(bytes.chunks_exact(BYTES_PER_SAMPLE).map(decode_pair).collect())
}

#[inline]
fn decode_pair(b: &[u8]) -> Complex64 {
    let re = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    let im = f32::from_le_bytes([b[4], b[5], b[6], b[7]]);
    Complex64::new(re as f64, im as f64)
}

// ============================================================================
// In-memory source and sink
// ============================================================================

/// Source replaying a buffer
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<Complex64>,
    pos: usize,
    rewind: bool,
}

impl MemorySource {
    /// Source that wraps around at the end of `data`
    pub fn new(data: Vec<Complex64>) -> Self {
        Self {
            data,
            pos: 0,
            rewind: true,
        }
    }

    /// Source that reports end of stream instead of wrapping
    pub fn once(data: Vec<Complex64>) -> Self {
        Self {
            rewind: false,
            ..Self::new(data)
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl SampleSource for MemorySource {
    fn receive(&mut self, frame: &mut [Complex64]) -> PhyResult<RxStatus> {
        let mut status = RxStatus::default();
        let mut filled = 0;
        while filled < frame.len() {
            if self.pos == self.data.len() {
                if !self.rewind || self.data.is_empty() {
                    frame[filled..].fill(Complex64::default());
                    status.end_of_stream = true;
                    break;
                }
                self.pos = 0;
                status.rewound = true;
            }
            let n = (frame.len() - filled).min(self.data.len() - self.pos);
            frame[filled..filled + n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(status)
    }
}

/// Sink collecting every frame
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    data: Vec<Complex64>,
    frames: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> Vec<Complex64> {
        self.data
    }
}

impl SampleSink for MemorySink {
    fn send(&mut self, frame: &[Complex64]) -> PhyResult<()> {
        self.data.extend_from_slice(frame);
        self.frames += 1;
        Ok(())
    }
}

// ============================================================================
// Binary file source and sink
// ============================================================================

/// Source reading a binary I/Q file, rewinding at its end
pub struct BinaryFileSource {
    reader: BufReader<File>,
    bytes: Vec<u8>,
}

impl BinaryFileSource {
    pub fn open(path: &Path) -> PhyResult<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            bytes: Vec::new(),
        })
    }

    /// Read as many bytes as possible into `buf`, stopping at EOF
    fn read_full(&mut self, buf: &mut [u8]) -> PhyResult<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.reader.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }
}

impl SampleSource for BinaryFileSource {
    fn receive(&mut self, frame: &mut [Complex64]) -> PhyResult<RxStatus> {
        let mut status = RxStatus::default();
        let mut filled = 0;
        let mut bytes = std::mem::take(&mut self.bytes);
        bytes.resize(frame.len() * BYTES_PER_SAMPLE, 0);

        while filled < frame.len() {
            let want = (frame.len() - filled) * BYTES_PER_SAMPLE;
            let got = self.read_full(&mut bytes[..want])? / BYTES_PER_SAMPLE;
            for (y, b) in frame[filled..filled + got]
                .iter_mut()
                .zip(bytes.chunks_exact(BYTES_PER_SAMPLE))
            {
                *y = decode_pair(b);
            }
            filled += got;
            if filled < frame.len() {
                // A rewind that still yields nothing means the file is empty
                if got == 0 && status.rewound {
                    frame[filled..].fill(Complex64::default());
                    status.end_of_stream = true;
                    break;
                }
                self.reader.seek(SeekFrom::Start(0))?;
                status.rewound = true;
            }
        }
        self.bytes = bytes;
        Ok(status)
    }
}

/// Sink appending frames to a binary I/Q file
pub struct BinaryFileSink {
    writer: BufWriter<File>,
}

impl BinaryFileSink {
    pub fn create(path: &Path) -> PhyResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn flush(&mut self) -> PhyResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl SampleSink for BinaryFileSink {
    fn send(&mut self, frame: &[Complex64]) -> PhyResult<()> {
        self.writer.write_all(&encode_iq_f32(frame))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<Complex64> {
        (0..n).map(|i| Complex64::new(i as f64, -(i as f64) / 4.0)).collect()
    }

    #[test]
    fn test_memory_source_rewinds() {
        let mut src = MemorySource::new(samples(10));
        let mut frame = vec![Complex64::default(); 4];

        assert_eq!(src.receive(&mut frame).unwrap(), RxStatus::default());
        src.receive(&mut frame).unwrap();
        let status = src.receive(&mut frame).unwrap();
        assert!(status.rewound && !status.is_error(), "{:?}", status);
        assert_eq!(frame[1], Complex64::new(9.0, -2.25));
        assert_eq!(frame[2], Complex64::new(0.0, 0.0));
        assert_eq!(src.position(), 2);
    }

    #[test]
    fn test_memory_source_once_ends() {
        let mut src = MemorySource::once(samples(6));
        let mut frame = vec![Complex64::new(7.0, 7.0); 4];
        src.receive(&mut frame).unwrap();
        let status = src.receive(&mut frame).unwrap();
        assert!(status.end_of_stream);
        assert_eq!(frame[1], Complex64::new(5.0, -1.25));
        assert_eq!(frame[2], Complex64::default());
    }

    #[test]
    fn test_empty_source_does_not_spin() {
        let mut src = MemorySource::new(Vec::new());
        let mut frame = vec![Complex64::default(); 4];
        assert!(src.receive(&mut frame).unwrap().end_of_stream);
    }

    #[test]
    fn test_wire_format() {
        let bytes = encode_iq_f32(&[Complex64::new(1.0, -0.5)]);
        assert_eq!(bytes, [0, 0, 128, 63, 0, 0, 0, 191]);
        assert_eq!(decode_iq_f32(&bytes).unwrap(), vec![Complex64::new(1.0, -0.5)]);
        assert!(decode_iq_f32(&bytes[..7]).is_err());
    }

    #[test]
    fn test_file_sink_and_source() {
        let path = std::env::temp_dir().join(format!("dvbs2_phy_io_{}.cf32", std::process::id()));
        {
            let mut sink = BinaryFileSink::create(&path).unwrap();
            sink.send(&samples(6)).unwrap();
            sink.flush().unwrap();
        }

        let mut src = BinaryFileSource::open(&path).unwrap();
        let mut frame = vec![Complex64::default(); 4];
        assert_eq!(src.receive(&mut frame).unwrap(), RxStatus::default());
        assert_eq!(frame, samples(4));

        let status = src.receive(&mut frame).unwrap();
        assert!(status.rewound);
        assert_eq!(frame[1], Complex64::new(5.0, -1.25));
        assert_eq!(frame[2], Complex64::new(0.0, 0.0));
        assert_eq!(frame[3], Complex64::new(1.0, -0.25));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.send(&samples(3)).unwrap();
        sink.send(&samples(2)).unwrap();
        assert_eq!(sink.frames(), 2);
        assert_eq!(sink.data().len(), 5);
    }
}
