//! PCM waveform container and RIFF/WAV serialization.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Bytes occupied by one 16-bit sample.
pub const BYTES_PER_SAMPLE: u32 = 2;

/// Size of the RIFF header preceding the sample data.
pub const RIFF_HEADER_LEN: usize = 44;

const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 0x0001;
const BITS_PER_SAMPLE: u16 = 16;

/// Header bytes counted by the RIFF size field: the data chunk header (8),
/// the fmt chunk body (16) and the `WAVE` tag plus fmt chunk header (12).
const RIFF_SIZE_OVERHEAD: u32 = 8 + 16 + 12;

/// Samples are buffered into chunks of this many bytes before each write.
const WRITE_CHUNK_LEN: usize = 4096;

/// Per-sample conversions for [`Waveform::encode_with`].
pub mod sample {
    /// Signed 16-bit little-endian, the representation used inside WAV files.
    pub fn s16le(sample: i16) -> [u8; 2] {
        sample.to_le_bytes()
    }

    /// Signed 16-bit big-endian, as used by AIFF and raw network audio.
    pub fn s16be(sample: i16) -> [u8; 2] {
        sample.to_be_bytes()
    }

    /// Unsigned 8-bit with a 128 offset, keeping only the high byte.
    pub fn u8(sample: i16) -> [u8; 1] {
        [((sample >> 8) + 128) as u8]
    }
}

/// A synthesized PCM waveform.
///
/// Samples are signed 16-bit and interleaved when there is more than one
/// channel. The waveform never changes after construction; encoding produces
/// bytes rather than a new waveform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    sample_rate: u16,
    num_samples: u32,
    num_channels: u16,
    samples: Vec<i16>,
}

impl Waveform {
    /// Build a waveform from interleaved samples.
    ///
    /// A trailing partial frame is dropped so that the sample count is always
    /// `num_samples * num_channels`. A waveform with zero channels is empty.
    pub fn new(sample_rate: u16, num_channels: u16, mut samples: Vec<i16>) -> Self {
        let frames = if num_channels == 0 {
            0
        } else {
            samples.len() / num_channels as usize
        };
        samples.truncate(frames * num_channels as usize);

        Self {
            sample_rate,
            num_samples: frames as u32,
            num_channels,
            samples,
        }
    }

    pub fn sample_rate(&self) -> u16 {
        self.sample_rate
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playing time of the waveform. Zero when the sample rate is zero.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }

        let rate = u64::from(self.sample_rate);
        let samples = u64::from(self.num_samples);
        let nanos = (samples % rate) * 1_000_000_000 / rate;
        Duration::new(samples / rate, nanos as u32)
    }

    /// Length of the sample data in bytes.
    pub fn data_len(&self) -> u64 {
        u64::from(self.num_channels) * u64::from(self.num_samples) * u64::from(BYTES_PER_SAMPLE)
    }

    /// Length of the complete output of [`encode_riff`](Self::encode_riff).
    pub fn riff_len(&self) -> u64 {
        RIFF_HEADER_LEN as u64 + self.data_len()
    }

    /// Write the waveform as a complete RIFF/WAV stream.
    ///
    /// The first failing write aborts encoding and its error is returned.
    /// Whatever was written before that point stays on the sink.
    pub fn encode_riff<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.riff_header()?)?;
        self.encode(out)
    }

    /// Write only the sample data as signed 16-bit little-endian.
    pub fn encode<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.encode_with(out, sample::s16le)
    }

    /// Write only the sample data, converting each sample with `convert`.
    pub fn encode_with<W, F, B>(&self, out: &mut W, mut convert: F) -> io::Result<()>
    where
        W: Write + ?Sized,
        F: FnMut(i16) -> B,
        B: AsRef<[u8]>,
    {
        let mut chunk = Vec::with_capacity(WRITE_CHUNK_LEN);
        for &s in &self.samples {
            chunk.extend_from_slice(convert(s).as_ref());
            if chunk.len() >= WRITE_CHUNK_LEN {
                out.write_all(&chunk)?;
                chunk.clear();
            }
        }

        if !chunk.is_empty() {
            out.write_all(&chunk)?;
        }
        Ok(())
    }

    /// Encode the waveform into an in-memory WAV buffer.
    pub fn to_riff_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.riff_len() as usize);
        self.encode_riff(&mut buf)?;
        Ok(buf)
    }

    /// Write the waveform to a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(Error::Write)?;
        let mut out = BufWriter::new(file);
        self.encode_riff(&mut out).map_err(Error::Write)?;
        out.flush().map_err(Error::Write)
    }

    fn riff_header(&self) -> io::Result<[u8; RIFF_HEADER_LEN]> {
        let data_len = u32::try_from(self.data_len())
            .ok()
            .filter(|len| len.checked_add(RIFF_SIZE_OVERHEAD).is_some())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} bytes of samples exceed the RIFF size limit", self.data_len()),
                )
            })?;

        let channels = self.num_channels;
        let rate = u32::from(self.sample_rate);
        let block_align = u16::try_from(u32::from(channels) * BYTES_PER_SAMPLE).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{channels} channels do not fit a RIFF block"),
            )
        })?;
        let byte_rate = rate * u32::from(block_align);

        let mut header = [0u8; RIFF_HEADER_LEN];
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            header[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };

        put(b"RIFF");
        put(&(data_len + RIFF_SIZE_OVERHEAD).to_le_bytes());
        put(b"WAVE");
        put(b"fmt ");
        put(&FMT_CHUNK_LEN.to_le_bytes());
        put(&FORMAT_PCM.to_le_bytes());
        put(&channels.to_le_bytes());
        put(&rate.to_le_bytes());
        put(&byte_rate.to_le_bytes());
        put(&block_align.to_le_bytes());
        put(&BITS_PER_SAMPLE.to_le_bytes());
        put(b"data");
        put(&data_len.to_le_bytes());

        Ok(header)
    }
}
