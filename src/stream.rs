//! Pull-based WAV streaming.
//!
//! [`WaveStream`] turns [`Waveform::encode_riff`] into a [`Read`]
//! implementation. On the first read it starts an encoder thread that writes
//! into one end of an in-memory [`pipe`] while the caller reads from the
//! other. Neither side imposes a timeout: a reader that stops reading stalls
//! the encoder, and a reader that goes away makes the encoder's next write
//! fail with [`io::ErrorKind::BrokenPipe`].

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::waveform::Waveform;

/// Number of written chunks the pipe buffers before writes block.
const PIPE_DEPTH: usize = 8;

type Chunk = io::Result<Vec<u8>>;

/// Create a unidirectional in-memory byte pipe.
pub fn pipe() -> (PipeReader, PipeWriter) {
    let (tx, rx) = bounded(PIPE_DEPTH);
    (
        PipeReader {
            rx,
            pending: Vec::new(),
            pos: 0,
            failed: None,
        },
        PipeWriter { tx },
    )
}

/// Write end of a [`pipe`].
///
/// Dropping the writer ends the stream; the reader sees end-of-file once it
/// has drained everything written before.
pub struct PipeWriter {
    tx: Sender<Chunk>,
}

impl PipeWriter {
    /// End the stream normally.
    pub fn close(self) {}

    /// End the stream so that the reader's next read fails with `err`.
    pub fn close_with_error(self, err: io::Error) {
        // Nobody is left to tell if the reader is gone.
        let _ = self.tx.send(Err(err));
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.tx.send(Ok(buf.to_vec())).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "wave stream reader closed")
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read end of a [`pipe`].
pub struct PipeReader {
    rx: Receiver<Chunk>,
    pending: Vec<u8>,
    pos: usize,
    failed: Option<(io::ErrorKind, String)>,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos >= self.pending.len() {
            if let Some((kind, msg)) = &self.failed {
                return Err(io::Error::new(*kind, msg.clone()));
            }

            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Ok(Err(err)) => {
                    self.failed = Some((err.kind(), err.to_string()));
                    return Err(err);
                }
                // Writer dropped: end of stream.
                Err(_) => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A [`Waveform`] readable as a WAV byte stream.
///
/// Each `WaveStream` is a single session: once it reaches the end or is
/// closed, reading from the start again needs a new `WaveStream`.
pub struct WaveStream {
    wave: Arc<Waveform>,
    reader: Option<PipeReader>,
    encoder: Option<JoinHandle<()>>,
    closed: bool,
}

impl WaveStream {
    pub fn new(wave: impl Into<Arc<Waveform>>) -> Self {
        Self {
            wave: wave.into(),
            reader: None,
            encoder: None,
            closed: false,
        }
    }

    pub fn waveform(&self) -> &Waveform {
        &self.wave
    }

    /// Stop reading. The encoder thread, if running, is shut down and joined.
    ///
    /// Later reads return end-of-file.
    pub fn close(&mut self) {
        self.closed = true;
        // Dropping the reader first makes any blocked encoder write fail.
        self.reader = None;
        if let Some(handle) = self.encoder.take() {
            if handle.join().is_err() {
                log::warn!("wave encoder thread panicked");
            }
        }
    }

    fn reader(&mut self) -> io::Result<&mut PipeReader> {
        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => self.start()?,
        };
        Ok(self.reader.insert(reader))
    }

    fn start(&mut self) -> io::Result<PipeReader> {
        let (reader, mut writer) = pipe();
        let wave = Arc::clone(&self.wave);

        let handle = thread::Builder::new()
            .name("wave-encoder".to_string())
            .spawn(move || match wave.encode_riff(&mut writer) {
                Ok(()) => writer.close(),
                Err(err) => {
                    log::debug!("wave encoding stopped: {err}");
                    writer.close_with_error(err);
                }
            })?;

        self.encoder = Some(handle);
        Ok(reader)
    }
}

impl Read for WaveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }
        self.reader()?.read(buf)
    }
}

impl Drop for WaveStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl From<Waveform> for WaveStream {
    fn from(wave: Waveform) -> Self {
        Self::new(wave)
    }
}

#[cfg(test)]
mod tests {
    use super::{pipe, WaveStream};
    use crate::waveform::Waveform;
    use std::io::{self, Read, Write};
    use std::thread;

    fn ramp(len: usize) -> Waveform {
        let samples = (0..len).map(|i| (i % 65536) as u16 as i16).collect();
        Waveform::new(16000, 1, samples)
    }

    #[test]
    fn streamed_bytes_match_direct_encoding() {
        let wave = ramp(100_000);
        let expected = wave.to_riff_bytes().unwrap();

        let mut stream = WaveStream::new(wave);
        let mut streamed = Vec::new();
        stream.read_to_end(&mut streamed).unwrap();

        assert_eq!(streamed, expected);
    }

    #[test]
    fn small_reads_reassemble_the_stream() {
        let wave = ramp(3000);
        let expected = wave.to_riff_bytes().unwrap();

        let mut stream = WaveStream::new(wave);
        let mut streamed = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            streamed.extend_from_slice(&buf[..n]);
        }

        assert_eq!(streamed, expected);
    }

    #[test]
    fn stream_decodes_with_hound() {
        let wave = ramp(500);
        let stream = WaveStream::new(wave.clone());

        let reader = hound::WavReader::new(stream).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, wave.samples());
    }

    #[test]
    fn early_close_does_not_block_the_encoder() {
        let mut stream = WaveStream::new(ramp(2_000_000));
        let mut head = [0u8; 4];
        stream.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"RIFF");

        stream.close();
        assert_eq!(stream.read(&mut head).unwrap(), 0);
    }

    #[test]
    fn dropping_an_unread_stream_is_fine() {
        let stream = WaveStream::new(ramp(10));
        drop(stream);
    }

    #[test]
    fn writer_error_reaches_the_reader() {
        let (mut reader, mut writer) = pipe();
        let producer = thread::spawn(move || {
            writer.write_all(b"partial").unwrap();
            writer.close_with_error(io::Error::new(io::ErrorKind::Other, "encoder failed"));
        });

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "encoder failed");
        assert_eq!(out, b"partial");

        // The failure sticks.
        let again = reader.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(again.to_string(), "encoder failed");
        producer.join().unwrap();
    }

    #[test]
    fn closed_writer_means_end_of_stream() {
        let (mut reader, mut writer) = pipe();
        writer.write_all(b"abc").unwrap();
        writer.close();

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn writes_fail_once_reader_is_gone() {
        let (reader, mut writer) = pipe();
        drop(reader);

        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
