//! Audio output for [`Synthesizer::say`](crate::Synthesizer::say).
//!
//! Enable the `playback` feature for [`RodioOutput`], which plays through the
//! default output device.

use crate::error::Result;
use crate::stream::WaveStream;

/// Something that plays a WAV byte stream.
pub trait AudioOutput {
    /// Start playing `stream` under the display name `name` and call
    /// `on_finish` once the last sample has been played. May return before
    /// playback ends.
    ///
    /// An implementation that fails after returning `Ok` must drop
    /// `on_finish` without calling it.
    fn play(
        &self,
        name: &str,
        stream: WaveStream,
        on_finish: Box<dyn FnOnce() + Send>,
    ) -> Result<()>;
}

#[cfg(feature = "playback")]
pub use self::device::RodioOutput;

#[cfg(feature = "playback")]
mod device {
    use std::io::Read;
    use std::time::Duration;

    use rodio::{OutputStreamBuilder, Sink, Source};

    use super::AudioOutput;
    use crate::error::{Error, Result};
    use crate::stream::WaveStream;

    /// Plays on the system's default output device.
    ///
    /// [`play`](AudioOutput::play) blocks until the sink has drained.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RodioOutput;

    impl RodioOutput {
        pub fn new() -> Self {
            Self
        }
    }

    impl AudioOutput for RodioOutput {
        fn play(
            &self,
            name: &str,
            stream: WaveStream,
            on_finish: Box<dyn FnOnce() + Send>,
        ) -> Result<()> {
            let source = WavSource::new(stream)?;
            let total = source.total_duration();

            let mut output = OutputStreamBuilder::open_default_stream()
                .map_err(|e| Error::Playback(format!("failed to open audio output: {e}")))?;
            let sink = Sink::connect_new(output.mixer());

            log::debug!("{name}: playing {total:.2?} of audio");
            sink.append(source);
            sink.sleep_until_end();
            output.log_on_drop(false);

            on_finish();
            Ok(())
        }
    }

    /// Decodes 16-bit WAV from a non-seekable reader as it plays.
    struct WavSource<R: Read> {
        samples: hound::WavIntoSamples<R, i16>,
        channels: u16,
        sample_rate: u32,
        duration: Duration,
    }

    impl<R: Read> WavSource<R> {
        fn new(reader: R) -> Result<Self> {
            let reader = hound::WavReader::new(reader)
                .map_err(|e| Error::Playback(format!("invalid WAV stream: {e}")))?;

            let spec = reader.spec();
            if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
                return Err(Error::Playback(format!(
                    "unsupported sample format: {} bit {:?}",
                    spec.bits_per_sample, spec.sample_format
                )));
            }

            let duration = if spec.sample_rate == 0 {
                Duration::ZERO
            } else {
                let nanos = u64::from(reader.duration()) * 1_000_000_000;
                Duration::from_nanos(nanos / u64::from(spec.sample_rate))
            };

            Ok(Self {
                samples: reader.into_samples(),
                channels: spec.channels,
                sample_rate: spec.sample_rate,
                duration,
            })
        }
    }

    impl<R: Read> Iterator for WavSource<R> {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            match self.samples.next()? {
                Ok(sample) => Some(f32::from(sample) / 32768.0),
                Err(e) => {
                    log::warn!("Stopping playback: {e}");
                    None
                }
            }
        }
    }

    impl<R: Read> Source for WavSource<R> {
        fn current_span_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> rodio::ChannelCount {
            self.channels
        }

        fn sample_rate(&self) -> rodio::SampleRate {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            Some(self.duration)
        }
    }

}
