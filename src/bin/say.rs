use std::error::Error;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use flite_say::discovery::{discover_voices, register_voices};
use flite_say::{AudioOutput, Synthesizer, VoiceRegistry, VoiceSettings};

/// A voice synthesis utility.
#[derive(Parser, Debug)]
#[command(name = "say", about, long_about = None)]
struct Cli {
    /// Message to speak. Read from standard input when omitted.
    message: Option<String>,

    /// Level of log output verbosity, as LEVEL or MODULE:LEVEL
    #[arg(short = 'L', long = "log-level", env = "LOGLEVEL", value_delimiter = ',')]
    log_level: Vec<String>,

    /// Specifies the voice to synthesize
    #[arg(short = 'V', long)]
    voice: Option<String>,

    /// Directory scanned for .flitevox voice files
    #[arg(long, default_value = ".")]
    voice_dir: PathBuf,

    /// How long to wait after the buffers drain before exiting [default: 150ms]
    #[arg(short = 'd', long, value_parser = parse_duration)]
    post_finish_delay: Option<Duration>,

    /// Affects the pitch of the voice [default: 160]
    #[arg(short = 'M', long)]
    target_mean: Option<i64>,

    /// Affects the vibrato of the voice [default: 25]
    #[arg(short = 'D', long)]
    target_stddev: Option<i64>,

    /// Applies a factor to speed up or slow down the voice [default: 1.0]
    #[arg(short = 'S', long)]
    stretch: Option<f64>,

    /// JSON file with voice settings; flags given on the command line win
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a WAV file instead of playing the message
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> Result<VoiceSettings, Box<dyn Error>> {
        let mut settings = match &self.config {
            Some(path) => VoiceSettings::from_json_file(path)?,
            None => VoiceSettings::default(),
        };

        if let Some(mean) = self.target_mean {
            settings.target_mean = mean;
        }
        if let Some(stddev) = self.target_stddev {
            settings.target_stddev = stddev;
        }
        if let Some(stretch) = self.stretch {
            settings.duration_stretch = stretch;
        }
        if let Some(delay) = self.post_finish_delay {
            settings.post_finish_delay = delay;
        }
        Ok(settings)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("say: {e}");
        return ExitCode::FAILURE;
    }
    log::debug!("Starting say {}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let registry = VoiceRegistry::global();

    match discover_voices(&cli.voice_dir, cli.voice.as_deref()) {
        Ok(files) => {
            register_voices(&registry, &files);
        }
        Err(e) => log::warn!(
            "failed to scan {} for voices: {e}",
            cli.voice_dir.display()
        ),
    }

    let mut synth = Synthesizer::with_registry(registry.clone())
        .map_err(|e| format!("failed to create synthesizer: {e}"))?;

    if let Some(voice) = &cli.voice {
        synth
            .set_voice(voice)
            .map_err(|e| format!("failed to set voice: {e}"))?;
    }
    synth.apply_settings(&cli.settings()?);

    let message = match cli.message {
        Some(message) => message,
        None => read_stdin()?,
    };
    if message.trim().is_empty() {
        log::debug!("Nothing to say");
        return Ok(());
    }

    let spoken = match &cli.output {
        Some(path) => synth
            .synthesize(&message)
            .and_then(|wave| wave.write_wav(path)),
        None => audio_output().and_then(|output| synth.say(&message, output.as_ref())),
    };
    spoken.map_err(|e| format!("failed to speak: {e}"))?;

    registry.release();
    Ok(())
}

#[cfg(feature = "playback")]
fn audio_output() -> flite_say::Result<Box<dyn AudioOutput>> {
    Ok(Box::new(flite_say::RodioOutput::new()))
}

#[cfg(not(feature = "playback"))]
fn audio_output() -> flite_say::Result<Box<dyn AudioOutput>> {
    Err(flite_say::Error::Playback(
        "built without the `playback` feature, use --output to write a WAV file".to_string(),
    ))
}

fn read_stdin() -> Result<String, Box<dyn Error>> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }

    let mut input = String::new();
    stdin.read_to_string(&mut input)?;
    Ok(input)
}

/// Build the env_logger filter from `LEVEL` and `MODULE:LEVEL` specs on top
/// of a default `info` level.
fn init_logging(specs: &[String]) -> Result<(), Box<dyn Error>> {
    let mut filters = vec!["info".to_string()];

    for spec in specs {
        let (module, level) = match spec.split_once(':') {
            Some((module, level)) => (Some(module), level),
            None => (None, spec.as_str()),
        };
        log::LevelFilter::from_str(level).map_err(|_| format!("invalid log level '{level}'"))?;

        filters.push(match module {
            Some(module) => format!("{module}={level}"),
            None => level.to_string(),
        });
    }

    env_logger::Builder::new()
        .parse_filters(&filters.join(","))
        .init();
    Ok(())
}

/// Parse durations such as `150ms`, `2s`, `1.5s` or `1m`.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{s}'"))?;
    let unit_nanos = match unit.trim() {
        "" if value == 0.0 => 0.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "" => return Err(format!("duration '{s}' needs a unit (ms, s, m)")),
        other => return Err(format!("unknown duration unit '{other}'")),
    };

    let nanos = (value * unit_nanos).round();
    if nanos >= u64::MAX as f64 {
        return Err(format!("duration '{s}' is too long"));
    }
    Ok(Duration::from_nanos(nanos as u64))
}
