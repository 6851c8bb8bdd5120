use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::{Error, Result};
use crate::registry::{FeatureValue, Features};

/// Build the flite arguments for one synthesis request.
pub fn synthesis_args(
    voice: &str,
    features: &Features,
    text: &str,
    wav_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-voice".into(), voice.into()];

    for (name, value) in features.iter() {
        let (flag, value) = match value {
            FeatureValue::Int(v) => ("--seti", v.to_string()),
            FeatureValue::Float(v) => ("--setf", v.to_string()),
            FeatureValue::String(v) => ("--sets", v.clone()),
        };
        args.push(flag.into());
        args.push(format!("{name}={value}").into());
    }

    args.push("-t".into());
    args.push(text.into());
    args.push("-o".into());
    args.push(wav_path.as_os_str().to_os_string());
    args
}

/// Parse the output of `flite -lv`.
///
/// flite prints `Voices available: kal awb_time kal16 awb rms slt`, possibly
/// followed by a newline.
pub fn parse_voice_list(output: &str) -> Vec<String> {
    let list = output
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(output);
    list.split_whitespace().map(str::to_string).collect()
}

/// Run flite with `args` and wait for it to exit.
pub fn run_flite<I, S>(program: &OsStr, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::EngineNotFound
            } else {
                Error::Io(e)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::{parse_voice_list, run_flite, synthesis_args};
    use crate::error::Error;
    use crate::registry::{FeatureValue, Features};
    use std::ffi::OsStr;
    use std::path::Path;

    #[test]
    fn builds_args_with_typed_features() {
        let mut features = Features::new();
        features.set("int_f0_target_mean", FeatureValue::Int(160));
        features.set("duration_stretch", FeatureValue::Float(1.5));
        features.set("voice_gender", FeatureValue::String("female".to_string()));

        let args = synthesis_args("slt", &features, "-dash first", Path::new("/tmp/out.wav"));
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();

        assert_eq!(
            args,
            vec![
                "-voice",
                "slt",
                "--setf",
                "duration_stretch=1.5",
                "--seti",
                "int_f0_target_mean=160",
                "--sets",
                "voice_gender=female",
                "-t",
                "-dash first",
                "-o",
                "/tmp/out.wav",
            ]
        );
    }

    #[test]
    fn whole_floats_are_written_without_fraction() {
        let mut features = Features::new();
        features.set("duration_stretch", FeatureValue::Float(1.0));
        let args = synthesis_args("slt", &features, "hi", Path::new("o.wav"));
        assert_eq!(args[3], "duration_stretch=1");
    }

    #[test]
    fn parses_voice_list() {
        assert_eq!(
            parse_voice_list("Voices available: kal awb_time kal16 awb rms slt\n"),
            vec!["kal", "awb_time", "kal16", "awb", "rms", "slt"]
        );
        assert_eq!(parse_voice_list("slt kal"), vec!["slt", "kal"]);
        assert!(parse_voice_list("Voices available:").is_empty());
    }

    #[test]
    fn missing_executable_is_engine_not_found() {
        let err = run_flite(OsStr::new("flite-does-not-exist-here"), ["-lv"]).unwrap_err();
        assert!(matches!(err, Error::EngineNotFound));
    }
}
