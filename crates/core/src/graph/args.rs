//! Engine argument assembly.

use std::path::Path;

use super::compiler::{CompiledProgram, InputSource};
use super::config::RenderConfig;
use crate::engine::EncoderProfile;
use crate::keyframe::format_number;

/// Builds the full argument list for one render.
///
/// Order: overwrite flag, hardware flags, inputs, graph program, output
/// mapping, encoder flags, audio codec, pixel format, frame rate, duration
/// clamp and finally the output path.
pub fn build_args(
    program: &CompiledProgram,
    profile: &EncoderProfile,
    render: &RenderConfig,
    output: &Path,
) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    args.extend(profile.hwaccel_args.iter().cloned());

    for input in &program.inputs {
        args.extend(input_args(input));
    }

    args.push("-filter_complex".to_string());
    args.push(program.program());
    args.push("-map".to_string());
    args.push(program.video_label().to_string());

    let audio = program.audio_label();
    if let Some(label) = &audio {
        args.push("-map".to_string());
        args.push(label.to_string());
    }

    args.extend(profile.codec_args());

    if audio.is_some() {
        args.extend([
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            render.audio_bitrate.clone(),
        ]);
    }

    let pixel_format = profile
        .pixel_format
        .clone()
        .unwrap_or_else(|| render.pixel_format.clone());
    args.extend([
        "-pix_fmt".to_string(),
        pixel_format,
        "-r".to_string(),
        render.fps.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-t".to_string(),
        format_number(program.duration),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

fn input_args(input: &InputSource) -> Vec<String> {
    match input {
        InputSource::Lavfi { spec } => vec!["-f".into(), "lavfi".into(), "-i".into(), spec.clone()],
        InputSource::LoopedImage { path, duration } => vec![
            "-loop".into(),
            "1".into(),
            "-t".into(),
            format_number(*duration),
            "-i".into(),
            path.clone(),
        ],
        InputSource::StillImage { path } => vec!["-i".into(), path.clone()],
        InputSource::Audio { path, looped: true } => {
            vec!["-stream_loop".into(), "-1".into(), "-i".into(), path.clone()]
        }
        InputSource::Audio {
            path,
            looped: false,
        } => vec!["-i".into(), path.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Backend;
    use crate::graph::GraphCompiler;
    use crate::scene::{AudioRole, AudioTrack, CompositionRequest, MediaSource};
    use std::path::PathBuf;

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn test_minimal_args() {
        let request = CompositionRequest::new(3.0, 320, 240);
        let program = GraphCompiler::new(RenderConfig::default()).compile(&request);
        let args = build_args(
            &program,
            &EncoderProfile::software(23),
            &RenderConfig::default(),
            Path::new("/out/a.mp4"),
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-f",
                "lavfi",
                "-i",
                "color=c=black:s=320x240:r=25:d=3",
                "-filter_complex",
                "[0:v]null[outv]",
                "-map",
                "[outv]",
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-crf",
                "23",
                "-pix_fmt",
                "yuv420p",
                "-r",
                "25",
                "-movflags",
                "+faststart",
                "-t",
                "3",
                "/out/a.mp4",
            ]
        );
    }

    #[test]
    fn test_audio_and_hardware_ordering() {
        let mut request = CompositionRequest::new(5.0, 320, 240);
        request.audio.push(AudioTrack {
            role: AudioRole::Music,
            source: MediaSource::Path(PathBuf::from("/m.mp3")),
            volume: None,
        });
        let program = GraphCompiler::new(RenderConfig::default()).compile(&request);
        let profile = EncoderProfile::for_backend(Backend::Qsv, 23);
        let args = build_args(
            &program,
            &profile,
            &RenderConfig::default(),
            Path::new("/o.mp4"),
        );

        assert!(position(&args, "-init_hw_device") < position(&args, "-i"));
        assert!(position(&args, "-stream_loop") < position(&args, "-filter_complex"));
        assert_eq!(args[position(&args, "-c:a") + 1], "aac");
        assert!(position(&args, "-c:v") < position(&args, "-c:a"));
        assert!(args.contains(&"[outa]".to_string()));
        assert_eq!(args[position(&args, "-pix_fmt") + 1], "nv12");
        assert_eq!(args.last().map(String::as_str), Some("/o.mp4"));
    }
}
