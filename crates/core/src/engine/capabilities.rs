//! Encoder availability detection.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

use super::backend::Backend;
use super::config::EngineConfig;
use super::error::EngineError;

/// H.264 encoders compiled into the engine binary.
///
/// Listing an encoder does not mean the hardware behind it is present; the
/// negotiator still runs a test encode before trusting a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// NVIDIA NVENC H.264 available
    pub h264_nvenc: bool,
    /// AMD AMF H.264 available
    pub h264_amf: bool,
    /// Intel Quick Sync H.264 available
    pub h264_qsv: bool,
    /// Apple VideoToolbox H.264 available
    pub h264_videotoolbox: bool,
    /// libx264 available
    pub libx264: bool,
}

impl EncoderCapabilities {
    /// Detects compiled-in encoders by listing them with ffmpeg.
    pub async fn detect(config: &EngineConfig) -> Result<Self, EngineError> {
        let output = Command::new(&config.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound {
                    path: config.ffmpeg_path.clone(),
                },
                _ => EngineError::Io(e),
            })?;

        if !output.status.success() {
            return Err(EngineError::ExecutionFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(Self::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parses `ffmpeg -encoders` output.
    pub fn parse(listing: &str) -> Self {
        let names: Vec<&str> = listing
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let flags = parts.next()?;
                // Encoder rows start with a six-character capability column.
                if flags.len() != 6 {
                    return None;
                }
                parts.next().filter(|name| *name != "=")
            })
            .collect();
        let has = |name: &str| names.contains(&name);

        Self {
            h264_nvenc: has("h264_nvenc"),
            h264_amf: has("h264_amf"),
            h264_qsv: has("h264_qsv"),
            h264_videotoolbox: has("h264_videotoolbox"),
            libx264: has("libx264"),
        }
    }

    pub fn supports(&self, backend: Backend) -> bool {
        match backend {
            Backend::Nvenc => self.h264_nvenc,
            Backend::Amf => self.h264_amf,
            Backend::Qsv => self.h264_qsv,
            Backend::VideoToolbox => self.h264_videotoolbox,
            Backend::Software => self.libx264,
        }
    }

    /// Listed backends in preference order.
    pub fn available_backends(&self) -> Vec<Backend> {
        Backend::PREFERENCE
            .iter()
            .copied()
            .filter(|b| self.supports(*b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 V..... h264_qsv             H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (Intel Quick Sync Video acceleration) (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_parse_listing() {
        let caps = EncoderCapabilities::parse(LISTING);
        assert!(caps.libx264);
        assert!(caps.h264_nvenc);
        assert!(caps.h264_qsv);
        assert!(!caps.h264_amf);
        assert!(!caps.h264_videotoolbox);
        assert_eq!(
            caps.available_backends(),
            vec![Backend::Nvenc, Backend::Qsv, Backend::Software]
        );
    }

    #[test]
    fn test_description_mentions_do_not_count() {
        let caps = EncoderCapabilities::parse(
            " V....D libx264rgb           libx264 H.264 RGB (codec h264)\n",
        );
        assert!(!caps.libx264);
    }

    #[test]
    fn test_empty_listing() {
        let caps = EncoderCapabilities::parse("");
        assert_eq!(caps, EncoderCapabilities::default());
        assert!(caps.available_backends().is_empty());
    }
}
