//! Encoder backends and their profiles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An H.264 encoding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// NVIDIA NVENC.
    Nvenc,
    /// AMD AMF.
    Amf,
    /// Intel Quick Sync.
    Qsv,
    /// Apple VideoToolbox.
    #[serde(rename = "videotoolbox")]
    VideoToolbox,
    /// libx264.
    Software,
}

impl Backend {
    /// Auto-detection order: discrete accelerators, integrated ones, then
    /// software.
    pub const PREFERENCE: [Backend; 5] = [
        Backend::Nvenc,
        Backend::Amf,
        Backend::Qsv,
        Backend::VideoToolbox,
        Backend::Software,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Nvenc => "nvenc",
            Backend::Amf => "amf",
            Backend::Qsv => "qsv",
            Backend::VideoToolbox => "videotoolbox",
            Backend::Software => "software",
        }
    }

    /// Encoder name as listed by `ffmpeg -encoders`.
    pub fn encoder(&self) -> &'static str {
        match self {
            Backend::Nvenc => "h264_nvenc",
            Backend::Amf => "h264_amf",
            Backend::Qsv => "h264_qsv",
            Backend::VideoToolbox => "h264_videotoolbox",
            Backend::Software => "libx264",
        }
    }

    /// Higher ranks win when several backends are usable.
    pub fn priority(&self) -> u8 {
        match self {
            Backend::Nvenc => 40,
            Backend::Amf => 30,
            Backend::Qsv => 20,
            Backend::VideoToolbox => 10,
            Backend::Software => 0,
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Backend::Software)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nvenc" | "cuda" | "nvidia" => Ok(Backend::Nvenc),
            "amf" | "amd" => Ok(Backend::Amf),
            "qsv" | "intel" => Ok(Backend::Qsv),
            "videotoolbox" | "vt" => Ok(Backend::VideoToolbox),
            "software" | "cpu" | "libx264" => Ok(Backend::Software),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// Everything the argument builder needs to drive one encoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncoderProfile {
    pub backend: Backend,
    pub encoder: String,
    /// Encoder flags, in order, after `-c:v <encoder>`.
    pub flags: Vec<String>,
    /// Flags placed before the first input.
    pub hwaccel_args: Vec<String>,
    /// Pixel format override.
    pub pixel_format: Option<String>,
    pub priority: u8,
}

impl EncoderProfile {
    /// Profile for `backend` targeting constant quality `quality`.
    pub fn for_backend(backend: Backend, quality: u8) -> Self {
        let q = quality.to_string();
        let (flags, hwaccel_args, pixel_format): (Vec<&str>, Vec<&str>, Option<&str>) =
            match backend {
                Backend::Nvenc => (
                    vec!["-preset", "p5", "-tune", "hq", "-rc", "vbr", "-cq", q.as_str()],
                    vec![],
                    None,
                ),
                Backend::Amf => (
                    vec!["-quality", "quality", "-rc", "cqp", "-qp_i", q.as_str(), "-qp_p", q.as_str()],
                    vec![],
                    None,
                ),
                Backend::Qsv => (
                    vec!["-preset", "medium", "-global_quality", q.as_str()],
                    vec!["-init_hw_device", "qsv=hw", "-filter_hw_device", "hw"],
                    Some("nv12"),
                ),
                Backend::VideoToolbox => (
                    vec!["-b:v", "0", "-q:v", q.as_str(), "-allow_sw", "1"],
                    vec![],
                    Some("nv12"),
                ),
                Backend::Software => (vec!["-preset", "medium", "-crf", q.as_str()], vec![], None),
            };

        Self {
            backend,
            encoder: backend.encoder().to_string(),
            flags: flags.into_iter().map(String::from).collect(),
            hwaccel_args: hwaccel_args.into_iter().map(String::from).collect(),
            pixel_format: pixel_format.map(String::from),
            priority: backend.priority(),
        }
    }

    /// The guaranteed fallback.
    pub fn software(quality: u8) -> Self {
        Self::for_backend(Backend::Software, quality)
    }

    /// `-c:v <encoder>` followed by the encoder flags.
    pub fn codec_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.encoder.clone()];
        args.extend(self.flags.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_is_sorted_by_priority() {
        let priorities: Vec<u8> = Backend::PREFERENCE.iter().map(|b| b.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert_eq!(Backend::PREFERENCE.last(), Some(&Backend::Software));
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!("NVENC".parse::<Backend>(), Ok(Backend::Nvenc));
        assert_eq!("cpu".parse::<Backend>(), Ok(Backend::Software));
        assert!("vaapi".parse::<Backend>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Backend::VideoToolbox).unwrap();
        assert_eq!(json, "\"videotoolbox\"");
        let backend: Backend = serde_json::from_str("\"qsv\"").unwrap();
        assert_eq!(backend, Backend::Qsv);
    }

    #[test]
    fn test_software_profile() {
        let profile = EncoderProfile::software(20);
        assert_eq!(
            profile.codec_args(),
            vec!["-c:v", "libx264", "-preset", "medium", "-crf", "20"]
        );
        assert!(profile.hwaccel_args.is_empty());
        assert_eq!(profile.priority, 0);
    }

    #[test]
    fn test_nvenc_profile() {
        let profile = EncoderProfile::for_backend(Backend::Nvenc, 19);
        assert_eq!(profile.encoder, "h264_nvenc");
        assert!(profile.flags.ends_with(&["-cq".to_string(), "19".to_string()]));
    }
}
