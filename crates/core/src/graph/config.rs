//! Rendering parameters shared by the compiler and argument builder.

use serde::{Deserialize, Serialize};

/// Output rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Output frame rate; also drives Ken-Burns step counts.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Maximum number of image clips turned into engine inputs.
    #[serde(default = "default_max_image_inputs")]
    pub max_image_inputs: usize,

    /// Output pixel format unless the encoder profile requires another.
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Constant-quality target handed to the negotiated encoder.
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// AAC bitrate for the mixed audio.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Seed for pan selection; random per compile when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_fps() -> u32 {
    25
}

fn default_max_image_inputs() -> usize {
    32
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_image_inputs: default_max_image_inputs(),
            pixel_format: default_pixel_format(),
            crf: default_crf(),
            audio_bitrate: default_audio_bitrate(),
            seed: None,
        }
    }
}

impl RenderConfig {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_max_image_inputs(mut self, max: usize) -> Self {
        self.max_image_inputs = max;
        self
    }

    /// Fixes the pan-selection seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.fps, 25);
        assert_eq!(config.max_image_inputs, 32);
        assert_eq!(config.pixel_format, "yuv420p");
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RenderConfig = toml::from_str("fps = 30\nseed = 9").unwrap();
        assert_eq!(config.fps, 30);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.crf, 23);
    }
}
