//! Scene model value types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::SceneError;
use crate::engine::Backend;

// ============================================================================
// Sources
// ============================================================================

/// Where a media asset comes from.
///
/// The stager turns every `Url` and `Data` source into a `Path` inside the
/// job's working directory before the request reaches the compiler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// A file already on the local filesystem.
    Path(PathBuf),
    /// A remote asset to download.
    Url(String),
    /// An embedded payload, either a `data:` URI or bare base64.
    Data(String),
}

impl MediaSource {
    /// Returns true if the source carries nothing to load.
    pub fn is_empty(&self) -> bool {
        match self {
            MediaSource::Path(p) => p.as_os_str().is_empty(),
            MediaSource::Url(u) => u.trim().is_empty(),
            MediaSource::Data(d) => d.trim().is_empty(),
        }
    }

    /// Returns the string handed to the engine as an input location.
    ///
    /// Local paths and URLs can be read by the engine directly; embedded
    /// payloads must be staged to disk first and yield `None`.
    pub fn as_input(&self) -> Option<String> {
        match self {
            MediaSource::Path(p) if !p.as_os_str().is_empty() => {
                Some(p.to_string_lossy().into_owned())
            }
            MediaSource::Url(u) if !u.trim().is_empty() => Some(u.trim().to_string()),
            _ => None,
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// A full render request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositionRequest {
    /// Human-readable title (informational only).
    #[serde(default)]
    pub title: String,
    /// Total output duration in seconds.
    pub duration: f64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Canvas background.
    #[serde(default)]
    pub background: Background,
    /// Timed still images, composited in order.
    #[serde(default)]
    pub images: Vec<ImageClip>,
    /// Audio tracks, all mixed together.
    #[serde(default)]
    pub audio: Vec<AudioTrack>,
    /// Subtitles burned in on top of everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<SubtitleSpec>,
    /// Text cues, drawn in order after the images.
    #[serde(default)]
    pub texts: Vec<TextCue>,
    /// Ken-Burns settings applied to clips without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ken_burns: Option<KenBurnsDefaults>,
    /// Encoder backend hint for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
}

impl CompositionRequest {
    /// Creates a request with a black background and nothing on it.
    pub fn new(duration: f64, width: u32, height: u32) -> Self {
        Self {
            title: String::new(),
            duration,
            width,
            height,
            background: Background::default(),
            images: Vec::new(),
            audio: Vec::new(),
            subtitles: None,
            texts: Vec::new(),
            ken_burns: None,
            backend: None,
        }
    }

    /// Checks required fields.
    ///
    /// Clip timing is deliberately not checked here: the compiler drops
    /// clips and cues with unusable timing instead of failing.
    pub fn validate(&self) -> Result<(), SceneError> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(SceneError::InvalidDuration(self.duration));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SceneError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }

        for (i, clip) in self.images.iter().enumerate() {
            if !clip.start.is_finite() || !clip.length.is_finite() {
                return Err(SceneError::NonFinite {
                    field: format!("images[{}] timing", i),
                });
            }
        }

        for (i, cue) in self.texts.iter().enumerate() {
            if !cue.start.is_finite() || !cue.end.is_finite() {
                return Err(SceneError::NonFinite {
                    field: format!("texts[{}] timing", i),
                });
            }
            let bad_keyframe = cue.keyframes.iter().any(|k| {
                !(k.time.is_finite()
                    && k.x.is_finite()
                    && k.y.is_finite()
                    && k.opacity.is_finite()
                    && k.scale.is_finite())
            });
            if bad_keyframe {
                return Err(SceneError::NonFinite {
                    field: format!("texts[{}].keyframes", i),
                });
            }
        }

        for (i, track) in self.audio.iter().enumerate() {
            if let Some(volume) = track.volume {
                if !volume.is_finite() {
                    return Err(SceneError::NonFinite {
                        field: format!("audio[{}].volume", i),
                    });
                }
                if volume < 0.0 {
                    return Err(SceneError::NegativeVolume { index: i, volume });
                }
            }
        }

        Ok(())
    }

    /// Mutable access to every media source in the request.
    ///
    /// Order: background image, image clips, audio tracks, subtitle file.
    pub fn media_sources_mut(&mut self) -> Vec<&mut MediaSource> {
        let mut sources = Vec::new();
        if let Background::Image { source } = &mut self.background {
            sources.push(source);
        }
        sources.extend(self.images.iter_mut().map(|c| &mut c.source));
        sources.extend(self.audio.iter_mut().map(|a| &mut a.source));
        if let Some(SubtitleSpec {
            source: SubtitleSource::File(source),
            ..
        }) = &mut self.subtitles
        {
            sources.push(source);
        }
        sources
    }
}

// ============================================================================
// Background
// ============================================================================

/// Canvas background.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    /// Solid colour, any colour string ffmpeg understands.
    Color { color: String },
    /// A still image stretched to fill the canvas.
    Image { source: MediaSource },
}

impl Default for Background {
    fn default() -> Self {
        Background::Color {
            color: "black".to_string(),
        }
    }
}

// ============================================================================
// Images
// ============================================================================

/// Target rectangle on the canvas, in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Returns true if this rectangle is exactly the whole canvas.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// A still image shown for a window of time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageClip {
    pub source: MediaSource,
    /// Start time in seconds.
    pub start: f64,
    /// Display length in seconds. Clips with `length <= 0` are skipped.
    pub length: f64,
    /// Target rectangle; `None` means the whole canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ken_burns: Option<KenBurnsSpec>,
}

impl ImageClip {
    /// End of the visibility window.
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// Per-clip zoom/pan settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KenBurnsSpec {
    /// Zoom increment per output frame.
    #[serde(default = "default_zoom_rate")]
    pub zoom_rate: f64,
    /// Horizontal pan expression; picked from a preset when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_x: Option<String>,
    /// Vertical pan expression; picked from a preset when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_y: Option<String>,
    /// Width the image is scaled to before zooming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescale_width: Option<u32>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for KenBurnsSpec {
    fn default() -> Self {
        Self {
            zoom_rate: default_zoom_rate(),
            pan_x: None,
            pan_y: None,
            prescale_width: None,
            enabled: true,
        }
    }
}

/// Request-wide Ken-Burns defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KenBurnsDefaults {
    /// Apply the effect to every clip that has no spec of its own.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_zoom_rate")]
    pub zoom_rate: f64,
    #[serde(default = "default_prescale_width")]
    pub prescale_width: u32,
    /// Pick a pan direction per clip at random instead of always centring.
    #[serde(default)]
    pub randomize_pan: bool,
}

impl Default for KenBurnsDefaults {
    fn default() -> Self {
        Self {
            enabled: false,
            zoom_rate: default_zoom_rate(),
            prescale_width: default_prescale_width(),
            randomize_pan: false,
        }
    }
}

fn default_zoom_rate() -> f64 {
    0.0015
}

fn default_prescale_width() -> u32 {
    3840
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Audio
// ============================================================================

/// What an audio track is for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioRole {
    /// Background music, looped under the whole timeline.
    Music,
    /// Narration, played once.
    VoiceOver,
}

/// An audio track to mix into the output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioTrack {
    pub role: AudioRole,
    pub source: MediaSource,
    /// Linear gain; defaults depend on the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl AudioTrack {
    /// Gain applied in the mix.
    pub fn effective_volume(&self) -> f64 {
        self.volume.unwrap_or(match self.role {
            AudioRole::Music => 0.3,
            AudioRole::VoiceOver => 1.0,
        })
    }
}

// ============================================================================
// Subtitles
// ============================================================================

/// Subtitle content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleSource {
    /// Subtitle file content (SRT or ASS) given inline.
    Inline(String),
    /// A subtitle file to load.
    File(MediaSource),
}

impl SubtitleSource {
    pub fn is_empty(&self) -> bool {
        match self {
            SubtitleSource::Inline(text) => text.trim().is_empty(),
            SubtitleSource::File(source) => source.is_empty(),
        }
    }
}

/// Vertical placement of subtitles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitlePosition {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Subtitle styling and source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubtitleSpec {
    pub source: SubtitleSource,
    #[serde(default = "default_subtitle_font_size")]
    pub font_size: u32,
    #[serde(default = "default_white")]
    pub color: String,
    #[serde(default)]
    pub position: SubtitlePosition,
    #[serde(default = "default_true")]
    pub outline: bool,
    /// Box colour behind the text, or `"transparent"`.
    #[serde(default = "default_transparent")]
    pub background: String,
}

fn default_subtitle_font_size() -> u32 {
    24
}

fn default_white() -> String {
    "#FFFFFF".to_string()
}

fn default_transparent() -> String {
    "transparent".to_string()
}

// ============================================================================
// Text
// ============================================================================

/// An animation anchor for a text cue.
///
/// `time` is relative to the cue's start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default = "default_one")]
    pub scale: f64,
}

impl Keyframe {
    /// A keyframe at `time` with identity opacity and scale.
    pub fn at(time: f64, x: f64, y: f64) -> Self {
        Self {
            time,
            x,
            y,
            opacity: 1.0,
            scale: 1.0,
        }
    }
}

fn default_one() -> f64 {
    1.0
}

/// A text element drawn over the video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextCue {
    pub text: String,
    /// Window start in seconds.
    pub start: f64,
    /// Window end in seconds.
    pub end: f64,
    #[serde(default = "default_text_font_size")]
    pub font_size: u32,
    #[serde(default = "default_white")]
    pub color: String,
    /// Static position when there are no keyframes; centred when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_color: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl TextCue {
    /// A plain, centred, unanimated cue.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            font_size: default_text_font_size(),
            color: default_white(),
            x: None,
            y: None,
            font_file: None,
            box_color: None,
            keyframes: Vec::new(),
        }
    }
}

fn default_text_font_size() -> u32 {
    48
}
