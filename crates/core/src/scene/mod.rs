//! Declarative composition requests.
//!
//! A [`CompositionRequest`] describes what to render and when: a background,
//! timed still images, audio tracks, an optional subtitle file and animated
//! text cues. These are plain values; the graph compiler consumes them and the
//! asset stager rewrites their sources to local paths before compilation.

mod error;
mod types;

pub use error::SceneError;
pub use types::{
    AudioRole, AudioTrack, Background, CompositionRequest, ImageClip, KenBurnsDefaults,
    KenBurnsSpec, Keyframe, MediaSource, Rect, SubtitlePosition, SubtitleSource, SubtitleSpec,
    TextCue,
};
