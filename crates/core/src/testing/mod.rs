//! Testing utilities and mock implementations.
//!
//! The job pipeline depends on its collaborators only through traits; these
//! mocks make it fully deterministic in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use montage_core::testing::{MockEngine, MockStager};
//!
//! let engine = Arc::new(MockEngine::new());
//! let stager = Arc::new(MockStager::new());
//! let pipeline = JobPipeline::new(engine.clone(), stager, store, render, jobs);
//! ```

mod mock_engine;
mod mock_stager;

pub use mock_engine::MockEngine;
pub use mock_stager::MockStager;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::scene::{
        AudioRole, AudioTrack, CompositionRequest, ImageClip, MediaSource, TextCue,
    };

    /// A 1280x720 request of `duration` seconds with nothing on it.
    pub fn empty_request(duration: f64) -> CompositionRequest {
        CompositionRequest::new(duration, 1280, 720)
    }

    /// A full-canvas image clip from a local path.
    pub fn image_clip(path: &str, start: f64, length: f64) -> ImageClip {
        ImageClip {
            source: MediaSource::Path(PathBuf::from(path)),
            start,
            length,
            rect: None,
            ken_burns: None,
        }
    }

    /// A centred text cue.
    pub fn text_cue(text: &str, start: f64, end: f64) -> TextCue {
        TextCue::new(text, start, end)
    }

    /// A background music track from a local path.
    pub fn music(path: &str) -> AudioTrack {
        AudioTrack {
            role: AudioRole::Music,
            source: MediaSource::Path(PathBuf::from(path)),
            volume: None,
        }
    }

    /// A small but complete request: one image, one text cue, music.
    pub fn sample_request() -> CompositionRequest {
        let mut request = empty_request(6.0);
        request.title = "sample".to_string();
        request.images.push(image_clip("/media/a.png", 0.0, 3.0));
        request.texts.push(text_cue("Hello", 1.0, 4.0));
        request.audio.push(music("/media/music.mp3"));
        request
    }
}
