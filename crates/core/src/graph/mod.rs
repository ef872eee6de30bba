//! Filter-graph compiler.
//!
//! Turns a [`CompositionRequest`](crate::scene::CompositionRequest) into an
//! ordered list of typed nodes with uniquely labeled pads, plus the input
//! declarations and engine arguments needed to run it.
//!
//! Stages run in a fixed order, each consuming the previous stage's label:
//!
//! 1. Background
//! 2. Image clips (scale or Ken-Burns, then overlay)
//! 3. Text cues
//! 4. Terminal video renaming (`[outv]`)
//! 5. Audio mixing (`[outa]`)
//! 6. Subtitle burn-in

mod args;
mod compiler;
mod config;
mod label;
mod node;
mod subtitle;

pub use args::build_args;
pub use compiler::{escape_filter_value, escape_text, CompiledProgram, GraphCompiler, InputSource};
pub use config::RenderConfig;
pub use label::{Label, LabelAllocator, LabelKind, AUDIO_OUT, VIDEO_OUT};
pub use node::{FilterGraph, FilterNode, NodeKind, Pad, StreamKind};
pub use subtitle::{ass_colour, force_style, inject_subtitles};
