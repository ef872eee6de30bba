//! External engine port and capability negotiation.
//!
//! The [`ExternalEngine`] trait is the only way the rest of the crate starts
//! processes. [`FfmpegEngine`] implements it on top of an ffmpeg binary, and
//! [`CapabilityNegotiator`] uses its probes to pick an [`EncoderProfile`],
//! falling back to software when no hardware backend works.

mod backend;
mod capabilities;
mod config;
mod error;
mod ffmpeg;
mod negotiator;
mod traits;

pub use backend::{Backend, EncoderProfile};
pub use capabilities::EncoderCapabilities;
pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::FfmpegEngine;
pub use negotiator::CapabilityNegotiator;
pub use traits::{EngineOutput, ExternalEngine};
