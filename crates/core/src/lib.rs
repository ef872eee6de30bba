pub mod assets;
pub mod concurrency;
pub mod config;
pub mod engine;
pub mod graph;
pub mod job;
pub mod keyframe;
pub mod metrics;
pub mod scene;
pub mod testing;

pub use assets::{AssetError, AssetStager, FetchConfig, FetchStatus, HttpAssetStager};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{
    Backend, CapabilityNegotiator, EncoderProfile, EngineConfig, EngineError, ExternalEngine,
    FfmpegEngine,
};
pub use graph::{build_args, CompiledProgram, GraphCompiler, RenderConfig};
pub use job::{
    InMemoryJobStore, JobConfig, JobFilter, JobPipeline, JobReport, JobStatus, JobStore,
    PipelineError,
};
pub use scene::{CompositionRequest, SceneError};
