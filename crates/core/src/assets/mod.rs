//! Asset materialization.
//!
//! Before a request is compiled, every source it references is made local:
//! downloaded, decoded or verified, inside the job's working directory. The
//! working directory is owned by the job and removed when it finishes.

mod config;
mod error;
mod http;
mod traits;

pub use config::FetchConfig;
pub use error::AssetError;
pub use http::{decode_data, FetchStatus, HttpAssetStager};
pub use traits::AssetStager;
