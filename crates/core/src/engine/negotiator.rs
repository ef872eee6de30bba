//! Backend selection with software fallback.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::backend::{Backend, EncoderProfile};
use super::traits::ExternalEngine;
use crate::metrics;

/// Picks an encoder profile for each render.
///
/// Probe outcomes are cached for the lifetime of the negotiator. A hardware
/// change during the run is not noticed until [`clear_cache`] is called.
///
/// [`clear_cache`]: CapabilityNegotiator::clear_cache
pub struct CapabilityNegotiator {
    engine: Arc<dyn ExternalEngine>,
    quality: u8,
    probes: RwLock<HashMap<Backend, bool>>,
}

impl CapabilityNegotiator {
    pub fn new(engine: Arc<dyn ExternalEngine>) -> Self {
        Self {
            engine,
            quality: 23,
            probes: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the constant-quality target used in returned profiles.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Selects a profile; never fails.
    ///
    /// A pinned backend is tried first. If its probe fails, auto-detection
    /// walks [`Backend::PREFERENCE`] and software closes the list without
    /// being probed.
    pub async fn negotiate(&self, requested: Option<Backend>) -> EncoderProfile {
        if let Some(backend) = requested {
            if backend == Backend::Software || self.probe(backend).await {
                info!(%backend, "Using requested backend");
                return EncoderProfile::for_backend(backend, self.quality);
            }
            warn!(%backend, "Requested backend unavailable, auto-detecting");
        }

        for backend in Backend::PREFERENCE {
            if backend == Backend::Software {
                break;
            }
            if Some(backend) == requested {
                continue;
            }
            if self.probe(backend).await {
                info!(%backend, "Selected hardware backend");
                return EncoderProfile::for_backend(backend, self.quality);
            }
        }

        debug!("No hardware backend available, using software");
        EncoderProfile::software(self.quality)
    }

    async fn probe(&self, backend: Backend) -> bool {
        if let Some(ok) = self.probes.read().await.get(&backend) {
            return *ok;
        }

        let ok = match self.engine.probe(backend).await {
            Ok(()) => true,
            Err(e) => {
                debug!(%backend, error = %e, "Probe failed");
                false
            }
        };
        metrics::PROBE_OUTCOMES
            .with_label_values(&[backend.as_str(), if ok { "ok" } else { "failed" }])
            .inc();

        self.probes.write().await.insert(backend, ok);
        ok
    }

    /// Probe outcomes recorded so far.
    pub async fn cached(&self) -> HashMap<Backend, bool> {
        self.probes.read().await.clone()
    }

    /// Forgets every recorded probe outcome.
    pub async fn clear_cache(&self) {
        self.probes.write().await.clear();
    }
}
