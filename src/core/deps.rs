//! Explicit collaborators handed to the engine and the orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::geometry::Silhouette;

pub type SharedSilhouette = Arc<dyn Silhouette + Send + Sync>;

#[derive(Clone, Default)]
pub struct Dependencies {
    silhouette: Option<SharedSilhouette>,
    // Shared by clones so the fallback is reported once per container.
    warned_missing_silhouette: Arc<AtomicBool>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_silhouette(mut self, silhouette: SharedSilhouette) -> Self {
        self.silhouette = Some(silhouette);
        self
    }

    /// The silhouette, if one was provided.
    ///
    /// The first miss logs a warning; callers fall back to a sphere.
    pub fn silhouette(&self) -> Option<&SharedSilhouette> {
        if self.silhouette.is_none() && !self.warned_missing_silhouette.swap(true, Ordering::Relaxed) {
            warn!("no silhouette provided; falling back to a spherical layout");
        }
        self.silhouette.as_ref()
    }

    pub fn has_silhouette(&self) -> bool {
        self.silhouette.is_some()
    }
}

impl core::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dependencies")
            .field("silhouette", &self.silhouette.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_silhouette_is_usable() {
        let deps = Dependencies::new().with_silhouette(Arc::new(|x: f32, y: f32| x * x + y * y < 100.0));
        let s = deps.silhouette().map(|s| s.contains(1.0, 1.0));
        assert_eq!(s, Some(true));
    }

    #[test]
    fn missing_silhouette_is_none() {
        let deps = Dependencies::new();
        assert!(deps.silhouette().is_none());
        let copy = deps.clone();
        assert!(copy.silhouette().is_none());
        assert!(copy.warned_missing_silhouette.load(Ordering::Relaxed));
        assert!(!deps.has_silhouette());
    }
}
