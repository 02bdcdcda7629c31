//! Pseudo-3D visualization of an evolving neural topology.
//!
//! A genetic-algorithm engine evolves candidate networks toward moving reward
//! targets; a software projection pipeline draws the current best network
//! with nothing but 2D primitives. Hosts (the browser crate, the daemon, the
//! headless runner) provide a [`surface::DrawSurface`] and drive
//! [`scene::Orchestrator::frame`].

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/camera.rs"]
pub mod camera;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/projection.rs"]
pub mod projection;

#[path = "core/geometry.rs"]
pub mod geometry;

#[path = "core/surface.rs"]
pub mod surface;

#[path = "core/genome.rs"]
pub mod genome;

#[path = "core/modifiers.rs"]
pub mod modifiers;

#[path = "core/deps.rs"]
pub mod deps;

#[path = "core/evolution.rs"]
pub mod evolution;

#[path = "core/scheduler.rs"]
pub mod scheduler;

#[path = "core/interaction.rs"]
pub mod interaction;

#[path = "core/scene.rs"]
pub mod scene;

pub mod observer;

#[cfg(feature = "serde")]
pub mod protocol;

pub mod prelude {
    pub use crate::camera::{Camera, Viewport};
    pub use crate::config::{Config, ConfigError, EngineConfig, InteractionConfig, SceneConfig};
    pub use crate::deps::Dependencies;
    pub use crate::evolution::{Engine, StepReport, TargetPoint};
    pub use crate::genome::{Connection, Genome, Neuron, NeuronId, NeuronKind, Region};
    pub use crate::interaction::{Hit, HitTarget, Key, KeyModifiers, PointerButton};
    pub use crate::modifiers::{ModifierId, ModifierSet};
    pub use crate::scene::{FrameStats, Orchestrator};
    pub use crate::scheduler::{Clock, ManualClock, SystemClock};
    pub use crate::surface::{DisplayList, DrawSurface, Rgba};
}
