use glam::Vec3;

use crate::camera::Camera;
use crate::evolution::{Engine, StepReport};
use crate::modifiers::{registry, ModifierId};
use crate::scene::{FrameStats, Orchestrator};
use crate::scheduler::Clock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A read-only snapshot of the engine.
///
/// Observers cannot steer the simulation; snapshots are taken on demand and
/// may allocate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineSnapshot {
    pub tick: u64,
    pub generation: u64,
    pub population: usize,
    pub best_uid: u64,
    pub best_fitness: f32,
    pub best_neurons: usize,
    pub best_connections: usize,
    pub sustained_attention: f32,
    pub active_modifiers: Vec<ModifierId>,
    pub targets: Vec<Vec3>,
    pub last_step: Option<StepReport>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModifierInfo {
    pub id: ModifierId,
    pub name: String,
    pub active: bool,
}

pub struct EngineAdapter<'a> {
    engine: &'a Engine,
}

impl<'a> EngineAdapter<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let best = self.engine.best();
        EngineSnapshot {
            tick: self.engine.tick(),
            generation: self.engine.generation(),
            population: self.engine.population().len(),
            best_uid: best.uid,
            best_fitness: best.fitness,
            best_neurons: best.neurons.len(),
            best_connections: best.connections.len(),
            sustained_attention: self.engine.sustained_attention(),
            active_modifiers: self.engine.modifiers().active_ids().collect(),
            targets: self.engine.targets().iter().map(|t| t.position).collect(),
            last_step: self.engine.last_report().copied(),
        }
    }

    /// Every registered modifier with its current membership.
    pub fn modifiers(&self) -> Vec<ModifierInfo> {
        registry()
            .iter()
            .map(|r| ModifierInfo {
                id: r.id,
                name: r.name.to_string(),
                active: self.engine.modifiers().is_active(r.id),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneSnapshot {
    pub engine: EngineSnapshot,
    pub camera: Camera,
    pub running: bool,
    pub frames: u64,
    pub cached_meshes: usize,
    pub last_frame: FrameStats,
}

pub struct SceneAdapter<'a, C: Clock> {
    scene: &'a Orchestrator<C>,
}

impl<'a, C: Clock> SceneAdapter<'a, C> {
    pub fn new(scene: &'a Orchestrator<C>) -> Self {
        Self { scene }
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            engine: EngineAdapter::new(self.scene.engine()).snapshot(),
            camera: *self.scene.camera(),
            running: self.scene.is_running(),
            frames: self.scene.scheduler().frames(),
            cached_meshes: self.scene.cached_meshes(),
            last_frame: *self.scene.last_stats(),
        }
    }
}
