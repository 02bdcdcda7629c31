use thiserror::Error;

use crate::camera::Camera;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("population_size must be at least 2 (got {0})")]
    PopulationTooSmall(usize),
    #[error("neurons_per_genome must be at least 1")]
    NoNeurons,
    #[error("field of view must be positive and finite (got {0})")]
    InvalidFov(f32),
    #[error("zoom range is inverted: min {min} > max {max}")]
    InvertedZoomRange { min: f32, max: f32 },
    #[error("tick rate must be within 0.1..=1000 Hz (got {0})")]
    InvalidTickRate(f32),
    #[error("grid would need {0} lines per axis (max 1000)")]
    GridTooDense(f32),
    #[error("{field} must be finite and non-negative (got {value})")]
    InvalidScalar { field: &'static str, value: f32 },
}

/// Genetic-algorithm parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    pub population_size: usize,
    pub neurons_per_genome: usize,
    pub initial_connections: usize,
    pub target_count: usize,

    // Neurons and targets are spawned inside a ball of this radius.
    pub world_radius: f32,

    pub base_mutation_rate: f32,
    // Max per-axis offset applied to a mutated neuron.
    pub position_step: f32,
    pub add_connection_prob: f32,
    pub remove_connection_prob: f32,

    // If set, makes evolution reproducible.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: 24,
            neurons_per_genome: 24,
            initial_connections: 30,
            target_count: 3,
            world_radius: 180.0,
            base_mutation_rate: 0.08,
            position_step: 12.0,
            add_connection_prob: 0.05,
            remove_connection_prob: 0.03,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_population(mut self, population_size: usize, neurons_per_genome: usize) -> Self {
        self.population_size = population_size;
        self.neurons_per_genome = neurons_per_genome;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_targets(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.neurons_per_genome == 0 {
            return Err(ConfigError::NoNeurons);
        }
        for (field, value) in [
            ("world_radius", self.world_radius),
            ("base_mutation_rate", self.base_mutation_rate),
            ("position_step", self.position_step),
            ("add_connection_prob", self.add_connection_prob),
            ("remove_connection_prob", self.remove_connection_prob),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidScalar { field, value });
            }
        }
        Ok(())
    }
}

pub const MIN_TICK_RATE_HZ: f32 = 0.1;
pub const MAX_TICK_RATE_HZ: f32 = 1000.0;
// Lines per axis drawn for the floor grid.
pub const MAX_GRID_LINES: f32 = 1000.0;

/// Rendering and loop parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneConfig {
    // Fixed simulation rate, independent of the display refresh.
    pub tick_rate_hz: f32,
    pub max_steps_per_frame: u32,

    pub tube_radius: f32,
    pub tube_radial_segments: usize,
    pub connection_bend: f32,
    // Endpoint movement (world units) that invalidates a cached tube.
    pub mesh_rebuild_threshold: f32,

    pub fog_near: f32,
    pub fog_far: f32,
    pub fog_min_factor: f32,

    pub particle_count: usize,
    pub grid_extent: f32,
    pub grid_spacing: f32,
    pub grid_y: f32,

    pub shell_slices: usize,
    pub shell_segments: usize,
    pub shell_max_depth: f32,
    pub shell_max_radius: f32,

    pub inset_enabled: bool,
    pub inset_fraction: f32,
    pub inset_margin: f32,
    // Radians per second the inset camera orbits.
    pub inset_orbit_speed: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30.0,
            max_steps_per_frame: 5,
            tube_radius: 2.2,
            tube_radial_segments: 6,
            connection_bend: 0.18,
            mesh_rebuild_threshold: 0.5,
            fog_near: 0.0,
            fog_far: 700.0,
            fog_min_factor: 0.15,
            particle_count: 80,
            grid_extent: 300.0,
            grid_spacing: 50.0,
            grid_y: 220.0,
            shell_slices: 9,
            shell_segments: 24,
            shell_max_depth: 140.0,
            shell_max_radius: 240.0,
            inset_enabled: true,
            inset_fraction: 0.28,
            inset_margin: 12.0,
            inset_orbit_speed: 0.25,
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TICK_RATE_HZ..=MAX_TICK_RATE_HZ).contains(&self.tick_rate_hz) {
            return Err(ConfigError::InvalidTickRate(self.tick_rate_hz));
        }
        for (field, value) in [
            ("tube_radius", self.tube_radius),
            ("grid_extent", self.grid_extent),
            ("grid_spacing", self.grid_spacing),
            ("mesh_rebuild_threshold", self.mesh_rebuild_threshold),
            ("fog_far", self.fog_far),
            ("shell_max_depth", self.shell_max_depth),
            ("shell_max_radius", self.shell_max_radius),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidScalar { field, value });
            }
        }
        // Mirrors the clamp applied when drawing.
        let lines = 2.0 * self.grid_extent / self.grid_spacing.max(1.0);
        if lines > MAX_GRID_LINES {
            return Err(ConfigError::GridTooDense(lines));
        }
        Ok(())
    }
}

/// Pointer/keyboard mapping parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractionConfig {
    pub rotate_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_sensitivity: f32,
    // Bounds on camera.position.z.
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub hit_radius_px: f32,
    pub initial_camera: Camera,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            rotate_sensitivity: 0.005,
            pan_sensitivity: 0.8,
            zoom_sensitivity: 0.5,
            min_zoom: 40.0,
            max_zoom: 1500.0,
            hit_radius_px: 10.0,
            initial_camera: Camera::default(),
        }
    }
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fov = self.initial_camera.fov;
        if !fov.is_finite() || fov <= 0.0 {
            return Err(ConfigError::InvalidFov(fov));
        }
        for (field, value) in [("min_zoom", self.min_zoom), ("max_zoom", self.max_zoom)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidScalar { field, value });
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::InvertedZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub engine: EngineConfig,
    pub scene: SceneConfig,
    pub interaction: InteractionConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.scene.validate()?;
        self.interaction.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_tiny_population() {
        let cfg = EngineConfig::default().with_population(1, 8);
        assert_eq!(cfg.validate(), Err(ConfigError::PopulationTooSmall(1)));
    }

    #[test]
    fn rejects_inverted_zoom() {
        let cfg = InteractionConfig {
            min_zoom: 10.0,
            max_zoom: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedZoomRange { .. })
        ));
    }

    #[test]
    fn rejects_nan_scalars() {
        let cfg = EngineConfig {
            position_step: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidScalar { field: "position_step", .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_tick_rate() {
        for hz in [1.0e-20, 0.0, -3.0, f32::NAN, f32::INFINITY, 1.0e9] {
            let cfg = SceneConfig {
                tick_rate_hz: hz,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTickRate(_))), "{hz}");
        }
    }

    #[test]
    fn rejects_runaway_grid() {
        let cfg = SceneConfig {
            grid_extent: 1.0e30,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::GridTooDense(_))));

        let cfg = SceneConfig {
            grid_extent: f32::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidScalar { field: "grid_extent", .. })
        ));
    }

    #[test]
    fn rejects_nan_zoom_bounds() {
        let cfg = InteractionConfig {
            min_zoom: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidScalar { field: "min_zoom", .. })
        ));
        let cfg = InteractionConfig {
            max_zoom: f32::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
