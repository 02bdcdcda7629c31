//! Scene/render orchestrator.
//!
//! Owns the engine, the cameras, the tube mesh cache and the loop scheduler,
//! and turns the current best genome into 2D draw calls each frame:
//!
//! 1. flush queued interaction into the camera
//! 2. run the due fixed simulation steps
//! 3. sync tube meshes against the best genome
//! 4. draw the background (particles, grid, shell wireframe)
//! 5. draw the foreground (connection triangles, neuron billboards, target
//!    spheres) back to front
//! 6. draw pulse overlays
//! 7. composite the inset view with its own camera and viewport

use core::cmp::Ordering;
use std::time::Duration;

use glam::{Vec2, Vec3};
use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::camera::{Camera, Viewport};
use crate::config::{Config, ConfigError, SceneConfig};
use crate::deps::Dependencies;
use crate::evolution::Engine;
use crate::genome::{Genome, NeuronId};
use crate::geometry::{bezier_point, capsule_mesh, control_point, extruded_shell, tube_mesh, Contour, Mesh, ShellParams};
use crate::interaction::{Hit, InteractionController, Key, KeyModifiers, PointerButton};
use crate::modifiers::{ModifierId, RenderStyle};
use crate::prng::Prng;
use crate::projection::{face_normal, project_view, shade, view_space, DepthFog, Projected};
use crate::scheduler::{Clock, Scheduler, SystemClock};
use crate::surface::{DrawSurface, Paint, RadialGradient, Rgba};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const BACKGROUND: Rgba = Rgba::rgb(11, 15, 26);
pub const EXCITATORY: Rgba = Rgba::rgb(96, 165, 250);
pub const INHIBITORY: Rgba = Rgba::rgb(248, 113, 113);
pub const TARGET_COLOR: Rgba = Rgba::rgb(250, 204, 21);
const GRID_COLOR: Rgba = Rgba::rgba(148, 163, 184, 0.18);
const SHELL_COLOR: Rgba = Rgba::rgba(122, 162, 255, 0.22);
const PARTICLE_COLOR: Rgba = Rgba::rgba(203, 213, 225, 0.5);
const PULSE_COLOR: Rgba = Rgba::rgb(255, 255, 255);
const INSET_BORDER: Rgba = Rgba::rgba(148, 163, 184, 0.6);

const LIGHT_DIR: Vec3 = Vec3::new(-0.4, -0.7, -0.6);
const AMBIENT: f32 = 0.35;
const TARGET_RADIUS: f32 = 6.0;
const TARGET_SEGMENTS: usize = 6;
const PARTICLE_SPEED: f32 = 6.0;
const PULSE_SPEED: f32 = 0.6;
const MAX_PULSES: usize = 64;

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStats {
    pub frame: u64,
    pub drawn: usize,
    pub culled: usize,
    pub meshes_rebuilt: usize,
    pub targets_rebuilt: usize,
    pub sim_steps: u32,
    pub generation: u64,
    pub best_fitness: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct CachedTarget {
    position: Vec3,
    mesh: Mesh,
}

#[derive(Debug, Clone, PartialEq)]
struct CachedTube {
    p0: Vec3,
    p1: Vec3,
    excitatory: bool,
    mesh: Mesh,
}

/// A projected foreground shape waiting to be depth sorted.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Triangle { points: [(f32, f32); 3], color: Rgba },
    Billboard { x: f32, y: f32, radius: f32, color: Rgba },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthItem {
    pub depth: f32,
    pub primitive: Primitive,
}

/// Back to front. Equal depths keep their submission order.
pub fn depth_sort(items: &mut [DepthItem]) {
    items.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    position: Vec3,
    velocity: Vec3,
}

fn spawn_particles(count: usize, radius: f32, rng: &mut Prng) -> Vec<Particle> {
    (0..count)
        .map(|_| {
            let position = Vec3::new(
                rng.gen_range_f32(-radius, radius),
                rng.gen_range_f32(-radius, radius),
                rng.gen_range_f32(-radius, radius),
            );
            let velocity = Vec3::new(
                rng.gen_range_f32(-1.0, 1.0),
                rng.gen_range_f32(-1.0, 1.0),
                rng.gen_range_f32(-1.0, 1.0),
            ) * PARTICLE_SPEED;
            Particle { position, velocity }
        })
        .collect()
}

pub struct Orchestrator<C: Clock = SystemClock> {
    cfg: SceneConfig,
    engine: Engine,
    interaction: InteractionController,
    scheduler: Scheduler<C>,

    camera: Camera,
    inset_camera: Camera,
    viewport: Viewport,
    fog: DepthFog,

    meshes: HashMap<(NeuronId, NeuronId), CachedTube>,
    // Parallel to `engine.targets()`.
    target_meshes: Vec<CachedTarget>,
    shell: Vec<Contour>,
    particles: Vec<Particle>,
    particle_radius: f32,

    // Simulated time, drives the inset orbit and pulse phase.
    elapsed: Duration,
    frame: u64,
    items: Vec<DepthItem>,
    last_stats: FrameStats,
}

impl Orchestrator<SystemClock> {
    pub fn with_system_clock(config: Config, deps: Dependencies) -> Result<Self, ConfigError> {
        Self::new(config, deps, SystemClock::new())
    }
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(config: Config, deps: Dependencies, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let Config {
            engine: engine_cfg,
            scene,
            interaction,
        } = config;

        let shell_params = ShellParams {
            center: Vec2::ZERO,
            max_radius: scene.shell_max_radius,
            num_segments: scene.shell_segments,
        };
        let shell = match deps.silhouette() {
            Some(s) => extruded_shell(Some(&**s), scene.shell_slices, scene.shell_max_depth, &shell_params),
            None => extruded_shell(None, scene.shell_slices, scene.shell_max_depth, &shell_params),
        };

        let mut rng = Prng::new(engine_cfg.seed.unwrap_or(1) ^ 0x5CE4_E000);
        let particle_radius = scene.grid_extent.max(1.0);
        let particles = spawn_particles(scene.particle_count, particle_radius, &mut rng);

        let engine = Engine::new(engine_cfg, deps)?;
        let camera = interaction.initial_camera;
        let mut inset_camera = camera;
        inset_camera.position.z = camera.position.z * 1.6;

        let scheduler = Scheduler::new(clock, scene.tick_rate_hz, scene.max_steps_per_frame);
        let fog = DepthFog {
            near: scene.fog_near,
            far: scene.fog_far,
            min_factor: scene.fog_min_factor,
        };

        Ok(Self {
            cfg: scene,
            engine,
            interaction: InteractionController::new(interaction),
            scheduler,
            camera,
            inset_camera,
            viewport: Viewport::default(),
            fog,
            meshes: HashMap::new(),
            target_meshes: Vec::new(),
            shell,
            particles,
            particle_radius,
            elapsed: Duration::ZERO,
            frame: 0,
            items: Vec::new(),
            last_stats: FrameStats::default(),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn inset_camera(&self) -> &Camera {
        &self.inset_camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scene_config(&self) -> &SceneConfig {
        &self.cfg
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn cached_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn cached_target_meshes(&self) -> usize {
        self.target_meshes.len()
    }

    pub fn shell(&self) -> &[Contour] {
        &self.shell
    }

    pub fn last_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    pub fn start(&mut self) -> bool {
        self.scheduler.start()
    }

    pub fn stop(&mut self) -> bool {
        self.scheduler.stop()
    }

    pub fn set_tick_rate(&mut self, hz: f32) {
        self.scheduler.set_rate(hz);
    }

    /// One manual generation tick, independent of the loop.
    pub fn step(&mut self) -> Genome {
        self.engine.step().clone()
    }

    /// Queued; takes effect at the next generation tick.
    pub fn set_modifier(&mut self, id: ModifierId, active: bool) -> bool {
        self.engine.set_modifier(id, active)
    }

    pub fn toggle_modifier(&mut self, id: ModifierId) -> bool {
        let on = !self.engine.modifiers().is_active(id);
        self.engine.set_modifier(id, on)
    }

    pub fn reset_camera(&mut self) {
        self.interaction.reset_camera();
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.interaction.rotate(dx, dy);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.interaction.pan(dx, dy);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.interaction.zoom(delta);
    }

    pub fn pointer_down(&mut self, button: PointerButton, mods: KeyModifiers, x: f32, y: f32) {
        self.interaction.pointer_down(button, mods, x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.interaction.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.interaction.wheel(delta_y);
    }

    pub fn key(&mut self, key: Key, mods: KeyModifiers) {
        if let Some(id) = self.interaction.key(key, mods) {
            self.toggle_modifier(id);
        }
    }

    /// Pick against the best genome as drawn last frame.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<Hit> {
        self.interaction.hit_test(
            self.engine.best(),
            self.cfg.connection_bend,
            &self.camera,
            &self.viewport,
            x,
            y,
        )
    }

    /// Host frame callback. Does nothing while the loop is stopped.
    pub fn frame(&mut self, surface: &mut dyn DrawSurface) -> Option<FrameStats> {
        let tick = self.scheduler.on_frame()?;
        self.interaction.apply(&mut self.camera);
        self.engine.commit_modifiers();
        for _ in 0..tick.sim_steps {
            self.engine.step();
        }
        self.elapsed += tick.dt;
        Some(self.draw(surface, tick.sim_steps))
    }

    /// Draw the current state without advancing anything but the camera.
    pub fn render(&mut self, surface: &mut dyn DrawSurface) -> FrameStats {
        self.interaction.apply(&mut self.camera);
        self.engine.commit_modifiers();
        self.draw(surface, 0)
    }

    fn draw(&mut self, surface: &mut dyn DrawSurface, sim_steps: u32) -> FrameStats {
        self.frame += 1;
        self.viewport = surface.viewport();
        let dt = self.elapsed.as_secs_f32();

        let meshes_rebuilt = self.sync_meshes();
        let targets_rebuilt = self.sync_target_meshes();
        self.advance_particles();

        let style = self.engine.modifiers().adjust_render(RenderStyle::default(), self.frame);
        let mut stats = FrameStats {
            frame: self.frame,
            meshes_rebuilt,
            targets_rebuilt,
            sim_steps,
            generation: self.engine.generation(),
            best_fitness: self.engine.best().fitness,
            ..FrameStats::default()
        };

        let main_vp = self.viewport;
        let camera = self.camera;
        surface.fill_rect(main_vp.x, main_vp.y, main_vp.width, main_vp.height, BACKGROUND);

        self.draw_background(surface, &camera, &main_vp, &mut stats);
        self.draw_foreground(surface, &camera, &main_vp, &style, &mut stats);
        if style.pulses {
            self.draw_pulses(surface, &camera, &main_vp, dt, &mut stats);
        }

        if self.cfg.inset_enabled {
            let inset = main_vp.inset(self.cfg.inset_fraction, self.cfg.inset_margin);
            self.inset_camera.rotation.y = dt * self.cfg.inset_orbit_speed;
            let inset_camera = self.inset_camera;

            surface.set_clip(Some(inset));
            surface.fill_rect(inset.x, inset.y, inset.width, inset.height, BACKGROUND);
            self.draw_foreground(surface, &inset_camera, &inset, &style, &mut stats);
            surface.stroke_rect(inset.x, inset.y, inset.width, inset.height, INSET_BORDER, 1.0);
            surface.set_clip(None);
        }
        self.viewport = main_vp;

        if meshes_rebuilt > 0 {
            debug!(
                "frame {}: rebuilt {} tube meshes ({} cached)",
                self.frame,
                meshes_rebuilt,
                self.meshes.len()
            );
        }
        self.last_stats = stats;
        stats
    }

    /// Rebuild tubes whose connection is new or whose endpoints moved; drop
    /// tubes whose connection is gone. Returns the number rebuilt.
    fn sync_meshes(&mut self) -> usize {
        let genome = self.engine.best();
        let threshold = self.cfg.mesh_rebuild_threshold;
        let mut live: HashSet<(NeuronId, NeuronId)> = HashSet::with_capacity(genome.connections.len());
        let mut rebuilt = 0;

        for c in &genome.connections {
            let Some((p0, p1)) = genome.endpoints(c) else {
                continue;
            };
            let key = c.key();
            if !live.insert(key) {
                continue;
            }
            let stale = match self.meshes.get(&key) {
                Some(t) => {
                    t.p0.distance(p0) > threshold || t.p1.distance(p1) > threshold || t.excitatory != c.is_excitatory()
                }
                None => true,
            };
            if stale {
                let cp = control_point(p0, p1, self.cfg.connection_bend);
                let mesh = tube_mesh(p0, p1, cp, self.cfg.tube_radius, self.cfg.tube_radial_segments);
                self.meshes.insert(
                    key,
                    CachedTube {
                        p0,
                        p1,
                        excitatory: c.is_excitatory(),
                        mesh,
                    },
                );
                rebuilt += 1;
            }
        }
        self.meshes.retain(|k, _| live.contains(k));
        rebuilt
    }

    /// Target capsules only change when the target set is replaced.
    fn sync_target_meshes(&mut self) -> usize {
        let targets = self.engine.targets();
        let current = targets.len() == self.target_meshes.len()
            && targets
                .iter()
                .zip(&self.target_meshes)
                .all(|(t, cached)| t.position == cached.position);
        if current {
            return 0;
        }
        self.target_meshes = targets
            .iter()
            .map(|t| CachedTarget {
                position: t.position,
                mesh: capsule_mesh(t.position, TARGET_RADIUS, TARGET_SEGMENTS),
            })
            .collect();
        self.target_meshes.len()
    }

    fn advance_particles(&mut self) {
        let r = self.particle_radius;
        for p in &mut self.particles {
            p.position += p.velocity * (1.0 / 60.0);
            // Wrap through the opposite face of the box.
            for axis in 0..3 {
                if p.position[axis] > r {
                    p.position[axis] -= 2.0 * r;
                } else if p.position[axis] < -r {
                    p.position[axis] += 2.0 * r;
                }
            }
        }
    }

    fn draw_background(&self, surface: &mut dyn DrawSurface, camera: &Camera, vp: &Viewport, stats: &mut FrameStats) {
        for particle in &self.particles {
            let p = project_point(particle.position, camera, vp);
            if !p.is_visible() {
                stats.culled += 1;
                continue;
            }
            let color = PARTICLE_COLOR.with_alpha(self.fog.apply(PARTICLE_COLOR.a, p.depth));
            surface.begin_path();
            surface.arc(p.x, p.y, (1.2 * p.scale).max(0.5), 0.0, core::f32::consts::TAU);
            surface.fill(&Paint::Solid(color));
            stats.drawn += 1;
        }

        let extent = self.cfg.grid_extent;
        let spacing = self.cfg.grid_spacing.max(1.0);
        let y = self.cfg.grid_y;
        let lines = (2.0 * extent / spacing).floor() as usize;
        for i in 0..=lines {
            let t = -extent + i as f32 * spacing;
            for (a, b) in [
                (Vec3::new(t, y, -extent), Vec3::new(t, y, extent)),
                (Vec3::new(-extent, y, t), Vec3::new(extent, y, t)),
            ] {
                if self.stroke_segment(surface, camera, vp, a, b, GRID_COLOR, 1.0) {
                    stats.drawn += 1;
                } else {
                    stats.culled += 1;
                }
            }
        }

        // Rings, then meridians joining consecutive rings.
        for contour in &self.shell {
            let n = contour.points.len();
            for j in 0..n {
                let (a, b) = (contour.points[j], contour.points[(j + 1) % n]);
                if self.stroke_segment(surface, camera, vp, a, b, SHELL_COLOR, 1.0) {
                    stats.drawn += 1;
                } else {
                    stats.culled += 1;
                }
            }
        }
        for pair in self.shell.windows(2) {
            for (a, b) in pair[0].points.iter().zip(pair[1].points.iter()) {
                if self.stroke_segment(surface, camera, vp, *a, *b, SHELL_COLOR, 1.0) {
                    stats.drawn += 1;
                } else {
                    stats.culled += 1;
                }
            }
        }
    }

    fn stroke_segment(
        &self,
        surface: &mut dyn DrawSurface,
        camera: &Camera,
        vp: &Viewport,
        a: Vec3,
        b: Vec3,
        color: Rgba,
        width: f32,
    ) -> bool {
        let pa = project_point(a, camera, vp);
        let pb = project_point(b, camera, vp);
        if !pa.is_visible() || !pb.is_visible() {
            return false;
        }
        let alpha = self.fog.apply(color.a, 0.5 * (pa.depth + pb.depth));
        surface.begin_path();
        surface.move_to(pa.x, pa.y);
        surface.line_to(pb.x, pb.y);
        surface.stroke(color.with_alpha(alpha), width);
        true
    }

    fn draw_foreground(
        &mut self,
        surface: &mut dyn DrawSurface,
        camera: &Camera,
        vp: &Viewport,
        style: &RenderStyle,
        stats: &mut FrameStats,
    ) {
        let mut items = std::mem::take(&mut self.items);
        items.clear();
        stats.culled += self.collect_foreground(camera, vp, style, &mut items);
        depth_sort(&mut items);

        for item in &items {
            match &item.primitive {
                Primitive::Triangle { points, color } => {
                    surface.begin_path();
                    surface.move_to(points[0].0, points[0].1);
                    surface.line_to(points[1].0, points[1].1);
                    surface.line_to(points[2].0, points[2].1);
                    surface.close_path();
                    surface.fill(&Paint::Solid(*color));
                }
                Primitive::Billboard { x, y, radius, color } => {
                    let gradient = RadialGradient {
                        x: *x,
                        y: *y,
                        radius: *radius,
                        stops: vec![
                            (0.0, Rgba::rgb(255, 255, 255).with_alpha(color.a)),
                            (0.35, *color),
                            (1.0, color.with_alpha(0.0)),
                        ],
                    };
                    surface.begin_path();
                    surface.arc(*x, *y, *radius, 0.0, core::f32::consts::TAU);
                    surface.fill(&Paint::Radial(gradient));
                }
            }
        }
        stats.drawn += items.len();
        self.items = items;
    }

    /// Project every foreground shape into `out`. Returns how many were culled.
    fn collect_foreground(&self, camera: &Camera, vp: &Viewport, style: &RenderStyle, out: &mut Vec<DepthItem>) -> usize {
        let mut culled = 0;
        let genome = self.engine.best();

        let mut seen: HashSet<(NeuronId, NeuronId)> = HashSet::with_capacity(self.meshes.len());
        for c in &genome.connections {
            if !seen.insert(c.key()) {
                continue;
            }
            let Some(tube) = self.meshes.get(&c.key()) else {
                continue;
            };
            let base = if tube.excitatory { EXCITATORY } else { INHIBITORY };
            culled += push_mesh(&tube.mesh, base, style.connection_alpha, style, camera, vp, &self.fog, out);
        }

        for target in &self.target_meshes {
            culled += push_mesh(&target.mesh, TARGET_COLOR, 0.9, style, camera, vp, &self.fog, out);
        }

        for n in &genome.neurons {
            let p = project_point(n.position, camera, vp);
            if !p.is_visible() {
                culled += 1;
                continue;
            }
            let alpha = self.fog.apply(style.neuron_alpha, p.depth);
            out.push(DepthItem {
                depth: p.depth,
                primitive: Primitive::Billboard {
                    x: p.x,
                    y: p.y,
                    radius: n.radius * p.scale * 2.0 * style.glow,
                    color: n.color.saturated(style.saturation).with_alpha(alpha),
                },
            });
        }
        culled
    }

    fn draw_pulses(&self, surface: &mut dyn DrawSurface, camera: &Camera, vp: &Viewport, t: f32, stats: &mut FrameStats) {
        let genome = self.engine.best();
        for (i, c) in genome.connections.iter().take(MAX_PULSES).enumerate() {
            let Some((p0, p1)) = genome.endpoints(c) else {
                continue;
            };
            let cp = control_point(p0, p1, self.cfg.connection_bend);
            let phase = (t * PULSE_SPEED + i as f32 * 0.137).fract();
            let p = project_point(bezier_point(p0, cp, p1, phase), camera, vp);
            if !p.is_visible() {
                stats.culled += 1;
                continue;
            }
            let color = PULSE_COLOR.with_alpha(self.fog.apply(0.9, p.depth));
            surface.begin_path();
            surface.arc(p.x, p.y, (2.5 * p.scale).max(1.0), 0.0, core::f32::consts::TAU);
            surface.fill(&Paint::Solid(color));
            stats.drawn += 1;
        }
    }
}

#[inline]
fn project_point(p: Vec3, camera: &Camera, vp: &Viewport) -> Projected {
    project_view(view_space(p, camera), camera.fov, vp)
}

/// Shade, fog and project each face of `mesh`. Faces with any vertex behind
/// the lens are culled.
#[allow(clippy::too_many_arguments)]
fn push_mesh(
    mesh: &Mesh,
    base: Rgba,
    alpha: f32,
    style: &RenderStyle,
    camera: &Camera,
    vp: &Viewport,
    fog: &DepthFog,
    out: &mut Vec<DepthItem>,
) -> usize {
    let mut culled = 0;
    let view: Vec<Vec3> = mesh.vertices.iter().map(|v| view_space(*v, camera)).collect();
    let color = base.saturated(style.saturation);
    for face in &mesh.faces {
        let [a, b, c] = face.map(|i| view[i as usize]);
        let pa = project_view(a, camera.fov, vp);
        let pb = project_view(b, camera.fov, vp);
        let pc = project_view(c, camera.fov, vp);
        if !pa.is_visible() || !pb.is_visible() || !pc.is_visible() {
            culled += 1;
            continue;
        }
        let depth = (a.z + b.z + c.z) / 3.0;
        let light = shade(face_normal(a, b, c), LIGHT_DIR, AMBIENT);
        out.push(DepthItem {
            depth,
            primitive: Primitive::Triangle {
                points: [(pa.x, pa.y), (pb.x, pb.y), (pc.x, pc.y)],
                color: color.scaled(light).with_alpha(fog.apply(alpha, depth)),
            },
        });
    }
    culled
}
