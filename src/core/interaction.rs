//! Pointer, wheel and keyboard input mapped onto the camera.
//!
//! Input handlers never touch the camera directly: they queue
//! [`CameraCommand`]s which the orchestrator drains at the start of the next
//! frame with [`InteractionController::apply`].

use glam::Vec3;

use crate::camera::{Camera, Viewport};
use crate::config::InteractionConfig;
use crate::genome::{Genome, NeuronId};
use crate::geometry::control_point;
use crate::modifiers::ModifierId;
use crate::projection::{project_view, view_space};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MAX_PITCH: f32 = 89.0 * core::f32::consts::PI / 180.0;

// Keyboard steps, in the same units as pointer deltas.
const KEY_ROTATE_STEP: f32 = 24.0;
const KEY_PAN_STEP: f32 = 12.0;
const KEY_ZOOM_STEP: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CameraCommand {
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    Zoom { delta: f32 },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    ZoomIn,
    ZoomOut,
    Reset,
    Digit(u8),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(name: &str) -> Option<Key> {
        Some(match name {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "+" | "=" => Key::ZoomIn,
            "-" | "_" => Key::ZoomOut,
            "r" | "R" => Key::Reset,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c @ '1'..='9'), None) => Key::Digit(c as u8 - b'0'),
                    _ => return None,
                }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Orbit,
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    mode: DragMode,
    last: (f32, f32),
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

pub struct InteractionController {
    cfg: InteractionConfig,
    queue: Vec<CameraCommand>,
    drag: Option<Drag>,
}

impl InteractionController {
    pub fn new(cfg: InteractionConfig) -> Self {
        Self {
            cfg,
            queue: Vec::new(),
            drag: None,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.cfg
    }

    pub fn initial_camera(&self) -> Camera {
        self.cfg.initial_camera
    }

    pub fn pending(&self) -> &[CameraCommand] {
        &self.queue
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.queue.push(CameraCommand::Rotate {
            dx: finite_or_zero(dx),
            dy: finite_or_zero(dy),
        });
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.queue.push(CameraCommand::Pan {
            dx: finite_or_zero(dx),
            dy: finite_or_zero(dy),
        });
    }

    pub fn zoom(&mut self, delta: f32) {
        self.queue.push(CameraCommand::Zoom {
            delta: finite_or_zero(delta),
        });
    }

    pub fn reset_camera(&mut self) {
        self.queue.push(CameraCommand::Reset);
    }

    /// Secondary button or shift-drag pans; anything else orbits.
    pub fn pointer_down(&mut self, button: PointerButton, mods: KeyModifiers, x: f32, y: f32) {
        let mode = if button == PointerButton::Secondary || mods.shift {
            DragMode::Pan
        } else {
            DragMode::Orbit
        };
        self.drag = Some(Drag {
            mode,
            last: (finite_or_zero(x), finite_or_zero(y)),
        });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let (x, y) = (finite_or_zero(x), finite_or_zero(y));
        let (dx, dy) = (x - drag.last.0, y - drag.last.1);
        drag.last = (x, y);
        match drag.mode {
            DragMode::Orbit => self.rotate(dx, dy),
            DragMode::Pan => self.pan(dx, dy),
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// `delta_y > 0` (scrolling down) moves the camera away.
    pub fn wheel(&mut self, delta_y: f32) {
        self.zoom(delta_y);
    }

    /// Queue the camera effect of a key. Digit keys are returned as a
    /// modifier id for the caller to toggle.
    pub fn key(&mut self, key: Key, mods: KeyModifiers) -> Option<ModifierId> {
        let (h, v) = match key {
            Key::ArrowLeft => (-1.0, 0.0),
            Key::ArrowRight => (1.0, 0.0),
            Key::ArrowUp => (0.0, -1.0),
            Key::ArrowDown => (0.0, 1.0),
            Key::ZoomIn => {
                self.zoom(-KEY_ZOOM_STEP);
                return None;
            }
            Key::ZoomOut => {
                self.zoom(KEY_ZOOM_STEP);
                return None;
            }
            Key::Reset => {
                self.reset_camera();
                return None;
            }
            Key::Digit(d) => return Some(ModifierId::from(d)),
        };
        if mods.shift {
            self.pan(h * KEY_PAN_STEP, v * KEY_PAN_STEP);
        } else {
            self.rotate(h * KEY_ROTATE_STEP, v * KEY_ROTATE_STEP);
        }
        None
    }

    /// Drain queued commands into `camera`. Returns how many were applied.
    pub fn apply(&mut self, camera: &mut Camera) -> usize {
        let n = self.queue.len();
        for cmd in std::mem::take(&mut self.queue) {
            self.apply_one(camera, cmd);
        }
        n
    }

    fn apply_one(&self, camera: &mut Camera, cmd: CameraCommand) {
        let cfg = &self.cfg;
        match cmd {
            CameraCommand::Rotate { dx, dy } => {
                camera.rotation.y += dx * cfg.rotate_sensitivity;
                camera.rotation.x = (camera.rotation.x + dy * cfg.rotate_sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
            }
            CameraCommand::Pan { dx, dy } => {
                camera.position.x += dx * cfg.pan_sensitivity;
                camera.position.y += dy * cfg.pan_sensitivity;
            }
            CameraCommand::Zoom { delta } => {
                camera.position.z =
                    (camera.position.z + delta * cfg.zoom_sensitivity).clamp(cfg.min_zoom, cfg.max_zoom);
            }
            CameraCommand::Reset => *camera = cfg.initial_camera,
        }
        if !camera.is_finite() {
            *camera = cfg.initial_camera;
        }
    }

    pub fn hit_test(&self, genome: &Genome, bend: f32, camera: &Camera, viewport: &Viewport, x: f32, y: f32) -> Option<Hit> {
        hit_test(genome, bend, camera, viewport, self.cfg.hit_radius_px, x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HitTarget {
    Neuron(NeuronId),
    Connection { index: usize, from: NeuronId, to: NeuronId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    pub target: HitTarget,
    // Screen-space distance in pixels.
    pub distance: f32,
}

/// Screen-space picking.
///
/// Neurons are tested at their centers, connections at their curve's control
/// point. A candidate is in range when its distance is within
/// `hit_radius_px × scale` (plus `radius × scale` for neurons). The nearest
/// candidate wins; on equal distance neurons are preferred.
pub fn hit_test(
    genome: &Genome,
    bend: f32,
    camera: &Camera,
    viewport: &Viewport,
    hit_radius_px: f32,
    x: f32,
    y: f32,
) -> Option<Hit> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let mut best: Option<Hit> = None;
    let mut consider = |target: HitTarget, world: Vec3, extra: f32| {
        let p = project_view(view_space(world, camera), camera.fov, viewport);
        if !p.is_visible() {
            return;
        }
        let d = ((p.x - x).powi(2) + (p.y - y).powi(2)).sqrt();
        let threshold = (hit_radius_px + extra) * p.scale;
        if d > threshold {
            return;
        }
        if best.map_or(true, |b| d < b.distance) {
            best = Some(Hit { target, distance: d });
        }
    };

    for n in &genome.neurons {
        consider(HitTarget::Neuron(n.id), n.position, n.radius);
    }
    for (index, c) in genome.connections.iter().enumerate() {
        if let Some((p0, p1)) = genome.endpoints(c) {
            let target = HitTarget::Connection {
                index,
                from: c.from,
                to: c.to,
            };
            consider(target, control_point(p0, p1, bend), 0.0);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{Connection, Neuron, NeuronKind, Region};
    use crate::projection::project;

    fn controller() -> InteractionController {
        InteractionController::new(InteractionConfig::default())
    }

    #[test]
    fn commands_wait_for_apply() {
        let mut ic = controller();
        let mut cam = Camera::default();
        let before = cam;
        ic.rotate(10.0, 0.0);
        assert_eq!(cam, before);
        assert_eq!(ic.apply(&mut cam), 1);
        assert!(cam.rotation.y > before.rotation.y);
        assert_eq!(ic.apply(&mut cam), 0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut ic = controller();
        let mut cam = Camera::default();
        ic.rotate(0.0, 1.0e6);
        ic.apply(&mut cam);
        assert!((cam.rotation.x - MAX_PITCH).abs() < 1e-6);
        ic.rotate(0.0, -1.0e7);
        ic.apply(&mut cam);
        assert!((cam.rotation.x + MAX_PITCH).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut ic = controller();
        let mut cam = Camera::default();
        ic.zoom(-1.0e6);
        ic.apply(&mut cam);
        assert_eq!(cam.position.z, ic.config().min_zoom);
        ic.wheel(1.0e6);
        ic.apply(&mut cam);
        assert_eq!(cam.position.z, ic.config().max_zoom);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut ic = controller();
        let mut cam = Camera::default();
        let before = cam;
        ic.rotate(f32::NAN, f32::INFINITY);
        ic.pan(f32::NEG_INFINITY, f32::NAN);
        ic.zoom(f32::NAN);
        ic.apply(&mut cam);
        assert_eq!(cam, before);
    }

    #[test]
    fn shift_drag_pans() {
        let mut ic = controller();
        ic.pointer_down(PointerButton::Primary, KeyModifiers { shift: true, ..Default::default() }, 10.0, 10.0);
        ic.pointer_move(20.0, 15.0);
        ic.pointer_up();
        ic.pointer_move(50.0, 50.0);
        assert_eq!(ic.pending(), &[CameraCommand::Pan { dx: 10.0, dy: 5.0 }]);
    }

    #[test]
    fn reset_restores_initial_pose() {
        let mut ic = controller();
        let mut cam = Camera::default();
        ic.rotate(100.0, 100.0);
        ic.pan(5.0, 5.0);
        ic.apply(&mut cam);
        assert_ne!(cam, ic.initial_camera());
        assert_eq!(ic.key(Key::Reset, KeyModifiers::default()), None);
        ic.apply(&mut cam);
        assert_eq!(cam, ic.initial_camera());
    }

    #[test]
    fn dom_keys_map() {
        assert_eq!(Key::from_dom("ArrowUp"), Some(Key::ArrowUp));
        assert_eq!(Key::from_dom("7"), Some(Key::Digit(7)));
        assert_eq!(Key::from_dom("0"), None);
        assert_eq!(Key::from_dom("12"), None);
        let mut ic = controller();
        assert_eq!(ic.key(Key::Digit(7), KeyModifiers::default()), Some(7));
    }

    fn two_neuron_genome() -> Genome {
        let neurons = vec![
            Neuron::new(0, Vec3::new(-80.0, 0.0, 0.0), NeuronKind::Soma, Region::Cortex),
            Neuron::new(1, Vec3::new(80.0, 0.0, 0.0), NeuronKind::Axon, Region::Thalamus),
        ];
        let connections = vec![Connection { from: 0, to: 1, weight: 0.4 }];
        Genome::new(1, neurons, connections)
    }

    #[test]
    fn hit_at_neuron_returns_it() {
        let g = two_neuron_genome();
        let cam = Camera::default();
        let vp = Viewport::default();
        for n in &g.neurons {
            let p = project(n.position, &cam, &vp);
            let hit = hit_test(&g, 0.18, &cam, &vp, 10.0, p.x, p.y);
            assert_eq!(hit.map(|h| h.target), Some(HitTarget::Neuron(n.id)));
        }
    }

    #[test]
    fn hit_at_control_point_returns_connection() {
        let g = two_neuron_genome();
        let cam = Camera::default();
        let vp = Viewport::default();
        let cp = control_point(g.neurons[0].position, g.neurons[1].position, 0.18);
        let p = project(cp, &cam, &vp);
        let hit = hit_test(&g, 0.18, &cam, &vp, 10.0, p.x, p.y);
        assert!(matches!(hit.map(|h| h.target), Some(HitTarget::Connection { index: 0, .. })));
    }

    #[test]
    fn neuron_wins_tie_with_straight_connection_midpoint() {
        let neurons = vec![
            Neuron::new(0, Vec3::new(-80.0, 0.0, 0.0), NeuronKind::Soma, Region::Cortex),
            Neuron::new(1, Vec3::new(80.0, 0.0, 0.0), NeuronKind::Soma, Region::Cortex),
            Neuron::new(2, Vec3::ZERO, NeuronKind::Dendrite, Region::Cortex),
        ];
        let connections = vec![Connection { from: 0, to: 1, weight: 0.4 }];
        let g = Genome::new(1, neurons, connections);
        let cam = Camera::default();
        let vp = Viewport::default();

        let cp = control_point(g.neurons[0].position, g.neurons[1].position, 0.0);
        let on_cp = project(cp, &cam, &vp);
        let on_neuron = project(g.neurons[2].position, &cam, &vp);
        assert_eq!((on_cp.x, on_cp.y), (on_neuron.x, on_neuron.y));

        let hit = hit_test(&g, 0.0, &cam, &vp, 10.0, on_neuron.x, on_neuron.y).unwrap();
        assert_eq!(hit.target, HitTarget::Neuron(2));
    }

    #[test]
    fn empty_space_misses() {
        let g = two_neuron_genome();
        assert!(hit_test(&g, 0.18, &Camera::default(), &Viewport::default(), 10.0, 2.0, 2.0).is_none());
    }
}
