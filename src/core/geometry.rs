//! Procedural meshes: connection tubes, terminal capsules and the extruded
//! volumetric shell built from a 2D silhouette.

use glam::{Vec2, Vec3};
use tracing::warn;

use crate::prng::Prng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rings sampled along a tube (plus one).
pub const TUBE_LONGITUDINAL_SEGMENTS: usize = 8;
/// Bisection steps per shell ray.
pub const SHELL_SEARCH_STEPS: usize = 8;
/// Rejection sampling budget, as a multiple of the requested point count.
pub const PLACEMENT_ATTEMPTS_PER_POINT: usize = 50;

const DEGENERATE_LEN: f32 = 1.0e-6;

/// Inside/outside test over the silhouette plane.
pub trait Silhouette {
    fn contains(&self, x: f32, y: f32) -> bool;
}

impl<F> Silhouette for F
where
    F: Fn(f32, f32) -> bool,
{
    fn contains(&self, x: f32, y: f32) -> bool {
        self(x, y)
    }
}

/// Immutable vertex/face buffers. Regenerated, never patched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub ring_size: usize,
}

impl Mesh {
    pub fn ring_count(&self) -> usize {
        if self.ring_size == 0 {
            0
        } else {
            self.vertices.len() / self.ring_size
        }
    }

    pub fn triangle(&self, face: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = *self.faces.get(face)?;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }

    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
    }
}

#[inline]
pub fn bezier_point(p0: Vec3, control: Vec3, p1: Vec3, t: f32) -> Vec3 {
    let u = 1.0 - t;
    p0 * (u * u) + control * (2.0 * u * t) + p1 * (t * t)
}

#[inline]
pub fn bezier_tangent(p0: Vec3, control: Vec3, p1: Vec3, t: f32) -> Vec3 {
    (control - p0) * (2.0 * (1.0 - t)) + (p1 - control) * (2.0 * t)
}

/// Two unit vectors perpendicular to `axis` (and to each other).
fn ring_basis(axis: Vec3) -> (Vec3, Vec3) {
    let up = if axis.dot(Vec3::Y).abs() > 0.99 {
        Vec3::X
    } else {
        Vec3::Y
    };
    let n = axis.cross(up).normalize_or_zero();
    let b = axis.cross(n).normalize_or_zero();
    (n, b)
}

fn push_ring(vertices: &mut Vec<Vec3>, center: Vec3, axis: Vec3, radius: f32, segments: usize) {
    let (n, b) = ring_basis(axis);
    for j in 0..segments {
        let theta = (j as f32 / segments as f32) * core::f32::consts::TAU;
        vertices.push(center + (n * theta.cos() + b * theta.sin()) * radius);
    }
}

/// Control point bowing the segment p0→p1 sideways by `bend × length`.
pub fn control_point(p0: Vec3, p1: Vec3, bend: f32) -> Vec3 {
    let mid = (p0 + p1) * 0.5;
    let d = p1 - p0;
    let len = d.length();
    if len <= DEGENERATE_LEN {
        return mid;
    }
    let dir = d / len;
    let (side, _) = ring_basis(dir);
    mid + side * (len * bend)
}

/// Swept circular cross-section along a quadratic Bézier.
pub fn tube_mesh(p0: Vec3, p1: Vec3, control: Vec3, radius: f32, radial_segments: usize) -> Mesh {
    let segments = radial_segments.max(3);
    let radius = if radius.is_finite() { radius.abs() } else { 0.0 };

    let chord = p1 - p0;
    if chord.length() <= DEGENERATE_LEN {
        let mut vertices = Vec::with_capacity(segments);
        push_ring(&mut vertices, p0, Vec3::Z, radius, segments);
        return Mesh {
            vertices,
            faces: Vec::new(),
            ring_size: segments,
        };
    }
    let chord_dir = chord.normalize();

    let rings = TUBE_LONGITUDINAL_SEGMENTS + 1;
    let mut vertices = Vec::with_capacity(rings * segments);
    for i in 0..rings {
        let t = i as f32 / TUBE_LONGITUDINAL_SEGMENTS as f32;
        let center = bezier_point(p0, control, p1, t);
        let tangent = bezier_tangent(p0, control, p1, t);
        // The control point may coincide with an endpoint.
        let axis = if tangent.length() > DEGENERATE_LEN {
            tangent.normalize()
        } else {
            chord_dir
        };
        push_ring(&mut vertices, center, axis, radius, segments);
    }

    let mut faces = Vec::with_capacity((rings - 1) * segments * 2);
    for i in 0..rings - 1 {
        for j in 0..segments {
            let a = (i * segments + j) as u32;
            let b = (i * segments + (j + 1) % segments) as u32;
            let c = ((i + 1) * segments + j) as u32;
            let d = ((i + 1) * segments + (j + 1) % segments) as u32;
            faces.push([a, c, b]);
            faces.push([b, c, d]);
        }
    }

    Mesh {
        vertices,
        faces,
        ring_size: segments,
    }
}

/// UV-sphere triangulation.
pub fn capsule_mesh(center: Vec3, radius: f32, segments: usize) -> Mesh {
    let stacks = segments.max(2);
    let slices = segments.max(3);
    let radius = if radius.is_finite() { radius.abs() } else { 0.0 };

    let mut vertices = Vec::with_capacity((stacks + 1) * slices);
    for i in 0..=stacks {
        let phi = (i as f32 / stacks as f32) * core::f32::consts::PI;
        let (sp, cp) = phi.sin_cos();
        for j in 0..slices {
            let theta = (j as f32 / slices as f32) * core::f32::consts::TAU;
            let (st, ct) = theta.sin_cos();
            vertices.push(center + Vec3::new(sp * ct, cp, sp * st) * radius);
        }
    }

    let mut faces = Vec::new();
    for i in 0..stacks {
        for j in 0..slices {
            let a = (i * slices + j) as u32;
            let b = (i * slices + (j + 1) % slices) as u32;
            let c = ((i + 1) * slices + j) as u32;
            let d = ((i + 1) * slices + (j + 1) % slices) as u32;
            // Pole rows collapse to a point; one triangle per quad there.
            if i != 0 {
                faces.push([a, c, b]);
            }
            if i != stacks - 1 {
                faces.push([b, c, d]);
            }
        }
    }

    Mesh {
        vertices,
        faces,
        ring_size: slices,
    }
}

/// Shape of the silhouette sampling region.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShellParams {
    pub center: Vec2,
    pub max_radius: f32,
    pub num_segments: usize,
}

impl Default for ShellParams {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            max_radius: 240.0,
            num_segments: 24,
        }
    }
}

/// One ring of the extruded shell at depth `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub z: f32,
    pub points: Vec<Vec3>,
}

/// Ellipsoid cross-section scale at depth `z`.
#[inline]
pub fn shell_profile(z: f32, max_depth: f32) -> f32 {
    if max_depth <= 0.0 {
        return 1.0;
    }
    let r = z / max_depth;
    (1.0 - r * r).max(0.0).sqrt()
}

fn boundary_along(silhouette: Option<&dyn Silhouette>, center: Vec2, dir: Vec2, max_radius: f32) -> f32 {
    let Some(s) = silhouette else {
        return max_radius;
    };
    let (mut lo, mut hi) = (0.0f32, max_radius);
    for _ in 0..SHELL_SEARCH_STEPS {
        let mid = 0.5 * (lo + hi);
        let p = center + dir * mid;
        if s.contains(p.x, p.y) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Stacks scaled silhouette contours along the depth axis.
///
/// Connecting the contours into a wireframe or surface is up to the caller.
pub fn extruded_shell(
    silhouette: Option<&dyn Silhouette>,
    num_slices: usize,
    max_depth: f32,
    params: &ShellParams,
) -> Vec<Contour> {
    if num_slices == 0 || params.num_segments == 0 {
        return Vec::new();
    }
    let max_depth = if max_depth.is_finite() { max_depth.max(0.0) } else { 0.0 };

    // The silhouette is independent of z, so the boundary per angle is too.
    let boundaries: Vec<(Vec2, f32)> = (0..params.num_segments)
        .map(|k| {
            let angle = (k as f32 / params.num_segments as f32) * core::f32::consts::TAU;
            let dir = Vec2::new(angle.cos(), angle.sin());
            (dir, boundary_along(silhouette, params.center, dir, params.max_radius))
        })
        .collect();

    (0..num_slices)
        .map(|i| {
            let z = if num_slices == 1 {
                0.0
            } else {
                -max_depth + 2.0 * max_depth * (i as f32 / (num_slices - 1) as f32)
            };
            let s = shell_profile(z, max_depth);
            let points = boundaries
                .iter()
                .map(|(dir, r)| {
                    let p = params.center + *dir * (*r * s);
                    Vec3::new(p.x, p.y, z)
                })
                .collect();
            Contour { z, points }
        })
        .collect()
}

/// Result of interior sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub points: Vec<Vec3>,
    // How many trailing points came from the unconstrained fallback.
    pub fallback_count: usize,
}

/// Rejection-samples `count` points inside the silhouette, tapering depth
/// toward the rim.
pub fn place_points_inside(
    silhouette: &dyn Silhouette,
    count: usize,
    max_depth: f32,
    params: &ShellParams,
    rng: &mut Prng,
) -> Placement {
    let r_max = params.max_radius.max(DEGENERATE_LEN);
    let mut points = Vec::with_capacity(count);
    let max_attempts = count.saturating_mul(PLACEMENT_ATTEMPTS_PER_POINT);

    let mut attempts = 0;
    while points.len() < count && attempts < max_attempts {
        attempts += 1;
        let x = params.center.x + rng.gen_range_f32(-r_max, r_max);
        let y = params.center.y + rng.gen_range_f32(-r_max, r_max);
        if !silhouette.contains(x, y) {
            continue;
        }
        let radial = Vec2::new(x, y).distance(params.center) / r_max;
        let taper = (1.0 - radial * radial).max(0.0);
        let z = rng.gen_range_f32(-1.0, 1.0) * max_depth * taper;
        points.push(Vec3::new(x, y, z));
    }

    let fallback_count = count - points.len();
    if fallback_count > 0 {
        warn!(
            "placement: only {} of {} points landed inside the silhouette after {} attempts; filling {} at random",
            points.len(),
            count,
            attempts,
            fallback_count
        );
        for _ in 0..fallback_count {
            points.push(Vec3::new(
                params.center.x + rng.gen_range_f32(-r_max, r_max),
                params.center.y + rng.gen_range_f32(-r_max, r_max),
                rng.gen_range_f32(-max_depth, max_depth),
            ));
        }
    }

    Placement {
        points,
        fallback_count,
    }
}

/// Uniform samples inside a ball.
pub fn sphere_points(count: usize, radius: f32, rng: &mut Prng) -> Vec<Vec3> {
    (0..count)
        .map(|_| {
            loop {
                let p = Vec3::new(
                    rng.gen_range_f32(-1.0, 1.0),
                    rng.gen_range_f32(-1.0, 1.0),
                    rng.gen_range_f32(-1.0, 1.0),
                );
                if p.length_squared() <= 1.0 {
                    break p * radius;
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_tube_is_single_ring() {
        let p = Vec3::new(3.0, -2.0, 5.0);
        let mesh = tube_mesh(p, p, Vec3::new(9.0, 9.0, 9.0), 2.0, 6);
        assert!(mesh.ring_count() >= 1);
        assert!(mesh.is_finite());
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn tube_has_expected_topology() {
        let mesh = tube_mesh(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), Vec3::new(50.0, 20.0, 0.0), 2.0, 5);
        assert_eq!(mesh.ring_count(), TUBE_LONGITUDINAL_SEGMENTS + 1);
        assert_eq!(mesh.faces.len(), TUBE_LONGITUDINAL_SEGMENTS * 5 * 2);
        let n = mesh.vertices.len() as u32;
        assert!(mesh.faces.iter().flatten().all(|&i| i < n));
    }

    #[test]
    fn tube_rings_sit_at_radius() {
        let p0 = Vec3::ZERO;
        let p1 = Vec3::new(0.0, 0.0, 80.0);
        let cp = control_point(p0, p1, 0.0);
        let mesh = tube_mesh(p0, p1, cp, 3.0, 8);
        for (i, v) in mesh.vertices.iter().enumerate() {
            let t = (i / 8) as f32 / TUBE_LONGITUDINAL_SEGMENTS as f32;
            let center = bezier_point(p0, cp, p1, t);
            assert!(((*v - center).length() - 3.0).abs() < 1e-3);
        }
    }

    #[test]
    fn control_point_coincident_with_endpoint_is_safe() {
        let p0 = Vec3::ZERO;
        let p1 = Vec3::new(10.0, 0.0, 0.0);
        let mesh = tube_mesh(p0, p1, p0, 1.0, 4);
        assert!(mesh.is_finite());
    }

    #[test]
    fn capsule_is_closed_sphere() {
        let mesh = capsule_mesh(Vec3::ZERO, 4.0, 6);
        assert!(mesh.is_finite());
        assert!(mesh
            .vertices
            .iter()
            .all(|v| (v.length() - 4.0).abs() < 1e-4));
        // 6 stacks × 6 slices × 2 minus one triangle per slice at each pole.
        assert_eq!(mesh.faces.len(), 6 * 6 * 2 - 2 * 6);
    }

    #[test]
    fn shell_without_silhouette_is_ellipsoid() {
        let params = ShellParams {
            center: Vec2::ZERO,
            max_radius: 100.0,
            num_segments: 12,
        };
        let contours = extruded_shell(None, 5, 50.0, &params);
        assert_eq!(contours.len(), 5);
        assert_eq!(contours[0].z, -50.0);
        assert_eq!(contours[4].z, 50.0);
        // Middle slice is the widest; the end caps collapse.
        let r_mid = contours[2].points[0].truncate().length();
        assert!((r_mid - 100.0).abs() < 1e-3);
        assert!(contours[0].points[0].truncate().length() < 1e-3);
    }

    #[test]
    fn shell_finds_circle_boundary() {
        let circle = |x: f32, y: f32| x * x + y * y <= 60.0 * 60.0;
        let params = ShellParams {
            center: Vec2::ZERO,
            max_radius: 100.0,
            num_segments: 16,
        };
        let contours = extruded_shell(Some(&circle), 1, 40.0, &params);
        // 8 bisection steps over 100 units resolve to < 0.4 units.
        for p in &contours[0].points {
            let r = p.truncate().length();
            assert!((r - 60.0).abs() < 0.5, "r = {r}");
        }
    }

    #[test]
    fn placement_respects_silhouette() {
        let disc = |x: f32, y: f32| x * x + y * y <= 50.0 * 50.0;
        let params = ShellParams {
            center: Vec2::ZERO,
            max_radius: 100.0,
            num_segments: 8,
        };
        let mut rng = Prng::new(5);
        let placed = place_points_inside(&disc, 40, 30.0, &params, &mut rng);
        assert_eq!(placed.points.len(), 40);
        assert_eq!(placed.fallback_count, 0);
        for p in &placed.points {
            assert!(disc(p.x, p.y));
            assert!(p.z.abs() <= 30.0);
        }
    }

    #[test]
    fn placement_falls_back_when_silhouette_is_empty() {
        let nothing = |_x: f32, _y: f32| false;
        let mut rng = Prng::new(8);
        let placed = place_points_inside(&nothing, 10, 20.0, &ShellParams::default(), &mut rng);
        assert_eq!(placed.points.len(), 10);
        assert_eq!(placed.fallback_count, 10);
    }

    #[test]
    fn sphere_points_stay_in_ball() {
        let mut rng = Prng::new(21);
        let pts = sphere_points(200, 30.0, &mut rng);
        assert_eq!(pts.len(), 200);
        assert!(pts.iter().all(|p| p.length() <= 30.0 + 1e-3));
    }
}
