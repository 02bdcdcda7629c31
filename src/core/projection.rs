//! Perspective projection onto a 2D surface.
//!
//! Everything here is a pure function of its inputs. `depth` is only used for
//! back-to-front ordering; there is no depth buffer.

use glam::{Quat, Vec3};

use crate::camera::{Camera, Viewport};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOG_NEAR: f32 = 0.0;
pub const DEFAULT_FOG_FAR: f32 = 700.0;
pub const DEFAULT_FOG_MIN_FACTOR: f32 = 0.15;

const DEGENERATE_NORMAL_EPS: f32 = 1.0e-12;

/// A point mapped to screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub scale: f32,
}

impl Projected {
    /// `scale <= 0` means the point is behind the lens and must not be drawn.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.scale > 0.0 && self.scale.is_finite() && self.x.is_finite() && self.y.is_finite()
    }
}

#[inline]
fn camera_rotation(camera: &Camera) -> Quat {
    // Yaw first, then pitch, then roll.
    Quat::from_rotation_z(camera.roll())
        * Quat::from_rotation_x(camera.pitch())
        * Quat::from_rotation_y(camera.yaw())
}

/// World point to view space: rotate about the origin, then translate.
#[inline]
pub fn view_space(point: Vec3, camera: &Camera) -> Vec3 {
    camera_rotation(camera) * point + camera.position
}

/// View-space point to screen space.
#[inline]
pub fn project_view(view: Vec3, fov: f32, viewport: &Viewport) -> Projected {
    let denom = fov + view.z;
    let scale = if denom > 0.0 { fov / denom } else { 0.0 };
    let (cx, cy) = viewport.center();
    Projected {
        x: cx + view.x * scale,
        y: cy + view.y * scale,
        depth: view.z,
        scale,
    }
}

pub fn project(point: Vec3, camera: &Camera, viewport: &Viewport) -> Projected {
    project_view(view_space(point, camera), camera.fov, viewport)
}

/// Projects many points sharing one camera (rotation computed once).
pub fn project_all(points: &[Vec3], camera: &Camera, viewport: &Viewport) -> Vec<Projected> {
    let rot = camera_rotation(camera);
    points
        .iter()
        .map(|p| project_view(rot * *p + camera.position, camera.fov, viewport))
        .collect()
}

/// Alpha attenuation with distance from the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DepthFog {
    pub near: f32,
    pub far: f32,
    // Fraction of alpha left at (and beyond) `far`.
    pub min_factor: f32,
}

impl Default for DepthFog {
    fn default() -> Self {
        Self {
            near: DEFAULT_FOG_NEAR,
            far: DEFAULT_FOG_FAR,
            min_factor: DEFAULT_FOG_MIN_FACTOR,
        }
    }
}

impl DepthFog {
    pub fn apply(&self, base_alpha: f32, depth: f32) -> f32 {
        let base = if base_alpha.is_finite() {
            base_alpha.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !depth.is_finite() || depth <= self.near {
            return base;
        }
        let span = (self.far - self.near).max(f32::EPSILON);
        let t = ((depth - self.near) / span).clamp(0.0, 1.0);
        let min_factor = self.min_factor.clamp(0.0, 1.0);
        let factor = 1.0 - t * (1.0 - min_factor);
        (base * factor).clamp(0.0, 1.0)
    }
}

pub fn apply_depth_fog(base_alpha: f32, depth: f32) -> f32 {
    DepthFog::default().apply(base_alpha, depth)
}

/// Unit normal of triangle (v0, v1, v2). Degenerate triangles face the viewer.
pub fn face_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let n = (v1 - v0).cross(v2 - v0);
    let len_sq = n.length_squared();
    if !len_sq.is_finite() || len_sq <= DEGENERATE_NORMAL_EPS {
        return Vec3::NEG_Z;
    }
    n / len_sq.sqrt()
}

/// Two-sided Lambert term in [ambient, 1].
pub fn shade(normal: Vec3, light_dir: Vec3, ambient: f32) -> f32 {
    let l = light_dir.normalize_or_zero();
    let ambient = ambient.clamp(0.0, 1.0);
    let diffuse = normal.dot(l).abs();
    if !diffuse.is_finite() {
        return ambient;
    }
    (ambient + (1.0 - ambient) * diffuse).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_camera(z: f32) -> Camera {
        Camera {
            position: Vec3::new(0.0, 0.0, z),
            rotation: Vec3::ZERO,
            fov: 500.0,
        }
    }

    #[test]
    fn origin_projects_to_viewport_center() {
        let vp = Viewport::new(800.0, 600.0);
        let p = project(Vec3::ZERO, &identity_camera(0.0), &vp);
        assert_eq!((p.x, p.y), (400.0, 300.0));
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.depth, 0.0);
    }

    #[test]
    fn points_behind_lens_are_clipped() {
        let cam = identity_camera(0.0);
        let vp = Viewport::default();
        for z in [-500.0f32, -500.0001, -650.0, -10_000.0] {
            let p = project(Vec3::new(12.0, -4.0, z), &cam, &vp);
            assert!(p.scale <= 0.0, "z={z} gave scale {}", p.scale);
            assert!(!p.is_visible());
        }
    }

    #[test]
    fn farther_points_shrink() {
        let cam = identity_camera(0.0);
        let vp = Viewport::default();
        let near = project(Vec3::new(10.0, 0.0, 0.0), &cam, &vp);
        let far = project(Vec3::new(10.0, 0.0, 400.0), &cam, &vp);
        assert!(far.scale < near.scale);
        assert!(far.depth > near.depth);
    }

    #[test]
    fn yaw_quarter_turn_moves_x_into_depth() {
        let cam = Camera {
            rotation: Vec3::new(0.0, core::f32::consts::FRAC_PI_2, 0.0),
            ..identity_camera(0.0)
        };
        let v = view_space(Vec3::X, &cam);
        assert!(v.x.abs() < 1e-5);
        assert!((v.z.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn project_all_matches_project() {
        let cam = Camera::default();
        let vp = Viewport::default();
        let pts = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-40.0, 8.0, 90.0)];
        let batch = project_all(&pts, &cam, &vp);
        for (p, b) in pts.iter().zip(batch.iter()) {
            let single = project(*p, &cam, &vp);
            assert!((single.x - b.x).abs() < 1e-4);
            assert!((single.depth - b.depth).abs() < 1e-4);
        }
    }

    #[test]
    fn fog_is_monotone_and_clamped() {
        let mut last = 1.0;
        for i in 0..50 {
            let a = apply_depth_fog(1.0, i as f32 * 25.0);
            assert!(a <= last + 1e-6);
            assert!((0.0..=1.0).contains(&a));
            last = a;
        }
        assert_eq!(apply_depth_fog(2.0, -10.0), 1.0);
        assert_eq!(apply_depth_fog(f32::NAN, 10.0), 0.0);
    }

    #[test]
    fn degenerate_face_uses_fallback_normal() {
        let p = Vec3::new(1.0, 1.0, 1.0);
        let n = face_normal(p, p, p);
        assert_eq!(n, Vec3::NEG_Z);
        let collinear = face_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert!(!collinear.is_nan());
    }

    #[test]
    fn face_normal_is_unit() {
        let n = face_normal(Vec3::ZERO, Vec3::X * 3.0, Vec3::Y * 5.0);
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!((n.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn shade_stays_between_ambient_and_one() {
        let s = shade(Vec3::Z, Vec3::new(0.0, 0.0, -1.0), 0.3);
        assert!((s - 1.0).abs() < 1e-6);
        let side = shade(Vec3::X, Vec3::Z, 0.3);
        assert!((side - 0.3).abs() < 1e-6);
    }
}
