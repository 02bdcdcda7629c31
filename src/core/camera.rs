use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Camera pose used by the projection pipeline.
///
/// `rotation` holds Euler angles in radians: `x` = pitch, `y` = yaw, `z` = roll.
/// `position` is applied after rotation, so it is a view-space offset of the
/// scene: `z` is the viewing distance, `x`/`y` pan along the camera's local axes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3,
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 350.0),
            rotation: Vec3::new(-0.25, 0.35, 0.0),
            fov: 600.0,
        }
    }
}

impl Camera {
    pub fn pitch(&self) -> f32 {
        self.rotation.x
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.y
    }

    pub fn roll(&self) -> f32 {
        self.rotation.z
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.fov.is_finite()
    }
}

/// Screen-space rectangle the projection maps into.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && py >= self.y && px <= self.x + self.width && py <= self.y + self.height
    }

    /// A smaller viewport anchored in the bottom-right corner.
    pub fn inset(&self, fraction: f32, margin: f32) -> Viewport {
        let fraction = fraction.clamp(0.05, 1.0);
        let width = self.width * fraction;
        let height = self.height * fraction;
        Viewport {
            x: self.x + self.width - width - margin,
            y: self.y + self.height - height - margin,
            width,
            height,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 640.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_sits_inside_parent() {
        let vp = Viewport::new(800.0, 600.0);
        let inset = vp.inset(0.25, 10.0);
        assert!(vp.contains(inset.x, inset.y));
        assert!(vp.contains(inset.x + inset.width, inset.y + inset.height));
        assert_eq!(inset.width, 200.0);
    }

    #[test]
    fn default_camera_is_finite() {
        assert!(Camera::default().is_finite());
    }
}
