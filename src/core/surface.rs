//! The 2D drawing surface the renderer targets.
//!
//! Hosts implement [`DrawSurface`] on whatever canvas they own; [`DisplayList`]
//! records commands instead of drawing, which is what the daemon ships to
//! clients and what the tests inspect.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::camera::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        let a = if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 };
        Self { a, ..self }
    }

    /// Multiply the color channels by `k` (alpha untouched).
    pub fn scaled(self, k: f32) -> Self {
        let k = if k.is_finite() { k.max(0.0) } else { 0.0 };
        let ch = |c: u8| ((c as f32) * k).round().clamp(0.0, 255.0) as u8;
        Self {
            r: ch(self.r),
            g: ch(self.g),
            b: ch(self.b),
            a: self.a,
        }
    }

    /// Blend toward gray by `1 - saturation`.
    pub fn saturated(self, saturation: f32) -> Self {
        let s = if saturation.is_finite() {
            saturation.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let gray = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
        let mix = |c: u8| (gray + (c as f32 - gray) * s).round().clamp(0.0, 255.0) as u8;
        Self {
            r: mix(self.r),
            g: mix(self.g),
            b: mix(self.b),
            a: self.a,
        }
    }

    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadialGradient {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    // (offset in [0,1], color)
    pub stops: Vec<(f32, Rgba)>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Paint {
    Solid(Rgba),
    Radial(RadialGradient),
}

pub trait DrawSurface {
    fn size(&self) -> (f32, f32);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba);
    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba, width: f32);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn arc(&mut self, x: f32, y: f32, radius: f32, start: f32, end: f32);
    fn close_path(&mut self);
    fn fill(&mut self, paint: &Paint);
    fn stroke(&mut self, color: Rgba, width: f32);

    /// Restrict drawing to `rect`; `None` removes the clip.
    fn set_clip(&mut self, rect: Option<Viewport>);

    fn viewport(&self) -> Viewport {
        let (w, h) = self.size();
        Viewport::new(w, h)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op"))]
pub enum DrawCommand {
    FillRect { x: f32, y: f32, w: f32, h: f32, color: Rgba },
    StrokeRect { x: f32, y: f32, w: f32, h: f32, color: Rgba, width: f32 },
    BeginPath,
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    Arc { x: f32, y: f32, radius: f32, start: f32, end: f32 },
    ClosePath,
    Fill { paint: Paint },
    Stroke { color: Rgba, width: f32 },
    Clip { rect: Option<Viewport> },
}

/// A surface that records instead of drawing.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Number of filled or stroked shapes.
    pub fn shape_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill { .. } | DrawCommand::Stroke { .. }))
            .count()
    }
}

impl DrawSurface for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { x, y, w, h, color });
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba, width: f32) {
        self.commands.push(DrawCommand::StrokeRect {
            x,
            y,
            w,
            h,
            color,
            width,
        });
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::LineTo { x, y });
    }

    fn arc(&mut self, x: f32, y: f32, radius: f32, start: f32, end: f32) {
        self.commands.push(DrawCommand::Arc {
            x,
            y,
            radius,
            start,
            end,
        });
    }

    fn close_path(&mut self) {
        self.commands.push(DrawCommand::ClosePath);
    }

    fn fill(&mut self, paint: &Paint) {
        self.commands.push(DrawCommand::Fill {
            paint: paint.clone(),
        });
    }

    fn stroke(&mut self, color: Rgba, width: f32) {
        self.commands.push(DrawCommand::Stroke { color, width });
    }

    fn set_clip(&mut self, rect: Option<Viewport>) {
        self.commands.push(DrawCommand::Clip { rect });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_format_matches_canvas_syntax() {
        assert_eq!(
            Rgba::rgba(122, 162, 255, 0.25).to_css(),
            "rgba(122, 162, 255, 0.250)"
        );
    }

    #[test]
    fn zero_saturation_is_gray() {
        let c = Rgba::rgb(250, 20, 40).saturated(0.0);
        assert_eq!(c.r, c.g);
        assert_eq!(c.g, c.b);
    }

    #[test]
    fn display_list_counts_shapes() {
        let mut dl = DisplayList::new(100.0, 100.0);
        dl.begin_path();
        dl.arc(10.0, 10.0, 3.0, 0.0, 6.28);
        dl.fill(&Paint::Solid(Rgba::rgb(1, 2, 3)));
        dl.begin_path();
        dl.move_to(0.0, 0.0);
        dl.line_to(5.0, 5.0);
        dl.stroke(Rgba::rgb(0, 0, 0), 1.0);
        assert_eq!(dl.shape_count(), 2);
        assert_eq!(dl.take_commands().len(), 8);
        assert!(dl.commands().is_empty());
    }
}
