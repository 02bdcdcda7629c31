//! Browser host for the neuroforge renderer.
//!
//! This crate is a stub by default so the workspace builds on native targets
//! without a wasm toolchain. Enable the canvas host with `--features web`
//! (and a wasm32 target).
//!
//! The DOM event decoding below is target independent so it can be tested
//! natively.

use neuroforge::interaction::{KeyModifiers, PointerButton};

// `WheelEvent.deltaMode` values.
pub const DOM_DELTA_PIXEL: u32 = 0;
pub const DOM_DELTA_LINE: u32 = 1;
pub const DOM_DELTA_PAGE: u32 = 2;

const LINE_HEIGHT_PX: f64 = 16.0;
const PAGE_HEIGHT_PX: f64 = 800.0;

/// Map `MouseEvent.button`.
pub fn pointer_button(button: i16) -> PointerButton {
    match button {
        1 => PointerButton::Middle,
        2 => PointerButton::Secondary,
        _ => PointerButton::Primary,
    }
}

pub fn key_modifiers(shift: bool, ctrl: bool, alt: bool) -> KeyModifiers {
    KeyModifiers { shift, ctrl, alt }
}

/// Normalize a wheel delta to pixels.
pub fn wheel_delta(delta_y: f64, delta_mode: u32) -> f32 {
    let px = match delta_mode {
        DOM_DELTA_LINE => delta_y * LINE_HEIGHT_PX,
        DOM_DELTA_PAGE => delta_y * PAGE_HEIGHT_PX,
        _ => delta_y,
    };
    if px.is_finite() {
        px as f32
    } else {
        0.0
    }
}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::{start, NeuroforgeApp};
