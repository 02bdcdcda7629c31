//! Line-delimited JSON protocol spoken by `neuroforged`.
//!
//! One request object per line, one response object per line, both tagged
//! with a `"type"` field.

use serde::{Deserialize, Serialize};

use crate::genome::Genome;
use crate::interaction::Hit;
use crate::modifiers::ModifierId;
use crate::observer::{ModifierInfo, SceneSnapshot};
use crate::scene::FrameStats;
use crate::surface::DrawCommand;

pub const DEFAULT_ADDR: &str = "127.0.0.1:9877";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    GetState,
    Start,
    Stop,
    Step,
    SetModifier { id: ModifierId, active: bool },
    ResetCamera,
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    Zoom { delta: f32 },
    HitTest { x: f32, y: f32 },
    GetFrame,
    SetFramerate { fps: u32 },
    ListModifiers,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    State(SceneSnapshot),
    Frame {
        width: f32,
        height: f32,
        stats: FrameStats,
        commands: Vec<DrawCommand>,
    },
    Genome(Genome),
    Hit { hit: Option<Hit> },
    Modifiers { modifiers: Vec<ModifierInfo> },
    Success { message: String },
    Error { message: String },
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Response::Success {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_type_tag() {
        let json = serde_json::to_string(&Request::SetModifier { id: 7, active: true }).unwrap();
        assert_eq!(json, r#"{"type":"SetModifier","id":7,"active":true}"#);
        let back: Request = serde_json::from_str(r#"{"type":"Zoom","delta":-20.0}"#).unwrap();
        assert_eq!(back, Request::Zoom { delta: -20.0 });
    }

    #[test]
    fn empty_hit_serializes_as_null() {
        let json = serde_json::to_string(&Response::Hit { hit: None }).unwrap();
        assert_eq!(json, r#"{"type":"Hit","hit":null}"#);
    }
}
