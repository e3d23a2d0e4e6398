//! Scripted interaction replays.
//!
//! A script is a list of frames, each with a timestamp, either a pointer ray
//! or a pre-computed hit index, and a click count. Frames may also switch the
//! year range. Scripts are JSON or YAML, picked by file extension.

use crate::catalog::{SongCatalog, YearRange};
use crate::events::ClickBus;
use crate::hit_test::Ray;
use crate::interaction::{InteractionState, Timestamp};
use crate::scene::{Scene, SceneSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Frame {frame}: timestamps must not go backwards ({at_ms}ms after {previous_ms}ms)")]
    TimeWentBackwards { frame: usize, at_ms: u64, previous_ms: u64 },
    #[error("Frame {frame}: give either `ray` or `hit`, not both")]
    AmbiguousPointer { frame: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptRay {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptFrame {
    pub at_ms: u64,
    #[serde(default)]
    pub ray: Option<ScriptRay>,
    #[serde(default)]
    pub hit: Option<usize>,
    #[serde(default)]
    pub clicks: usize,
    /// Switch the year filter before this frame runs.
    #[serde(default)]
    pub years: Option<YearRange>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Script {
    pub frames: Vec<ScriptFrame>,
}

impl Script {
    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&contents)
        } else {
            Self::from_json_str(&contents)
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(s)?;
        script.check()?;
        Ok(script)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_yaml::from_str(s)?;
        script.check()?;
        Ok(script)
    }

    fn check(&self) -> Result<(), ScriptError> {
        let mut previous_ms = 0;
        for (frame, f) in self.frames.iter().enumerate() {
            if f.at_ms < previous_ms {
                return Err(ScriptError::TimeWentBackwards {
                    frame,
                    at_ms: f.at_ms,
                    previous_ms,
                });
            }
            if f.ray.is_some() && f.hit.is_some() {
                return Err(ScriptError::AmbiguousPointer { frame });
            }
            previous_ms = f.at_ms;
        }
        Ok(())
    }
}

/// What the scene looked like after one scripted frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub at_ms: u64,
    pub years: YearRange,
    pub state: InteractionState,
    pub hovered: Option<String>,
    pub paused: bool,
    pub angle: f64,
    pub timers: usize,
}

/// Mount a scene, play every frame through it, then tear it down.
pub fn run(
    catalog: &SongCatalog,
    years: YearRange,
    settings: SceneSettings,
    script: &Script,
) -> Vec<FrameRecord> {
    let bus = ClickBus::new();
    let mut scene = Scene::mount(catalog, years, &bus, settings);
    let mut records = Vec::with_capacity(script.frames.len());

    for f in &script.frames {
        if let Some(range) = f.years {
            scene.set_year_range(range);
        }
        for _ in 0..f.clicks {
            bus.publish();
        }

        let now = Timestamp::from_millis(f.at_ms);
        let frame = match (f.ray, f.hit) {
            (Some(r), _) => scene.tick(now, Some(&Ray::new(r.origin, r.direction))),
            (None, hit) => scene.tick_hit(now, hit),
        };

        records.push(FrameRecord {
            at_ms: f.at_ms,
            years: scene.year_range(),
            state: frame.state,
            hovered: frame.hovered.map(|s| format!("{} — {}", s.name, s.artist)),
            paused: frame.paused,
            angle: frame.angle,
            timers: scene.pending_timers(),
        });
    }

    scene.teardown();
    records
}
