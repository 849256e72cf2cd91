//! World settings, loading and clamping.
//!
//! [`Settings`] is the single configuration input of a
//! [`FluidWorld`](crate::FluidWorld). Every field has a default, so a
//! TOML file only needs the keys it changes. Out-of-range values are
//! never rejected: [`Settings::sanitized`] clamps them and logs a
//! warning per clamp.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use shoal_core::FluidLayer;
use shoal_grid::GridConfig;

/// Largest readback or distance-field timeslice count.
pub const MAX_TIMESLICES: u32 = 64;
/// Largest jump-flood iteration cap.
pub const MAX_JUMP_FLOOD_ITERATIONS: u32 = 16;
/// Largest number of fixed steps one frame may run.
pub const MAX_STEPS_PER_FRAME: u32 = 16;

// ── ReadbackSettings ───────────────────────────────────────────────

/// Surface mirror readback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadbackSettings {
    /// Mirror the composite to host memory for queries.
    pub enabled: bool,
    /// Row bands per full mirror refresh.
    pub timeslices: u32,
}

impl Default for ReadbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeslices: 4,
        }
    }
}

// ── DistanceFieldSettings ──────────────────────────────────────────

/// Jump-flood nearest-fluid field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceFieldSettings {
    /// Build and mirror the field.
    pub enabled: bool,
    /// Cells per distance texel along each axis.
    pub downsample: u32,
    /// Cap on propagation passes.
    pub max_iterations: u32,
    /// Row bands per full mirror refresh.
    pub timeslices: u32,
}

impl Default for DistanceFieldSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            downsample: 2,
            max_iterations: 8,
            timeslices: 4,
        }
    }
}

// ── SecondLayerSettings ────────────────────────────────────────────

/// The optional second fluid layer and its physics overrides. `None`
/// inherits the first layer's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondLayerSettings {
    /// Allocate and simulate a second layer.
    pub enabled: bool,
    /// Gravity-like acceleration override.
    pub acceleration: Option<f32>,
    /// Wave damping override.
    pub wave_damping: Option<f32>,
    /// Evaporation rate override (depth per second).
    pub evaporation: Option<f32>,
}

/// Resolved per-layer physics handed to solvers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerPhysics {
    /// Gravity-like acceleration.
    pub acceleration: f32,
    /// Velocity damping per second.
    pub wave_damping: f32,
    /// Depth lost per second.
    pub evaporation: f32,
}

// ── Settings ───────────────────────────────────────────────────────

/// Everything a world reads from its settings collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Interior cells per tile along x and z.
    pub resolution: [u32; 2],
    /// World-space size of one tile along x and z.
    pub dimension: [f32; 2],
    /// Ghost cells per side.
    pub ghost_margin: u32,
    /// Cells beyond the interior exposed to renderers.
    pub render_margin: u32,
    /// Scale applied to the cell size the solver sees.
    pub cell_size_scale: f32,
    /// Velocity damping per second.
    pub wave_damping: f32,
    /// Gravity-like acceleration.
    pub acceleration: f32,
    /// Unlinked tile sides drain instead of reflecting.
    pub open_borders: bool,
    /// Depth lost per second, per layer.
    pub evaporation: [f32; 2],
    /// Fixed step length in seconds.
    pub step_duration: f32,
    /// Upper bound on fixed steps per frame.
    pub max_steps_per_frame: u32,
    /// Surface mirror readback.
    pub readback: ReadbackSettings,
    /// Nearest-fluid distance field.
    pub distance_field: DistanceFieldSettings,
    /// Optional second fluid layer.
    pub second_layer: SecondLayerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: [128, 128],
            dimension: [64.0, 64.0],
            ghost_margin: 2,
            render_margin: 1,
            cell_size_scale: 1.0,
            wave_damping: 0.02,
            acceleration: 9.81,
            open_borders: false,
            evaporation: [0.0, 0.0],
            step_duration: 1.0 / 60.0,
            max_steps_per_frame: 3,
            readback: ReadbackSettings::default(),
            distance_field: DistanceFieldSettings::default(),
            second_layer: SecondLayerSettings::default(),
        }
    }
}

fn clamp_u32(name: &str, value: &mut u32, lo: u32, hi: u32) {
    let clamped = (*value).clamp(lo, hi);
    if clamped != *value {
        log::warn!("{name} clamped from {value} to {clamped}");
        *value = clamped;
    }
}

fn clamp_f32(name: &str, value: &mut f32, lo: f32, hi: f32, fallback: f32) {
    let clamped = if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    };
    if clamped != *value {
        log::warn!("{name} clamped from {value} to {clamped}");
        *value = clamped;
    }
}

impl Settings {
    /// Parse settings from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Return a copy with every value clamped to its supported range.
    pub fn sanitized(&self) -> Self {
        let mut s = self.clone();
        for (axis, r) in ["resolution.x", "resolution.z"].iter().zip(&mut s.resolution) {
            clamp_u32(axis, r, GridConfig::MIN_RESOLUTION, GridConfig::MAX_RESOLUTION);
        }
        for (axis, d) in ["dimension.x", "dimension.z"].iter().zip(&mut s.dimension) {
            clamp_f32(axis, d, 1e-3, f32::MAX, 1.0);
        }
        clamp_u32("ghost_margin", &mut s.ghost_margin, 1, GridConfig::MAX_GHOST_MARGIN);
        clamp_u32("render_margin", &mut s.render_margin, 0, s.ghost_margin);
        clamp_f32("cell_size_scale", &mut s.cell_size_scale, 1e-3, 1e3, 1.0);
        clamp_f32("wave_damping", &mut s.wave_damping, 0.0, 1e3, 0.0);
        clamp_f32("acceleration", &mut s.acceleration, 0.0, 1e3, 9.81);
        for e in &mut s.evaporation {
            clamp_f32("evaporation", e, 0.0, f32::MAX, 0.0);
        }
        clamp_u32("readback.timeslices", &mut s.readback.timeslices, 1, MAX_TIMESLICES);
        let df = &mut s.distance_field;
        clamp_u32("distance_field.downsample", &mut df.downsample, 1, GridConfig::MAX_DOWNSAMPLE);
        clamp_u32(
            "distance_field.max_iterations",
            &mut df.max_iterations,
            1,
            MAX_JUMP_FLOOD_ITERATIONS,
        );
        clamp_u32("distance_field.timeslices", &mut df.timeslices, 1, MAX_TIMESLICES);
        let second = &mut s.second_layer;
        if let Some(a) = second.acceleration.as_mut() {
            clamp_f32("second_layer.acceleration", a, 0.0, 1e3, 9.81);
        }
        if let Some(d) = second.wave_damping.as_mut() {
            clamp_f32("second_layer.wave_damping", d, 0.0, 1e3, 0.0);
        }
        if let Some(e) = second.evaporation.as_mut() {
            clamp_f32("second_layer.evaporation", e, 0.0, f32::MAX, 0.0);
        }
        clamp_f32("step_duration", &mut s.step_duration, 1e-4, 1.0, 1.0 / 60.0);
        clamp_u32("max_steps_per_frame", &mut s.max_steps_per_frame, 1, MAX_STEPS_PER_FRAME);
        s
    }

    /// Fluid layers simulated.
    pub fn layers(&self) -> u32 {
        if self.second_layer.enabled {
            2
        } else {
            1
        }
    }

    /// Tile size as a vector.
    pub fn tile_size(&self) -> Vec2 {
        Vec2::from(self.dimension)
    }

    /// Physics for `layer`, with second-layer overrides applied.
    pub fn layer_physics(&self, layer: FluidLayer) -> LayerPhysics {
        let base = LayerPhysics {
            acceleration: self.acceleration,
            wave_damping: self.wave_damping,
            evaporation: self.evaporation[layer.index()],
        };
        match layer {
            FluidLayer::Primary => base,
            FluidLayer::Secondary => LayerPhysics {
                acceleration: self.second_layer.acceleration.unwrap_or(base.acceleration),
                wave_damping: self.second_layer.wave_damping.unwrap_or(base.wave_damping),
                evaporation: self.second_layer.evaporation.unwrap_or(base.evaporation),
            },
        }
    }

    /// Grid configuration for a tile centred at `center` with local
    /// heights relative to `world_y`.
    pub fn grid_config(&self, center: Vec2, world_y: f32) -> GridConfig {
        GridConfig {
            resolution: self.resolution,
            ghost_margin: self.ghost_margin,
            render_margin: self.render_margin,
            layers: self.layers(),
            dimension: self.tile_size(),
            center,
            world_y,
            distance_downsample: self
                .distance_field
                .enabled
                .then_some(self.distance_field.downsample),
        }
        .sanitized()
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors loading or saving [`Settings`].
#[derive(Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    Io(io::Error),
    /// The TOML was malformed or had a value of the wrong type.
    Parse(toml::de::Error),
    /// The settings could not be written as TOML.
    Serialize(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "reading settings: {e}"),
            Self::Parse(e) => write!(f, "parsing settings: {e}"),
            Self::Serialize(e) => write!(f, "writing settings: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Serialize(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Serialize(e)
    }
}
