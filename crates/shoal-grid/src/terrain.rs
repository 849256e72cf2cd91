//! Terrain sources and the terrain bake.
//!
//! Every kind of terrain reduces to a [`TerrainInput`] (a texture, a
//! height scale and a UV transform over known world bounds) before it
//! reaches a grid. The bake samples that input at each padded cell and
//! writes heights relative to the tile's world Y.

use std::fmt;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use shoal_compute::{workgroups, CommandStream};
use shoal_core::{Texture, UvTransform, WorldBounds};

use crate::grid::SimulationGrid;

/// Default texel count per axis when rasterizing a procedural source.
pub const DEFAULT_SAMPLE_RESOLUTION: u32 = 256;

/// A height function of world `(x, z)`.
pub type SurfaceFn = Arc<dyn Fn(f32, f32) -> f32 + Send + Sync>;

/// Static collision geometry used as terrain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions in world space.
    pub vertices: Vec<Vec3>,
    /// Triangles as vertex index triples.
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Highest surface point above `(x, z)`, if any triangle covers it.
    ///
    /// Degenerate triangles and out-of-range indices are ignored.
    pub fn height_at(&self, p: Vec2) -> Option<f32> {
        let mut best: Option<f32> = None;
        for tri in &self.indices {
            let (Some(a), Some(b), Some(c)) = (
                self.vertices.get(tri[0] as usize),
                self.vertices.get(tri[1] as usize),
                self.vertices.get(tri[2] as usize),
            ) else {
                continue;
            };
            if let Some(y) = barycentric_height(*a, *b, *c, p) {
                best = Some(best.map_or(y, |h| h.max(y)));
            }
        }
        best
    }

    /// Horizontal extent of all vertices.
    pub fn bounds(&self) -> Option<WorldBounds> {
        let mut iter = self.vertices.iter().map(|v| Vec2::new(v.x, v.z));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(WorldBounds { min, max })
    }
}

fn barycentric_height(a: Vec3, b: Vec3, c: Vec3, p: Vec2) -> Option<f32> {
    let (a2, b2, c2) = (Vec2::new(a.x, a.z), Vec2::new(b.x, b.z), Vec2::new(c.x, c.z));
    let v0 = b2 - a2;
    let v1 = c2 - a2;
    let v2 = p - a2;
    let den = v0.perp_dot(v1);
    if den.abs() <= f32::EPSILON {
        return None;
    }
    let v = v2.perp_dot(v1) / den;
    let w = v0.perp_dot(v2) / den;
    let u = 1.0 - v - w;
    const TOL: f32 = -1e-5;
    if u < TOL || v < TOL || w < TOL {
        return None;
    }
    Some(u * a.y + v * b.y + w * c.y)
}

/// Where terrain heights come from.
#[derive(Clone)]
pub enum TerrainSource {
    /// An external heightmap texture (channel 0).
    Heightmap(Texture),
    /// A procedural surface evaluated at world `(x, z)`.
    Surface(SurfaceFn),
    /// Static collision geometry, rasterized top-down.
    CollisionMesh(TriangleMesh),
    /// Top-down captured depth layers; the highest layer wins per texel.
    CapturedDepth(Vec<Texture>),
}

impl fmt::Debug for TerrainSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heightmap(t) => write!(f, "Heightmap({}x{})", t.width(), t.height()),
            Self::Surface(_) => write!(f, "Surface(..)"),
            Self::CollisionMesh(m) => write!(f, "CollisionMesh({} tris)", m.indices.len()),
            Self::CapturedDepth(layers) => write!(f, "CapturedDepth({} layers)", layers.len()),
        }
    }
}

/// Uniform terrain description consumed by the bake.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainInput {
    /// Height texture, channel 0.
    pub texture: Texture,
    /// Multiplier from texel value to world height.
    pub height_scale: f32,
    /// Transform from terrain UV to texture UV.
    pub uv_transform: UvTransform,
    /// World area the terrain UV square covers.
    pub bounds: WorldBounds,
}

impl TerrainInput {
    /// World height at `p`.
    pub fn height_at(&self, p: Vec2) -> f32 {
        let uv = self.uv_transform.apply(self.bounds.to_uv(p));
        self.texture.sample(uv, 0) * self.height_scale
    }
}

/// A terrain source placed in the world.
///
/// Tiles created from a parent share its terrain through an `Arc`.
#[derive(Clone, Debug)]
pub struct Terrain {
    /// The height source.
    pub source: TerrainSource,
    /// World area covered.
    pub bounds: WorldBounds,
    /// Multiplier from source value to world height.
    pub height_scale: f32,
    /// Transform from terrain UV to source UV.
    pub uv_transform: UvTransform,
    /// Texels per axis when a source must be rasterized.
    pub sample_resolution: u32,
}

impl Terrain {
    /// Terrain from `source` covering `bounds`, unit scale.
    pub fn new(source: TerrainSource, bounds: WorldBounds) -> Self {
        Self {
            source,
            bounds,
            height_scale: 1.0,
            uv_transform: UvTransform::IDENTITY,
            sample_resolution: DEFAULT_SAMPLE_RESOLUTION,
        }
    }

    /// Set the height scale.
    pub fn with_height_scale(mut self, scale: f32) -> Self {
        self.height_scale = scale;
        self
    }

    /// Set the UV transform.
    pub fn with_uv_transform(mut self, uv: UvTransform) -> Self {
        self.uv_transform = uv;
        self
    }

    /// Set the rasterization resolution for procedural sources.
    pub fn with_sample_resolution(mut self, texels: u32) -> Self {
        self.sample_resolution = texels.max(1);
        self
    }

    /// Flat terrain at world height `y`.
    pub fn flat(bounds: WorldBounds, y: f32) -> Self {
        Self::new(TerrainSource::Heightmap(Texture::from_fn(1, 1, |_, _| y)), bounds)
    }

    /// Adapt the source to a uniform [`TerrainInput`].
    ///
    /// Procedural sources are rasterized over `bounds` in terrain UV, so
    /// the UV transform applies to every source the same way.
    pub fn to_input(&self) -> TerrainInput {
        let res = self.sample_resolution.max(1);
        let bounds = self.bounds;
        let world = move |u: f32, v: f32| bounds.from_uv(Vec2::new(u, v));
        let texture = match &self.source {
            TerrainSource::Heightmap(t) => t.clone(),
            TerrainSource::Surface(f) => Texture::from_fn(res, res, |u, v| {
                let p = world(u, v);
                f(p.x, p.y)
            }),
            TerrainSource::CollisionMesh(mesh) => {
                Texture::from_fn(res, res, |u, v| mesh.height_at(world(u, v)).unwrap_or(0.0))
            }
            TerrainSource::CapturedDepth(layers) => merge_layers(layers),
        };
        TerrainInput {
            texture,
            height_scale: self.height_scale,
            uv_transform: self.uv_transform,
            bounds,
        }
    }
}

/// Merge captured layers at the first layer's resolution, keeping the
/// highest value per texel.
fn merge_layers(layers: &[Texture]) -> Texture {
    let Some(first) = layers.first() else {
        return Texture::new(1, 1, 1);
    };
    let (w, h) = (first.width(), first.height());
    Texture::from_fn(w, h, |u, v| {
        layers
            .iter()
            .map(|t| t.sample(Vec2::new(u, v), 0))
            .fold(f32::NEG_INFINITY, f32::max)
    })
}

impl SimulationGrid {
    /// Bake terrain into the next terrain buffer, then swap it in.
    ///
    /// With no terrain assigned this is a no-op and the buffer keeps its
    /// previous contents.
    pub fn bake_terrain(&mut self, terrain: Option<&TerrainInput>, stream: &mut CommandStream<'_>) {
        let Some(input) = terrain else {
            log::debug!("no terrain assigned; skipping bake");
            return;
        };
        let [w, h] = self.padded();
        let config = self.config().clone();
        let buf = self.terrain.next_mut();
        let kernel = stream.kernels().terrain_bake;
        stream.dispatch(kernel, workgroups(w, h), || {
            for y in 0..h {
                for x in 0..w {
                    let world = input.height_at(config.cell_center(x, y));
                    let local = world - config.world_y;
                    buf.set(x, y, 0, if local.is_finite() { local } else { 0.0 });
                }
            }
        });
        self.terrain.swap();
    }
}
