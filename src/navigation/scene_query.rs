//! The narrow query surface the navigation core needs from the physics and
//! terrain collaborators.
//!
//! A game implements [TrackScene] over its physics engine. The crate ships
//! [StaticSurfaceScene], a scene described by flat surface patches and box
//! obstructions, which is enough for headless tooling, tests and benchmarks.
//!

use bevy::prelude::*;

/// What a downward ray struck
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum SurfaceMaterial {
	/// Driveable road surface
	Track,
	/// Driveable but slow ground such as grass or dirt
	Offroad,
	/// Anything else the ray can hit, rails, walls, scenery
	Other,
}

/// A single intersection of a downward ray with a static surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
	/// Point of impact
	pub position: Vec3,
	/// Material of the face that was hit
	pub material: SurfaceMaterial,
	/// Index of the face that was hit within its mesh
	pub face_index: u32,
}

/// Height and classification of the terrain at a point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainSample {
	/// Terrain height
	pub height: f32,
	/// Whether the terrain here is driveable offroad ground
	pub is_offroad: bool,
}

/// Queries the [crate::prelude::MotionGrid] makes of the world while it is built
pub trait TrackScene {
	/// The `(min, max)` corners of the drivable area in the `(x, y)` plane
	fn terrain_bounds(&self) -> (Vec2, Vec2);
	/// Cast a ray straight down from `(xy, top)` for `length` units and return
	/// every static surface it passes through, nearest (highest) first
	fn raycast_down(&self, xy: Vec2, top: f32, length: f32) -> Vec<SurfaceHit>;
	/// Whether any static scenery overlaps a sphere. Drivable surfaces are not reported
	fn overlap_sphere(&self, centre: Vec3, radius: f32) -> bool;
	/// Sample the terrain at `xy`, [None] outside of the terrain
	fn sample_terrain(&self, xy: Vec2) -> Option<TerrainSample>;
}

/// A flat, axis aligned driveable surface of a [StaticSurfaceScene]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePatch {
	/// Minimum `(x, y)` corner, inclusive
	min: Vec2,
	/// Maximum `(x, y)` corner, exclusive
	max: Vec2,
	/// Height of the surface
	height: f32,
	/// Material reported by rays hitting the patch
	material: SurfaceMaterial,
}

impl SurfacePatch {
	/// Create a new instance of [SurfacePatch]
	pub fn new(min: Vec2, max: Vec2, height: f32, material: SurfaceMaterial) -> Self {
		SurfacePatch {
			min,
			max,
			height,
			material,
		}
	}
	/// Whether `xy` lies over the patch
	pub fn contains(&self, xy: Vec2) -> bool {
		xy.x >= self.min.x && xy.x < self.max.x && xy.y >= self.min.y && xy.y < self.max.y
	}
}

/// A box of static scenery in a [StaticSurfaceScene]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstruction {
	/// Minimum corner
	min: Vec3,
	/// Maximum corner
	max: Vec3,
}

impl Obstruction {
	/// Create a new instance of [Obstruction]
	pub fn new(min: Vec3, max: Vec3) -> Self {
		Obstruction {
			min: min.min(max),
			max: min.max(max),
		}
	}
	/// Sphere against box overlap
	fn overlaps_sphere(&self, centre: Vec3, radius: f32) -> bool {
		let closest = centre.clamp(self.min, self.max);
		closest.distance_squared(centre) <= radius * radius
	}
}

/// A [TrackScene] made of flat patches over a flat terrain
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct StaticSurfaceScene {
	/// Minimum `(x, y)` of the terrain
	bounds_min: Vec2,
	/// Maximum `(x, y)` of the terrain
	bounds_max: Vec2,
	/// Height of the flat terrain
	terrain_height: f32,
	/// Whether the terrain counts as offroad ground
	terrain_offroad: bool,
	/// Driveable surfaces
	patches: Vec<SurfacePatch>,
	/// Static scenery
	obstructions: Vec<Obstruction>,
}

impl StaticSurfaceScene {
	/// Create a scene whose terrain spans `min..max` at height `0` and is entirely offroad ground
	pub fn new(min: Vec2, max: Vec2) -> Self {
		StaticSurfaceScene {
			bounds_min: min.min(max),
			bounds_max: min.max(max),
			terrain_height: 0.0,
			terrain_offroad: true,
			patches: Vec::new(),
			obstructions: Vec::new(),
		}
	}
	/// Change the height and classification of the terrain
	pub fn with_terrain(mut self, height: f32, is_offroad: bool) -> Self {
		self.terrain_height = height;
		self.terrain_offroad = is_offroad;
		self
	}
	/// Add a driveable surface
	pub fn with_patch(mut self, patch: SurfacePatch) -> Self {
		self.patches.push(patch);
		self
	}
	/// Add a box of static scenery
	pub fn with_obstruction(mut self, obstruction: Obstruction) -> Self {
		self.obstructions.push(obstruction);
		self
	}
}

impl TrackScene for StaticSurfaceScene {
	fn terrain_bounds(&self) -> (Vec2, Vec2) {
		(self.bounds_min, self.bounds_max)
	}
	fn raycast_down(&self, xy: Vec2, top: f32, length: f32) -> Vec<SurfaceHit> {
		let bottom = top - length;
		let mut hits: Vec<SurfaceHit> = self
			.patches
			.iter()
			.enumerate()
			.filter(|(_, patch)| {
				patch.contains(xy) && patch.height <= top && patch.height >= bottom
			})
			.map(|(i, patch)| SurfaceHit {
				position: xy.extend(patch.height),
				material: patch.material,
				face_index: i as u32,
			})
			.collect();
		hits.sort_by(|a, b| b.position.z.total_cmp(&a.position.z));
		hits
	}
	fn overlap_sphere(&self, centre: Vec3, radius: f32) -> bool {
		self.obstructions
			.iter()
			.any(|o| o.overlaps_sphere(centre, radius))
	}
	fn sample_terrain(&self, xy: Vec2) -> Option<TerrainSample> {
		if xy.x < self.bounds_min.x
			|| xy.x > self.bounds_max.x
			|| xy.y < self.bounds_min.y
			|| xy.y > self.bounds_max.y
		{
			return None;
		}
		Some(TerrainSample {
			height: self.terrain_height,
			is_offroad: self.terrain_offroad,
		})
	}
}
