//! Tunables of the [crate::prelude::MotionGrid]
//!

use bevy::prelude::*;

/// Describes how the [crate::prelude::MotionGrid] samples the track and how
/// far a path search may go.
///
/// ## Cells
///
/// The terrain bounds are divided into square cells of `cell_size` units.
/// Smaller cells produce finer avoidance paths at the cost of more physics
/// queries during the build and more expansions per search.
///
/// ## Layers
///
/// Two surfaces of the same cell closer than `distinct_hit_epsilon` are
/// treated as one layer. Moving between neighbouring cells is only possible
/// onto a layer within `layer_z_tolerance` of the current one, which is what
/// stops a search from stepping from a road straight onto the bridge above it.
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(default)
)]
#[derive(Resource, Clone, Copy, Debug, PartialEq, Reflect)]
pub struct GridSettings {
	/// Side length of a cell
	cell_size: f32,
	/// Largest height difference between layers of neighbouring cells that can be driven across
	layer_z_tolerance: f32,
	/// Hard cap on the nodes a path search may expand
	max_path_expansions: u32,
	/// Height the downward build rays start from
	raycast_top: f32,
	/// Length of the downward build rays
	raycast_length: f32,
	/// Radius of the sphere used to test a layer for static obstructions
	obstruction_probe_radius: f32,
	/// Height above a layer where the obstruction sphere is placed
	obstruction_probe_height: f32,
	/// Surfaces of a cell closer together than this merge into a single layer
	distinct_hit_epsilon: f32,
}

impl Default for GridSettings {
	fn default() -> Self {
		GridSettings {
			cell_size: 2.0,
			layer_z_tolerance: 10.0,
			max_path_expansions: 1000,
			raycast_top: 5000.0,
			raycast_length: 10000.0,
			obstruction_probe_radius: 0.8,
			obstruction_probe_height: 1.5,
			distinct_hit_epsilon: 0.5,
		}
	}
}

impl GridSettings {
	/// Create a new instance of [GridSettings] with a custom cell size, layer tolerance and search budget. Other values use their defaults
	pub fn new(cell_size: f32, layer_z_tolerance: f32, max_path_expansions: u32) -> Self {
		if cell_size <= 0.0 {
			panic!("GridSettings cell_size must be greater than zero, found {}", cell_size);
		}
		if layer_z_tolerance <= 0.0 {
			panic!(
				"GridSettings layer_z_tolerance must be greater than zero, found {}",
				layer_z_tolerance
			);
		}
		if max_path_expansions == 0 {
			panic!("GridSettings max_path_expansions must allow at least one expansion");
		}
		GridSettings {
			cell_size,
			layer_z_tolerance,
			max_path_expansions,
			..default()
		}
	}
	/// Override how the build probes layers for obstructions
	pub fn with_obstruction_probe(mut self, radius: f32, height: f32) -> Self {
		if radius <= 0.0 || radius >= self.cell_size {
			panic!(
				"Obstruction probe radius {} must be positive and smaller than the cell size {}",
				radius, self.cell_size
			);
		}
		self.obstruction_probe_radius = radius;
		self.obstruction_probe_height = height;
		self
	}
	/// Override the vertical span of the build rays
	pub fn with_raycast_span(mut self, top: f32, length: f32) -> Self {
		self.raycast_top = top;
		self.raycast_length = length;
		self
	}
	pub fn get_cell_size(&self) -> f32 {
		self.cell_size
	}
	pub fn get_layer_z_tolerance(&self) -> f32 {
		self.layer_z_tolerance
	}
	pub fn get_max_path_expansions(&self) -> u32 {
		self.max_path_expansions
	}
	pub fn get_raycast_top(&self) -> f32 {
		self.raycast_top
	}
	pub fn get_raycast_length(&self) -> f32 {
		self.raycast_length
	}
	pub fn get_obstruction_probe_radius(&self) -> f32 {
		self.obstruction_probe_radius
	}
	pub fn get_obstruction_probe_height(&self) -> f32 {
		self.obstruction_probe_height
	}
	pub fn get_distinct_hit_epsilon(&self) -> f32 {
		self.distinct_hit_epsilon
	}
	/// From a `ron` file generate the [GridSettings], any missing field falls back to its default
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, crate::prelude::NavigationFileError> {
		let file = std::fs::File::open(path)?;
		let settings: GridSettings = ron::de::from_reader(file)?;
		Ok(settings)
	}
}
