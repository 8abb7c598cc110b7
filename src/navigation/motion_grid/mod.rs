//! The [MotionGrid] is an occupancy map of the drivable surface used to
//! search short paths around hazards.
//!
//! The terrain bounds are divided into square cells. A cell is a vertical
//! column and may hold several stacked layers, one per distinct surface found
//! by a downward ray through its centre:
//!
//! ```text
//!  z
//!  |     _ _ _ _ _ _          layer 0, bridge deck
//!  |    |_|_|_|_|_|_|
//!  |  _ _ _ _ _ _ _ _ _ _     layer 1, road beneath
//!  | |_|_|_|_|_|_|_|_|_|_|
//!  |________________________ x
//! ```
//!
//! Layers are ordered from the highest to the lowest. Each layer carries a
//! static [CellType] established when the grid is built and a dynamic one
//! written by gameplay (vehicles, hazards) which only counts while its
//! generation matches the grid's current generation, so transient marks
//! expire on their own when [MotionGrid::advance_generation] is called.
//!

pub mod path_search;

use std::ops::{BitOr, BitOrAssign};

use crate::prelude::*;
use bevy::prelude::*;

/// Bit flags describing what occupies a layer of a cell
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub struct CellType(u8);

impl CellType {
	pub const NONE: CellType = CellType(0);
	/// Static scenery sits on the layer
	pub const BLOCKED: CellType = CellType(1 << 0);
	pub const OFFROAD: CellType = CellType(1 << 1);
	pub const TRACK: CellType = CellType(1 << 2);
	/// A vehicle occupies the layer
	pub const VEHICLE: CellType = CellType(1 << 3);
	pub const HAZARD: CellType = CellType(1 << 4);
	pub const PICKUP_MONEY: CellType = CellType(1 << 5);
	pub const PICKUP_ARMOR: CellType = CellType(1 << 6);
	/// Flags a path search may not move into
	pub const IMPASSABLE: CellType = CellType(1 << 0 | 1 << 3 | 1 << 4);

	pub fn bits(&self) -> u8 {
		self.0
	}
	/// Whether every flag of `other` is set
	pub fn contains(&self, other: CellType) -> bool {
		self.0 & other.0 == other.0
	}
	/// Whether any flag of `other` is set
	pub fn intersects(&self, other: CellType) -> bool {
		self.0 & other.0 != 0
	}
	pub fn is_empty(&self) -> bool {
		self.0 == 0
	}
	/// Whether a path search may move onto a layer of this type
	pub fn is_passable(&self) -> bool {
		!self.intersects(CellType::IMPASSABLE)
	}
}

impl BitOr for CellType {
	type Output = CellType;
	fn bitor(self, rhs: CellType) -> CellType {
		CellType(self.0 | rhs.0)
	}
}

impl BitOrAssign for CellType {
	fn bitor_assign(&mut self, rhs: CellType) {
		self.0 |= rhs.0;
	}
}

/// One drivable surface of a [Cell]
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct CellContents {
	/// Height of the surface
	z: f32,
	/// Flags set when the grid was built or by permanent marks
	static_cell_type: CellType,
	/// Flags set by transient marks during `generation`
	dynamic_cell_type: CellType,
	/// Grid generation the dynamic flags were written in
	generation: u32,
}

impl CellContents {
	/// Create a layer without any transient marks
	fn new(z: f32, static_cell_type: CellType) -> Self {
		CellContents {
			z,
			static_cell_type,
			dynamic_cell_type: CellType::NONE,
			generation: 0,
		}
	}
	pub fn get_z(&self) -> f32 {
		self.z
	}
	pub fn get_static_cell_type(&self) -> CellType {
		self.static_cell_type
	}
	/// Dynamic flags as last written, regardless of whether they have expired
	pub fn get_dynamic_cell_type(&self) -> CellType {
		self.dynamic_cell_type
	}
	pub fn get_generation(&self) -> u32 {
		self.generation
	}
	/// The flags in effect during `generation`
	pub fn cell_type(&self, generation: u32) -> CellType {
		if self.generation == generation {
			self.static_cell_type | self.dynamic_cell_type
		} else {
			self.static_cell_type
		}
	}
}

/// A column of the grid
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct Cell {
	/// Layers ordered by descending height
	contents: Vec<CellContents>,
}

impl Cell {
	pub fn get_contents(&self) -> &[CellContents] {
		&self.contents
	}
	pub fn layer_count(&self) -> usize {
		self.contents.len()
	}
	/// Layer with a height closest to `z`, if one lies within `tolerance`
	fn closest_layer(&self, z: f32, tolerance: f32) -> Option<usize> {
		self.contents
			.iter()
			.enumerate()
			.map(|(i, layer)| (i, (layer.z - z).abs()))
			.filter(|(_, difference)| *difference <= tolerance)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(i, _)| i)
	}
}

/// Multi-layer occupancy map of a track
#[derive(Component, Clone, Debug, Default)]
pub struct MotionGrid {
	/// Minimum `(x, y)` corner, a multiple of the cell size
	min: Vec2,
	/// Number of columns along `x`
	width: usize,
	/// Number of rows along `y`
	height: usize,
	/// Row major cells, `width * height` of them
	cells: Vec<Cell>,
	/// Current generation of transient marks
	generation: u32,
	/// Tunables the grid was built with
	settings: GridSettings,
}

impl MotionGrid {
	/// Sample a [TrackScene] into a new grid. The bounds of the terrain are
	/// snapped outward to the cell size and a ray is cast down through the
	/// centre of every cell
	pub fn build(scene: &impl TrackScene, settings: GridSettings) -> Self {
		let cell_size = settings.get_cell_size();
		let (bounds_min, bounds_max) = scene.terrain_bounds();
		let min = Vec2::new(
			snap_down(bounds_min.x, cell_size),
			snap_down(bounds_min.y, cell_size),
		);
		let max = Vec2::new(
			snap_up(bounds_max.x, cell_size),
			snap_up(bounds_max.y, cell_size),
		);
		let width = ((max.x - min.x) / cell_size).round().max(0.0) as usize;
		let height = ((max.y - min.y) / cell_size).round().max(0.0) as usize;
		let mut grid = MotionGrid {
			min,
			width,
			height,
			cells: Vec::with_capacity(width * height),
			generation: 0,
			settings,
		};
		for row in 0..height {
			for column in 0..width {
				let centre = grid.cell_centre(column, row);
				let cell = sample_cell(scene, centre, &settings);
				grid.cells.push(cell);
			}
		}
		let layers: usize = grid.cells.iter().map(|c| c.layer_count()).sum();
		let blocked = grid
			.cells
			.iter()
			.flat_map(|c| c.contents.iter())
			.filter(|l| l.static_cell_type.contains(CellType::BLOCKED))
			.count();
		info!(
			"Built motion grid of {}x{} cells with {} layers, {} blocked",
			width, height, layers, blocked
		);
		grid
	}
	pub fn get_min(&self) -> Vec2 {
		self.min
	}
	/// Maximum `(x, y)` corner
	pub fn get_max(&self) -> Vec2 {
		self.min
			+ Vec2::new(self.width as f32, self.height as f32) * self.settings.get_cell_size()
	}
	/// Number of columns
	pub fn width(&self) -> usize {
		self.width
	}
	/// Number of rows
	pub fn height(&self) -> usize {
		self.height
	}
	pub fn get_settings(&self) -> &GridSettings {
		&self.settings
	}
	pub fn get_generation(&self) -> u32 {
		self.generation
	}
	/// Get a cell by `(column, row)`
	pub fn cell(&self, column: usize, row: usize) -> Option<&Cell> {
		if column >= self.width || row >= self.height {
			return None;
		}
		self.cells.get(row * self.width + column)
	}
	/// Number of layers of a cell, `0` outside of the grid
	pub fn layer_count(&self, column: usize, row: usize) -> usize {
		self.cell(column, row).map_or(0, |c| c.layer_count())
	}
	/// `(column, row)` of the cell containing `position`, ignoring its height
	pub fn world_to_cell(&self, position: Vec3) -> Option<(usize, usize)> {
		let (column, row) = self.unbounded_cell(position.truncate());
		if column < 0 || row < 0 || column as usize >= self.width || row as usize >= self.height
		{
			return None;
		}
		Some((column as usize, row as usize))
	}
	/// Cell coordinates of `xy` which may lie outside of the grid
	fn unbounded_cell(&self, xy: Vec2) -> (i32, i32) {
		let local = (xy - self.min) / self.settings.get_cell_size();
		(local.x.floor() as i32, local.y.floor() as i32)
	}
	/// Centre of a cell in the `(x, y)` plane
	pub fn cell_centre(&self, column: usize, row: usize) -> Vec2 {
		let cell_size = self.settings.get_cell_size();
		self.min + Vec2::new(column as f32 + 0.5, row as f32 + 0.5) * cell_size
	}
	/// Index of the layer of `position`'s cell closest to its height, if one lies within the layer tolerance
	pub fn get_cell_layer_index(&self, position: Vec3) -> Option<usize> {
		let (column, row) = self.world_to_cell(position)?;
		self.layer_at(column, row, position.z)
	}
	/// Index of the layer of a cell closest to `z` within the layer tolerance
	pub fn layer_at(&self, column: usize, row: usize, z: f32) -> Option<usize> {
		self.cell(column, row)?
			.closest_layer(z, self.settings.get_layer_z_tolerance())
	}
	/// Flags of a layer in effect this generation
	pub fn get_cell_type(&self, column: usize, row: usize, layer: usize) -> Option<CellType> {
		self.cell(column, row)?
			.contents
			.get(layer)
			.map(|l| l.cell_type(self.generation))
	}
	/// Mark the layer under `position`. Permanent marks change the static
	/// type, others last until the generation advances. Returns whether a
	/// layer was found
	pub fn set_cell(&mut self, position: Vec3, cell_type: CellType, permanent: bool) -> bool {
		let Some((column, row)) = self.world_to_cell(position) else {
			return false;
		};
		self.mark_layer(column, row, position.z, cell_type, permanent)
	}
	/// Mark every cell whose centre lies within `radius` of `position` in the
	/// `(x, y)` plane, plus the cell containing `position`. Returns the number
	/// of layers marked
	pub fn set_cells(
		&mut self,
		position: Vec3,
		radius: f32,
		cell_type: CellType,
		permanent: bool,
	) -> usize {
		let xy = position.truncate();
		let (centre_column, centre_row) = self.unbounded_cell(xy);
		let reach = (radius.max(0.0) / self.settings.get_cell_size()).ceil() as i64;
		let radius_squared = radius * radius;
		let mut marked = 0;
		// only the cells of the grid covered by the square around the mark
		let span = |centre: i32, len: usize| {
			let low = (centre as i64).saturating_sub(reach).max(0);
			let high = (centre as i64).saturating_add(reach).min(len as i64 - 1);
			low as usize..(high + 1).max(low) as usize
		};
		for row in span(centre_row, self.height) {
			for column in span(centre_column, self.width) {
				let is_centre = column as i32 == centre_column && row as i32 == centre_row;
				if !is_centre && self.cell_centre(column, row).distance_squared(xy) > radius_squared
				{
					continue;
				}
				if self.mark_layer(column, row, position.z, cell_type, permanent) {
					marked += 1;
				}
			}
		}
		marked
	}
	/// Apply a mark to the layer of a cell closest to `z`
	fn mark_layer(
		&mut self,
		column: usize,
		row: usize,
		z: f32,
		cell_type: CellType,
		permanent: bool,
	) -> bool {
		let Some(layer) = self.layer_at(column, row, z) else {
			return false;
		};
		let generation = self.generation;
		let index = row * self.width + column;
		let contents = &mut self.cells[index].contents[layer];
		if permanent {
			contents.static_cell_type |= cell_type;
		} else {
			if contents.generation != generation {
				contents.dynamic_cell_type = CellType::NONE;
				contents.generation = generation;
			}
			contents.dynamic_cell_type |= cell_type;
		}
		true
	}
	/// Expire every transient mark
	pub fn advance_generation(&mut self) {
		self.generation = self.generation.wrapping_add(1);
	}
	/// Union of the flags in effect around a cell: the layers within the
	/// tolerance of `z` in the cell and its eight neighbours, masked by `mask`
	pub fn get_cell_bleed(&self, column: usize, row: usize, z: f32, mask: CellType) -> CellType {
		let mut bleed = CellType::NONE;
		let offsets = std::iter::once((0, 0)).chain(Ordinal::ALL.iter().map(|o| o.offset()));
		for (dx, dy) in offsets {
			let c = column as i32 + dx;
			let r = row as i32 + dy;
			if c < 0 || r < 0 {
				continue;
			}
			let (c, r) = (c as usize, r as usize);
			if let Some(layer) = self.layer_at(c, r, z) {
				if let Some(cell_type) = self.get_cell_type(c, r, layer) {
					bleed |= cell_type;
				}
			}
		}
		CellType(bleed.0 & mask.0)
	}
	/// Describe every layer for debug rendering, coloured by its flags
	pub fn debug_draw(&self) -> DebugDrawList {
		let mut list = DebugDrawList::default();
		let radius = self.settings.get_cell_size() * 0.25;
		for row in 0..self.height {
			for column in 0..self.width {
				let centre = self.cell_centre(column, row);
				for layer in self.cells[row * self.width + column].contents.iter() {
					let cell_type = layer.cell_type(self.generation);
					let color = if !cell_type.is_passable() {
						Color::srgb(1.0, 0.0, 0.0)
					} else if cell_type.contains(CellType::TRACK) {
						Color::srgb(0.0, 1.0, 0.0)
					} else if cell_type.contains(CellType::OFFROAD) {
						Color::srgb(1.0, 1.0, 0.0)
					} else {
						Color::srgb(0.5, 0.5, 0.5)
					};
					list.marker(centre.extend(layer.z), radius, color);
				}
			}
		}
		list
	}
}

/// Find the layers of the cell centred on `centre`
fn sample_cell(scene: &impl TrackScene, centre: Vec2, settings: &GridSettings) -> Cell {
	let epsilon = settings.get_distinct_hit_epsilon();
	let tolerance = settings.get_layer_z_tolerance();
	let mut contents: Vec<CellContents> = Vec::new();
	let hits = scene.raycast_down(
		centre,
		settings.get_raycast_top(),
		settings.get_raycast_length(),
	);
	for hit in hits {
		let cell_type = match hit.material {
			SurfaceMaterial::Track => CellType::TRACK,
			SurfaceMaterial::Offroad => CellType::OFFROAD,
			SurfaceMaterial::Other => continue,
		};
		let z = hit.position.z;
		if contents.iter().any(|l| (l.z - z).abs() < epsilon) {
			continue;
		}
		contents.push(CellContents::new(z, cell_type));
	}
	if let Some(terrain) = scene.sample_terrain(centre) {
		if terrain.is_offroad
			&& !contents
				.iter()
				.any(|l| (l.z - terrain.height).abs() <= tolerance)
		{
			contents.push(CellContents::new(terrain.height, CellType::OFFROAD));
		}
	}
	for layer in contents.iter_mut() {
		let probe = centre.extend(layer.z + settings.get_obstruction_probe_height());
		if scene.overlap_sphere(probe, settings.get_obstruction_probe_radius()) {
			layer.static_cell_type |= CellType::BLOCKED;
		}
	}
	contents.sort_by(|a, b| b.z.total_cmp(&a.z));
	Cell { contents }
}
