//! Marking hazards, vehicles and pickups onto the [MotionGrid]. Transient
//! marks only last for the frame they are made in, the generation of every
//! grid is advanced at the start of each frame
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Used to mark the layers around a point of every [MotionGrid]
#[derive(Event, Clone, Copy, Debug)]
pub struct EventMarkHazard {
	/// Centre of the mark, its height selects the layer
	position: Vec3,
	/// Cells whose centre lies within this distance are marked, `0` marks only the cell containing `position`
	radius: f32,
	/// Flags to set
	cell_type: CellType,
	/// Whether the mark outlives the current generation
	permanent: bool,
}

impl EventMarkHazard {
	/// Create a new instance of [EventMarkHazard]
	pub fn new(position: Vec3, radius: f32, cell_type: CellType, permanent: bool) -> Self {
		EventMarkHazard {
			position,
			radius,
			cell_type,
			permanent,
		}
	}
	/// A mark lasting for the current frame only
	pub fn transient(position: Vec3, radius: f32, cell_type: CellType) -> Self {
		EventMarkHazard::new(position, radius, cell_type, false)
	}
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	pub fn get_radius(&self) -> f32 {
		self.radius
	}
	pub fn get_cell_type(&self) -> CellType {
		self.cell_type
	}
	pub fn is_permanent(&self) -> bool {
		self.permanent
	}
}

/// Expire the transient marks of the previous frame
#[cfg(not(tarpaulin_include))]
pub fn advance_hazard_generation(mut grids: Query<&mut MotionGrid>) {
	for mut grid in grids.iter_mut() {
		grid.advance_generation();
	}
}

/// Read [EventMarkHazard] and apply them to each [MotionGrid]
#[cfg(not(tarpaulin_include))]
pub fn process_hazard_marks(
	mut events: EventReader<EventMarkHazard>,
	mut grids: Query<&mut MotionGrid>,
) {
	for event in events.read() {
		for mut grid in grids.iter_mut() {
			let marked = if event.radius > 0.0 {
				grid.set_cells(
					event.position,
					event.radius,
					event.cell_type,
					event.permanent,
				)
			} else {
				grid.set_cell(event.position, event.cell_type, event.permanent) as usize
			};
			if marked == 0 {
				warn!(
					"Hazard mark at {} did not land on any layer of the motion grid",
					event.position
				);
			}
		}
	}
}
