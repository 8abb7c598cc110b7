//! Searching the [MotionGrid] for a way around whatever is ahead of an AI
//! driver. A search is only run when a driver asks for one, the result is
//! attached to the driver as an [AvoidancePath]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A request for a path around obstacles on behalf of an entity
#[derive(Event, Clone, Copy, Debug)]
pub struct EventAvoidanceRequest {
	/// The driver which will receive the [AvoidancePath]
	entity: Entity,
	/// Where the search starts
	from: Vec3,
	/// Where the driver wants to get to
	to: Vec3,
}

impl EventAvoidanceRequest {
	/// Create a new instance of [EventAvoidanceRequest]
	pub fn new(entity: Entity, from: Vec3, to: Vec3) -> Self {
		EventAvoidanceRequest { entity, from, to }
	}
	pub fn get_entity(&self) -> Entity {
		self.entity
	}
	pub fn get_from(&self) -> Vec3 {
		self.from
	}
	pub fn get_to(&self) -> Vec3 {
		self.to
	}
}

/// The latest path found around obstacles for a driver
#[derive(Component, Clone, Debug, Default)]
pub struct AvoidancePath {
	/// Steps of the path from the driver toward its target
	path: Vec<PathNode>,
	/// Generation of the [MotionGrid] the path was searched in
	generation: u32,
}

impl AvoidancePath {
	/// Create a new instance of [AvoidancePath]
	pub fn new(path: Vec<PathNode>, generation: u32) -> Self {
		AvoidancePath { path, generation }
	}
	pub fn get_path(&self) -> &[PathNode] {
		&self.path
	}
	pub fn get_generation(&self) -> u32 {
		self.generation
	}
	/// Positions of the steps
	pub fn get_waypoints(&self) -> impl Iterator<Item = Vec3> + '_ {
		self.path.iter().map(|n| n.get_position())
	}
	/// Whether no way forward was found
	pub fn is_empty(&self) -> bool {
		self.path.is_empty()
	}
	/// Whether the search reached the requested target rather than stopping short of it
	pub fn reaches_target(&self) -> bool {
		self.path.last().is_some_and(|n| n.get_h() <= f32::EPSILON)
	}
}

/// Read [EventAvoidanceRequest] and search the [MotionGrid] containing the start of each
#[cfg(not(tarpaulin_include))]
pub fn process_avoidance_requests(
	mut events: EventReader<EventAvoidanceRequest>,
	grids: Query<&MotionGrid>,
	mut commands: Commands,
) {
	for event in events.read() {
		let Some(grid) = grids
			.iter()
			.find(|g| g.world_to_cell(event.from).is_some())
		else {
			warn!(
				"Avoidance request from {} is outside of every motion grid",
				event.from
			);
			continue;
		};
		let path = grid.find_path(event.from, event.to);
		if path.is_empty() {
			debug!("No avoidance path from {} to {}", event.from, event.to);
		}
		if let Ok(mut entity) = commands.get_entity(event.entity) {
			entity.insert(AvoidancePath::new(path, grid.get_generation()));
		}
	}
}
