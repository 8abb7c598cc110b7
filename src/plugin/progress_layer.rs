//! Tracking how far every vehicle is through the race.
//!
//! Each frame the position of a vehicle is projected onto the [TrackGraph]
//! of its track. Once the low mark of its [LapQuery] is close to the finish
//! and the vehicle is just beyond the [StartLine] the lap is complete and an
//! [EventLapCompleted] is sent
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Race progress of a vehicle
#[derive(Component, Clone, Debug, Reflect)]
pub struct RaceProgress {
	/// Entity holding the [TrackNavigationBundle] of the track being raced
	track: Entity,
	/// Lap distance state, created on the first update
	lap_query: Option<LapQuery>,
	/// Lap currently being driven, starting from `1`
	current_lap: u32,
	/// Laps in the race
	total_laps: u32,
	/// Whether the final lap has been completed
	finished: bool,
	/// How far behind its low mark a vehicle may be matched onto the graph
	max_skippable_distance: f32,
}

impl RaceProgress {
	/// Create a new instance of [RaceProgress] for a race of `total_laps` around the track held by `track`
	pub fn new(track: Entity, total_laps: u32) -> Self {
		RaceProgress {
			track,
			lap_query: None,
			current_lap: 1,
			total_laps: total_laps.max(1),
			finished: false,
			max_skippable_distance: DEFAULT_MAX_SKIPPABLE_DISTANCE,
		}
	}
	/// Override how far behind its low mark a vehicle may be matched onto the graph
	pub fn with_max_skippable_distance(mut self, distance: f32) -> Self {
		self.max_skippable_distance = distance;
		self
	}
	pub fn get_track(&self) -> Entity {
		self.track
	}
	pub fn get_lap_query(&self) -> Option<&LapQuery> {
		self.lap_query.as_ref()
	}
	pub fn get_current_lap(&self) -> u32 {
		self.current_lap
	}
	pub fn get_total_laps(&self) -> u32 {
		self.total_laps
	}
	pub fn is_finished(&self) -> bool {
		self.finished
	}
	/// Distance driven over the whole race, used to rank vehicles
	pub fn get_race_distance(&self, lap_length: f32) -> f32 {
		let completed = (self.current_lap - 1) as f32 * lap_length;
		let this_lap = self
			.lap_query
			.map_or(0.0, |q| q.get_distance_covered(lap_length));
		completed + this_lap
	}
	/// Update from a new position, returning whether a lap was completed
	pub fn update(&mut self, graph: &TrackGraph, start: &StartLine, position: Vec3) -> bool {
		if self.finished {
			return false;
		}
		let max_skippable_distance = self.max_skippable_distance;
		let query = self.lap_query.get_or_insert_with(|| graph.new_lap_query());
		graph.find_lap_distance(position, query, max_skippable_distance);
		if !query.is_lap_completable(max_skippable_distance) || !start.has_crossed(position) {
			return false;
		}
		if self.current_lap >= self.total_laps {
			self.finished = true;
		} else {
			self.current_lap += 1;
			query.start_new_lap(graph.lap_length());
		}
		true
	}
}

/// Sent when a vehicle crosses the finish line at the end of a lap
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct EventLapCompleted {
	/// The vehicle
	entity: Entity,
	/// The lap which was completed
	lap: u32,
	/// Whether it was the final lap
	finished: bool,
}

impl EventLapCompleted {
	pub fn get_entity(&self) -> Entity {
		self.entity
	}
	pub fn get_lap(&self) -> u32 {
		self.lap
	}
	pub fn is_finished(&self) -> bool {
		self.finished
	}
}

/// Project every vehicle onto the [TrackGraph] of its track
#[cfg(not(tarpaulin_include))]
pub fn update_race_progress(
	mut vehicles: Query<(Entity, &Transform, &mut RaceProgress)>,
	tracks: Query<(&TrackGraph, &StartLine)>,
	mut event_lap: EventWriter<EventLapCompleted>,
) {
	for (entity, transform, mut progress) in vehicles.iter_mut() {
		let Ok((graph, start)) = tracks.get(progress.track) else {
			continue;
		};
		let lap = progress.current_lap;
		if progress.update(graph, start, transform.translation) {
			debug!("{:?} completed lap {}", entity, lap);
			event_lap.write(EventLapCompleted {
				entity,
				lap,
				finished: progress.finished,
			});
		}
	}
}
