//! Measuring how far round a lap a point on the course is.
//!
//! A [LapQuery] is carried by each vehicle between frames. Every query
//! projects the vehicle onto the nearest edge of the [TrackGraph] and reads the
//! interpolated distance to the finish. The query keeps a low mark, the
//! smallest distance to the finish reached this lap. Candidate edges
//! further than `max_skippable_distance` behind the low mark are ignored so
//! a vehicle cannot be matched onto a stretch of road it has already left
//! behind, such as the far side of a hairpin or an overlapping section.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Per vehicle progress state of [TrackGraph::find_lap_distance]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct LapQuery {
	/// Node at the end of the matched edge closest to the finish
	last_node: Option<usize>,
	/// Distance to the finish at the last query
	current_lap_distance: f32,
	/// Smallest distance to the finish reached this lap
	lap_distance_low_mark: f32,
	/// Point on the graph the last query was matched to
	position: Vec3,
}

impl LapQuery {
	/// Create a query for a vehicle on the start line of a lap `lap_length` long
	pub fn new(lap_length: f32) -> Self {
		LapQuery {
			last_node: None,
			current_lap_distance: lap_length,
			lap_distance_low_mark: lap_length,
			position: Vec3::ZERO,
		}
	}
	pub fn get_last_node(&self) -> Option<usize> {
		self.last_node
	}
	/// Distance to the finish at the last query
	pub fn get_current_lap_distance(&self) -> f32 {
		self.current_lap_distance
	}
	/// Smallest distance to the finish reached this lap
	pub fn get_lap_distance_low_mark(&self) -> f32 {
		self.lap_distance_low_mark
	}
	/// Point on the graph the last query matched
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	/// Distance driven this lap. It never decreases within a lap
	pub fn get_distance_covered(&self, lap_length: f32) -> f32 {
		(lap_length - self.lap_distance_low_mark).max(0.0)
	}
	/// Whether the vehicle is close enough to the finish for a crossing of the start line to count as a completed lap
	pub fn is_lap_completable(&self, max_skippable_distance: f32) -> bool {
		self.lap_distance_low_mark < max_skippable_distance
	}
	/// Reset the low mark once the vehicle crosses the finish line
	pub fn start_new_lap(&mut self, lap_length: f32) {
		self.current_lap_distance = lap_length;
		self.lap_distance_low_mark = lap_length;
	}
}

impl TrackGraph {
	/// A [LapQuery] for a vehicle sat on the start line of this graph
	pub fn new_lap_query(&self) -> LapQuery {
		let mut query = LapQuery::new(self.lap_length());
		if let Some(start) = self.start_node() {
			query.last_node = Some(start);
			query.position = self.get_nodes()[start].get_position();
		}
		query
	}
	/// Project `point` onto the closest eligible edge and update the `query`.
	///
	/// An edge is eligible if the interpolated distance to the finish at the
	/// projection is no more than `max_skippable_distance` above the low mark.
	/// Candidates whose distance to the finish differs from the last query by
	/// more than [PROGRESS_MISMATCH_THRESHOLD] are penalised like in
	/// [TrackGraph::find_track_progress_at_point], so a vehicle waiting behind
	/// the start line is matched to the start of the lap rather than the
	/// finish. If no edge is eligible the query is left untouched
	pub fn find_lap_distance(
		&self,
		point: Vec3,
		query: &mut LapQuery,
		max_skippable_distance: f32,
	) {
		let nodes = self.get_nodes();
		let limit = query.lap_distance_low_mark + max_skippable_distance;
		let mut min_distance = f32::MAX;
		let mut best = None;
		for (a, b) in self.edges() {
			let from = &nodes[a];
			let to = &nodes[b];
			if !from.is_reachable() || !to.is_reachable() {
				continue;
			}
			let (fraction, projected) =
				project_onto_segment(point, from.get_position(), to.get_position());
			let t = from.get_t() + (to.get_t() - from.get_t()) * fraction;
			if t > limit {
				continue;
			}
			let mut distance = projected.distance_squared(point);
			if (t - query.current_lap_distance).abs() > PROGRESS_MISMATCH_THRESHOLD {
				distance += PROGRESS_MISMATCH_PENALTY * PROGRESS_MISMATCH_PENALTY;
			}
			if distance < min_distance {
				min_distance = distance;
				let ahead = if from.get_t() < to.get_t() { a } else { b };
				best = Some((t, ahead, projected));
			}
		}
		if let Some((t, ahead, projected)) = best {
			query.current_lap_distance = t;
			query.last_node = Some(ahead);
			query.position = projected;
			if t < query.lap_distance_low_mark {
				query.lap_distance_low_mark = t;
			}
		}
	}
	/// Distance to the finish of the graph position nearest `point`.
	///
	/// Candidates whose distance to the finish differs from
	/// `reference_progress` by more than [PROGRESS_MISMATCH_THRESHOLD] are
	/// penalised, which settles ambiguous points such as the start line where
	/// the start and end nodes coincide. Returns `reference_progress` if the
	/// graph has no reachable edges
	pub fn find_track_progress_at_point(&self, point: Vec3, reference_progress: f32) -> f32 {
		let nodes = self.get_nodes();
		let mut min_distance = f32::MAX;
		let mut progress = reference_progress;
		for (a, b) in self.edges() {
			let from = &nodes[a];
			let to = &nodes[b];
			if !from.is_reachable() || !to.is_reachable() {
				continue;
			}
			let (fraction, projected) =
				project_onto_segment(point, from.get_position(), to.get_position());
			let t = from.get_t() + (to.get_t() - from.get_t()) * fraction;
			let mut distance = projected.distance_squared(point);
			if (t - reference_progress).abs() > PROGRESS_MISMATCH_THRESHOLD {
				distance += PROGRESS_MISMATCH_PENALTY * PROGRESS_MISMATCH_PENALTY;
			}
			if distance < min_distance {
				min_distance = distance;
				progress = t;
			}
		}
		progress
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// A 100 unit square split at the origin facing +x
	fn square() -> TrackGraph {
		let mut graph = TrackGraph::default();
		graph.add_node(Vec3::new(0.0, 0.0, 0.0));
		graph.add_node(Vec3::new(100.0, 0.0, 0.0));
		graph.add_node(Vec3::new(100.0, 100.0, 0.0));
		graph.add_node(Vec3::new(0.0, 100.0, 0.0));
		graph.add_connection(0, 1);
		graph.add_connection(1, 2);
		graph.add_connection(2, 3);
		graph.add_connection(3, 0);
		graph.rebuild(&Transform::IDENTITY).unwrap();
		graph
	}
	#[test]
	fn new_query_on_start_line() {
		let graph = square();
		let query = graph.new_lap_query();
		assert_eq!(graph.start_node(), query.get_last_node());
		assert_eq!(graph.lap_length(), query.get_lap_distance_low_mark());
		assert_eq!(0.0, query.get_distance_covered(graph.lap_length()));
	}
	#[test]
	fn projection_onto_first_straight() {
		let graph = square();
		let mut query = graph.new_lap_query();
		graph.find_lap_distance(Vec3::new(50.0, 3.0, 0.0), &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
		// 49.5 along the edge from the start at t=399.5
		assert!((query.get_current_lap_distance() - 350.0).abs() < 0.01);
		assert_eq!(Some(1), query.get_last_node());
		assert!(query.get_position().abs_diff_eq(Vec3::new(50.0, 0.0, 0.0), 1e-4));
	}
	#[test]
	fn far_edges_are_skipped() {
		let graph = square();
		let mut query = graph.new_lap_query();
		// drive to the far corner, the low mark drops to ~200
		graph.find_lap_distance(Vec3::new(100.0, 50.0, 0.0), &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
		graph.find_lap_distance(Vec3::new(100.0, 100.0, 0.0), &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
		let low_mark = query.get_lap_distance_low_mark();
		assert!((low_mark - 200.0).abs() < 0.01);
		// with a tight window the first straight near the start is no longer eligible
		graph.find_lap_distance(Vec3::new(60.0, 2.0, 0.0), &mut query, 20.0);
		assert!(query.get_current_lap_distance() <= low_mark + 20.0);
		assert!(query.get_position().distance(Vec3::new(60.0, 0.0, 0.0)) > 1.0);
	}
	#[test]
	fn low_mark_never_rises() {
		let graph = square();
		let mut query = graph.new_lap_query();
		let route = [
			Vec3::new(30.0, 0.0, 0.0),
			Vec3::new(80.0, 0.0, 0.0),
			Vec3::new(70.0, 0.0, 0.0),
			Vec3::new(100.0, 40.0, 0.0),
			Vec3::new(100.0, 20.0, 0.0),
			Vec3::new(60.0, 100.0, 0.0),
			Vec3::new(0.0, 60.0, 0.0),
		];
		let mut previous = query.get_lap_distance_low_mark();
		for point in route {
			graph.find_lap_distance(point, &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
			assert!(query.get_lap_distance_low_mark() <= previous);
			previous = query.get_lap_distance_low_mark();
		}
		assert!(query.is_lap_completable(DEFAULT_MAX_SKIPPABLE_DISTANCE));
	}
	#[test]
	fn waiting_behind_start_line() {
		let graph = square();
		let mut query = graph.new_lap_query();
		for point in [Vec3::new(-6.0, 0.0, 0.0), Vec3::new(-3.0, 0.0, 0.0), Vec3::new(-3.0, 2.0, 0.0)] {
			graph.find_lap_distance(point, &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
			assert_eq!(graph.lap_length(), query.get_lap_distance_low_mark());
			assert_eq!(0.0, query.get_distance_covered(graph.lap_length()));
		}
		graph.find_lap_distance(Vec3::new(8.0, 0.0, 0.0), &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
		assert!((query.get_current_lap_distance() - 392.0).abs() < 0.01);
	}
	#[test]
	fn new_lap_resets_low_mark() {
		let graph = square();
		let mut query = graph.new_lap_query();
		for point in [Vec3::new(100.0, 50.0, 0.0), Vec3::new(50.0, 100.0, 0.0), Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, 20.0, 0.0)] {
			graph.find_lap_distance(point, &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
		}
		assert!(query.get_lap_distance_low_mark() < 25.0);
		query.start_new_lap(graph.lap_length());
		assert_eq!(graph.lap_length(), query.get_lap_distance_low_mark());
	}
	#[test]
	fn empty_graph_leaves_query() {
		let graph = TrackGraph::default();
		let mut query = LapQuery::new(100.0);
		graph.find_lap_distance(Vec3::ONE, &mut query, DEFAULT_MAX_SKIPPABLE_DISTANCE);
		assert_eq!(LapQuery::new(100.0), query);
	}
	#[test]
	fn progress_at_start_line_follows_reference() {
		let graph = square();
		let point = Vec3::new(0.5, 0.0, 0.0);
		let near_start = graph.find_track_progress_at_point(point, graph.lap_length());
		assert!((near_start - graph.lap_length()).abs() < 0.01);
		let near_finish = graph.find_track_progress_at_point(point, 0.0);
		assert!(near_finish.abs() < 0.01);
	}
	#[test]
	fn progress_prefers_nearest_when_consistent() {
		let graph = square();
		let result = graph.find_track_progress_at_point(Vec3::new(100.0, 50.0, 0.0), 260.0);
		assert!((result - 250.0).abs() < 0.01);
	}
}
