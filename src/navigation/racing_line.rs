//! A [RacingLine] is the idealised loop an AI driver follows when nothing is
//! in its way. It is authored as a list of waypoints each with a target
//! speed and is closed by an implicit segment from the last waypoint back to
//! the first.
//!
//! Once built against a [TrackGraph] every waypoint also knows how far round
//! the lap it is, which lets a driver that has been knocked off the line find
//! the part of the line matching its own progress rather than a stretch of
//! the line that merely passes nearby.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A waypoint of a [RacingLine]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct RacingLinePoint {
	/// Location of the waypoint
	position: Vec3,
	/// Speed the AI aims for at this waypoint
	target_speed: f32,
	/// Arc length from the first waypoint
	#[cfg_attr(feature = "serde", serde(skip))]
	distance_to_here: f32,
	/// Distance to the finish line of the track graph at this waypoint
	#[cfg_attr(feature = "serde", serde(skip))]
	track_progress: f32,
}

impl RacingLinePoint {
	/// Create a new instance of [RacingLinePoint]
	pub fn new(position: Vec3, target_speed: f32) -> Self {
		RacingLinePoint {
			position,
			target_speed,
			distance_to_here: 0.0,
			track_progress: 0.0,
		}
	}
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	pub fn get_target_speed(&self) -> f32 {
		self.target_speed
	}
	/// Arc length from the first waypoint
	pub fn get_distance_to_here(&self) -> f32 {
		self.distance_to_here
	}
	/// Distance to the finish line at this waypoint
	pub fn get_track_progress(&self) -> f32 {
		self.track_progress
	}
	/// Blend between two waypoints
	fn lerp(&self, other: &RacingLinePoint, fraction: f32) -> RacingLinePoint {
		RacingLinePoint {
			position: self.position.lerp(other.position, fraction),
			target_speed: self.target_speed + (other.target_speed - self.target_speed) * fraction,
			distance_to_here: self.distance_to_here
				+ (other.distance_to_here - self.distance_to_here) * fraction,
			track_progress: self.track_progress
				+ (other.track_progress - self.track_progress) * fraction,
		}
	}
}

/// A closed loop of [RacingLinePoint]s
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct RacingLine {
	/// Authored waypoints
	points: Vec<RacingLinePoint>,
	/// Length of the loop including the closing segment
	#[cfg_attr(feature = "serde", serde(skip))]
	length: f32,
	/// Copy of the first waypoint at the end of the closing segment
	#[cfg_attr(feature = "serde", serde(skip))]
	end_point: RacingLinePoint,
}

impl RacingLine {
	/// Create a new unbuilt instance of [RacingLine]
	pub fn new(points: Vec<RacingLinePoint>) -> Self {
		RacingLine {
			points,
			..default()
		}
	}
	pub fn get_points(&self) -> &[RacingLinePoint] {
		&self.points
	}
	/// Length of the loop, `0` until built
	pub fn get_length(&self) -> f32 {
		self.length
	}
	/// Panic if the line is too short to be queried
	fn assert_enough_points(&self) {
		if self.points.len() < 2 {
			panic!(
				"A racing line needs at least 2 points, found {}",
				self.points.len()
			);
		}
	}
	/// The waypoint after `index` around the loop
	fn next_point(&self, index: usize) -> &RacingLinePoint {
		if index + 1 < self.points.len() {
			&self.points[index + 1]
		} else {
			&self.end_point
		}
	}
	/// Measure the line and tag every waypoint with its progress through the lap of `track_graph`
	pub fn build(&mut self, track_graph: &TrackGraph) {
		self.assert_enough_points();
		let mut length = 0.0;
		self.points[0].distance_to_here = 0.0;
		for i in 1..self.points.len() {
			length += self.points[i].position.distance(self.points[i - 1].position);
			self.points[i].distance_to_here = length;
		}
		let last = self.points.len() - 1;
		length += self.points[last].position.distance(self.points[0].position);
		self.length = length;

		let mut previous_progress = track_graph.lap_length();
		for point in self.points.iter_mut() {
			point.track_progress =
				track_graph.find_track_progress_at_point(point.position, previous_progress);
			previous_progress = point.track_progress;
		}
		self.end_point = self.points[0];
		self.end_point.distance_to_here = length;
		self.end_point.track_progress = 0.0;
		debug!(
			"Built racing line of {} points, {} long",
			self.points.len(),
			length
		);
	}
	/// Wrap a distance into `[0, length)`
	fn wrap_distance(&self, distance: f32) -> f32 {
		if self.length <= 0.0 {
			return 0.0;
		}
		let wrapped = distance - self.length * (distance / self.length).floor();
		if wrapped >= self.length || wrapped < 0.0 {
			0.0
		} else {
			wrapped
		}
	}
	/// The point `distance` along the line from the first waypoint. Any
	/// distance is accepted, it is wrapped around the loop
	pub fn get_point_at(&self, distance: f32) -> RacingLinePoint {
		self.assert_enough_points();
		let distance = self.wrap_distance(distance);
		let mut index = self.points.len() - 1;
		while index > 0 && distance < self.points[index].distance_to_here {
			index -= 1;
		}
		let a = &self.points[index];
		let b = self.next_point(index);
		let span = b.distance_to_here - a.distance_to_here;
		let fraction = if span > f32::EPSILON {
			(distance - a.distance_to_here) / span
		} else {
			0.0
		};
		let mut point = a.lerp(b, fraction);
		point.distance_to_here = distance;
		point
	}
	/// The point of the line nearest `position`. Segments whose progress
	/// differs from `current_track_progress` by more than
	/// [PROGRESS_MISMATCH_THRESHOLD] are penalised so a driver is matched to
	/// its own part of the course
	pub fn get_nearest_point(&self, position: Vec3, current_track_progress: f32) -> RacingLinePoint {
		self.assert_enough_points();
		let mut min_distance = f32::MAX;
		let mut nearest = self.points[0];
		for (i, a) in self.points.iter().enumerate() {
			let b = self.next_point(i);
			let (fraction, projected) = project_onto_segment(position, a.position, b.position);
			let candidate = a.lerp(b, fraction);
			let mut distance = projected.distance_squared(position);
			if (current_track_progress - candidate.track_progress).abs()
				> PROGRESS_MISMATCH_THRESHOLD
			{
				distance += PROGRESS_MISMATCH_PENALTY * PROGRESS_MISMATCH_PENALTY;
			}
			if distance < min_distance {
				min_distance = distance;
				nearest = candidate;
				nearest.position = projected;
			}
		}
		nearest
	}
	/// Describe the line for debug rendering, each segment shaded by its target speed relative to `max_speed`
	pub fn debug_draw(&self, max_speed: f32) -> DebugDrawList {
		let mut list = DebugDrawList::default();
		let max_speed = max_speed.max(f32::EPSILON);
		for (i, a) in self.points.iter().enumerate() {
			let b = self.next_point(i);
			let fraction = (a.target_speed / max_speed).clamp(0.0, 1.0);
			list.line(a.position, b.position, Color::srgb(1.0 - fraction, fraction, 1.0));
		}
		list
	}
	/// From a `ron` file of waypoints generate an unbuilt [RacingLine]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, NavigationFileError> {
		let file = std::fs::File::open(path)?;
		let line: RacingLine = ron::de::from_reader(file)?;
		Ok(line)
	}
	/// From a CSV file with rows of `x,y,z,target_speed` generate an unbuilt [RacingLine]
	#[cfg(feature = "csv")]
	pub fn from_csv(path: &str) -> Result<Self, NavigationFileError> {
		let data = std::fs::File::open(path)?;
		let mut rdr = csv::ReaderBuilder::new()
			.has_headers(false)
			.comment(Some(b'#'))
			.trim(csv::Trim::All)
			.from_reader(data);
		let mut points = Vec::new();
		for (row, record) in rdr.records().enumerate() {
			let record = record?;
			if record.len() != 4 {
				return Err(NavigationFileError::InvalidRecord {
					line: row + 1,
					reason: format!("expected 4 values, found {}", record.len()),
				});
			}
			let mut values = [0.0; 4];
			for (value, field) in values.iter_mut().zip(record.iter()) {
				*value = field
					.parse::<f32>()
					.map_err(|e| NavigationFileError::InvalidRecord {
						line: row + 1,
						reason: format!("'{}' is not a number, {}", field, e),
					})?;
			}
			points.push(RacingLinePoint::new(
				Vec3::new(values[0], values[1], values[2]),
				values[3],
			));
		}
		Ok(RacingLine::new(points))
	}
}

/// The racing lines of a track, the preferred line first
#[derive(Component, Clone, Debug, Default)]
pub struct RacingLines(pub Vec<RacingLine>);

impl RacingLines {
	/// The preferred line
	pub fn get_primary(&self) -> Option<&RacingLine> {
		self.0.first()
	}
	pub fn get(&self, index: usize) -> Option<&RacingLine> {
		self.0.get(index)
	}
	pub fn len(&self) -> usize {
		self.0.len()
	}
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// A 100 unit square track graph split at the origin facing +x
	fn square_graph() -> TrackGraph {
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
		graph.subdivide(MAX_GRAPH_SEGMENT_LENGTH);
		graph
	}
	/// A line just inside the square with speeds rising along it
	fn square_line() -> RacingLine {
		let mut line = RacingLine::new(vec![
			RacingLinePoint::new(Vec3::new(10.0, 10.0, 0.0), 10.0),
			RacingLinePoint::new(Vec3::new(90.0, 10.0, 0.0), 20.0),
			RacingLinePoint::new(Vec3::new(90.0, 90.0, 0.0), 30.0),
			RacingLinePoint::new(Vec3::new(10.0, 90.0, 0.0), 40.0),
		]);
		line.build(&square_graph());
		line
	}
	#[test]
	fn length_includes_closing_segment() {
		let line = square_line();
		assert_eq!(320.0, line.get_length());
		let result: Vec<f32> = line.get_points().iter().map(|p| p.get_distance_to_here()).collect();
		assert_eq!(vec![0.0, 80.0, 160.0, 240.0], result);
	}
	#[test]
	fn progress_decreases_round_the_lap() {
		let line = square_line();
		let progress: Vec<f32> = line.get_points().iter().map(|p| p.get_track_progress()).collect();
		for pair in progress.windows(2) {
			assert!(pair[0] > pair[1]);
		}
		// the first waypoint belongs to the start of the lap, not the finish
		assert!(progress[0] > 350.0);
	}
	#[test]
	fn point_half_way_along_segment() {
		let line = square_line();
		let result = line.get_point_at(40.0);
		assert_eq!(Vec3::new(50.0, 10.0, 0.0), result.get_position());
		assert_eq!(15.0, result.get_target_speed());
		assert_eq!(40.0, result.get_distance_to_here());
	}
	#[test]
	fn point_on_closing_segment() {
		let line = square_line();
		let result = line.get_point_at(280.0);
		assert_eq!(Vec3::new(10.0, 50.0, 0.0), result.get_position());
		assert_eq!(25.0, result.get_target_speed());
	}
	#[test]
	fn wrap_around() {
		let line = square_line();
		let start = line.get_point_at(0.0);
		let end = line.get_point_at(line.get_length());
		assert_eq!(start.get_position(), end.get_position());
		for k in [-2.0, -1.0, 1.0, 3.0] {
			let a = line.get_point_at(123.0);
			let b = line.get_point_at(123.0 + k * line.get_length());
			assert!(a.get_position().abs_diff_eq(b.get_position(), 1e-3));
			assert!((a.get_target_speed() - b.get_target_speed()).abs() < 1e-3);
		}
	}
	#[test]
	fn nearest_point_projects_onto_line() {
		let line = square_line();
		let progress = line.get_point_at(40.0).get_track_progress();
		let result = line.get_nearest_point(Vec3::new(50.0, 3.0, 0.0), progress);
		assert_eq!(Vec3::new(50.0, 10.0, 0.0), result.get_position());
		assert_eq!(40.0, result.get_distance_to_here());
	}
	#[test]
	fn nearest_point_respects_progress() {
		// a hairpin, the two straights run 12 units apart
		let mut graph = TrackGraph::default();
		let nodes = [
			Vec3::new(0.0, 0.0, 0.0),
			Vec3::new(100.0, 0.0, 0.0),
			Vec3::new(100.0, 12.0, 0.0),
			Vec3::new(0.0, 12.0, 0.0),
			Vec3::new(-50.0, 6.0, 0.0),
		];
		for n in nodes {
			graph.add_node(n);
		}
		for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)] {
			graph.add_connection(a, b);
		}
		graph.rebuild(&Transform::IDENTITY).unwrap();
		graph.subdivide(MAX_GRAPH_SEGMENT_LENGTH);
		let mut line = RacingLine::new(nodes.iter().map(|n| RacingLinePoint::new(*n, 10.0)).collect());
		line.build(&graph);
		let between = Vec3::new(50.0, 5.0, 0.0);
		// closer to the outbound straight but progress says the driver is on the way back
		let return_progress = graph.find_track_progress_at_point(Vec3::new(50.0, 12.0, 0.0), 100.0);
		let result = line.get_nearest_point(between, return_progress);
		assert_eq!(12.0, result.get_position().y);
		let outbound_progress = graph.find_track_progress_at_point(Vec3::new(50.0, 0.0, 0.0), graph.lap_length());
		let result = line.get_nearest_point(between, outbound_progress);
		assert_eq!(0.0, result.get_position().y);
	}
	#[test]
	#[should_panic]
	fn single_point_line() {
		let line = RacingLine::new(vec![RacingLinePoint::new(Vec3::ZERO, 1.0)]);
		line.get_point_at(0.0);
	}
	#[test]
	fn debug_draw_closes_loop() {
		let line = square_line();
		let list = line.debug_draw(40.0);
		assert_eq!(4, list.get_lines().len());
		assert_eq!(Vec3::new(10.0, 10.0, 0.0), list.get_lines()[3].end);
	}
	#[test]
	#[cfg(feature = "csv")]
	fn line_from_csv() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/racing_line.csv";
		let mut line = RacingLine::from_csv(&path).unwrap();
		assert_eq!(4, line.get_points().len());
		line.build(&square_graph());
		assert!(line.get_length() > 0.0);
	}
	#[test]
	#[cfg(feature = "ron")]
	fn line_from_ron() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/racing_line.ron";
		let line = RacingLine::from_ron(&path).unwrap();
		assert_eq!(4, line.get_points().len());
		assert_eq!(0.0, line.get_length());
	}
}
