//! A [TrackLayout] is the authored description of a course, the skeleton of
//! the [TrackGraph], the start line and the racing lines. Layouts are
//! typically stored as `ron` files next to the track scene.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Where the race starts and which way the grid faces
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Component, Clone, Copy, Debug, PartialEq, Reflect)]
pub struct StartLine {
	/// Centre of the start line
	position: Vec3,
	/// Direction of travel across the line
	forward: Vec3,
}

impl Default for StartLine {
	fn default() -> Self {
		StartLine {
			position: Vec3::ZERO,
			forward: Vec3::X,
		}
	}
}

impl StartLine {
	/// Create a new instance of [StartLine]
	pub fn new(position: Vec3, forward: Vec3) -> Self {
		StartLine { position, forward }
	}
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	pub fn get_forward(&self) -> Vec3 {
		self.forward
	}
	/// A [Transform] at the line whose local `x` axis points along `forward`
	pub fn to_transform(&self) -> Transform {
		let forward = self.forward.try_normalize().unwrap_or(Vec3::X);
		Transform::from_translation(self.position)
			.with_rotation(Quat::from_rotation_arc(Vec3::X, forward))
	}
	/// Whether `position` lies just beyond the line, within [FINISH_LINE_RADIUS] of its centre
	pub fn has_crossed(&self, position: Vec3) -> bool {
		let offset = position - self.position;
		offset.dot(self.forward) > 0.0
			&& offset.length_squared() < FINISH_LINE_RADIUS * FINISH_LINE_RADIUS
	}
}

/// Authored description of a course
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackLayout {
	/// Positions of the course skeleton
	nodes: Vec<Vec3>,
	/// Pairs of node indices joined by a stretch of road
	connections: Vec<(u32, u32)>,
	/// The start and finish line
	start: StartLine,
	/// Lines the AI can follow, the preferred line first
	#[cfg_attr(feature = "serde", serde(default))]
	racing_lines: Vec<RacingLine>,
}

impl TrackLayout {
	/// Create a new instance of [TrackLayout]
	pub fn new(
		nodes: Vec<Vec3>,
		connections: Vec<(u32, u32)>,
		start: StartLine,
		racing_lines: Vec<RacingLine>,
	) -> Self {
		TrackLayout {
			nodes,
			connections,
			start,
			racing_lines,
		}
	}
	pub fn get_nodes(&self) -> &[Vec3] {
		&self.nodes
	}
	pub fn get_connections(&self) -> &[(u32, u32)] {
		&self.connections
	}
	pub fn get_start(&self) -> &StartLine {
		&self.start
	}
	pub fn get_racing_lines(&self) -> &[RacingLine] {
		&self.racing_lines
	}
	/// Construct, split and subdivide the [TrackGraph] of the course
	pub fn build_track_graph(&self) -> Result<TrackGraph, NavigationFileError> {
		let mut graph = TrackGraph::default();
		for node in self.nodes.iter() {
			graph.add_node(*node);
		}
		let count = self.nodes.len() as u32;
		for (line, (a, b)) in self.connections.iter().enumerate() {
			if *a >= count || *b >= count {
				error!("Track layout connects missing node in ({}, {})", a, b);
				return Err(NavigationFileError::InvalidRecord {
					line: line + 1,
					reason: format!(
						"connection ({}, {}) refers to a node beyond the {} defined",
						a, b, count
					),
				});
			}
			graph.add_connection(*a, *b);
		}
		graph.rebuild(&self.start.to_transform())?;
		graph.subdivide(MAX_GRAPH_SEGMENT_LENGTH);
		Ok(graph)
	}
	/// Build every racing line against the graph of the course. Lines with fewer than two points are skipped
	pub fn build_racing_lines(&self, track_graph: &TrackGraph) -> RacingLines {
		let mut lines = Vec::with_capacity(self.racing_lines.len());
		for (i, line) in self.racing_lines.iter().enumerate() {
			if line.get_points().len() < 2 {
				warn!(
					"Skipping racing line {} with {} points",
					i,
					line.get_points().len()
				);
				continue;
			}
			let mut line = line.clone();
			line.build(track_graph);
			lines.push(line);
		}
		RacingLines(lines)
	}
	/// From a `ron` file generate the [TrackLayout]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, NavigationFileError> {
		let file = std::fs::File::open(path)?;
		let layout: TrackLayout = ron::de::from_reader(file)?;
		Ok(layout)
	}
}
