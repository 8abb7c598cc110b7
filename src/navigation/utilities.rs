//! Useful structures, constants and tools shared by the navigation structures
//!

use bevy::prelude::*;

/// The [crate::prelude::TrackGraph] node chosen as the start/finish must sit within this distance of the start line
pub const START_LINE_PROXIMITY: f32 = 50.0;
/// After being snapped onto the start line the start node is nudged this far along the forward axis
pub const START_NODE_OFFSET: f32 = 0.5;
/// Edges of the [crate::prelude::TrackGraph] longer than this are subdivided once `t` is known
pub const MAX_GRAPH_SEGMENT_LENGTH: f32 = 60.0;
/// Upper bound on the number of distinct start-to-finish routes stored by the [crate::prelude::TrackGraph]
pub const MAX_GRAPH_PATHS: usize = 16;
/// A candidate whose progress differs from the expected progress by more than this is treated as a different part of the course
pub const PROGRESS_MISMATCH_THRESHOLD: f32 = 55.0;
/// Distance added to candidates failing [PROGRESS_MISMATCH_THRESHOLD], it is squared before being added to a squared distance
pub const PROGRESS_MISMATCH_PENALTY: f32 = 30.0;
/// How far behind its low mark a vehicle may appear to be before a lap distance candidate is rejected
pub const DEFAULT_MAX_SKIPPABLE_DISTANCE: f32 = 250.0;
/// A vehicle this close to the start line and in front of it is considered to have crossed it
pub const FINISH_LINE_RADIUS: f32 = 40.0;

/// Convenience way of accessing the 8 directions of movement between
/// neighbouring cells of the [crate::prelude::MotionGrid]
///
/// Rows grow along `+y` so [Ordinal::North] points toward `+y`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Reflect)]
pub enum Ordinal {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
}

impl Ordinal {
	/// All directions, orthogonal first
	pub const ALL: [Ordinal; 8] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
		Ordinal::NorthEast,
		Ordinal::SouthEast,
		Ordinal::SouthWest,
		Ordinal::NorthWest,
	];
	/// The `(column, row)` step taken when moving in this direction
	pub fn offset(&self) -> (i32, i32) {
		match self {
			Ordinal::North => (0, 1),
			Ordinal::East => (1, 0),
			Ordinal::South => (0, -1),
			Ordinal::West => (-1, 0),
			Ordinal::NorthEast => (1, 1),
			Ordinal::SouthEast => (1, -1),
			Ordinal::SouthWest => (-1, -1),
			Ordinal::NorthWest => (-1, 1),
		}
	}
}

/// Round `value` down to the nearest multiple of `step`
pub fn snap_down(value: f32, step: f32) -> f32 {
	(value / step).floor() * step
}

/// Round `value` up to the nearest multiple of `step`
pub fn snap_up(value: f32, step: f32) -> f32 {
	(value / step).ceil() * step
}

/// Heading in radians of the planar vector from `from` to `to`, measured anticlockwise from `+x`
pub fn point_direction(from: Vec2, to: Vec2) -> f32 {
	(to.y - from.y).atan2(to.x - from.x)
}

/// Clamped parametric projection of `point` onto the segment `a -> b`.
/// Returns the fraction along the segment in `[0, 1]` and the projected
/// position. A zero length segment projects onto `a`
pub fn project_onto_segment(point: Vec3, a: Vec3, b: Vec3) -> (f32, Vec3) {
	let ab = b - a;
	let length_squared = ab.length_squared();
	if length_squared <= f32::EPSILON {
		return (0.0, a);
	}
	let fraction = ((point - a).dot(ab) / length_squared).clamp(0.0, 1.0);
	(fraction, a + ab * fraction)
}
