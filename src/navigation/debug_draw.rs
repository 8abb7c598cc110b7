//! Primitives emitted by the `debug_draw` methods of the navigation
//! structures. They are plain data so they can be inspected in tests or
//! handed to any renderer, the `debug_draw` feature forwards them to
//! [Gizmos](https://docs.rs/bevy/latest/bevy/gizmos/gizmos/struct.Gizmos.html)
//!

use bevy::prelude::*;

/// A coloured line segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugLine {
	/// Start of the segment
	pub start: Vec3,
	/// End of the segment
	pub end: Vec3,
	/// Colour of the segment
	pub color: Color,
}

/// A coloured point of interest
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugMarker {
	/// Centre of the marker
	pub position: Vec3,
	/// Radius of the marker
	pub radius: f32,
	/// Colour of the marker
	pub color: Color,
}

/// Collection of [DebugLine] and [DebugMarker] describing a navigation structure
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebugDrawList {
	/// Segments to draw
	lines: Vec<DebugLine>,
	/// Markers to draw
	markers: Vec<DebugMarker>,
}

impl DebugDrawList {
	/// Add a line segment
	pub fn line(&mut self, start: Vec3, end: Vec3, color: Color) {
		self.lines.push(DebugLine { start, end, color });
	}
	/// Add a marker
	pub fn marker(&mut self, position: Vec3, radius: f32, color: Color) {
		self.markers.push(DebugMarker {
			position,
			radius,
			color,
		});
	}
	pub fn get_lines(&self) -> &[DebugLine] {
		&self.lines
	}
	pub fn get_markers(&self) -> &[DebugMarker] {
		&self.markers
	}
	/// Append the contents of another list
	pub fn extend(&mut self, other: DebugDrawList) {
		self.lines.extend(other.lines);
		self.markers.extend(other.markers);
	}
	pub fn is_empty(&self) -> bool {
		self.lines.is_empty() && self.markers.is_empty()
	}
}
