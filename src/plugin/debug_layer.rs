//! Draws the navigation structures of every track with [Gizmos]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Toggles for what the [NavigationDebugPlugin] draws
#[derive(Resource, Clone, Copy, Debug, Reflect)]
pub struct NavigationDebugSettings {
	/// Draw the [TrackGraph] edges, headings and start/end nodes
	pub draw_track_graph: bool,
	/// Draw every layer of the [MotionGrid], this is a lot of gizmos on a big track
	pub draw_motion_grid: bool,
	/// Draw the [RacingLines]
	pub draw_racing_lines: bool,
	/// Draw the latest [AvoidancePath] of each driver
	pub draw_avoidance_paths: bool,
	/// Target speed drawn in the brightest colour along a racing line
	pub racing_line_max_speed: f32,
}

impl Default for NavigationDebugSettings {
	fn default() -> Self {
		NavigationDebugSettings {
			draw_track_graph: true,
			draw_motion_grid: false,
			draw_racing_lines: true,
			draw_avoidance_paths: true,
			racing_line_max_speed: 100.0,
		}
	}
}

/// Renders [DebugDrawList]s produced by the navigation structures
pub struct NavigationDebugPlugin;

impl Plugin for NavigationDebugPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.init_resource::<NavigationDebugSettings>()
			.register_type::<NavigationDebugSettings>()
			.add_systems(
				Update,
				(draw_tracks, draw_avoidance_paths).after(OrderingSet::Calculate),
			);
	}
}

/// Forward a [DebugDrawList] to [Gizmos]
#[cfg(not(tarpaulin_include))]
fn draw_list(gizmos: &mut Gizmos, list: &DebugDrawList) {
	for line in list.get_lines() {
		gizmos.line(line.start, line.end, line.color);
	}
	for marker in list.get_markers() {
		gizmos.sphere(
			Isometry3d::from_translation(marker.position),
			marker.radius,
			marker.color,
		);
	}
}

/// Draw the graph, grid and lines of each track
#[cfg(not(tarpaulin_include))]
fn draw_tracks(
	settings: Res<NavigationDebugSettings>,
	tracks: Query<(&TrackGraph, &MotionGrid, &RacingLines)>,
	mut gizmos: Gizmos,
) {
	for (graph, grid, lines) in tracks.iter() {
		if settings.draw_track_graph {
			draw_list(&mut gizmos, &graph.debug_draw());
		}
		if settings.draw_motion_grid {
			draw_list(&mut gizmos, &grid.debug_draw());
		}
		if settings.draw_racing_lines {
			for line in lines.0.iter() {
				draw_list(&mut gizmos, &line.debug_draw(settings.racing_line_max_speed));
			}
		}
	}
}

/// Draw each driver's avoidance path
#[cfg(not(tarpaulin_include))]
fn draw_avoidance_paths(
	settings: Res<NavigationDebugSettings>,
	paths: Query<&AvoidancePath>,
	mut gizmos: Gizmos,
) {
	if !settings.draw_avoidance_paths {
		return;
	}
	for path in paths.iter() {
		draw_list(&mut gizmos, &debug_draw_path(path.get_path()));
	}
}
