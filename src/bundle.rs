//! The navigation data of a track, spawned onto the track entity once the
//! track has been loaded. Systems of the [crate::plugin::TrackNavigationPlugin]
//! query for these components
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Everything the AI drivers of one track navigate with
#[derive(Bundle, Clone, Debug)]
pub struct TrackNavigationBundle {
	track_graph: TrackGraph,
	motion_grid: MotionGrid,
	racing_lines: RacingLines,
	start_line: StartLine,
}

impl TrackNavigationBundle {
	/// Create a new instance of [TrackNavigationBundle], building the
	/// [MotionGrid] from the `scene` and the [TrackGraph] and [RacingLines] from
	/// the `layout`
	pub fn new(
		scene: &impl TrackScene,
		layout: &TrackLayout,
		settings: GridSettings,
	) -> Result<Self, NavigationFileError> {
		let track_graph = layout.build_track_graph()?;
		let racing_lines = layout.build_racing_lines(&track_graph);
		let motion_grid = MotionGrid::build(scene, settings);
		info!(
			"Track navigation ready, {} racing lines, {} route(s) to the finish",
			racing_lines.len(),
			track_graph.paths().len()
		);
		Ok(TrackNavigationBundle {
			track_graph,
			motion_grid,
			racing_lines,
			start_line: *layout.get_start(),
		})
	}
	/// Create a new instance of [TrackNavigationBundle] where the [TrackLayout] is read from disk
	#[cfg(feature = "ron")]
	pub fn from_ron(
		scene: &impl TrackScene,
		layout_path: &str,
		settings: GridSettings,
	) -> Result<Self, NavigationFileError> {
		let layout = TrackLayout::from_ron(layout_path)?;
		TrackNavigationBundle::new(scene, &layout, settings)
	}
	pub fn get_track_graph(&self) -> &TrackGraph {
		&self.track_graph
	}
	pub fn get_motion_grid(&self) -> &MotionGrid {
		&self.motion_grid
	}
	pub fn get_racing_lines(&self) -> &RacingLines {
		&self.racing_lines
	}
	pub fn get_start_line(&self) -> &StartLine {
		&self.start_line
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	fn scene() -> StaticSurfaceScene {
		StaticSurfaceScene::new(Vec2::new(-10.0, -10.0), Vec2::new(110.0, 110.0))
			.with_patch(SurfacePatch::new(Vec2::new(-10.0, -10.0), Vec2::new(110.0, 10.0), 0.0, SurfaceMaterial::Track))
	}
	fn layout() -> TrackLayout {
		TrackLayout::new(
			vec![
				Vec3::new(0.0, 0.0, 0.0),
				Vec3::new(100.0, 0.0, 0.0),
				Vec3::new(100.0, 100.0, 0.0),
				Vec3::new(0.0, 100.0, 0.0),
			],
			vec![(0, 1), (1, 2), (2, 3), (3, 0)],
			StartLine::new(Vec3::ZERO, Vec3::X),
			vec![RacingLine::new(vec![
				RacingLinePoint::new(Vec3::new(10.0, 10.0, 0.0), 10.0),
				RacingLinePoint::new(Vec3::new(90.0, 10.0, 0.0), 20.0),
				RacingLinePoint::new(Vec3::new(90.0, 90.0, 0.0), 30.0),
				RacingLinePoint::new(Vec3::new(10.0, 90.0, 0.0), 20.0),
			])],
		)
	}
	#[test]
	fn new_bundle() {
		let bundle = TrackNavigationBundle::new(&scene(), &layout(), GridSettings::default()).unwrap();
		assert!(bundle.get_track_graph().is_valid());
		assert_eq!(60, bundle.get_motion_grid().width());
		assert_eq!(1, bundle.get_racing_lines().len());
	}
	#[test]
	fn bundle_with_broken_layout() {
		let layout = TrackLayout::new(vec![Vec3::ZERO], vec![], StartLine::default(), vec![]);
		let result = TrackNavigationBundle::new(&scene(), &layout, GridSettings::default());
		assert!(matches!(result, Err(NavigationFileError::Graph(TrackGraphError::DegenerateStart))));
	}
	#[test]
	#[cfg(feature = "ron")]
	fn bundle_from_disk() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/square_track.ron";
		let bundle = TrackNavigationBundle::from_ron(&scene(), &path, GridSettings::default()).unwrap();
		assert!((bundle.get_track_graph().lap_length() - 399.5).abs() < 0.01);
	}
}
