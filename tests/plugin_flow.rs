//! Run the plugin systems inside an [App] across several frames
//!

use bevy::prelude::*;
use bevy_race_navigation::prelude::*;

/// 100 unit square course with its road laid over a 20 unit wide strip along each side
fn square_course() -> (StaticSurfaceScene, TrackLayout) {
	let scene = StaticSurfaceScene::new(Vec2::new(-10.0, -10.0), Vec2::new(110.0, 110.0))
		.with_terrain(-5.0, false)
		.with_patch(SurfacePatch::new(Vec2::new(-10.0, -10.0), Vec2::new(110.0, 10.0), 0.0, SurfaceMaterial::Track))
		.with_patch(SurfacePatch::new(Vec2::new(90.0, -10.0), Vec2::new(110.0, 110.0), 0.0, SurfaceMaterial::Track))
		.with_patch(SurfacePatch::new(Vec2::new(-10.0, 90.0), Vec2::new(110.0, 110.0), 0.0, SurfaceMaterial::Track))
		.with_patch(SurfacePatch::new(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 110.0), 0.0, SurfaceMaterial::Track));
	let layout = TrackLayout::new(
		vec![
			Vec3::new(0.0, 0.0, 0.0),
			Vec3::new(100.0, 0.0, 0.0),
			Vec3::new(100.0, 100.0, 0.0),
			Vec3::new(0.0, 100.0, 0.0),
		],
		vec![(0, 1), (1, 2), (2, 3), (3, 0)],
		StartLine::new(Vec3::ZERO, Vec3::X),
		vec![],
	);
	(scene, layout)
}

/// An [App] with the plugin and a spawned track, returning the track entity
fn app_with_track() -> (App, Entity) {
	let mut app = App::new();
	app.add_plugins(TrackNavigationPlugin);
	let (scene, layout) = square_course();
	let bundle = TrackNavigationBundle::new(&scene, &layout, GridSettings::default()).unwrap();
	let track = app.world_mut().spawn(bundle).id();
	(app, track)
}

#[test]
fn hazard_marks_last_one_frame() {
	let (mut app, track) = app_with_track();
	app.world_mut()
		.send_event(EventMarkHazard::transient(Vec3::new(51.0, 1.0, 0.0), 0.0, CellType::HAZARD));
	app.update();
	let grid = app.world().get::<MotionGrid>(track).unwrap();
	let (column, row) = grid.world_to_cell(Vec3::new(51.0, 1.0, 0.0)).unwrap();
	assert!(grid.get_cell_type(column, row, 0).unwrap().contains(CellType::HAZARD));
	app.update();
	let grid = app.world().get::<MotionGrid>(track).unwrap();
	assert!(!grid.get_cell_type(column, row, 0).unwrap().contains(CellType::HAZARD));
}

#[test]
fn permanent_hazard_persists() {
	let (mut app, track) = app_with_track();
	app.world_mut()
		.send_event(EventMarkHazard::new(Vec3::new(51.0, 1.0, 0.0), 3.0, CellType::BLOCKED, true));
	app.update();
	app.update();
	let grid = app.world().get::<MotionGrid>(track).unwrap();
	let (column, row) = grid.world_to_cell(Vec3::new(51.0, 1.0, 0.0)).unwrap();
	assert!(!grid.get_cell_type(column, row, 0).unwrap().is_passable());
}

#[test]
fn avoidance_path_inserted() {
	let (mut app, _track) = app_with_track();
	let driver = app.world_mut().spawn_empty().id();
	app.world_mut()
		.send_event(EventMarkHazard::transient(Vec3::new(41.0, 1.0, 0.0), 3.0, CellType::VEHICLE));
	app.world_mut()
		.send_event(EventAvoidanceRequest::new(driver, Vec3::new(31.0, 1.0, 0.0), Vec3::new(51.0, 1.0, 0.0)));
	app.update();
	let path = app.world().get::<AvoidancePath>(driver).unwrap();
	assert!(path.reaches_target());
	// the direct route along y=1 is blocked
	assert!(path.get_waypoints().any(|p| p.y != 1.0));
}

#[test]
fn lap_completion_event() {
	let (mut app, track) = app_with_track();
	let vehicle = app
		.world_mut()
		.spawn((Transform::from_xyz(10.0, 0.0, 0.0), RaceProgress::new(track, 3)))
		.id();
	let mut route = Vec::new();
	for i in 1..10 {
		route.push(Vec3::new(i as f32 * 10.0, 0.0, 0.0));
	}
	for i in 0..10 {
		route.push(Vec3::new(100.0, i as f32 * 10.0, 0.0));
	}
	for i in 0..10 {
		route.push(Vec3::new(100.0 - i as f32 * 10.0, 100.0, 0.0));
	}
	for i in 0..10 {
		route.push(Vec3::new(0.0, 100.0 - i as f32 * 10.0, 0.0));
	}
	route.push(Vec3::new(5.0, 0.0, 0.0));
	for position in route {
		app.world_mut().get_mut::<Transform>(vehicle).unwrap().translation = position;
		app.update();
	}
	let progress = app.world().get::<RaceProgress>(vehicle).unwrap();
	assert_eq!(2, progress.get_current_lap());
	let events = app.world().resource::<Events<EventLapCompleted>>();
	let mut cursor = events.get_cursor();
	let completed: Vec<&EventLapCompleted> = cursor.read(events).collect();
	assert_eq!(1, completed.len());
	assert_eq!(1, completed[0].get_lap());
	assert_eq!(vehicle, completed[0].get_entity());
	assert!(!completed[0].is_finished());
}
