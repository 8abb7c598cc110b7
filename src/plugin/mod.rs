//! Defines the Bevy [Plugin] for track navigation
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod avoidance_layer;
#[cfg(feature = "debug_draw")]
pub mod debug_layer;
pub mod hazard_layer;
pub mod progress_layer;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	Tidy,
	Calculate,
}

pub struct TrackNavigationPlugin;

impl Plugin for TrackNavigationPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<Ordinal>()
			.register_type::<GridSettings>()
			.register_type::<CellType>()
			.register_type::<StartLine>()
			.register_type::<RacingLinePoint>()
			.register_type::<LapQuery>()
			.register_type::<RaceProgress>()
			.add_event::<EventMarkHazard>()
			.add_event::<EventAvoidanceRequest>()
			.add_event::<EventLapCompleted>()
			.configure_sets(Update, (OrderingSet::Tidy, OrderingSet::Calculate).chain())
			.add_systems(
				Update,
				(
					hazard_layer::advance_hazard_generation.in_set(OrderingSet::Tidy),
					(
						hazard_layer::process_hazard_marks,
						progress_layer::update_race_progress,
						avoidance_layer::process_avoidance_requests,
					)
						.chain()
						.in_set(OrderingSet::Calculate),
				),
			);
	}
}

/// Build the navigation of a track and spawn it. A track which cannot be
/// navigated is a broken asset, the error is logged and the app halts
pub fn spawn_track_navigation(
	commands: &mut Commands,
	scene: &impl TrackScene,
	layout: &TrackLayout,
	settings: GridSettings,
) -> Entity {
	match TrackNavigationBundle::new(scene, layout, settings) {
		Ok(bundle) => commands.spawn(bundle).id(),
		Err(e) => {
			error!("Unable to build track navigation: {}", e);
			panic!("Unable to build track navigation: {}", e);
		}
	}
}
