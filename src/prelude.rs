//! `use bevy_race_navigation::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::navigation::{
	debug_draw::*,
	error::*,
	motion_grid::{path_search::*, *},
	racing_line::*,
	scene_query::*,
	settings::*,
	track_graph::{lap_query::*, *},
	track_layout::*,
	utilities::*,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{avoidance_layer::*, hazard_layer::*, progress_layer::*, *},
};

#[cfg(feature = "debug_draw")]
#[doc(hidden)]
pub use crate::plugin::debug_layer::*;
