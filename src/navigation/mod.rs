//! The navigation core used by AI drivers. It is made of three cooperating
//! structures which are built once when a track is loaded and then queried
//! every frame:
//!
//! * [track_graph::TrackGraph] - a skeleton of the course where every node
//!   knows its distance to the finish line. It is the authoritative measure
//!   of race progress and is used to rank vehicles
//! * [motion_grid::MotionGrid] - a grid of cells laid over the drivable
//!   surface, each cell holding one or more stacked layers (a road passing
//!   under a bridge has two). It is used to search short paths around hazards
//! * [racing_line::RacingLine] - an idealised closed loop of waypoints with a
//!   target speed at each point which the AI follows by default
//!
//! The world is treated as `z`-up. The ground plane is `(x, y)`, grid cells
//! are indexed by `(column, row)` along `x` and `y` and the layers of a cell
//! are stacked along `z`:
//!
//! ```text
//!           z
//!           |      ___________ bridge layer
//!           |     /          /
//!           |    /__________/
//!           |      ___________ ground layer
//!           |     /          /
//!           |    /__________/
//!           |___________________ x
//!          /
//!         y
//! ```
//!
//! Definitions:
//!
//! * Progress `t` - the distance left to travel to reach the finish line. It
//!   is `0` at the finish and equal to the lap length at the start
//! * Layer - one drivable surface of a grid cell at a given height
//! * Low mark - the smallest `t` a vehicle has reached during the current
//!   lap, it never moves backwards which stops a vehicle from being credited
//!   with a part of the course that merely passes close by
//!
//! Physics, terrain and track authoring live outside of this crate and are
//! reached through the [scene_query::TrackScene] trait.
//!

pub mod debug_draw;
pub mod error;
pub mod motion_grid;
pub mod racing_line;
pub mod scene_query;
pub mod settings;
pub mod track_graph;
pub mod track_layout;
pub mod utilities;
