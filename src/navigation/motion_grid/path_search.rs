//! A* search across the layers of a [MotionGrid].
//!
//! A search node is a layer of a cell, `(column, row, layer)`. From a node
//! the search may step to any of the eight neighbouring cells, landing on the
//! layer of that cell closest in height to the current one provided it lies
//! within the layer tolerance and is passable. A car under a bridge therefore
//! stays on the road beneath it while a car on the bridge stays on the deck.
//!
//! The number of expansions is capped, when the cap is hit the path to the
//! node discovered closest to the goal is returned instead.
//!

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::prelude::*;
use bevy::prelude::*;

/// A step of a path through the [MotionGrid]
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct PathNode {
	/// Centre of the cell at the height of the layer
	position: Vec3,
	/// Estimated total cost through this node, `g + h`
	f: f32,
	/// Distance travelled from the start
	g: f32,
	/// Straight line distance to the goal
	h: f32,
}

impl PathNode {
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	pub fn get_f(&self) -> f32 {
		self.f
	}
	/// Distance travelled from the start of the path
	pub fn get_g(&self) -> f32 {
		self.g
	}
	/// Straight line distance to the goal
	pub fn get_h(&self) -> f32 {
		self.h
	}
}

/// `(column, row, layer)`
type LayerId = (usize, usize, usize);

/// Open set entry, ordered so the lowest `f` is popped first
#[derive(Clone, Copy, Debug)]
struct Frontier {
	/// Estimated total cost
	f: f32,
	/// Distance travelled to reach the layer
	g: f32,
	/// The layer
	id: LayerId,
}

impl Ord for Frontier {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.f
			.total_cmp(&self.f)
			.then_with(|| other.id.cmp(&self.id))
	}
}

impl PartialOrd for Frontier {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Frontier {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Frontier {}

impl MotionGrid {
	/// World position of a layer
	fn layer_position(&self, id: LayerId) -> Option<Vec3> {
		let (column, row, layer) = id;
		let z = self.cell(column, row)?.get_contents().get(layer)?.get_z();
		Some(self.cell_centre(column, row).extend(z))
	}
	/// Search for a path from `from` to `to`.
	///
	/// The start is the layer of `from`'s cell closest to its height. The goal
	/// is the layer of `to`'s cell closest to its height, if none lies within
	/// the tolerance any layer of that cell ends the search. The result runs from
	/// the start to the goal, or to the node nearest the goal if the goal
	/// could not be reached within the expansion cap or at all. An empty path
	/// is returned if either point is outside of the grid, either cell has no
	/// layers, or the starting layer is impassable
	pub fn find_path(&self, from: Vec3, to: Vec3) -> Vec<PathNode> {
		let Some((start_column, start_row)) = self.world_to_cell(from) else {
			return Vec::new();
		};
		let Some(goal) = self.world_to_cell(to) else {
			return Vec::new();
		};
		let Some(goal_cell) = self.cell(goal.0, goal.1) else {
			return Vec::new();
		};
		let goal_layer = self.layer_at(goal.0, goal.1, to.z);
		let Some(goal_z) = goal_cell
			.get_contents()
			.iter()
			.map(|l| l.get_z())
			.min_by(|a, b| (a - to.z).abs().total_cmp(&(b - to.z).abs()))
		else {
			return Vec::new();
		};
		let Some(start_layer) = self.layer_at(start_column, start_row, from.z) else {
			return Vec::new();
		};
		let start = (start_column, start_row, start_layer);
		let start_passable = self
			.get_cell_type(start_column, start_row, start_layer)
			.is_some_and(|t| t.is_passable());
		if !start_passable {
			debug!("Path search starting from an impassable layer at {}", from);
			return Vec::new();
		}
		let goal_position = self.cell_centre(goal.0, goal.1).extend(goal_z);
		let tolerance = self.get_settings().get_layer_z_tolerance();
		let max_expansions = self.get_settings().get_max_path_expansions();

		let mut best_g: HashMap<LayerId, f32> = HashMap::new();
		let mut parents: HashMap<LayerId, LayerId> = HashMap::new();
		let mut open = BinaryHeap::new();
		let Some(start_position) = self.layer_position(start) else {
			return Vec::new();
		};
		let h = start_position.distance(goal_position);
		best_g.insert(start, 0.0);
		open.push(Frontier {
			f: h,
			g: 0.0,
			id: start,
		});
		// node nearest the goal discovered so far
		let mut nearest = (start, h);
		let mut expansions = 0;
		let mut reached = None;
		while let Some(Frontier { g, id, .. }) = open.pop() {
			if best_g.get(&id).is_some_and(|best| g > *best) {
				continue;
			}
			let Some(position) = self.layer_position(id) else {
				continue;
			};
			let h = position.distance(goal_position);
			if h < nearest.1 {
				nearest = (id, h);
			}
			if (id.0, id.1) == goal && goal_layer.is_none_or(|layer| layer == id.2) {
				reached = Some(id);
				break;
			}
			for ordinal in Ordinal::ALL.iter() {
				let (dx, dy) = ordinal.offset();
				let column = id.0 as i32 + dx;
				let row = id.1 as i32 + dy;
				if column < 0 || row < 0 {
					continue;
				}
				let (column, row) = (column as usize, row as usize);
				let Some(cell) = self.cell(column, row) else {
					continue;
				};
				let Some(layer) = cell
					.get_contents()
					.iter()
					.enumerate()
					.map(|(i, l)| (i, (l.get_z() - position.z).abs()))
					.filter(|(_, difference)| *difference <= tolerance)
					.min_by(|a, b| a.1.total_cmp(&b.1))
					.map(|(i, _)| i)
				else {
					continue;
				};
				let passable = self
					.get_cell_type(column, row, layer)
					.is_some_and(|t| t.is_passable());
				if !passable {
					continue;
				}
				let next = (column, row, layer);
				let Some(next_position) = self.layer_position(next) else {
					continue;
				};
				let next_g = g + position.distance(next_position);
				if best_g.get(&next).is_some_and(|best| next_g >= *best) {
					continue;
				}
				best_g.insert(next, next_g);
				parents.insert(next, id);
				let next_h = next_position.distance(goal_position);
				if next_h < nearest.1 {
					nearest = (next, next_h);
				}
				open.push(Frontier {
					f: next_g + next_h,
					g: next_g,
					id: next,
				});
			}
			expansions += 1;
			if expansions >= max_expansions {
				debug!(
					"Path search from {} to {} stopped after {} expansions",
					from, to, expansions
				);
				break;
			}
		}
		let end = reached.unwrap_or(nearest.0);
		self.trace_path(end, start, &parents, &best_g, goal_position)
	}
	/// Walk the parents from `end` back to `start` and convert into [PathNode]s
	fn trace_path(
		&self,
		end: LayerId,
		start: LayerId,
		parents: &HashMap<LayerId, LayerId>,
		best_g: &HashMap<LayerId, f32>,
		goal_position: Vec3,
	) -> Vec<PathNode> {
		let mut ids = vec![end];
		let mut current = end;
		while current != start {
			match parents.get(&current) {
				Some(parent) => {
					current = *parent;
					ids.push(current);
				}
				None => break,
			}
		}
		ids.reverse();
		ids.into_iter()
			.filter_map(|id| {
				let position = self.layer_position(id)?;
				let g = best_g.get(&id).copied().unwrap_or(0.0);
				let h = position.distance(goal_position);
				Some(PathNode {
					position,
					f: g + h,
					g,
					h,
				})
			})
			.collect()
	}
}

/// Describe a path for debug rendering
pub fn debug_draw_path(path: &[PathNode]) -> DebugDrawList {
	let mut list = DebugDrawList::default();
	for pair in path.windows(2) {
		list.line(
			pair[0].get_position(),
			pair[1].get_position(),
			Color::srgb(0.0, 1.0, 1.0),
		);
	}
	if let Some(last) = path.last() {
		list.marker(last.get_position(), 1.0, Color::srgb(0.0, 1.0, 1.0));
	}
	list
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	fn flat_scene() -> StaticSurfaceScene {
		StaticSurfaceScene::new(Vec2::ZERO, Vec2::new(20.0, 20.0))
			.with_terrain(0.0, false)
			.with_patch(SurfacePatch::new(Vec2::ZERO, Vec2::new(20.0, 20.0), 0.0, SurfaceMaterial::Track))
	}
	#[test]
	fn straight_path() {
		let grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		let result: Vec<Vec3> = path.iter().map(|n| n.get_position()).collect();
		let actual = vec![
			Vec3::new(1.0, 1.0, 0.0),
			Vec3::new(3.0, 1.0, 0.0),
			Vec3::new(5.0, 1.0, 0.0),
			Vec3::new(7.0, 1.0, 0.0),
			Vec3::new(9.0, 1.0, 0.0),
		];
		assert_eq!(actual, result);
		assert_eq!(8.0, path[4].get_g());
		assert_eq!(0.0, path[4].get_h());
	}
	#[test]
	fn diagonal_path() {
		let grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(7.0, 7.0, 0.0));
		assert_eq!(4, path.len());
		assert!((path[3].get_g() - 6.0 * 2.0_f32.sqrt()).abs() < 1e-4);
	}
	#[test]
	fn path_avoids_hazard() {
		let mut grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		// wall across x=5 with a gap at the top
		for y in 0..8 {
			grid.set_cell(Vec3::new(5.0, y as f32 * 2.0 + 1.0, 0.0), CellType::HAZARD, false);
		}
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		assert_eq!(Vec3::new(9.0, 1.0, 0.0), path.last().unwrap().get_position());
		for node in path.iter() {
			let (column, row) = grid.world_to_cell(node.get_position()).unwrap();
			let layer = grid.get_cell_layer_index(node.get_position()).unwrap();
			assert!(grid.get_cell_type(column, row, layer).unwrap().is_passable());
			// every step is grid aligned
			assert_eq!(grid.cell_centre(column, row), node.get_position().truncate());
		}
		assert!(path.iter().any(|n| n.get_position().y > 15.0));
	}
	#[test]
	fn hazard_expires_next_generation() {
		let mut grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		for y in 0..10 {
			grid.set_cell(Vec3::new(5.0, y as f32 * 2.0 + 1.0, 0.0), CellType::VEHICLE, false);
		}
		let blocked = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		assert_ne!(Vec3::new(9.0, 1.0, 0.0), blocked.last().unwrap().get_position());
		grid.advance_generation();
		let open = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		assert_eq!(5, open.len());
	}
	#[test]
	fn unreachable_goal_returns_nearest() {
		let mut grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		for y in 0..10 {
			grid.set_cell(Vec3::new(5.0, y as f32 * 2.0 + 1.0, 0.0), CellType::BLOCKED, true);
		}
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		// stops against the wall
		assert_eq!(Vec3::new(3.0, 1.0, 0.0), path.last().unwrap().get_position());
		assert_eq!(Vec3::new(1.0, 1.0, 0.0), path[0].get_position());
	}
	#[test]
	fn expansion_cap_returns_partial_path() {
		let settings = GridSettings::new(2.0, 10.0, 3);
		let grid = MotionGrid::build(&flat_scene(), settings);
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(19.0, 1.0, 0.0));
		assert!(!path.is_empty());
		let last = path.last().unwrap();
		assert!(last.get_h() > 0.0);
		assert!(last.get_h() < 18.0);
	}
	#[test]
	fn expansion_cap_counts_every_expansion() {
		// a single expansion still discovers the next cell along the corridor
		let settings = GridSettings::new(2.0, 10.0, 1);
		let grid = MotionGrid::build(&flat_scene(), settings);
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		let result: Vec<Vec3> = path.iter().map(|n| n.get_position()).collect();
		let actual = vec![Vec3::new(1.0, 1.0, 0.0), Vec3::new(3.0, 1.0, 0.0)];
		assert_eq!(actual, result);
	}
	#[test]
	fn goal_above_surface_is_reached() {
		let grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		let path = grid.find_path(Vec3::new(3.0, 9.0, 0.5), Vec3::new(9.0, 9.0, 0.5));
		let last = path.last().unwrap();
		assert_eq!(Vec3::new(9.0, 9.0, 0.0), last.get_position());
		assert_eq!(0.0, last.get_h());
	}
	/// Road at `z=0` south of `y=12`, a lane climbing north of it onto a deck
	/// at `z=3` spanning `x` in `10..16` over the road
	fn ramp_scene() -> StaticSurfaceScene {
		StaticSurfaceScene::new(Vec2::ZERO, Vec2::new(20.0, 20.0))
			.with_terrain(-10.0, false)
			.with_patch(SurfacePatch::new(Vec2::ZERO, Vec2::new(20.0, 12.0), 0.0, SurfaceMaterial::Track))
			.with_patch(SurfacePatch::new(Vec2::new(0.0, 12.0), Vec2::new(6.0, 20.0), 0.0, SurfaceMaterial::Track))
			.with_patch(SurfacePatch::new(Vec2::new(6.0, 12.0), Vec2::new(8.0, 20.0), 1.0, SurfaceMaterial::Track))
			.with_patch(SurfacePatch::new(Vec2::new(8.0, 12.0), Vec2::new(10.0, 20.0), 2.0, SurfaceMaterial::Track))
			.with_patch(SurfacePatch::new(Vec2::new(10.0, 0.0), Vec2::new(16.0, 20.0), 3.0, SurfaceMaterial::Track))
	}
	#[test]
	fn goal_on_deck_climbs_the_ramp() {
		let grid = MotionGrid::build(&ramp_scene(), GridSettings::new(2.0, 1.5, 1000));
		let goal = Vec3::new(13.0, 3.0, 3.0);
		let (column, row) = grid.world_to_cell(goal).unwrap();
		assert_eq!(2, grid.layer_count(column, row));
		let path = grid.find_path(Vec3::new(1.0, 3.0, 0.0), goal);
		let last = path.last().unwrap();
		assert_eq!(goal, last.get_position());
		assert_eq!(0.0, last.get_h());
		// the deck is only reached by way of the lane
		assert!(path.iter().any(|n| n.get_position().y > 12.0));
		for pair in path.windows(2) {
			assert!((pair[1].get_position().z - pair[0].get_position().z).abs() <= 1.5);
		}
	}
	#[test]
	fn goal_on_road_under_deck() {
		let grid = MotionGrid::build(&ramp_scene(), GridSettings::new(2.0, 1.5, 1000));
		let path = grid.find_path(Vec3::new(1.0, 3.0, 0.0), Vec3::new(13.0, 3.0, 0.0));
		assert_eq!(7, path.len());
		assert!(path.iter().all(|n| n.get_position().z == 0.0));
	}
	#[test]
	fn start_without_layers() {
		let scene = StaticSurfaceScene::new(Vec2::ZERO, Vec2::new(20.0, 20.0))
			.with_terrain(0.0, false)
			.with_patch(SurfacePatch::new(Vec2::new(4.0, 0.0), Vec2::new(20.0, 20.0), 0.0, SurfaceMaterial::Track));
		let grid = MotionGrid::build(&scene, GridSettings::default());
		assert_eq!(0, grid.layer_count(0, 0));
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		assert!(path.is_empty());
		let path = grid.find_path(Vec3::new(9.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
		assert!(path.is_empty());
	}
	#[test]
	fn outside_grid() {
		let grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		assert!(grid.find_path(Vec3::new(-1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0)).is_empty());
		assert!(grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(90.0, 1.0, 0.0)).is_empty());
	}
	#[test]
	fn path_under_bridge_stays_on_ground() {
		let scene = flat_scene()
			.with_patch(SurfacePatch::new(Vec2::new(8.0, 0.0), Vec2::new(12.0, 20.0), 4.0, SurfaceMaterial::Track));
		let grid = MotionGrid::build(&scene, GridSettings::default());
		let path = grid.find_path(Vec3::new(9.0, 5.0, 0.0), Vec3::new(15.0, 5.0, 0.0));
		assert!(!path.is_empty());
		for node in path.iter() {
			assert_eq!(0.0, node.get_position().z);
		}
	}
	#[test]
	fn path_on_bridge_stays_on_deck() {
		let scene = flat_scene()
			.with_patch(SurfacePatch::new(Vec2::new(8.0, 0.0), Vec2::new(12.0, 20.0), 4.0, SurfaceMaterial::Track));
		let grid = MotionGrid::build(&scene, GridSettings::default());
		let path = grid.find_path(Vec3::new(9.0, 1.0, 4.0), Vec3::new(9.0, 19.0, 4.0));
		assert_eq!(10, path.len());
		for pair in path.windows(2) {
			assert_eq!(4.0, pair[1].get_position().z);
			assert!((pair[1].get_position().z - pair[0].get_position().z).abs() < 10.0);
		}
	}
	#[test]
	fn debug_draw_follows_path() {
		let grid = MotionGrid::build(&flat_scene(), GridSettings::default());
		let path = grid.find_path(Vec3::new(1.0, 1.0, 0.0), Vec3::new(9.0, 1.0, 0.0));
		let list = debug_draw_path(&path);
		assert_eq!(4, list.get_lines().len());
		assert_eq!(1, list.get_markers().len());
	}
}
