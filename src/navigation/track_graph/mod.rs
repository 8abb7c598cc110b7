//! The [TrackGraph] is a skeleton of the race course. Track authoring lays
//! down nodes along the centre of every drivable route and connects
//! neighbouring nodes, branches and shortcuts included, so the graph may
//! contain cycles.
//!
//! When a race starts the graph is split at the finish line. The node
//! closest to the start line becomes two nodes: a start node keeping the
//! connections ahead of the line and an end node taking the connections
//! behind it. A shortest path search outward from the end node then gives
//! every node its distance to the finish, `t`:
//!
//! ```text
//!        N3 ______________ N2
//!         |  t=100        |  t=200
//!         |               |
//!         |               |
//!     end |_______________| N1
//!     t=0  start          t=300
//!          t=400
//! ```
//!
//! A vehicle's progress through a lap is read from the graph by projecting
//! its position onto the nearest edge, see [lap_query].
//!

pub mod lap_query;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::prelude::*;
use bevy::prelude::*;

/// A vertex of the course skeleton
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct TrackNode {
	/// Location of the node
	position: Vec3,
	/// Distance left to the finish line, [f32::MAX] until the graph is rebuilt or if the node cannot reach the finish
	t: f32,
	/// Normalised heading toward the neighbour closest to the finish
	direction: Vec3,
	/// Planar angle used to orient checkpoints at this node
	angle: f32,
	/// Indices of adjacent nodes
	connections: Vec<u32>,
}

impl TrackNode {
	/// Create a new unconnected instance of [TrackNode]
	fn new(position: Vec3) -> Self {
		TrackNode {
			position,
			t: f32::MAX,
			direction: Vec3::ZERO,
			angle: 0.0,
			connections: Vec::new(),
		}
	}
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	/// Distance to the finish line
	pub fn get_t(&self) -> f32 {
		self.t
	}
	pub fn get_direction(&self) -> Vec3 {
		self.direction
	}
	pub fn get_angle(&self) -> f32 {
		self.angle
	}
	pub fn get_connections(&self) -> &[u32] {
		&self.connections
	}
	/// Whether the finish line can be reached from this node
	pub fn is_reachable(&self) -> bool {
		self.t < f32::MAX
	}
}

/// Entry of the travel time priority queue, ordered so the smallest `t` is popped first
#[derive(Clone, Copy, Debug)]
struct TravelTime {
	/// Index of the node
	node: usize,
	/// Candidate distance to the finish
	t: f32,
}

impl Ord for TravelTime {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.t
			.total_cmp(&self.t)
			.then_with(|| other.node.cmp(&self.node))
	}
}

impl PartialOrd for TravelTime {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for TravelTime {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for TravelTime {}

/// A graph of [TrackNode]s annotated with the distance to the finish line
#[derive(Component, Clone, Debug, Default)]
pub struct TrackGraph {
	/// All nodes, the end node and subdivision nodes are appended after the authored ones
	nodes: Vec<TrackNode>,
	/// Index of the node at the start line, set by [TrackGraph::rebuild]
	start_node: Option<usize>,
	/// Index of the synthetic node at the finish line, set by [TrackGraph::rebuild]
	end_node: Option<usize>,
	/// Distinct start to finish routes, shortest first
	paths: Vec<Vec<usize>>,
}

impl TrackGraph {
	/// Remove every node and route
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.paths.clear();
		self.start_node = None;
		self.end_node = None;
	}
	/// Append an unconnected node and return its index
	pub fn add_node(&mut self, position: Vec3) -> u32 {
		self.nodes.push(TrackNode::new(position));
		(self.nodes.len() - 1) as u32
	}
	/// Connect two nodes, connections are undirected
	pub fn add_connection(&mut self, from_index: u32, to_index: u32) {
		let count = self.nodes.len();
		if from_index as usize >= count || to_index as usize >= count {
			panic!(
				"Cannot connect track graph nodes {} and {}, the graph only has {} nodes",
				from_index, to_index, count
			);
		}
		self.nodes[from_index as usize].connections.push(to_index);
		self.nodes[to_index as usize].connections.push(from_index);
	}
	pub fn get_nodes(&self) -> &[TrackNode] {
		&self.nodes
	}
	pub fn get_node(&self, index: usize) -> Option<&TrackNode> {
		self.nodes.get(index)
	}
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}
	/// Index of the start node once rebuilt
	pub fn start_node(&self) -> Option<usize> {
		self.start_node
	}
	/// Index of the end node once rebuilt
	pub fn end_node(&self) -> Option<usize> {
		self.end_node
	}
	/// Whether [TrackGraph::rebuild] succeeded
	pub fn is_valid(&self) -> bool {
		self.start_node.is_some() && self.end_node.is_some()
	}
	/// Distance from the start line all the way round to the finish, `0` before a rebuild
	pub fn lap_length(&self) -> f32 {
		match self.start_node {
			Some(start) if self.nodes[start].is_reachable() => self.nodes[start].t,
			_ => 0.0,
		}
	}
	/// Distinct routes from the start node to the end node as node indices, shortest first
	pub fn paths(&self) -> &[Vec<usize>] {
		&self.paths
	}
	/// Each undirected edge once, as `(lower index, higher index)`
	pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
		self.nodes.iter().enumerate().flat_map(|(i, node)| {
			node.connections
				.iter()
				.map(|c| *c as usize)
				.filter(move |c| *c > i)
				.map(move |c| (i, c))
		})
	}
	/// Split the graph at the start line and compute the distance to the finish of every node.
	///
	/// The node nearest `start_transform` is snapped onto the start line
	/// and becomes the start node. A copy of it becomes the end node and
	/// takes over every connection lying behind the line (against the local
	/// `x` axis of the transform). Distances are then propagated outward from
	/// the end node, the start node being the last node of the lap
	pub fn rebuild(&mut self, start_transform: &Transform) -> Result<(), TrackGraphError> {
		if self.end_node.is_some() {
			error!("Track graph rebuild requested twice");
			return Err(TrackGraphError::AlreadyBuilt);
		}
		let start_position = start_transform.translation;
		let forward = (start_transform.rotation * Vec3::X).normalize_or_zero();
		let Some((start_index, distance_squared)) = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, node)| (i, node.position.distance_squared(start_position)))
			.min_by(|a, b| a.1.total_cmp(&b.1))
		else {
			error!("Track graph has no nodes");
			return Err(TrackGraphError::EmptyGraph);
		};
		if distance_squared > START_LINE_PROXIMITY * START_LINE_PROXIMITY {
			let distance = distance_squared.sqrt();
			error!(
				"There is no track graph node close enough to the finish line, closest is {}",
				distance
			);
			return Err(TrackGraphError::NoNodeNearStart {
				distance,
				threshold: START_LINE_PROXIMITY,
			});
		}
		// move the start node directly onto the finish line
		let original = self.nodes[start_index].position;
		let start = original - forward * (original - start_position).dot(forward)
			+ forward * START_NODE_OFFSET;
		let (behind, ahead): (Vec<u32>, Vec<u32>) = self.nodes[start_index]
			.connections
			.iter()
			.partition(|c| (self.nodes[**c as usize].position - start).dot(forward) <= 0.0);
		if behind.is_empty() {
			error!("The end node of the track graph would have no connections");
			return Err(TrackGraphError::DegenerateStart);
		}
		let end_index = self.nodes.len();
		// neighbours behind the line now lead to the finish instead of the start
		for c in behind.iter() {
			if let Some(link) = self.nodes[*c as usize]
				.connections
				.iter_mut()
				.find(|o| **o as usize == start_index)
			{
				*link = end_index as u32;
			}
		}
		let mut end = TrackNode::new(start);
		end.connections = behind;
		let start_node = &mut self.nodes[start_index];
		start_node.position = start;
		start_node.connections = ahead;
		self.nodes.push(end);
		self.start_node = Some(start_index);
		self.end_node = Some(end_index);

		self.compute_travel_times(end_index, start_index);
		self.compute_checkpoint_angles();
		self.compute_paths();
		info!(
			"Rebuilt track graph: {} nodes, lap length {}",
			self.nodes.len(),
			self.lap_length()
		);
		Ok(())
	}
	/// Shortest distance from every node to `end_index`. Propagation never
	/// continues out of `start_index` so the course cannot be short-circuited
	/// backwards across the finish line
	fn compute_travel_times(&mut self, end_index: usize, start_index: usize) {
		for node in self.nodes.iter_mut() {
			node.t = f32::MAX;
		}
		self.nodes[end_index].t = 0.0;
		let mut queue = BinaryHeap::new();
		queue.push(TravelTime {
			node: end_index,
			t: 0.0,
		});
		while let Some(TravelTime { node, t }) = queue.pop() {
			// stale entry, a shorter route has already been found
			if t > self.nodes[node].t {
				continue;
			}
			if node == start_index {
				continue;
			}
			for i in 0..self.nodes[node].connections.len() {
				let next = self.nodes[node].connections[i] as usize;
				let travel_time =
					t + self.nodes[node].position.distance(self.nodes[next].position);
				if travel_time < self.nodes[next].t {
					self.nodes[next].t = travel_time;
					queue.push(TravelTime {
						node: next,
						t: travel_time,
					});
				}
			}
		}
	}
	/// Orient every connected node toward its neighbour nearest the finish
	fn compute_checkpoint_angles(&mut self) {
		for index in 0..self.nodes.len() {
			let node = &self.nodes[index];
			let Some(min) = node
				.connections
				.iter()
				.map(|c| *c as usize)
				.min_by(|a, b| self.nodes[*a].t.total_cmp(&self.nodes[*b].t))
			else {
				continue;
			};
			// `ahead` is whichever of the pair is closer to the finish
			let (behind, ahead) = if self.nodes[min].t < node.t {
				(index, min)
			} else {
				(min, index)
			};
			let a = self.nodes[behind].position;
			let b = self.nodes[ahead].position;
			let angle = point_direction(b.truncate(), a.truncate()) - std::f32::consts::FRAC_PI_2;
			let direction = (b - a).normalize_or_zero();
			let node = &mut self.nodes[index];
			node.angle = angle;
			node.direction = direction;
		}
	}
	/// Split every edge longer than `max_segment_length` at its midpoint
	/// until no long edge remains. Midpoints interpolate `t` and take their
	/// heading from the endpoint further from the finish. Routes are
	/// recomputed afterwards since they hold node indices
	pub fn subdivide(&mut self, max_segment_length: f32) {
		if max_segment_length <= 0.0 {
			warn!(
				"Ignoring track graph subdivision with segment length {}",
				max_segment_length
			);
			return;
		}
		let max_distance = max_segment_length * max_segment_length;
		let authored_count = self.nodes.len();
		let mut index = 0;
		while index < self.nodes.len() {
			for i in 0..self.nodes[index].connections.len() {
				let next = self.nodes[index].connections[i] as usize;
				let from = &self.nodes[index];
				let to = &self.nodes[next];
				if from.position.distance_squared(to.position) <= max_distance {
					continue;
				}
				let (direction, angle) = if from.t > to.t {
					(from.direction, from.angle)
				} else {
					(to.direction, to.angle)
				};
				// a midpoint next to an unreachable node is unreachable too
				let t = if from.is_reachable() && to.is_reachable() {
					from.t + (to.t - from.t) * 0.5
				} else {
					f32::MAX
				};
				let middle_index = self.nodes.len() as u32;
				let middle = TrackNode {
					position: from.position.lerp(to.position, 0.5),
					t,
					direction,
					angle,
					connections: vec![next as u32, index as u32],
				};
				if let Some(link) = self.nodes[next]
					.connections
					.iter_mut()
					.find(|c| **c as usize == index)
				{
					*link = middle_index;
				}
				self.nodes[index].connections[i] = middle_index;
				self.nodes.push(middle);
			}
			index += 1;
		}
		debug!(
			"Subdivided track graph from {} to {} nodes",
			authored_count,
			self.nodes.len()
		);
		self.compute_paths();
	}
	/// Enumerate routes from the start node to the end node that always move
	/// to a neighbour closer to the finish, keeping at most [MAX_GRAPH_PATHS]
	fn compute_paths(&mut self) {
		/// Depth first walk down the `t` gradient, steepest neighbour first
		fn walk(
			graph: &TrackGraph,
			node: usize,
			end: usize,
			path: &mut Vec<usize>,
			found: &mut Vec<Vec<usize>>,
		) {
			if found.len() >= MAX_GRAPH_PATHS {
				return;
			}
			if node == end {
				found.push(path.clone());
				return;
			}
			let t = graph.nodes[node].t;
			let mut next: Vec<usize> = graph.nodes[node]
				.connections
				.iter()
				.map(|c| *c as usize)
				.filter(|c| graph.nodes[*c].t < t)
				.collect();
			next.sort_by(|a, b| graph.nodes[*a].t.total_cmp(&graph.nodes[*b].t));
			for n in next {
				path.push(n);
				walk(graph, n, end, path, found);
				path.pop();
			}
		}
		self.paths.clear();
		let (Some(start), Some(end)) = (self.start_node, self.end_node) else {
			return;
		};
		if !self.nodes[start].is_reachable() {
			return;
		}
		let mut found = Vec::new();
		let mut path = vec![start];
		walk(self, start, end, &mut path, &mut found);
		let mut measured: Vec<(f32, Vec<usize>)> = found
			.into_iter()
			.map(|p| (self.path_length(&p), p))
			.collect();
		measured.sort_by(|a, b| a.0.total_cmp(&b.0));
		self.paths = measured.into_iter().map(|(_, p)| p).collect();
	}
	/// Sum of the segment lengths along a list of node indices
	pub fn path_length(&self, path: &[usize]) -> f32 {
		path.windows(2)
			.map(|w| self.nodes[w[0]].position.distance(self.nodes[w[1]].position))
			.sum()
	}
	/// Describe the graph for debug rendering. Edges fade from red at the
	/// start of the lap to green at the finish, unreachable edges are grey,
	/// each node shows its heading and the start and end nodes are marked
	pub fn debug_draw(&self) -> DebugDrawList {
		let mut list = DebugDrawList::default();
		let lap_length = self.lap_length().max(f32::EPSILON);
		for (a, b) in self.edges() {
			let na = &self.nodes[a];
			let nb = &self.nodes[b];
			let color = if na.is_reachable() && nb.is_reachable() {
				let fraction = ((na.t + nb.t) * 0.5 / lap_length).clamp(0.0, 1.0);
				Color::srgb(fraction, 1.0 - fraction, 0.1)
			} else {
				Color::srgb(0.5, 0.5, 0.5)
			};
			list.line(na.position, nb.position, color);
		}
		for node in self.nodes.iter().filter(|n| !n.connections.is_empty()) {
			list.line(
				node.position,
				node.position + node.direction * 4.0,
				Color::WHITE,
			);
		}
		if let Some(start) = self.start_node {
			list.marker(self.nodes[start].position, 2.0, Color::srgb(0.0, 1.0, 0.0));
		}
		if let Some(end) = self.end_node {
			list.marker(self.nodes[end].position, 2.5, Color::srgb(1.0, 0.0, 0.0));
		}
		list
	}
}
