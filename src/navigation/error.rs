//! Errors raised while building the navigation structures of a track
//!
//! A track which produces any of these cannot be raced on, the plugin layer
//! treats them as fatal
//!

use thiserror::Error;

/// Reasons a [crate::prelude::TrackGraph] could not be rebuilt
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackGraphError {
	/// The graph has no nodes at all
	#[error("the track graph has no nodes")]
	EmptyGraph,
	/// The closest node to the start line is too far away to be the finish
	#[error("there is no track graph node close enough to the finish line, closest is {distance} away (limit {threshold})")]
	NoNodeNearStart {
		/// Distance of the closest node
		distance: f32,
		/// Maximum allowed distance
		threshold: f32,
	},
	/// None of the neighbours of the start node sit behind the start line so the finish cannot be reached
	#[error("the end node of the track graph has no connections, the start line does not split the course")]
	DegenerateStart,
	/// The graph has already been split at the start line, `clear` it and add the nodes again to rebuild
	#[error("the track graph has already been rebuilt")]
	AlreadyBuilt,
}

/// Failures loading navigation data from disk
#[derive(Debug, Error)]
pub enum NavigationFileError {
	/// The file could not be opened or read
	#[error("failed reading navigation file: {0}")]
	Io(#[from] std::io::Error),
	/// The `ron` document could not be deserialized
	#[cfg(feature = "ron")]
	#[error("failed deserializing navigation file: {0}")]
	Ron(#[from] ron::error::SpannedError),
	/// The `csv` document could not be read
	#[cfg(feature = "csv")]
	#[error("failed reading csv record: {0}")]
	Csv(#[from] csv::Error),
	/// A record was read but its contents make no sense
	#[error("invalid record on line {line}: {reason}")]
	InvalidRecord {
		/// 1-based line of the record
		line: usize,
		/// What is wrong with it
		reason: String,
	},
	/// The data loaded but the graph it describes is malformed
	#[error(transparent)]
	Graph(#[from] TrackGraphError),
}
