//! This is a plugin for Bevy game engine to give AI drivers a sense of where the race track goes, how far through a lap they are and how to steer around hazards
//!

pub mod bundle;
pub mod navigation;
pub mod plugin;

pub mod prelude;
