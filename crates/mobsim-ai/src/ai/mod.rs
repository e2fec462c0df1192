//! Mob AI: footing, pathfinding, navigation, movement, behavior ladders,
//! scheduling, crowd separation and natural spawning.

pub mod behavior;
pub mod brain;
pub mod footprint;
pub mod hostile;
pub mod movement;
pub mod navigator;
pub mod passive;
pub mod pathfinding;
pub mod scheduler;
pub mod separation;
pub mod spatial;
pub mod spawning;
pub mod stationary;
