pub mod ai;
pub mod entity;
pub mod physics;
pub mod player;
pub mod tile;
