pub mod engine;
pub mod event;
pub mod level;
pub mod snapshot;
pub mod step;
pub mod world;
