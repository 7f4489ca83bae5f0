//! Tile Hop: a deterministic side-scrolling platformer simulation.
//!
//! The core (`domain`, `sim`, `input`) is headless and driven through
//! [`sim::engine::Engine`]. The `ui` module holds the terminal host's
//! collaborators: keyboard, gamepad, sound and renderer.

pub mod config;
pub mod domain;
pub mod error;
pub mod input;
pub mod sim;
pub mod ui;
