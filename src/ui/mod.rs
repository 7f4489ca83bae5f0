pub mod gamepad;
pub mod keyboard;
pub mod renderer;
pub mod sound;
