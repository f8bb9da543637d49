//! PixelQ - per-LED brightness measurement from photographs of LED arrays
//!
//! The engine operates purely on coordinates, pixel buffers, and explicit
//! session state: it derives n×n LED positions from four grid corners (or
//! manual clicks, or heuristic auto-alignment), samples color and
//! brightness around each position, and recovers plausible values for LEDs
//! too dark to detect directly. Rendering, file dialogs, and serialization
//! formatting belong to the host.

pub mod align;
pub mod config;
pub mod enhance;
pub mod export;
pub mod geometry;
pub mod history;
pub mod interpolate;
pub mod manual;
pub mod sample;
pub mod session;
pub mod transform;
