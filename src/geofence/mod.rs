//! Geofence evaluation: geometry primitives and the zone resolver.

pub mod geometry;
pub mod resolver;

pub use geometry::Point;
pub use resolver::{ValidationResult, resolve};
