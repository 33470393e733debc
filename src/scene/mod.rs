//! Scene-side collaborators.
//!
//! The renderer consumes these through their data only:
//! - RenderObject: a drawable with identity, geometry, skeleton and shadow flags
//! - Light: a light with world-space placement resolved
//! - Fog: scene fog

pub mod fog;
pub mod light;
pub mod object;

pub use fog::Fog;
pub use light::{Light, LightKind, ShadowConfig};
pub use object::{DrawMode, ObjectGeometry, ObjectKind, RenderObject, Skeleton};
