//! Core resource definitions, independent of the GPU:
//! - Attribute family: typed vertex/index storage with change versions
//! - BufferGeometry: flat, GPU-ready geometry
//! - Geometry / DirectGeometry: legacy face-list model and its expansion
//! - Material / Texture: descriptors consumed by program selection
//! - ShaderDefines: custom `#define` sets

pub mod attribute;
pub mod bounds;
pub mod buffer_geometry;
pub mod direct_geometry;
pub mod geometry;
pub mod material;
pub mod shader_defines;
pub mod texture;
pub mod version_tracker;

pub use attribute::{
    Attribute, AttributeArray, AttributeData, BufferAttribute, InstancedBufferAttribute,
    InterleavedBuffer, InterleavedBufferAttribute, SharedInterleavedBuffer, UpdateRange,
};
pub use bounds::{BoundingBox, BoundingSphere};
pub use buffer_geometry::{BufferGeometry, DrawRange, Group, MAX_INDEX};
pub use direct_geometry::DirectGeometry;
pub use geometry::{Face3, Geometry, MorphNormals, MorphTarget};
pub use material::{
    BlendEquation, BlendFactor, BlendSettings, Blending, Combine, DepthFunc, MapSlot, Material,
    MaterialFeatures, MaterialKind, MaterialMaps, Precision, Shading, ShaderSource, Side,
    VertexColors,
};
pub use shader_defines::ShaderDefines;
pub use texture::{Texture, TextureEncoding, TextureMapping};
pub use version_tracker::ChangeTracker;
