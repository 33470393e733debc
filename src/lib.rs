//! GPU resource, state and shader-program management for a three.js style
//! GL ES 2.0 renderer.
//!
//! - [`resources`]: attribute buffers, buffer and legacy geometry, material and texture descriptors
//! - [`scene`]: the render objects, lights and fog the renderer consumes
//! - [`renderer`]: GPU caches, the shader permutation pipeline, the state cache and draw calls

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{LumenError, Result};
pub use renderer::gl::headless::HeadlessGl;
pub use renderer::{GlContext, GlRenderer, RenderInfo, RendererSettings};
pub use resources::{
    Attribute, BufferAttribute, BufferGeometry, Geometry, InterleavedBuffer, Material,
    MaterialKind, ShaderDefines, Texture,
};
pub use scene::{Fog, Light, RenderObject};
