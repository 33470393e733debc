//! The native GL binding seam.
//!
//! [`GlBackend`] is the GL ES 2.0 subset (plus instanced drawing) the caches
//! call into. Every method takes `&self`: a GL context is a single-threaded
//! state machine owned by the rendering thread, and the wrappers built on it
//! are shared through [`GlContext`].
//!
//! Implementations:
//! - [`headless::HeadlessGl`]: records calls, answers queries from fixed limits
//! - `glow_backend::GlowBackend` (feature `glow`): a real context through `glow`

pub mod constants;
#[cfg(all(feature = "glow", not(target_arch = "wasm32")))]
pub mod glow_backend;
pub mod headless;

use std::num::NonZeroU32;
use std::rc::Rc;

macro_rules! native_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub NonZeroU32);
        )*
    };
}

native_handle! {
    /// Native buffer object.
    BufferId,
    /// Native shader object.
    ShaderId,
    /// Native program object.
    ProgramId,
    /// Native texture object.
    TextureId,
}

/// Location of a uniform within a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// One entry of `getActiveUniform` / `getActiveAttrib`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    pub size: i32,
    pub kind: u32,
}

/// Result of `getShaderPrecisionFormat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionFormat {
    pub range_min: i32,
    pub range_max: i32,
    pub precision: i32,
}

/// Shared handle to the context.
pub type GlContext = Rc<dyn GlBackend>;

pub trait GlBackend {
    // --- Buffers ---
    fn create_buffer(&self) -> Result<BufferId, String>;
    fn delete_buffer(&self, buffer: BufferId);
    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>);
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]);

    // --- Shaders & programs ---
    fn create_shader(&self, kind: u32) -> Result<ShaderId, String>;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    fn create_program(&self) -> Result<ProgramId, String>;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveInfo>;
    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveInfo>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    // --- Fixed-function state ---
    fn enable(&self, capability: u32);
    fn disable(&self, capability: u32);
    fn blend_equation(&self, mode: u32);
    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32);
    fn blend_func(&self, src: u32, dst: u32);
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn depth_func(&self, func: u32);
    fn depth_mask(&self, flag: bool);
    fn color_mask(&self, red: bool, green: bool, blue: bool, alpha: bool);
    fn stencil_func(&self, func: u32, reference: i32, mask: u32);
    fn stencil_op(&self, fail: u32, zfail: u32, zpass: u32);
    fn stencil_mask(&self, mask: u32);
    fn front_face(&self, mode: u32);
    fn cull_face(&self, mode: u32);
    fn line_width(&self, width: f32);
    fn polygon_offset(&self, factor: f32, units: f32);

    // --- Textures ---
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: Option<TextureId>);

    // --- Framebuffer ---
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&self, depth: f32);
    fn clear_stencil(&self, stencil: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    // --- Vertex input ---
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    // --- Draw ---
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32);
    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    );

    // --- Queries ---
    fn get_parameter_i32(&self, parameter: u32) -> i32;
    fn shader_precision_format(&self, shader_kind: u32, precision: u32) -> Option<PrecisionFormat>;
    fn has_extension(&self, name: &str) -> bool;
}
