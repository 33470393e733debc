//! A context-free [`GlBackend`].
//!
//! `HeadlessGl` keeps no pixels. It hands out sequential handles, records
//! every state-changing call as a [`GlCall`], tracks live objects and answers
//! limit/extension queries from a [`HeadlessLimits`]. Shaders "compile"
//! unless their source contains the configured failure marker; active
//! uniforms and attributes are read back from the `uniform` / `attribute`
//! declarations of the sources.

use std::cell::{Cell, RefCell};
use std::num::NonZeroU32;

use rustc_hash::{FxHashMap, FxHashSet};

use super::constants as gl;
use super::{
    ActiveInfo, BufferId, GlBackend, PrecisionFormat, ProgramId, ShaderId, TextureId,
    UniformLocation,
};

/// Limits and extensions reported by a [`HeadlessGl`].
#[derive(Debug, Clone)]
pub struct HeadlessLimits {
    pub max_textures: i32,
    pub max_vertex_textures: i32,
    pub max_texture_size: i32,
    pub max_cubemap_size: i32,
    pub max_attributes: i32,
    pub max_vertex_uniforms: i32,
    pub max_varyings: i32,
    pub max_fragment_uniforms: i32,
    /// Mantissa bits reported for `HIGH_FLOAT`; `0` means unsupported.
    pub high_float_precision: i32,
    pub medium_float_precision: i32,
    pub extensions: FxHashSet<String>,
    /// Shader sources containing this text fail to compile.
    pub compile_failure_marker: Option<String>,
}

impl Default for HeadlessLimits {
    fn default() -> Self {
        Self {
            max_textures: 16,
            max_vertex_textures: 4,
            max_texture_size: 4096,
            max_cubemap_size: 4096,
            max_attributes: 16,
            max_vertex_uniforms: 256,
            max_varyings: 8,
            max_fragment_uniforms: 256,
            high_float_precision: 23,
            medium_float_precision: 10,
            extensions: [
                gl::OES_TEXTURE_FLOAT,
                gl::OES_ELEMENT_INDEX_UINT,
                gl::ANGLE_INSTANCED_ARRAYS,
                gl::EXT_FRAG_DEPTH,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            compile_failure_marker: Some("#error".to_string()),
        }
    }
}

impl HeadlessLimits {
    #[must_use]
    pub fn without_extension(mut self, name: &str) -> Self {
        self.extensions.remove(name);
        self
    }

    #[must_use]
    pub fn without_extensions(mut self) -> Self {
        self.extensions.clear();
        self
    }
}

/// A recorded state-changing call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindBuffer(u32, Option<BufferId>),
    BufferData { target: u32, len: usize, usage: u32 },
    BufferSubData { target: u32, offset: i32, len: usize },

    CreateShader(u32),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    BindAttribLocation(ProgramId, u32, String),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),

    Enable(u32),
    Disable(u32),
    BlendEquation(u32),
    BlendEquationSeparate(u32, u32),
    BlendFunc(u32, u32),
    BlendFuncSeparate(u32, u32, u32, u32),
    DepthFunc(u32),
    DepthMask(bool),
    ColorMask([bool; 4]),
    StencilFunc(u32, i32, u32),
    StencilOp(u32, u32, u32),
    StencilMask(u32),
    FrontFace(u32),
    CullFace(u32),
    LineWidth(f32),
    PolygonOffset(f32, f32),

    ActiveTexture(u32),
    BindTexture(u32, Option<TextureId>),

    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Scissor([i32; 4]),
    Viewport([i32; 4]),

    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribDivisor(u32, u32),
    VertexAttribPointer { index: u32, size: i32, data_type: u32, normalized: bool, stride: i32, offset: i32 },

    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawElements { mode: u32, count: i32, index_type: u32, offset: i32 },
    DrawArraysInstanced { mode: u32, first: i32, count: i32, instances: i32 },
    DrawElementsInstanced { mode: u32, count: i32, index_type: u32, offset: i32, instances: i32 },
}

#[derive(Debug, Default)]
struct ShaderObject {
    kind: u32,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<u32>,
    linked: bool,
    uniforms: Vec<ActiveInfo>,
    attributes: Vec<ActiveInfo>,
}

#[derive(Debug, Default)]
pub struct HeadlessGl {
    limits: HeadlessLimits,
    next_handle: Cell<u32>,
    calls: RefCell<Vec<GlCall>>,
    buffers: RefCell<FxHashSet<u32>>,
    shaders: RefCell<FxHashMap<u32, ShaderObject>>,
    programs: RefCell<FxHashMap<u32, ProgramObject>>,
}

impl HeadlessGl {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(HeadlessLimits::default())
    }

    #[must_use]
    pub fn with_limits(limits: HeadlessLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn limits(&self) -> &HeadlessLimits {
        &self.limits
    }

    /// Snapshot of the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Buffers created and not yet deleted.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.borrow().len()
    }

    /// Programs created and not yet deleted.
    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.programs.borrow().len()
    }

    /// Shaders created and not yet deleted.
    #[must_use]
    pub fn live_shaders(&self) -> usize {
        self.shaders.borrow().len()
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> NonZeroU32 {
        let next = self.next_handle.get() + 1;
        self.next_handle.set(next);
        NonZeroU32::MIN.saturating_add(next - 1)
    }
}

/// Collects `<keyword> <type> <name>;` declarations, `name[N]` as an array of N.
fn scan_declarations(source: &str, keyword: &str, into: &mut Vec<ActiveInfo>) {
    for line in source.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some(keyword) {
            continue;
        }
        let Some(declared) = words.last() else {
            continue;
        };
        let declared = declared.trim_end_matches(';');
        let (name, size) = match declared.split_once('[') {
            Some((base, rest)) => {
                let size = rest.trim_end_matches(']').parse().unwrap_or(1);
                (format!("{base}[0]"), size)
            }
            None => (declared.to_string(), 1),
        };
        if into.iter().any(|info| info.name == name) {
            continue;
        }
        into.push(ActiveInfo {
            name,
            size,
            kind: gl::FLOAT,
        });
    }
}

impl GlBackend for HeadlessGl {
    fn create_buffer(&self) -> Result<BufferId, String> {
        let id = self.allocate();
        self.buffers.borrow_mut().insert(id.get());
        self.record(GlCall::CreateBuffer(BufferId(id)));
        Ok(BufferId(id))
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.buffers.borrow_mut().remove(&buffer.0.get());
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>) {
        self.record(GlCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        self.record(GlCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]) {
        self.record(GlCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn create_shader(&self, kind: u32) -> Result<ShaderId, String> {
        let id = self.allocate();
        self.shaders.borrow_mut().insert(
            id.get(),
            ShaderObject {
                kind,
                ..ShaderObject::default()
            },
        );
        self.record(GlCall::CreateShader(kind));
        Ok(ShaderId(id))
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        if let Some(object) = self.shaders.borrow_mut().get_mut(&shader.0.get()) {
            object.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        let marker = self.limits.compile_failure_marker.as_deref();
        if let Some(object) = self.shaders.borrow_mut().get_mut(&shader.0.get()) {
            let compiled = marker.is_none_or(|m| !object.source.contains(m));
            object.compiled = compiled;
        }
        self.record(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders
            .borrow()
            .get(&shader.0.get())
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        if self.shader_compile_status(shader) {
            String::new()
        } else {
            "ERROR: 0:1: '#error' : compilation terminated".to_string()
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.shaders.borrow_mut().remove(&shader.0.get());
        self.record(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        let id = self.allocate();
        self.programs
            .borrow_mut()
            .insert(id.get(), ProgramObject::default());
        self.record(GlCall::CreateProgram(ProgramId(id)));
        Ok(ProgramId(id))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let Some(object) = self.programs.borrow_mut().get_mut(&program.0.get()) {
            object.shaders.push(shader.0.get());
        }
        self.record(GlCall::AttachShader(program, shader));
    }

    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str) {
        self.record(GlCall::BindAttribLocation(program, index, name.to_string()));
    }

    fn link_program(&self, program: ProgramId) {
        let shaders = self.shaders.borrow();
        if let Some(object) = self.programs.borrow_mut().get_mut(&program.0.get()) {
            let attached: Vec<&ShaderObject> =
                object.shaders.iter().filter_map(|s| shaders.get(s)).collect();
            object.linked = attached.len() == 2 && attached.iter().all(|s| s.compiled);
            object.uniforms.clear();
            object.attributes.clear();
            if object.linked {
                for shader in &attached {
                    scan_declarations(&shader.source, "uniform", &mut object.uniforms);
                    if shader.kind == gl::VERTEX_SHADER {
                        scan_declarations(&shader.source, "attribute", &mut object.attributes);
                    }
                }
            }
        }
        self.record(GlCall::LinkProgram(program));
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs
            .borrow()
            .get(&program.0.get())
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        if self.program_link_status(program) {
            String::new()
        } else {
            "ERROR: one or more attached shaders not successfully compiled".to_string()
        }
    }

    fn delete_program(&self, program: ProgramId) {
        self.programs.borrow_mut().remove(&program.0.get());
        self.record(GlCall::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.record(GlCall::UseProgram(program));
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveInfo> {
        self.programs
            .borrow()
            .get(&program.0.get())
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveInfo> {
        self.programs
            .borrow()
            .get(&program.0.get())
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let programs = self.programs.borrow();
        let object = programs.get(&program.0.get())?;
        object
            .uniforms
            .iter()
            .position(|u| u.name == name || u.name.strip_suffix("[0]") == Some(name))
            .map(|i| UniformLocation(i as u32))
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let programs = self.programs.borrow();
        let object = programs.get(&program.0.get())?;
        object
            .attributes
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as u32)
    }

    fn enable(&self, capability: u32) {
        self.record(GlCall::Enable(capability));
    }

    fn disable(&self, capability: u32) {
        self.record(GlCall::Disable(capability));
    }

    fn blend_equation(&self, mode: u32) {
        self.record(GlCall::BlendEquation(mode));
    }

    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32) {
        self.record(GlCall::BlendEquationSeparate(mode_rgb, mode_alpha));
    }

    fn blend_func(&self, src: u32, dst: u32) {
        self.record(GlCall::BlendFunc(src, dst));
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(GlCall::BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn depth_func(&self, func: u32) {
        self.record(GlCall::DepthFunc(func));
    }

    fn depth_mask(&self, flag: bool) {
        self.record(GlCall::DepthMask(flag));
    }

    fn color_mask(&self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.record(GlCall::ColorMask([red, green, blue, alpha]));
    }

    fn stencil_func(&self, func: u32, reference: i32, mask: u32) {
        self.record(GlCall::StencilFunc(func, reference, mask));
    }

    fn stencil_op(&self, fail: u32, zfail: u32, zpass: u32) {
        self.record(GlCall::StencilOp(fail, zfail, zpass));
    }

    fn stencil_mask(&self, mask: u32) {
        self.record(GlCall::StencilMask(mask));
    }

    fn front_face(&self, mode: u32) {
        self.record(GlCall::FrontFace(mode));
    }

    fn cull_face(&self, mode: u32) {
        self.record(GlCall::CullFace(mode));
    }

    fn line_width(&self, width: f32) {
        self.record(GlCall::LineWidth(width));
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        self.record(GlCall::PolygonOffset(factor, units));
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: u32, texture: Option<TextureId>) {
        self.record(GlCall::BindTexture(target, texture));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor([r, g, b, a]));
    }

    fn clear_depth(&self, depth: f32) {
        self.record(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&self, stencil: i32) {
        self.record(GlCall::ClearStencil(stencil));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Scissor([x, y, width, height]));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport([x, y, width, height]));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record(GlCall::VertexAttribDivisor(index, divisor));
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.record(GlCall::DrawArrays { mode, first, count });
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32) {
        self.record(GlCall::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        self.record(GlCall::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    ) {
        self.record(GlCall::DrawElementsInstanced {
            mode,
            count,
            index_type,
            offset,
            instances,
        });
    }

    fn get_parameter_i32(&self, parameter: u32) -> i32 {
        let l = &self.limits;
        match parameter {
            gl::MAX_TEXTURE_IMAGE_UNITS => l.max_textures,
            gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS => l.max_vertex_textures,
            gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS => l.max_textures + l.max_vertex_textures,
            gl::MAX_TEXTURE_SIZE => l.max_texture_size,
            gl::MAX_CUBE_MAP_TEXTURE_SIZE => l.max_cubemap_size,
            gl::MAX_VERTEX_ATTRIBS => l.max_attributes,
            gl::MAX_VERTEX_UNIFORM_VECTORS => l.max_vertex_uniforms,
            gl::MAX_VARYING_VECTORS => l.max_varyings,
            gl::MAX_FRAGMENT_UNIFORM_VECTORS => l.max_fragment_uniforms,
            _ => 0,
        }
    }

    fn shader_precision_format(&self, _shader_kind: u32, precision: u32) -> Option<PrecisionFormat> {
        let bits = match precision {
            gl::HIGH_FLOAT => self.limits.high_float_precision,
            gl::MEDIUM_FLOAT => self.limits.medium_float_precision,
            gl::LOW_FLOAT => 8,
            _ => return None,
        };
        Some(PrecisionFormat {
            range_min: 127,
            range_max: 127,
            precision: bits,
        })
    }

    fn has_extension(&self, name: &str) -> bool {
        self.limits.extensions.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential_and_tracked() {
        let gl = HeadlessGl::new();
        let a = gl.create_buffer().unwrap();
        let b = gl.create_buffer().unwrap();
        assert_ne!(a, b);
        assert_eq!(gl.live_buffers(), 2);
        gl.delete_buffer(a);
        assert_eq!(gl.live_buffers(), 1);
    }

    #[test]
    fn link_reads_declarations() {
        let gl = HeadlessGl::new();
        let vs = gl.create_shader(gl::VERTEX_SHADER).unwrap();
        gl.shader_source(vs, "attribute vec3 position;\nuniform mat4 bones[4];\nvoid main() {}");
        gl.compile_shader(vs);
        let fs = gl.create_shader(gl::FRAGMENT_SHADER).unwrap();
        gl.shader_source(fs, "uniform vec3 diffuse;\nvoid main() {}");
        gl.compile_shader(fs);
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        assert!(gl.program_link_status(program));
        assert_eq!(gl.attrib_location(program, "position"), Some(0));
        let uniforms = gl.active_uniforms(program);
        assert_eq!(uniforms[0].name, "bones[0]");
        assert_eq!(uniforms[0].size, 4);
        assert!(gl.uniform_location(program, "diffuse").is_some());
    }

    #[test]
    fn failure_marker_breaks_compile() {
        let gl = HeadlessGl::new();
        let shader = gl.create_shader(gl::FRAGMENT_SHADER).unwrap();
        gl.shader_source(shader, "#error broken");
        gl.compile_shader(shader);
        assert!(!gl.shader_compile_status(shader));
        assert!(!gl.shader_info_log(shader).is_empty());
    }
}
