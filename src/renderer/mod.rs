//! The GL renderer core.
//!
//! [`GlRenderer`] ties the caches together for one draw:
//!
//! ```text
//! RenderObject + Material
//!   -> GlObjects      (flat geometry, attribute buffers up to date)
//!   -> GlPrograms     (parameters -> program code -> shared GlProgram)
//!   -> GlState        (material state, program, vertex attributes)
//!   -> BufferRenderer (drawArrays / drawElements, RenderInfo)
//! ```
//!
//! Scene traversal, sorting and uniform upload live outside this crate; the
//! renderer exposes the program it bound so callers can set uniforms on it.

pub mod buffer;
pub mod buffer_renderer;
pub mod capabilities;
pub mod geometries;
pub mod gl;
pub mod info;
pub mod lights;
pub mod objects;
pub mod program;
pub mod properties;
pub mod settings;
pub mod state;

pub use buffer::GpuBuffer;
pub use buffer_renderer::{BufferRenderer, GlBufferRenderer, GlIndexedBufferRenderer};
pub use capabilities::GlCapabilities;
pub use geometries::GlGeometries;
pub use gl::{GlBackend, GlContext};
pub use info::{MemoryStats, RenderInfo, RenderStats};
pub use lights::{GlLights, LightUniforms, LightsState};
pub use objects::GlObjects;
pub use program::{GlProgram, GlPrograms, ProgramHandle, ProgramParameters};
pub use properties::GlProperties;
pub use settings::{RendererSettings, ShadowMapSettings, ShadowMapType, ToneMapping};
pub use state::{CullFace, GlState};

use glam::Mat4;
use uuid::Uuid;

use self::gl::constants as glc;
use crate::errors::{LumenError, Result};
use crate::resources::{Attribute, BufferAttribute, BufferGeometry, ChangeTracker, Group, Material};
use crate::scene::{DrawMode, Fog, Light, ObjectKind, RenderObject};

/// Program selection remembered per material.
#[derive(Debug, Clone, Copy)]
struct MaterialProgram {
    handle: ProgramHandle,
    material_version: u64,
    settings_version: u64,
    lights_hash: u64,
    /// `None` without fog, else whether the fog is exponential.
    fog: Option<bool>,
}

/// What a draw needs from an index attribute.
#[derive(Debug, Clone, Copy)]
struct IndexSource {
    data_id: Uuid,
    count: usize,
    wide: bool,
}

impl IndexSource {
    fn of(index: &BufferAttribute) -> Self {
        Self {
            data_id: index.data().id(),
            count: index.count(),
            wide: index.array().is_u32(),
        }
    }
}

pub struct GlRenderer {
    gl: GlContext,
    settings: RendererSettings,
    /// Moves on every `settings_mut`, invalidating remembered selections.
    settings_version: ChangeTracker,
    capabilities: GlCapabilities,

    state: GlState,
    objects: GlObjects,
    lights: GlLights,
    programs: GlPrograms,
    material_programs: GlProperties<MaterialProgram>,

    buffer_renderer: GlBufferRenderer,
    indexed_renderer: GlIndexedBufferRenderer,

    info: RenderInfo,
    context_lost: bool,
}

impl GlRenderer {
    /// Queries the context once and puts it into the default state.
    #[must_use]
    pub fn new(gl: GlContext, settings: RendererSettings) -> Self {
        let capabilities = GlCapabilities::new(&gl);
        log::info!(
            "GL renderer: precision {}, {} attributes, {} vertex uniforms, uint indices {}, instancing {}",
            capabilities.precision.as_str(),
            capabilities.max_attributes,
            capabilities.max_vertex_uniforms,
            capabilities.element_index_uint,
            capabilities.instanced_arrays
        );

        let mut state = GlState::new(GlContext::clone(&gl), &capabilities);
        state.init();

        Self {
            objects: GlObjects::new(GlContext::clone(&gl), capabilities.element_index_uint),
            programs: GlPrograms::new(GlContext::clone(&gl), capabilities.clone()),
            buffer_renderer: GlBufferRenderer::new(
                GlContext::clone(&gl),
                capabilities.instanced_arrays,
            ),
            indexed_renderer: GlIndexedBufferRenderer::new(
                GlContext::clone(&gl),
                capabilities.element_index_uint,
                capabilities.instanced_arrays,
            ),
            lights: GlLights::new(),
            material_programs: GlProperties::new(),
            info: RenderInfo::default(),
            context_lost: false,
            state,
            settings,
            settings_version: ChangeTracker::new(),
            capabilities,
            gl,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Settings changes apply from the next render: every material selects
    /// its program again.
    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        self.settings_version.changed();
        &mut self.settings
    }

    #[must_use]
    pub fn capabilities(&self) -> &GlCapabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn context(&self) -> &GlContext {
        &self.gl
    }

    pub fn state_mut(&mut self) -> &mut GlState {
        &mut self.state
    }

    #[must_use]
    pub fn objects(&self) -> &GlObjects {
        &self.objects
    }

    #[must_use]
    pub fn programs(&self) -> &GlPrograms {
        &self.programs
    }

    /// Access to the shader library, for registering chunks.
    pub fn programs_mut(&mut self) -> &mut GlPrograms {
        &mut self.programs
    }

    #[must_use]
    pub fn lights(&self) -> &LightsState {
        self.lights.state()
    }

    /// Gathers this frame's lights; changed counts re-select programs.
    pub fn setup_lights(&mut self, lights: &[Light], view_matrix: &Mat4) -> &LightsState {
        self.lights.setup(lights, view_matrix)
    }

    /// Statistics, with the memory section refreshed.
    #[must_use]
    pub fn info(&self) -> RenderInfo {
        let mut info = self.info;
        info.memory = MemoryStats {
            geometries: self.objects.geometries().count(),
            buffers: self.objects.buffer_count(),
            programs: self.programs.len(),
        };
        info
    }

    /// Call at the start of each frame.
    pub fn reset_info(&mut self) {
        self.info.reset();
    }

    #[must_use]
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// The program that [`render_item`](Self::render_item) selected for
    /// `material`, if any.
    #[must_use]
    pub fn material_program(&self, material: &Material) -> Option<&GlProgram> {
        let cached = self.material_programs.get(&material.uuid())?;
        self.programs.get(cached.handle)
    }

    /// Draws `object` with `material`, restricted to `group` when given.
    ///
    /// A program that failed to build skips the draw; malformed geometry is
    /// an error.
    pub fn render_item(
        &mut self,
        object: &RenderObject,
        material: &Material,
        fog: Option<&Fog>,
        group: Option<&Group>,
    ) -> Result<()> {
        if self.context_lost {
            return Err(LumenError::ContextLost);
        }

        let handle = self.select_program(material, object, fog)?;
        let Some(program) = self.programs.get(handle) else {
            return Err(LumenError::Gl(format!("program {handle:?} vanished from the cache")));
        };
        if !program.is_runnable() {
            log::debug!("Skipping draw of {}: program is not runnable", object.uuid());
            return Ok(());
        }

        self.state.set_material(material);
        self.state.use_program(Some(program.id()));

        let geometry = self.objects.update(object)?;
        let geometry = geometry.borrow();
        let position_count = geometry
            .attribute("position")
            .map(Attribute::count)
            .ok_or_else(|| {
                LumenError::InvalidGeometry(format!(
                    "geometry {} has no position attribute",
                    geometry.uuid()
                ))
            })?;

        let (index, range_factor) = if material.wireframe {
            let wireframe = self.objects.wireframe_attribute(&geometry)?;
            (Some(IndexSource::of(wireframe)), 2)
        } else {
            (geometry.index().map(IndexSource::of), 1)
        };

        // Reborrow: wireframe_attribute needed the objects cache mutably.
        let Some(program) = self.programs.get(handle) else {
            return Err(LumenError::Gl(format!("program {handle:?} vanished from the cache")));
        };
        bind_attributes(&self.gl, &mut self.state, &self.objects, program, &geometry)?;

        let data_count = index.map_or(position_count, |index| index.count);
        let Some((start, count)) = draw_span(&geometry, group, data_count, range_factor) else {
            return Ok(());
        };

        let mode = if material.wireframe {
            self.state.set_line_width(material.wireframe_linewidth);
            glc::LINES
        } else {
            self.primitive_mode(&object.kind, material)
        };

        let renderer: &mut dyn BufferRenderer = if let Some(index) = index {
            let buffer = self.objects.buffer_id(&index.data_id).ok_or_else(|| {
                LumenError::InvalidGeometry(format!("index of {} was never uploaded", geometry.uuid()))
            })?;
            self.gl.bind_buffer(glc::ELEMENT_ARRAY_BUFFER, Some(buffer));
            self.indexed_renderer.set_wide_indices(index.wide);
            &mut self.indexed_renderer
        } else {
            &mut self.buffer_renderer
        };
        renderer.set_mode(mode);

        match geometry.max_instanced_count {
            Some(instances) => renderer.render_instances(&mut self.info, start, count, instances),
            None => renderer.render(&mut self.info, start, count),
        }
        Ok(())
    }

    fn primitive_mode(&mut self, kind: &ObjectKind, material: &Material) -> u32 {
        match kind {
            ObjectKind::Mesh { draw_mode } | ObjectKind::SkinnedMesh { draw_mode, .. } => {
                match draw_mode {
                    DrawMode::Triangles => glc::TRIANGLES,
                    DrawMode::TriangleStrip => glc::TRIANGLE_STRIP,
                    DrawMode::TriangleFan => glc::TRIANGLE_FAN,
                }
            }
            ObjectKind::Line | ObjectKind::LineSegments | ObjectKind::LineLoop => {
                self.state.set_line_width(material.linewidth);
                match kind {
                    ObjectKind::LineSegments => glc::LINES,
                    ObjectKind::LineLoop => glc::LINE_LOOP,
                    _ => glc::LINE_STRIP,
                }
            }
            ObjectKind::Points => glc::POINTS,
        }
    }

    /// Reuses the material's program until its version, the settings, the light
    /// counts or the fog kind change; then acquires by program code and releases
    /// the old one.
    fn select_program(
        &mut self,
        material: &Material,
        object: &RenderObject,
        fog: Option<&Fog>,
    ) -> Result<ProgramHandle> {
        let lights = self.lights.state();
        let fog_kind = fog.map(Fog::is_exp2);
        let uuid = material.uuid();

        if let Some(cached) = self.material_programs.get(&uuid)
            && cached.material_version == material.version()
            && cached.settings_version == self.settings_version.version()
            && cached.lights_hash == lights.hash
            && cached.fog == fog_kind
        {
            return Ok(cached.handle);
        }

        let parameters = self
            .programs
            .get_parameters(material, lights, fog, object, &self.settings);
        let code = self.programs.program_code(material, &parameters);
        let lights_hash = lights.hash;

        let previous = self.material_programs.get(&uuid).map(|c| c.handle);
        if let Some(previous) = previous
            && self.programs.get(previous).is_some_and(|p| p.code() == code)
        {
            self.remember(material, previous, lights_hash, fog_kind);
            return Ok(previous);
        }

        let handle = self.programs.acquire(material, &parameters, code)?;
        if let Some(previous) = previous {
            self.programs.release(previous);
        }
        self.remember(material, handle, lights_hash, fog_kind);
        Ok(handle)
    }

    fn remember(&mut self, material: &Material, handle: ProgramHandle, lights_hash: u64, fog: Option<bool>) {
        let selection = MaterialProgram {
            handle,
            material_version: material.version(),
            settings_version: self.settings_version.version(),
            lights_hash,
            fog,
        };
        *self
            .material_programs
            .get_or_insert_with(material.uuid(), || selection) = selection;
    }

    /// Drops the material's hold on its program; the program is destroyed
    /// when no other material shares it.
    pub fn release_material(&mut self, material: &Uuid) {
        if let Some(cached) = self.material_programs.remove(material)
            && self.programs.release(cached.handle)
        {
            log::debug!("Released last use of program {:?}", cached.handle);
        }
    }

    /// Frees the GPU buffers of a geometry that will not be drawn again.
    pub fn dispose_geometry(&mut self, geometry: &Uuid) {
        self.objects.dispose_geometry(geometry);
    }

    /// Every native handle is invalid from now on. Drawing fails with
    /// [`LumenError::ContextLost`] until [`context_restored`](Self::context_restored).
    pub fn context_lost(&mut self) {
        log::warn!("GL context lost");
        self.context_lost = true;
        self.material_programs.clear();
        self.programs.clear();
        self.objects.clear();
        self.lights.clear();
        self.state.reset();
    }

    /// Re-applies the default state; caches refill lazily on the next draws.
    pub fn context_restored(&mut self) {
        log::info!("GL context restored");
        self.context_lost = false;
        self.state.reset();
        self.state.init();
    }
}

/// Points every attribute the program reads at its buffer.
fn bind_attributes(
    gl: &GlContext,
    state: &mut GlState,
    objects: &GlObjects,
    program: &GlProgram,
    geometry: &BufferGeometry,
) -> Result<()> {
    state.init_attributes();

    for (name, location) in program.attributes() {
        let bound = match morph_slot(name) {
            Some((base, slot)) => geometry
                .morph_attributes(base)
                .get(slot)
                .map(|target| (target.data().id(), target.item_size(), target.normalized, 0, 0, 0)),
            None => geometry.attribute(name).map(|attribute| {
                let (stride, offset) = attribute.byte_layout();
                (
                    attribute.data().id(),
                    attribute.item_size(),
                    attribute.normalized(),
                    stride,
                    offset,
                    attribute.divisor(),
                )
            }),
        };

        let Some((data_id, item_size, normalized, stride, offset, divisor)) = bound else {
            continue;
        };
        let Some(buffer) = objects.attribute_buffer(&data_id) else {
            return Err(LumenError::InvalidGeometry(format!(
                "attribute {name} of {} was never uploaded",
                geometry.uuid()
            )));
        };

        if divisor > 0 {
            state.enable_attribute_and_divisor(location, divisor);
        } else {
            state.enable_attribute(location);
        }
        gl.bind_buffer(glc::ARRAY_BUFFER, Some(buffer.buffer.id()));
        gl.vertex_attrib_pointer(
            location,
            item_size as i32,
            buffer.data_type,
            normalized,
            stride as i32,
            offset as i32,
        );
    }

    state.disable_unused_attributes();
    Ok(())
}

/// `morphTarget3` -> `("position", 3)`, `morphNormal1` -> `("normal", 1)`.
fn morph_slot(name: &str) -> Option<(&'static str, usize)> {
    if let Some(slot) = name.strip_prefix("morphTarget") {
        return slot.parse().ok().map(|slot| ("position", slot));
    }
    name.strip_prefix("morphNormal")
        .and_then(|slot| slot.parse().ok())
        .map(|slot| ("normal", slot))
}

/// Element span to draw: the draw range intersected with `group` and the
/// available data, scaled by `range_factor` for wireframe indices.
fn draw_span(
    geometry: &BufferGeometry,
    group: Option<&Group>,
    data_count: usize,
    range_factor: usize,
) -> Option<(usize, usize)> {
    let range = geometry.draw_range();
    let mut start = range.start * range_factor;
    let mut end = range.start.saturating_add(range.count).saturating_mul(range_factor);
    if let Some(group) = group {
        start = start.max(group.start * range_factor);
        end = end.min((group.start + group.count).saturating_mul(range_factor));
    }
    end = end.min(data_count);
    (end > start).then(|| (start, end - start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::BufferAttribute;

    fn triangles(vertices: usize) -> BufferGeometry {
        let mut geometry = BufferGeometry::new();
        geometry.set_attribute("position", BufferAttribute::zeroed_f32(vertices, 3));
        geometry
    }

    #[test]
    fn span_defaults_to_all_data() {
        let geometry = triangles(9);
        assert_eq!(draw_span(&geometry, None, 9, 1), Some((0, 9)));
    }

    #[test]
    fn span_intersects_range_and_group() {
        let mut geometry = triangles(12);
        geometry.set_draw_range(3, 6);
        let group = Group {
            start: 6,
            count: 6,
            material_index: 0,
        };
        assert_eq!(draw_span(&geometry, Some(&group), 12, 1), Some((6, 3)));
        geometry.set_draw_range(0, 3);
        assert_eq!(draw_span(&geometry, Some(&group), 12, 1), None);
    }

    #[test]
    fn wireframe_span_doubles() {
        let mut geometry = triangles(6);
        geometry.set_draw_range(0, 3);
        assert_eq!(draw_span(&geometry, None, 24, 2), Some((0, 6)));
    }

    #[test]
    fn morph_names() {
        assert_eq!(morph_slot("morphTarget3"), Some(("position", 3)));
        assert_eq!(morph_slot("morphNormal1"), Some(("normal", 1)));
        assert_eq!(morph_slot("position"), None);
    }
}
