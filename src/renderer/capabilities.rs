//! Context limits and feature queries, read once at renderer creation.

use super::gl::{GlContext, constants as gl};
use crate::resources::Precision;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlCapabilities {
    /// Best float precision available to both shader stages.
    pub precision: Precision,
    /// `EXT_frag_depth` present.
    pub logarithmic_depth_buffer: bool,

    pub max_textures: i32,
    pub max_vertex_textures: i32,
    pub max_texture_size: i32,
    pub max_cubemap_size: i32,

    pub max_attributes: i32,
    pub max_vertex_uniforms: i32,
    pub max_varyings: i32,
    pub max_fragment_uniforms: i32,

    pub vertex_textures: bool,
    pub float_fragment_textures: bool,
    pub float_vertex_textures: bool,

    /// `OES_element_index_uint` present.
    pub element_index_uint: bool,
    /// `ANGLE_instanced_arrays` present.
    pub instanced_arrays: bool,
}

impl GlCapabilities {
    #[must_use]
    pub fn new(gl: &GlContext) -> Self {
        let max_vertex_textures = gl.get_parameter_i32(gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS);
        let vertex_textures = max_vertex_textures > 0;
        let float_fragment_textures = gl.has_extension(gl::OES_TEXTURE_FLOAT);

        Self {
            precision: max_precision(gl),
            logarithmic_depth_buffer: gl.has_extension(gl::EXT_FRAG_DEPTH),

            max_textures: gl.get_parameter_i32(gl::MAX_TEXTURE_IMAGE_UNITS),
            max_vertex_textures,
            max_texture_size: gl.get_parameter_i32(gl::MAX_TEXTURE_SIZE),
            max_cubemap_size: gl.get_parameter_i32(gl::MAX_CUBE_MAP_TEXTURE_SIZE),

            max_attributes: gl.get_parameter_i32(gl::MAX_VERTEX_ATTRIBS),
            max_vertex_uniforms: gl.get_parameter_i32(gl::MAX_VERTEX_UNIFORM_VECTORS),
            max_varyings: gl.get_parameter_i32(gl::MAX_VARYING_VECTORS),
            max_fragment_uniforms: gl.get_parameter_i32(gl::MAX_FRAGMENT_UNIFORM_VECTORS),

            vertex_textures,
            float_fragment_textures,
            float_vertex_textures: vertex_textures && float_fragment_textures,

            element_index_uint: gl.has_extension(gl::OES_ELEMENT_INDEX_UINT),
            instanced_arrays: gl.has_extension(gl::ANGLE_INSTANCED_ARRAYS),
        }
    }

    /// `requested`, lowered to the best supported precision.
    #[must_use]
    pub fn resolve_precision(&self, requested: Precision) -> Precision {
        let resolved = requested.min(self.precision);
        if resolved != requested {
            log::warn!(
                "{} not supported, using {} instead",
                requested.as_str(),
                resolved.as_str()
            );
        }
        resolved
    }

    /// Attribute slots usable by the state cache, never fewer than one.
    #[must_use]
    pub fn attribute_slots(&self) -> usize {
        self.max_attributes.max(1) as usize
    }
}

fn max_precision(gl: &GlContext) -> Precision {
    let supported = |precision| {
        [gl::VERTEX_SHADER, gl::FRAGMENT_SHADER].into_iter().all(|stage| {
            gl.shader_precision_format(stage, precision)
                .is_some_and(|format| format.precision > 0)
        })
    };
    if supported(gl::HIGH_FLOAT) {
        Precision::High
    } else if supported(gl::MEDIUM_FLOAT) {
        Precision::Medium
    } else {
        Precision::Low
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::renderer::gl::headless::{HeadlessGl, HeadlessLimits};

    fn capabilities(limits: HeadlessLimits) -> GlCapabilities {
        let context: GlContext = Rc::new(HeadlessGl::with_limits(limits));
        GlCapabilities::new(&context)
    }

    #[test]
    fn reads_limits_and_extensions() {
        let caps = capabilities(HeadlessLimits::default());
        assert_eq!(caps.max_vertex_uniforms, 256);
        assert!(caps.vertex_textures);
        assert!(caps.float_vertex_textures);
        assert!(caps.element_index_uint);
        assert_eq!(caps.precision, Precision::High);
    }

    #[test]
    fn precision_falls_back_to_medium() {
        let caps = capabilities(HeadlessLimits {
            high_float_precision: 0,
            ..HeadlessLimits::default()
        });
        assert_eq!(caps.precision, Precision::Medium);
        assert_eq!(caps.resolve_precision(Precision::High), Precision::Medium);
        assert_eq!(caps.resolve_precision(Precision::Low), Precision::Low);
    }

    #[test]
    fn no_vertex_textures_without_units() {
        let caps = capabilities(HeadlessLimits {
            max_vertex_textures: 0,
            ..HeadlessLimits::default()
        });
        assert!(!caps.vertex_textures);
        assert!(!caps.float_vertex_textures);
    }
}
