use std::borrow::Cow;
use std::fmt;

use rustc_hash::FxHashMap;

use super::library::ShaderLibrary;
use super::parameters::ProgramParameters;
use super::preprocess::{
    LightCounts, add_line_numbers, replace_light_counts, resolve_includes, unroll_loops,
};
use crate::errors::{LumenError, Result};
use crate::renderer::gl::{GlContext, ProgramId, ShaderId, UniformLocation, constants as gl};
use crate::resources::{Combine, Material, TextureEncoding, TextureMapping, VertexColors};

/// Logs and prefixes kept when a build produced any diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDiagnostics {
    pub runnable: bool,
    pub program_log: String,
    pub vertex_log: String,
    pub fragment_log: String,
    pub vertex_prefix: String,
    pub fragment_prefix: String,
}

/// A linked program object with its uniform and attribute locations.
///
/// Construction never fails on bad GLSL: the program is returned with
/// [`is_runnable`](Self::is_runnable) `false` and the diagnostics logged.
/// The native program is deleted on drop.
pub struct GlProgram {
    gl: GlContext,
    id: ProgramId,
    code: String,
    runnable: bool,
    diagnostics: Option<ProgramDiagnostics>,
    uniforms: FxHashMap<String, UniformLocation>,
    attributes: FxHashMap<String, u32>,
}

impl GlProgram {
    pub fn new(
        gl: &GlContext,
        library: &ShaderLibrary,
        material: &Material,
        parameters: &ProgramParameters,
        code: String,
    ) -> Result<Self> {
        let (vertex_source, fragment_source) = stage_sources(library, material, parameters)?;

        let (vertex_prefix, fragment_prefix) = if parameters.raw_shader {
            (String::new(), String::new())
        } else {
            (
                vertex_prefix(material, parameters),
                fragment_prefix(library, material, parameters)?,
            )
        };

        let vertex_glsl = vertex_prefix.clone() + &preprocess(library, &vertex_source, parameters)?;
        let fragment_glsl =
            fragment_prefix.clone() + &preprocess(library, &fragment_source, parameters)?;

        let id = gl.create_program().map_err(LumenError::Gl)?;
        let mut program = Self {
            gl: GlContext::clone(gl),
            id,
            code,
            runnable: false,
            diagnostics: None,
            uniforms: FxHashMap::default(),
            attributes: FxHashMap::default(),
        };

        let vertex = compile_stage(gl, gl::VERTEX_SHADER, &vertex_glsl)?;
        let fragment = match compile_stage(gl, gl::FRAGMENT_SHADER, &fragment_glsl) {
            Ok(shader) => shader,
            Err(err) => {
                gl.delete_shader(vertex);
                return Err(err);
            }
        };

        gl.attach_shader(id, vertex);
        gl.attach_shader(id, fragment);

        // Morphed programs displace position, keep it out of a disabled slot 0.
        if parameters.morph_targets {
            gl.bind_attrib_location(id, 0, "position");
        }

        gl.link_program(id);

        let program_log = gl.program_info_log(id);
        let vertex_log = gl.shader_info_log(vertex);
        let fragment_log = gl.shader_info_log(fragment);

        program.runnable = gl.program_link_status(id);
        if !program.runnable {
            log::error!(
                "Program {id:?} failed to link: {program_log}\n{vertex_log}\n{fragment_log}"
            );
        } else if !program_log.is_empty() {
            log::warn!("Program {id:?} info log: {program_log}");
        }

        let has_diagnostics = !program.runnable
            || !program_log.is_empty()
            || !vertex_log.is_empty()
            || !fragment_log.is_empty();
        if has_diagnostics {
            program.diagnostics = Some(ProgramDiagnostics {
                runnable: program.runnable,
                program_log,
                vertex_log,
                fragment_log,
                vertex_prefix,
                fragment_prefix,
            });
        }

        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if program.runnable {
            program.fetch_locations();
        }

        Ok(program)
    }

    fn fetch_locations(&mut self) {
        for info in self.gl.active_uniforms(self.id) {
            if let Some(location) = self.gl.uniform_location(self.id, &info.name) {
                let name = info.name.strip_suffix("[0]").unwrap_or(&info.name);
                self.uniforms.insert(name.to_string(), location);
            }
        }
        for info in self.gl.active_attributes(self.id) {
            if let Some(location) = self.gl.attrib_location(self.id, &info.name) {
                self.attributes.insert(info.name, location);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// The cache key this program was built for.
    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// `false` when compilation or linking failed.
    #[inline]
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.runnable
    }

    #[must_use]
    pub fn diagnostics(&self) -> Option<&ProgramDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// Location of an active uniform; array uniforms are keyed without `[0]`.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, UniformLocation)> {
        self.uniforms.iter().map(|(name, &loc)| (name.as_str(), loc))
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, u32)> {
        self.attributes.iter().map(|(name, &loc)| (name.as_str(), loc))
    }
}

impl Drop for GlProgram {
    fn drop(&mut self) {
        self.gl.delete_program(self.id);
    }
}

impl fmt::Debug for GlProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlProgram")
            .field("id", &self.id)
            .field("runnable", &self.runnable)
            .field("uniforms", &self.uniforms.len())
            .field("attributes", &self.attributes.len())
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Source assembly
// ----------------------------------------------------------------------------

fn stage_sources<'a>(
    library: &ShaderLibrary,
    material: &'a Material,
    parameters: &ProgramParameters,
) -> Result<(Cow<'a, str>, Cow<'a, str>)> {
    if let Some(id) = parameters.shader_id {
        let pair = library.shader(id)?;
        return Ok((pair.vertex, pair.fragment));
    }
    let source = material
        .kind
        .custom_source()
        .ok_or_else(|| LumenError::ShaderInclude {
            chunk: format!("<shader of material {}>", material.uuid()),
        })?;
    Ok((
        Cow::Borrowed(source.vertex.as_str()),
        Cow::Borrowed(source.fragment.as_str()),
    ))
}

fn preprocess(
    library: &ShaderLibrary,
    source: &str,
    parameters: &ProgramParameters,
) -> Result<String> {
    let lookup = |name: &str| library.chunk(name);
    let resolved = resolve_includes(source, &lookup)?;
    let counted = replace_light_counts(
        &resolved,
        LightCounts {
            directional: parameters.num_dir_lights,
            point: parameters.num_point_lights,
            spot: parameters.num_spot_lights,
            hemi: parameters.num_hemi_lights,
        },
    );
    if parameters.custom_shader {
        Ok(counted)
    } else {
        Ok(unroll_loops(&counted))
    }
}

fn compile_stage(gl: &GlContext, kind: u32, source: &str) -> Result<ShaderId> {
    let shader = gl.create_shader(kind).map_err(LumenError::Gl)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    let stage = if kind == gl::VERTEX_SHADER { "vertex" } else { "fragment" };
    if !gl.shader_compile_status(shader) {
        log::error!(
            "Couldn't compile {stage} shader: {}\n{}",
            gl.shader_info_log(shader),
            add_line_numbers(source)
        );
    } else {
        let info = gl.shader_info_log(shader);
        if !info.is_empty() {
            log::warn!("{stage} shader info log: {info}");
        }
    }
    Ok(shader)
}

fn env_map_type_define(mapping: TextureMapping) -> &'static str {
    match mapping {
        TextureMapping::CubeUvReflection | TextureMapping::CubeUvRefraction => {
            "ENVMAP_TYPE_CUBE_UV"
        }
        TextureMapping::EquirectangularReflection | TextureMapping::EquirectangularRefraction => {
            "ENVMAP_TYPE_EQUIREC"
        }
        TextureMapping::SphericalReflection => "ENVMAP_TYPE_SPHERE",
        TextureMapping::Uv | TextureMapping::CubeReflection | TextureMapping::CubeRefraction => {
            "ENVMAP_TYPE_CUBE"
        }
    }
}

fn env_map_mode_define(mapping: TextureMapping) -> &'static str {
    if mapping.is_refraction() {
        "ENVMAP_MODE_REFRACTION"
    } else {
        "ENVMAP_MODE_REFLECTION"
    }
}

fn env_map_blending_define(combine: Option<Combine>) -> &'static str {
    match combine {
        Some(Combine::Mix) => "ENVMAP_BLENDING_MIX",
        Some(Combine::Add) => "ENVMAP_BLENDING_ADD",
        Some(Combine::Multiply) | None => "ENVMAP_BLENDING_MULTIPLY",
    }
}

fn texel_decoding(function: &str, encoding: TextureEncoding) -> String {
    let (name, args) = encoding.glsl_components();
    format!("vec4 {function}( vec4 value ) {{ return {name}ToLinear( value{args} ); }}")
}

fn texel_encoding(function: &str, encoding: TextureEncoding) -> String {
    let (name, args) = encoding.glsl_components();
    format!("vec4 {function}( vec4 value ) {{ return LinearTo{name}( value{args} ); }}")
}

/// Pushes `line` when `condition` holds.
fn push_if(lines: &mut Vec<String>, condition: bool, line: impl Into<String>) {
    if condition {
        lines.push(line.into());
    }
}

fn gamma_factor_define(parameters: &ProgramParameters) -> String {
    let factor = if parameters.gamma_factor > 0.0 {
        parameters.gamma_factor
    } else {
        1.0
    };
    format!("#define GAMMA_FACTOR {factor:?}")
}

fn vertex_prefix(material: &Material, p: &ProgramParameters) -> String {
    let precision = p.precision.as_str();
    let mut lines = vec![
        format!("precision {precision} float;"),
        format!("precision {precision} int;"),
    ];
    lines.extend(material.defines.to_glsl_lines());

    push_if(&mut lines, p.supports_vertex_textures, "#define VERTEX_TEXTURES");
    lines.push(gamma_factor_define(p));
    lines.push(format!("#define MAX_BONES {}", p.max_bones));

    push_if(&mut lines, p.map, "#define USE_MAP");
    push_if(&mut lines, p.env_map, "#define USE_ENVMAP");
    if let Some(mapping) = p.env_map_mode {
        lines.push(format!("#define {}", env_map_mode_define(mapping)));
    }
    push_if(&mut lines, p.light_map, "#define USE_LIGHTMAP");
    push_if(&mut lines, p.ao_map, "#define USE_AOMAP");
    push_if(&mut lines, p.emissive_map, "#define USE_EMISSIVEMAP");
    push_if(&mut lines, p.bump_map, "#define USE_BUMPMAP");
    push_if(&mut lines, p.normal_map, "#define USE_NORMALMAP");
    push_if(
        &mut lines,
        p.displacement_map && p.supports_vertex_textures,
        "#define USE_DISPLACEMENTMAP",
    );
    push_if(&mut lines, p.specular_map, "#define USE_SPECULARMAP");
    push_if(&mut lines, p.roughness_map, "#define USE_ROUGHNESSMAP");
    push_if(&mut lines, p.metalness_map, "#define USE_METALNESSMAP");
    push_if(&mut lines, p.alpha_map, "#define USE_ALPHAMAP");
    push_if(&mut lines, p.vertex_colors != VertexColors::None, "#define USE_COLOR");

    push_if(&mut lines, p.flat_shading, "#define FLAT_SHADED");

    push_if(&mut lines, p.skinning, "#define USE_SKINNING");
    push_if(&mut lines, p.use_vertex_texture, "#define BONE_TEXTURE");

    push_if(&mut lines, p.morph_targets, "#define USE_MORPHTARGETS");
    push_if(
        &mut lines,
        p.morph_normals && !p.flat_shading,
        "#define USE_MORPHNORMALS",
    );
    push_if(&mut lines, p.double_sided, "#define DOUBLE_SIDED");
    push_if(&mut lines, p.flip_sided, "#define FLIP_SIDED");

    push_if(&mut lines, p.shadow_map_enabled, "#define USE_SHADOWMAP");
    if p.shadow_map_enabled {
        lines.push(format!("#define {}", p.shadow_map_type.define()));
    }
    push_if(&mut lines, p.point_light_shadows > 0, "#define POINT_LIGHT_SHADOWS");

    push_if(&mut lines, p.size_attenuation, "#define USE_SIZEATTENUATION");

    push_if(&mut lines, p.logarithmic_depth_buffer, "#define USE_LOGDEPTHBUF");
    push_if(&mut lines, p.logarithmic_depth_buffer, "#define USE_LOGDEPTHBUF_EXT");

    lines.extend(
        [
            "uniform mat4 modelMatrix;",
            "uniform mat4 modelViewMatrix;",
            "uniform mat4 projectionMatrix;",
            "uniform mat4 viewMatrix;",
            "uniform mat3 normalMatrix;",
            "uniform vec3 cameraPosition;",
            "attribute vec3 position;",
            "attribute vec3 normal;",
            "attribute vec2 uv;",
            "#ifdef USE_COLOR",
            "\tattribute vec3 color;",
            "#endif",
            "#ifdef USE_MORPHTARGETS",
            "\tattribute vec3 morphTarget0;",
            "\tattribute vec3 morphTarget1;",
            "\tattribute vec3 morphTarget2;",
            "\tattribute vec3 morphTarget3;",
            "\t#ifdef USE_MORPHNORMALS",
            "\t\tattribute vec3 morphNormal0;",
            "\t\tattribute vec3 morphNormal1;",
            "\t\tattribute vec3 morphNormal2;",
            "\t\tattribute vec3 morphNormal3;",
            "\t#else",
            "\t\tattribute vec3 morphTarget4;",
            "\t\tattribute vec3 morphTarget5;",
            "\t\tattribute vec3 morphTarget6;",
            "\t\tattribute vec3 morphTarget7;",
            "\t#endif",
            "#endif",
            "#ifdef USE_SKINNING",
            "\tattribute vec4 skinIndex;",
            "\tattribute vec4 skinWeight;",
            "#endif",
        ]
        .map(String::from),
    );

    let mut prefix = lines.join("\n");
    prefix.push_str("\n\n");
    prefix
}

fn fragment_prefix(
    library: &ShaderLibrary,
    material: &Material,
    p: &ProgramParameters,
) -> Result<String> {
    let chunk = |name: &str| {
        library.chunk(name).ok_or_else(|| LumenError::ShaderInclude {
            chunk: name.to_string(),
        })
    };

    let mut lines = Vec::new();
    push_if(
        &mut lines,
        p.bump_map || p.normal_map || p.flat_shading || p.env_map_cube_uv,
        "#extension GL_OES_standard_derivatives : enable",
    );
    push_if(
        &mut lines,
        p.logarithmic_depth_buffer,
        "#extension GL_EXT_frag_depth : enable",
    );

    let precision = p.precision.as_str();
    lines.push(format!("precision {precision} float;"));
    lines.push(format!("precision {precision} int;"));
    lines.extend(material.defines.to_glsl_lines());

    if p.alpha_test > 0.0 {
        lines.push(format!("#define ALPHATEST {:?}", p.alpha_test));
    }
    lines.push(gamma_factor_define(p));

    push_if(&mut lines, p.use_fog && p.fog, "#define USE_FOG");
    push_if(&mut lines, p.use_fog && p.fog_exp, "#define FOG_EXP2");

    push_if(&mut lines, p.map, "#define USE_MAP");
    push_if(&mut lines, p.env_map, "#define USE_ENVMAP");
    if let Some(mapping) = p.env_map_mode {
        lines.push(format!("#define {}", env_map_type_define(mapping)));
        lines.push(format!("#define {}", env_map_mode_define(mapping)));
        lines.push(format!("#define {}", env_map_blending_define(p.combine)));
    }
    push_if(&mut lines, p.light_map, "#define USE_LIGHTMAP");
    push_if(&mut lines, p.ao_map, "#define USE_AOMAP");
    push_if(&mut lines, p.emissive_map, "#define USE_EMISSIVEMAP");
    push_if(&mut lines, p.bump_map, "#define USE_BUMPMAP");
    push_if(&mut lines, p.normal_map, "#define USE_NORMALMAP");
    push_if(&mut lines, p.specular_map, "#define USE_SPECULARMAP");
    push_if(&mut lines, p.roughness_map, "#define USE_ROUGHNESSMAP");
    push_if(&mut lines, p.metalness_map, "#define USE_METALNESSMAP");
    push_if(&mut lines, p.alpha_map, "#define USE_ALPHAMAP");
    push_if(&mut lines, p.vertex_colors != VertexColors::None, "#define USE_COLOR");

    push_if(&mut lines, p.flat_shading, "#define FLAT_SHADED");

    push_if(&mut lines, p.double_sided, "#define DOUBLE_SIDED");
    push_if(&mut lines, p.flip_sided, "#define FLIP_SIDED");

    push_if(&mut lines, p.shadow_map_enabled, "#define USE_SHADOWMAP");
    if p.shadow_map_enabled {
        lines.push(format!("#define {}", p.shadow_map_type.define()));
    }
    push_if(&mut lines, p.point_light_shadows > 0, "#define POINT_LIGHT_SHADOWS");

    push_if(&mut lines, p.premultiplied_alpha, "#define PREMULTIPLIED_ALPHA");
    push_if(
        &mut lines,
        p.physically_correct_lights,
        "#define PHYSICALLY_CORRECT_LIGHTS",
    );

    push_if(&mut lines, p.logarithmic_depth_buffer, "#define USE_LOGDEPTHBUF");
    push_if(&mut lines, p.logarithmic_depth_buffer, "#define USE_LOGDEPTHBUF_EXT");

    lines.push("uniform mat4 viewMatrix;".to_string());
    lines.push("uniform vec3 cameraPosition;".to_string());

    if let Some(function) = p.tone_mapping.glsl_function() {
        lines.push("#define TONE_MAPPING".to_string());
        lines.push(chunk("tonemapping_pars_fragment")?.into_owned());
        lines.push(format!(
            "vec3 toneMapping( vec3 color ) {{ return {function}( color ); }}"
        ));
    }

    lines.push(chunk("encodings_pars_fragment")?.into_owned());
    lines.push(texel_decoding("mapTexelToLinear", p.map_encoding));
    lines.push(texel_decoding("envMapTexelToLinear", p.env_map_encoding));
    lines.push(texel_decoding("emissiveMapTexelToLinear", p.emissive_map_encoding));
    lines.push(texel_encoding("linearToOutputTexel", p.output_encoding));

    let mut prefix = lines.join("\n");
    prefix.push_str("\n\n");
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::renderer::capabilities::GlCapabilities;
    use crate::renderer::gl::headless::HeadlessGl;
    use crate::renderer::lights::LightsState;
    use crate::renderer::program::parameters::{get_parameters, program_code};
    use crate::renderer::settings::RendererSettings;
    use crate::resources::{MaterialKind, ShaderSource, Texture};
    use crate::scene::RenderObject;

    fn build(headless: &Rc<HeadlessGl>, material: &Material) -> GlProgram {
        let context: GlContext = headless.clone();
        let caps = GlCapabilities::new(&context);
        let object = RenderObject::mesh(crate::resources::BufferGeometry::new());
        let params = get_parameters(
            material,
            &LightsState::default(),
            None,
            &object,
            &RendererSettings::default(),
            &caps,
        );
        let code = program_code(material, &params);
        GlProgram::new(&context, &ShaderLibrary::new(), material, &params, code).unwrap()
    }

    fn custom(vertex: &str, fragment: &str, raw: bool) -> Material {
        let source = ShaderSource {
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
        };
        Material::new(if raw {
            MaterialKind::RawShader(source)
        } else {
            MaterialKind::Shader(source)
        })
    }

    #[test]
    fn builtin_program_links_and_caches_locations() {
        let headless = Rc::new(HeadlessGl::new());
        let program = build(&headless, &Material::phong());

        assert!(program.is_runnable());
        assert!(program.diagnostics().is_none());
        assert_eq!(program.attribute("position"), Some(0));
        assert!(program.uniform("modelViewMatrix").is_some());
        assert!(program.uniform("diffuse").is_some());
        assert_eq!(headless.live_shaders(), 0);
        assert_eq!(headless.live_programs(), 1);

        drop(program);
        assert_eq!(headless.live_programs(), 0);
    }

    #[test]
    fn map_defines_reach_both_stages() {
        let mut material = Material::basic();
        material.maps.map = Some(Texture::new().with_encoding(TextureEncoding::Srgb));
        let headless = Rc::new(HeadlessGl::new());
        let program = build(&headless, &material);
        assert!(program.is_runnable());
        assert!(program.uniform("map").is_some());
    }

    #[test]
    fn compile_failure_is_soft() {
        let material = custom("void main() {}", "#error broken\nvoid main() {}", false);
        let headless = Rc::new(HeadlessGl::new());
        let program = build(&headless, &material);

        assert!(!program.is_runnable());
        let diagnostics = program.diagnostics().unwrap();
        assert!(!diagnostics.runnable);
        assert!(!diagnostics.fragment_log.is_empty());
        assert_eq!(program.uniforms().count(), 0);
    }

    #[test]
    fn raw_shaders_get_no_prefix() {
        let material = custom(
            "attribute vec3 position;\nvoid main() {}",
            "void main() {}",
            true,
        );
        let headless = Rc::new(HeadlessGl::new());
        let program = build(&headless, &material);
        assert!(program.is_runnable());
        assert_eq!(program.attribute("position"), Some(0));
        assert!(program.uniform("modelMatrix").is_none());
    }

    #[test]
    fn custom_shaders_get_the_prefix_and_array_names() {
        let material = custom(
            "uniform float weights[4];\nvoid main() {}",
            "void main() {}",
            false,
        );
        let headless = Rc::new(HeadlessGl::new());
        let program = build(&headless, &material);
        assert!(program.uniform("modelMatrix").is_some());
        assert!(program.uniform("weights").is_some());
    }

    #[test]
    fn encoding_helpers() {
        assert_eq!(
            texel_decoding("mapTexelToLinear", TextureEncoding::Rgbm7),
            "vec4 mapTexelToLinear( vec4 value ) { return RGBMToLinear( value, 7.0 ); }"
        );
        assert_eq!(
            texel_encoding("linearToOutputTexel", TextureEncoding::Linear),
            "vec4 linearToOutputTexel( vec4 value ) { return LinearToLinear( value ); }"
        );
    }
}
