//! Program Parameter Selection
//!
//! [`get_parameters`] reduces a material, the frame's lights, the scene fog
//! and the drawn object to a flat [`ProgramParameters`] record. Two draws
//! whose records (and shader identity) match share one compiled program;
//! [`program_code`] renders that identity as the cache key.
//!
//! The key lists every parameter in the fixed order of [`PARAMETER_NAMES`].
//! Reordering it invalidates nothing at runtime but changes every key, so
//! the order is part of the contract.

use std::fmt::Write as _;

use crate::renderer::capabilities::GlCapabilities;
use crate::renderer::lights::LightsState;
use crate::renderer::settings::{RendererSettings, ShadowMapType, ToneMapping};
use crate::resources::{
    Combine, MapSlot, Material, MaterialFeatures, Precision, Shading, Side, Texture,
    TextureEncoding, TextureMapping, VertexColors,
};
use crate::scene::{Fog, RenderObject};

/// Bones available to skeletons stored in a float texture.
pub const VERTEX_TEXTURE_BONES: usize = 1024;

/// Key order of [`program_code`].
pub const PARAMETER_NAMES: [&str; 50] = [
    "precision",
    "supportsVertexTextures",
    "map",
    "mapEncoding",
    "envMap",
    "envMapMode",
    "envMapEncoding",
    "lightMap",
    "aoMap",
    "emissiveMap",
    "emissiveMapEncoding",
    "bumpMap",
    "normalMap",
    "displacementMap",
    "specularMap",
    "roughnessMap",
    "metalnessMap",
    "alphaMap",
    "combine",
    "vertexColors",
    "fog",
    "useFog",
    "fogExp",
    "flatShading",
    "sizeAttenuation",
    "logarithmicDepthBuffer",
    "skinning",
    "maxBones",
    "useVertexTexture",
    "morphTargets",
    "morphNormals",
    "maxMorphTargets",
    "maxMorphNormals",
    "premultipliedAlpha",
    "numDirLights",
    "numPointLights",
    "numSpotLights",
    "numHemiLights",
    "shadowMapEnabled",
    "pointLightShadows",
    "toneMapping",
    "physicallyCorrectLights",
    "shadowMapType",
    "alphaTest",
    "doubleSided",
    "flipSided",
    "outputEncoding",
    "envMapCubeUV",
    "gammaFactor",
    "shaderKind",
];

/// Everything a generated program prefix depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramParameters {
    /// Built-in shader library id, `None` for custom shaders.
    pub shader_id: Option<&'static str>,
    /// Custom shader compiled without any generated prefix.
    pub raw_shader: bool,
    /// Custom shader (raw or not); such sources are never loop-unrolled.
    pub custom_shader: bool,

    pub precision: Precision,
    pub supports_vertex_textures: bool,
    pub output_encoding: TextureEncoding,

    pub map: bool,
    pub map_encoding: TextureEncoding,
    pub env_map: bool,
    /// Mapping of the environment map when one is set.
    pub env_map_mode: Option<TextureMapping>,
    pub env_map_encoding: TextureEncoding,
    pub env_map_cube_uv: bool,
    pub light_map: bool,
    pub ao_map: bool,
    pub emissive_map: bool,
    pub emissive_map_encoding: TextureEncoding,
    pub bump_map: bool,
    pub normal_map: bool,
    pub displacement_map: bool,
    pub specular_map: bool,
    pub roughness_map: bool,
    pub metalness_map: bool,
    pub alpha_map: bool,

    pub combine: Option<Combine>,
    pub vertex_colors: VertexColors,

    /// The scene has fog.
    pub fog: bool,
    /// The material takes part in fog.
    pub use_fog: bool,
    pub fog_exp: bool,

    pub flat_shading: bool,
    pub size_attenuation: bool,
    pub logarithmic_depth_buffer: bool,

    pub skinning: bool,
    pub max_bones: usize,
    pub use_vertex_texture: bool,

    pub morph_targets: bool,
    pub morph_normals: bool,
    pub max_morph_targets: usize,
    pub max_morph_normals: usize,

    pub premultiplied_alpha: bool,

    pub num_dir_lights: usize,
    pub num_point_lights: usize,
    pub num_spot_lights: usize,
    pub num_hemi_lights: usize,

    pub shadow_map_enabled: bool,
    pub point_light_shadows: usize,
    pub shadow_map_type: ShadowMapType,

    pub tone_mapping: ToneMapping,
    pub physically_correct_lights: bool,
    pub gamma_factor: f32,

    pub alpha_test: f32,
    pub double_sided: bool,
    pub flip_sided: bool,
}

impl ProgramParameters {
    /// `(name, value)` pairs in [`PARAMETER_NAMES`] order.
    #[must_use]
    pub fn key_entries(&self) -> Vec<(&'static str, String)> {
        let shader_kind = match (self.shader_id, self.raw_shader) {
            (Some(id), _) => id,
            (None, true) => "raw",
            (None, false) => "custom",
        };
        let values: [String; 50] = [
            format!("{:?}", self.precision),
            self.supports_vertex_textures.to_string(),
            self.map.to_string(),
            format!("{:?}", self.map_encoding),
            self.env_map.to_string(),
            format!("{:?}", self.env_map_mode),
            format!("{:?}", self.env_map_encoding),
            self.light_map.to_string(),
            self.ao_map.to_string(),
            self.emissive_map.to_string(),
            format!("{:?}", self.emissive_map_encoding),
            self.bump_map.to_string(),
            self.normal_map.to_string(),
            self.displacement_map.to_string(),
            self.specular_map.to_string(),
            self.roughness_map.to_string(),
            self.metalness_map.to_string(),
            self.alpha_map.to_string(),
            format!("{:?}", self.combine),
            format!("{:?}", self.vertex_colors),
            self.fog.to_string(),
            self.use_fog.to_string(),
            self.fog_exp.to_string(),
            self.flat_shading.to_string(),
            self.size_attenuation.to_string(),
            self.logarithmic_depth_buffer.to_string(),
            self.skinning.to_string(),
            self.max_bones.to_string(),
            self.use_vertex_texture.to_string(),
            self.morph_targets.to_string(),
            self.morph_normals.to_string(),
            self.max_morph_targets.to_string(),
            self.max_morph_normals.to_string(),
            self.premultiplied_alpha.to_string(),
            self.num_dir_lights.to_string(),
            self.num_point_lights.to_string(),
            self.num_spot_lights.to_string(),
            self.num_hemi_lights.to_string(),
            self.shadow_map_enabled.to_string(),
            self.point_light_shadows.to_string(),
            format!("{:?}", self.tone_mapping),
            self.physically_correct_lights.to_string(),
            format!("{:?}", self.shadow_map_type),
            format!("{:?}", self.alpha_test),
            self.double_sided.to_string(),
            self.flip_sided.to_string(),
            format!("{:?}", self.output_encoding),
            self.env_map_cube_uv.to_string(),
            format!("{:?}", self.gamma_factor),
            shader_kind.to_string(),
        ];
        PARAMETER_NAMES.into_iter().zip(values).collect()
    }
}

/// Encoding a sampler of `map` decodes from.
///
/// No map reads as linear. `gamma_override` reinterprets linear data as
/// gamma-encoded, the legacy `gammaInput` / `gammaOutput` switches.
#[must_use]
pub fn encoding_from_map(map: Option<&Texture>, gamma_override: bool) -> TextureEncoding {
    let encoding = map.map_or(TextureEncoding::Linear, |texture| texture.encoding);
    if encoding == TextureEncoding::Linear && gamma_override {
        TextureEncoding::Gamma
    } else {
        encoding
    }
}

/// Bone matrices the vertex stage can hold for `object`.
#[must_use]
pub fn allocate_bones(object: &RenderObject, capabilities: &GlCapabilities) -> usize {
    let skeleton = object.kind.skeleton();

    if capabilities.float_vertex_textures && skeleton.is_some_and(|s| s.use_vertex_texture) {
        return VERTEX_TEXTURE_BONES;
    }

    // 20 vectors stay reserved for the other vertex uniforms; a matrix takes four.
    let vertex_matrices = ((capabilities.max_vertex_uniforms - 20) / 4).max(0) as usize;

    let Some(skeleton) = skeleton else {
        return vertex_matrices;
    };
    let max_bones = vertex_matrices.min(skeleton.bone_count);
    if max_bones < skeleton.bone_count {
        log::warn!(
            "Skeleton has {} bones, this GPU supports {max_bones}",
            skeleton.bone_count
        );
    }
    max_bones
}

/// Computes the program parameters of one draw.
#[must_use]
pub fn get_parameters(
    material: &Material,
    lights: &LightsState,
    fog: Option<&Fog>,
    object: &RenderObject,
    settings: &RendererSettings,
    capabilities: &GlCapabilities,
) -> ProgramParameters {
    type F = MaterialFeatures;

    let requested = material.precision.unwrap_or(settings.precision);
    let precision = capabilities.resolve_precision(requested);

    let map = material.active_map(MapSlot::Map);
    let env_map = material.active_map(MapSlot::EnvMap);
    let emissive_map = material.active_map(MapSlot::EmissiveMap);
    let has = |slot| material.active_map(slot).is_some();

    let env_map_mode = env_map.map(|texture| texture.mapping);

    ProgramParameters {
        shader_id: material.kind.shader_id(),
        raw_shader: material.kind.is_raw(),
        custom_shader: material.kind.custom_source().is_some(),

        precision,
        supports_vertex_textures: capabilities.vertex_textures,
        output_encoding: encoding_from_map(None, settings.gamma_output),

        map: map.is_some(),
        map_encoding: encoding_from_map(map, settings.gamma_input),
        env_map: env_map.is_some(),
        env_map_mode,
        env_map_encoding: encoding_from_map(env_map, settings.gamma_input),
        env_map_cube_uv: env_map_mode.is_some_and(TextureMapping::is_cube_uv),
        light_map: has(MapSlot::LightMap),
        ao_map: has(MapSlot::AoMap),
        emissive_map: emissive_map.is_some(),
        emissive_map_encoding: encoding_from_map(emissive_map, settings.gamma_input),
        bump_map: has(MapSlot::BumpMap),
        normal_map: has(MapSlot::NormalMap),
        displacement_map: has(MapSlot::DisplacementMap),
        specular_map: has(MapSlot::SpecularMap),
        roughness_map: has(MapSlot::RoughnessMap),
        metalness_map: has(MapSlot::MetalnessMap),
        alpha_map: has(MapSlot::AlphaMap),

        combine: material.supports(F::COMBINE).then_some(material.combine),
        vertex_colors: if material.supports(F::VERTEX_COLORS) {
            material.vertex_colors
        } else {
            VertexColors::None
        },

        fog: fog.is_some(),
        use_fog: material.flag(F::FOG, material.fog),
        fog_exp: fog.is_some_and(Fog::is_exp2),

        flat_shading: material.flag(F::FLAT_SHADING, material.shading == Shading::Flat),
        size_attenuation: material.flag(F::SIZE_ATTENUATION, material.size_attenuation),
        logarithmic_depth_buffer: settings.logarithmic_depth_buffer
            && capabilities.logarithmic_depth_buffer,

        skinning: material.flag(F::SKINNING, material.skinning),
        max_bones: allocate_bones(object, capabilities),
        use_vertex_texture: capabilities.float_vertex_textures
            && object.kind.skeleton().is_some_and(|s| s.use_vertex_texture),

        morph_targets: material.flag(F::MORPH_TARGETS, material.morph_targets),
        morph_normals: material.flag(F::MORPH_NORMALS, material.morph_normals),
        max_morph_targets: settings.max_morph_targets as usize,
        max_morph_normals: settings.max_morph_normals as usize,

        premultiplied_alpha: material.premultiplied_alpha,

        num_dir_lights: lights.num_dir_lights(),
        num_point_lights: lights.num_point_lights(),
        num_spot_lights: lights.num_spot_lights(),
        num_hemi_lights: lights.num_hemi_lights(),

        shadow_map_enabled: settings.shadow_map.enabled
            && object.receive_shadow
            && lights.shadows > 0,
        point_light_shadows: lights.point_shadows,
        shadow_map_type: settings.shadow_map.kind,

        tone_mapping: settings.tone_mapping,
        physically_correct_lights: settings.physically_correct_lights,
        gamma_factor: settings.gamma_factor,

        alpha_test: material.alpha_test,
        double_sided: material.side == Side::Double,
        flip_sided: material.side == Side::Back,
    }
}

/// The program cache key: shader identity, custom defines, then every
/// parameter, joined by `,`.
#[must_use]
pub fn program_code(material: &Material, parameters: &ProgramParameters) -> String {
    let mut code = String::with_capacity(1024);

    match (parameters.shader_id, material.kind.custom_source()) {
        (Some(id), _) => code.push_str(id),
        (None, Some(source)) => {
            code.push_str(&source.fragment);
            code.push(',');
            code.push_str(&source.vertex);
        }
        (None, None) => {}
    }

    material.defines.write_key(&mut code);

    for (name, value) in parameters.key_entries() {
        let _ = write!(code, ",{name},{value}");
    }

    code
}
