//! Material descriptors.
//!
//! One [`Material`] struct carries every pipeline-relevant setting; the
//! [`MaterialKind`] tag selects the built-in shader and decides, through
//! [`MaterialKind::features`], which of those settings the shader honours.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resources::shader_defines::ShaderDefines;
use crate::resources::texture::Texture;
use crate::resources::version_tracker::ChangeTracker;

bitflags! {
    /// Settings a material kind's shader can make use of.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFeatures: u32 {
        const MAP              = 1 << 0;
        const ENV_MAP          = 1 << 1;
        const LIGHT_MAP        = 1 << 2;
        const AO_MAP           = 1 << 3;
        const EMISSIVE_MAP     = 1 << 4;
        const BUMP_MAP         = 1 << 5;
        const NORMAL_MAP       = 1 << 6;
        const DISPLACEMENT_MAP = 1 << 7;
        const SPECULAR_MAP     = 1 << 8;
        const ROUGHNESS_MAP    = 1 << 9;
        const METALNESS_MAP    = 1 << 10;
        const ALPHA_MAP        = 1 << 11;
        const SKINNING         = 1 << 12;
        const MORPH_TARGETS    = 1 << 13;
        const MORPH_NORMALS    = 1 << 14;
        const VERTEX_COLORS    = 1 << 15;
        const FOG              = 1 << 16;
        const LIGHTS           = 1 << 17;
        const SIZE_ATTENUATION = 1 << 18;
        const WIREFRAME        = 1 << 19;
        const FLAT_SHADING     = 1 << 20;
        const COMBINE          = 1 << 21;
    }
}

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    #[serde(rename = "lowp")]
    Low,
    #[serde(rename = "mediump")]
    Medium,
    #[default]
    #[serde(rename = "highp")]
    High,
}

impl Precision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "lowp",
            Self::Medium => "mediump",
            Self::High => "highp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shading {
    Flat,
    #[default]
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexColors {
    #[default]
    None,
    Face,
    Vertex,
}

/// How the environment map combines with the surface color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Combine {
    #[default]
    Multiply,
    Mix,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Blending {
    None,
    #[default]
    Normal,
    Additive,
    Subtractive,
    Multiply,
    /// Uses the material's explicit equation and factors.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    DstColor,
    OneMinusDstColor,
    SrcAlphaSaturate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunc {
    Never,
    Always,
    Less,
    #[default]
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
}

// ============================================================================
// Kinds
// ============================================================================

/// User-provided GLSL for custom shader materials.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialKind {
    Basic,
    Lambert,
    Phong,
    Standard,
    Points,
    LineBasic,
    LineDashed,
    Depth,
    Normal,
    /// Custom source, receives the generated `#define` prefix.
    Shader(ShaderSource),
    /// Custom source compiled exactly as given.
    RawShader(ShaderSource),
}

impl MaterialKind {
    /// Built-in shader library id; `None` for custom shaders.
    #[must_use]
    pub fn shader_id(&self) -> Option<&'static str> {
        match self {
            Self::Basic | Self::LineBasic => Some("basic"),
            Self::Lambert => Some("lambert"),
            Self::Phong => Some("phong"),
            Self::Standard => Some("standard"),
            Self::Points => Some("points"),
            Self::LineDashed => Some("dashed"),
            Self::Depth => Some("depth"),
            Self::Normal => Some("normal"),
            Self::Shader(_) | Self::RawShader(_) => None,
        }
    }

    #[must_use]
    pub fn custom_source(&self) -> Option<&ShaderSource> {
        match self {
            Self::Shader(source) | Self::RawShader(source) => Some(source),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::RawShader(_))
    }

    /// The settings this kind's shader responds to.
    #[must_use]
    pub fn features(&self) -> MaterialFeatures {
        type F = MaterialFeatures;
        let animated = F::SKINNING | F::MORPH_TARGETS;
        match self {
            Self::Basic => {
                F::MAP | F::AO_MAP | F::LIGHT_MAP | F::SPECULAR_MAP | F::ALPHA_MAP | F::ENV_MAP
                    | F::VERTEX_COLORS | F::FOG | F::WIREFRAME | F::COMBINE | animated
            }
            Self::Lambert => {
                F::MAP | F::LIGHT_MAP | F::AO_MAP | F::EMISSIVE_MAP | F::SPECULAR_MAP | F::ALPHA_MAP
                    | F::ENV_MAP | F::VERTEX_COLORS | F::FOG | F::LIGHTS | F::WIREFRAME | F::COMBINE
                    | animated | F::MORPH_NORMALS
            }
            Self::Phong => {
                F::MAP | F::LIGHT_MAP | F::AO_MAP | F::EMISSIVE_MAP | F::BUMP_MAP | F::NORMAL_MAP
                    | F::DISPLACEMENT_MAP | F::SPECULAR_MAP | F::ALPHA_MAP | F::ENV_MAP
                    | F::VERTEX_COLORS | F::FOG | F::LIGHTS | F::WIREFRAME | F::FLAT_SHADING
                    | F::COMBINE | animated | F::MORPH_NORMALS
            }
            Self::Standard => {
                F::MAP | F::LIGHT_MAP | F::AO_MAP | F::EMISSIVE_MAP | F::BUMP_MAP | F::NORMAL_MAP
                    | F::DISPLACEMENT_MAP | F::ROUGHNESS_MAP | F::METALNESS_MAP | F::ALPHA_MAP
                    | F::ENV_MAP | F::VERTEX_COLORS | F::FOG | F::LIGHTS | F::WIREFRAME
                    | F::FLAT_SHADING | animated | F::MORPH_NORMALS
            }
            Self::Points => F::MAP | F::VERTEX_COLORS | F::FOG | F::SIZE_ATTENUATION,
            Self::LineBasic | Self::LineDashed => F::VERTEX_COLORS | F::FOG,
            Self::Depth => F::MORPH_TARGETS | F::WIREFRAME,
            Self::Normal => F::MORPH_TARGETS | F::WIREFRAME | F::FLAT_SHADING,
            Self::Shader(_) | Self::RawShader(_) => {
                animated | F::MORPH_NORMALS | F::VERTEX_COLORS | F::FOG | F::LIGHTS | F::WIREFRAME
                    | F::FLAT_SHADING
            }
        }
    }
}

// ============================================================================
// Maps
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapSlot {
    Map,
    EnvMap,
    LightMap,
    AoMap,
    EmissiveMap,
    BumpMap,
    NormalMap,
    DisplacementMap,
    SpecularMap,
    RoughnessMap,
    MetalnessMap,
    AlphaMap,
}

impl MapSlot {
    #[must_use]
    pub fn feature(self) -> MaterialFeatures {
        match self {
            Self::Map => MaterialFeatures::MAP,
            Self::EnvMap => MaterialFeatures::ENV_MAP,
            Self::LightMap => MaterialFeatures::LIGHT_MAP,
            Self::AoMap => MaterialFeatures::AO_MAP,
            Self::EmissiveMap => MaterialFeatures::EMISSIVE_MAP,
            Self::BumpMap => MaterialFeatures::BUMP_MAP,
            Self::NormalMap => MaterialFeatures::NORMAL_MAP,
            Self::DisplacementMap => MaterialFeatures::DISPLACEMENT_MAP,
            Self::SpecularMap => MaterialFeatures::SPECULAR_MAP,
            Self::RoughnessMap => MaterialFeatures::ROUGHNESS_MAP,
            Self::MetalnessMap => MaterialFeatures::METALNESS_MAP,
            Self::AlphaMap => MaterialFeatures::ALPHA_MAP,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaterialMaps {
    pub map: Option<Texture>,
    pub env_map: Option<Texture>,
    pub light_map: Option<Texture>,
    pub ao_map: Option<Texture>,
    pub emissive_map: Option<Texture>,
    pub bump_map: Option<Texture>,
    pub normal_map: Option<Texture>,
    pub displacement_map: Option<Texture>,
    pub specular_map: Option<Texture>,
    pub roughness_map: Option<Texture>,
    pub metalness_map: Option<Texture>,
    pub alpha_map: Option<Texture>,
}

impl MaterialMaps {
    #[must_use]
    pub fn get(&self, slot: MapSlot) -> Option<&Texture> {
        match slot {
            MapSlot::Map => self.map.as_ref(),
            MapSlot::EnvMap => self.env_map.as_ref(),
            MapSlot::LightMap => self.light_map.as_ref(),
            MapSlot::AoMap => self.ao_map.as_ref(),
            MapSlot::EmissiveMap => self.emissive_map.as_ref(),
            MapSlot::BumpMap => self.bump_map.as_ref(),
            MapSlot::NormalMap => self.normal_map.as_ref(),
            MapSlot::DisplacementMap => self.displacement_map.as_ref(),
            MapSlot::SpecularMap => self.specular_map.as_ref(),
            MapSlot::RoughnessMap => self.roughness_map.as_ref(),
            MapSlot::MetalnessMap => self.metalness_map.as_ref(),
            MapSlot::AlphaMap => self.alpha_map.as_ref(),
        }
    }
}

// ============================================================================
// Material
// ============================================================================

/// Explicit blend factors for [`Blending::Custom`]. Alpha values default to
/// the color ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendSettings {
    pub equation: BlendEquation,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub equation_alpha: Option<BlendEquation>,
    pub src_alpha: Option<BlendFactor>,
    pub dst_alpha: Option<BlendFactor>,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            equation: BlendEquation::Add,
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::OneMinusSrcAlpha,
            equation_alpha: None,
            src_alpha: None,
            dst_alpha: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    uuid: Uuid,
    pub name: String,
    pub kind: MaterialKind,
    pub maps: MaterialMaps,
    pub defines: ShaderDefines,

    pub combine: Combine,
    pub vertex_colors: VertexColors,
    pub fog: bool,
    pub skinning: bool,
    pub morph_targets: bool,
    pub morph_normals: bool,
    pub shading: Shading,
    pub size_attenuation: bool,
    pub wireframe: bool,
    pub wireframe_linewidth: f32,
    pub linewidth: f32,
    pub precision: Option<Precision>,

    pub side: Side,
    pub transparent: bool,
    pub blending: Blending,
    pub blend: BlendSettings,
    pub premultiplied_alpha: bool,
    /// Fragments with alpha below this are discarded; `0` disables the test.
    pub alpha_test: f32,

    pub depth_func: DepthFunc,
    pub depth_test: bool,
    pub depth_write: bool,
    pub color_write: bool,

    pub polygon_offset: bool,
    pub polygon_offset_factor: f32,
    pub polygon_offset_units: f32,

    tracker: ChangeTracker,
}

impl Material {
    #[must_use]
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: String::new(),
            kind,
            maps: MaterialMaps::default(),
            defines: ShaderDefines::new(),
            combine: Combine::Multiply,
            vertex_colors: VertexColors::None,
            fog: true,
            skinning: false,
            morph_targets: false,
            morph_normals: false,
            shading: Shading::Smooth,
            size_attenuation: true,
            wireframe: false,
            wireframe_linewidth: 1.0,
            linewidth: 1.0,
            precision: None,
            side: Side::Front,
            transparent: false,
            blending: Blending::Normal,
            blend: BlendSettings::default(),
            premultiplied_alpha: false,
            alpha_test: 0.0,
            depth_func: DepthFunc::LessEqual,
            depth_test: true,
            depth_write: true,
            color_write: true,
            polygon_offset: false,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            tracker: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn basic() -> Self {
        Self::new(MaterialKind::Basic)
    }

    #[must_use]
    pub fn phong() -> Self {
        Self::new(MaterialKind::Phong)
    }

    #[must_use]
    pub fn standard() -> Self {
        Self::new(MaterialKind::Standard)
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Forces program re-selection on next use.
    pub fn set_needs_update(&mut self, value: bool) {
        self.tracker.set_needs_update(value);
    }

    #[inline]
    #[must_use]
    pub fn supports(&self, feature: MaterialFeatures) -> bool {
        self.kind.features().contains(feature)
    }

    /// The texture in `slot` if set and honoured by this kind of material.
    #[must_use]
    pub fn active_map(&self, slot: MapSlot) -> Option<&Texture> {
        if self.supports(slot.feature()) {
            self.maps.get(slot)
        } else {
            None
        }
    }

    /// `flag` if the kind honours `feature`, else `false`.
    #[inline]
    #[must_use]
    pub fn flag(&self, feature: MaterialFeatures, flag: bool) -> bool {
        flag && self.supports(feature)
    }
}
