//! Renderer Settings
//!
//! Plain configuration data consumed by [`GlRenderer::new`](super::GlRenderer::new)
//! and by program parameter selection. Everything here feeds the program cache
//! key, so two renderers with equal settings produce identical permutations.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lumen::renderer::{RendererSettings, ShadowMapType, ToneMapping};
//!
//! let settings = RendererSettings {
//!     gamma_output: true,
//!     tone_mapping: ToneMapping::Reinhard,
//!     ..Default::default()
//! };
//! assert_eq!(settings.shadow_map.kind, ShadowMapType::Pcf);
//! ```

use serde::{Deserialize, Serialize};

use crate::resources::Precision;

// ---------------------------------------------------------------------------
// ToneMapping
// ---------------------------------------------------------------------------

/// Tone-mapping operator baked into fragment programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    #[default]
    None,
    Linear,
    Reinhard,
    Uncharted2,
    Cineon,
}

impl ToneMapping {
    /// Name of the GLSL function implementing the operator, if any.
    #[inline]
    #[must_use]
    pub fn glsl_function(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Linear => Some("LinearToneMapping"),
            Self::Reinhard => Some("ReinhardToneMapping"),
            Self::Uncharted2 => Some("Uncharted2ToneMapping"),
            Self::Cineon => Some("OptimizedCineonToneMapping"),
        }
    }
}

// ---------------------------------------------------------------------------
// Shadow maps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowMapType {
    Basic,
    #[default]
    Pcf,
    PcfSoft,
}

impl ShadowMapType {
    #[inline]
    #[must_use]
    pub fn define(self) -> &'static str {
        match self {
            Self::Basic => "SHADOWMAP_TYPE_BASIC",
            Self::Pcf => "SHADOWMAP_TYPE_PCF",
            Self::PcfSoft => "SHADOWMAP_TYPE_PCF_SOFT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowMapSettings {
    pub enabled: bool,
    pub kind: ShadowMapType,
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global renderer configuration.
///
/// | Field                        | Default  |
/// |------------------------------|----------|
/// | `precision`                  | `High`   |
/// | `gamma_input`/`gamma_output` | `false`  |
/// | `gamma_factor`               | `2.0`    |
/// | `tone_mapping`               | `None`   |
/// | `tone_mapping_exposure`      | `1.0`    |
/// | `tone_mapping_white_point`   | `1.0`    |
/// | `shadow_map`                 | disabled, PCF |
/// | `max_morph_targets`          | `8`      |
/// | `max_morph_normals`          | `4`      |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Requested shader precision; downgraded to what the context supports.
    pub precision: Precision,

    /// Textures are authored in gamma space.
    pub gamma_input: bool,
    /// Write gamma-encoded output.
    pub gamma_output: bool,
    pub gamma_factor: f32,

    pub tone_mapping: ToneMapping,
    pub tone_mapping_exposure: f32,
    pub tone_mapping_white_point: f32,

    pub shadow_map: ShadowMapSettings,
    pub physically_correct_lights: bool,
    /// Only honoured when `EXT_frag_depth` is available.
    pub logarithmic_depth_buffer: bool,

    pub max_morph_targets: u32,
    pub max_morph_normals: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            precision: Precision::High,
            gamma_input: false,
            gamma_output: false,
            gamma_factor: 2.0,
            tone_mapping: ToneMapping::None,
            tone_mapping_exposure: 1.0,
            tone_mapping_white_point: 1.0,
            shadow_map: ShadowMapSettings::default(),
            physically_correct_lights: false,
            logarithmic_depth_buffer: false,
            max_morph_targets: 8,
            max_morph_normals: 4,
        }
    }
}
