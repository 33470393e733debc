use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resources::version_tracker::ChangeTracker;

/// Color encoding of texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureEncoding {
    #[default]
    Linear,
    Srgb,
    Rgbe,
    Rgbm7,
    Rgbm16,
    Rgbd,
    Gamma,
}

impl TextureEncoding {
    /// `(function suffix, extra argument)` used when emitting GLSL
    /// encode/decode helpers, e.g. `("RGBM", ", 7.0")`.
    #[must_use]
    pub fn glsl_components(self) -> (&'static str, &'static str) {
        match self {
            Self::Linear => ("Linear", ""),
            Self::Srgb => ("sRGB", ""),
            Self::Rgbe => ("RGBE", ""),
            Self::Rgbm7 => ("RGBM", ", 7.0"),
            Self::Rgbm16 => ("RGBM", ", 16.0"),
            Self::Rgbd => ("RGBD", ", 256.0"),
            Self::Gamma => ("Gamma", ", float( GAMMA_FACTOR )"),
        }
    }
}

/// How a texture is projected onto geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureMapping {
    #[default]
    Uv,
    CubeReflection,
    CubeRefraction,
    CubeUvReflection,
    CubeUvRefraction,
    EquirectangularReflection,
    EquirectangularRefraction,
    SphericalReflection,
}

impl TextureMapping {
    #[must_use]
    pub fn is_refraction(self) -> bool {
        matches!(
            self,
            Self::CubeRefraction | Self::CubeUvRefraction | Self::EquirectangularRefraction
        )
    }

    #[must_use]
    pub fn is_cube_uv(self) -> bool {
        matches!(self, Self::CubeUvReflection | Self::CubeUvRefraction)
    }
}

/// The texture properties program selection depends on. Pixel data and
/// upload live outside this crate.
#[derive(Debug, Clone)]
pub struct Texture {
    uuid: Uuid,
    pub name: String,
    pub encoding: TextureEncoding,
    pub mapping: TextureMapping,
    tracker: ChangeTracker,
}

impl Default for Texture {
    fn default() -> Self {
        Self::new()
    }
}

impl Texture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: String::new(),
            encoding: TextureEncoding::Linear,
            mapping: TextureMapping::Uv,
            tracker: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_mapping(mut self, mapping: TextureMapping) -> Self {
        self.mapping = mapping;
        self
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

    pub fn set_needs_update(&mut self, value: bool) {
        self.tracker.set_needs_update(value);
    }
}
