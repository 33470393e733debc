use glam::{Vec2, Vec3};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowConfig {
    pub bias: f32,
    pub radius: f32,
    pub map_size: Vec2,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bias: 0.0,
            radius: 1.0,
            map_size: Vec2::new(512.0, 512.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// World-space point the light aims at.
    pub target: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    /// `0` means no range cutoff.
    pub distance: f32,
    pub decay: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub target: Vec3,
    pub distance: f32,
    pub decay: f32,
    /// Cone half-angle in radians.
    pub angle: f32,
    /// Fraction of the cone attenuated by the penumbra, `0..=1`.
    pub penumbra: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HemisphereLight {
    pub ground_color: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
    Hemisphere(HemisphereLight),
}

/// A light as seen by the renderer: world-space placement already resolved.
#[derive(Debug, Clone)]
pub struct Light {
    uuid: Uuid,
    pub color: Vec3,
    pub intensity: f32,
    /// World-space position (direction source for directional and hemisphere lights).
    pub position: Vec3,
    pub kind: LightKind,
    pub visible: bool,

    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Light {
    fn with_kind(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            color,
            intensity,
            position: Vec3::Y,
            kind,
            visible: true,
            cast_shadow: false,
            shadow: ShadowConfig::default(),
        }
    }

    #[must_use]
    pub fn new_ambient(color: Vec3, intensity: f32) -> Self {
        Self::with_kind(LightKind::Ambient, color, intensity)
    }

    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32) -> Self {
        Self::with_kind(
            LightKind::Directional(DirectionalLight { target: Vec3::ZERO }),
            color,
            intensity,
        )
    }

    #[must_use]
    pub fn new_point(color: Vec3, intensity: f32, distance: f32) -> Self {
        Self::with_kind(
            LightKind::Point(PointLight { distance, decay: 1.0 }),
            color,
            intensity,
        )
    }

    #[must_use]
    pub fn new_spot(color: Vec3, intensity: f32, distance: f32, angle: f32) -> Self {
        Self::with_kind(
            LightKind::Spot(SpotLight {
                target: Vec3::ZERO,
                distance,
                decay: 1.0,
                angle,
                penumbra: 0.0,
            }),
            color,
            intensity,
        )
    }

    #[must_use]
    pub fn new_hemisphere(sky_color: Vec3, ground_color: Vec3, intensity: f32) -> Self {
        Self::with_kind(
            LightKind::Hemisphere(HemisphereLight { ground_color }),
            sky_color,
            intensity,
        )
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_shadow(mut self, cast_shadow: bool) -> Self {
        self.cast_shadow = cast_shadow;
        self
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}
