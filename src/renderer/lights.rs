//! Light uniform slots and the per-frame light summary.
//!
//! [`GlLights::get`] hands out one uniform slot per light, created on first
//! use with defaults for the light's kind. [`GlLights::setup`] refreshes the
//! slots of the visible lights in view space and gathers them into a
//! [`LightsState`], whose counts drive program selection.

use glam::{Mat4, Vec2, Vec3};
use xxhash_rust::xxh3::xxh3_64;

use super::properties::GlProperties;
use crate::scene::{Light, LightKind};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowUniforms {
    pub enabled: bool,
    pub bias: f32,
    pub radius: f32,
    pub map_size: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionalUniforms {
    pub direction: Vec3,
    pub color: Vec3,
    pub shadow: ShadowUniforms,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointUniforms {
    pub position: Vec3,
    pub color: Vec3,
    pub distance: f32,
    pub decay: f32,
    pub shadow: ShadowUniforms,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpotUniforms {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub distance: f32,
    pub decay: f32,
    pub cone_cos: f32,
    pub penumbra_cos: f32,
    pub shadow: ShadowUniforms,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HemisphereUniforms {
    pub direction: Vec3,
    pub sky_color: Vec3,
    pub ground_color: Vec3,
}

/// Uniform slot of one light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightUniforms {
    Ambient { color: Vec3 },
    Directional(DirectionalUniforms),
    Point(PointUniforms),
    Spot(SpotUniforms),
    Hemisphere(HemisphereUniforms),
}

impl LightUniforms {
    fn for_kind(kind: &LightKind) -> Self {
        match kind {
            LightKind::Ambient => Self::Ambient { color: Vec3::ZERO },
            LightKind::Directional(_) => Self::Directional(DirectionalUniforms::default()),
            LightKind::Point(_) => Self::Point(PointUniforms::default()),
            LightKind::Spot(_) => Self::Spot(SpotUniforms::default()),
            LightKind::Hemisphere(_) => Self::Hemisphere(HemisphereUniforms::default()),
        }
    }

    fn same_kind(&self, kind: &LightKind) -> bool {
        matches!(
            (self, kind),
            (Self::Ambient { .. }, LightKind::Ambient)
                | (Self::Directional(_), LightKind::Directional(_))
                | (Self::Point(_), LightKind::Point(_))
                | (Self::Spot(_), LightKind::Spot(_))
                | (Self::Hemisphere(_), LightKind::Hemisphere(_))
        )
    }
}

/// Lights gathered for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightsState {
    /// Digest of the light counts; changes force program re-selection.
    pub hash: u64,
    pub ambient: Vec3,
    pub directional: Vec<DirectionalUniforms>,
    pub point: Vec<PointUniforms>,
    pub spot: Vec<SpotUniforms>,
    pub hemi: Vec<HemisphereUniforms>,
    /// Shadow-casting lights of any kind.
    pub shadows: usize,
    pub point_shadows: usize,
}

impl LightsState {
    #[must_use]
    pub fn num_dir_lights(&self) -> usize {
        self.directional.len()
    }

    #[must_use]
    pub fn num_point_lights(&self) -> usize {
        self.point.len()
    }

    #[must_use]
    pub fn num_spot_lights(&self) -> usize {
        self.spot.len()
    }

    #[must_use]
    pub fn num_hemi_lights(&self) -> usize {
        self.hemi.len()
    }
}

#[derive(Default)]
pub struct GlLights {
    slots: GlProperties<LightUniforms>,
    state: LightsState,
}

impl GlLights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The uniform slot for `light`, re-created if the light changed kind.
    pub fn get(&mut self, light: &Light) -> &mut LightUniforms {
        let slot = self
            .slots
            .get_or_insert_with(light.uuid(), || LightUniforms::for_kind(&light.kind));
        if !slot.same_kind(&light.kind) {
            *slot = LightUniforms::for_kind(&light.kind);
        }
        slot
    }

    #[must_use]
    pub fn state(&self) -> &LightsState {
        &self.state
    }

    /// Refreshes the slots of every visible light and rebuilds the summary.
    pub fn setup(&mut self, lights: &[Light], view_matrix: &Mat4) -> &LightsState {
        let mut state = LightsState::default();

        for light in lights.iter().filter(|l| l.visible) {
            let color = light.color * light.intensity;
            let shadow = ShadowUniforms {
                enabled: light.cast_shadow,
                bias: light.shadow.bias,
                radius: light.shadow.radius,
                map_size: light.shadow.map_size,
            };
            let view_position = view_matrix.transform_point3(light.position);

            let uniforms = match &light.kind {
                LightKind::Ambient => {
                    state.ambient += color;
                    LightUniforms::Ambient { color }
                }
                LightKind::Directional(directional) => {
                    let slot = DirectionalUniforms {
                        direction: view_direction(view_matrix, light.position, directional.target),
                        color,
                        shadow,
                    };
                    state.directional.push(slot);
                    LightUniforms::Directional(slot)
                }
                LightKind::Point(point) => {
                    let slot = PointUniforms {
                        position: view_position,
                        color,
                        distance: point.distance,
                        decay: if point.distance == 0.0 { 0.0 } else { point.decay },
                        shadow,
                    };
                    state.point.push(slot);
                    if light.cast_shadow {
                        state.point_shadows += 1;
                    }
                    LightUniforms::Point(slot)
                }
                LightKind::Spot(spot) => {
                    let slot = SpotUniforms {
                        position: view_position,
                        direction: view_direction(view_matrix, light.position, spot.target),
                        color,
                        distance: spot.distance,
                        decay: if spot.distance == 0.0 { 0.0 } else { spot.decay },
                        cone_cos: spot.angle.cos(),
                        penumbra_cos: (spot.angle * (1.0 - spot.penumbra)).cos(),
                        shadow,
                    };
                    state.spot.push(slot);
                    LightUniforms::Spot(slot)
                }
                LightKind::Hemisphere(hemisphere) => {
                    let slot = HemisphereUniforms {
                        direction: view_matrix
                            .transform_vector3(light.position)
                            .normalize_or_zero(),
                        sky_color: color,
                        ground_color: hemisphere.ground_color * light.intensity,
                    };
                    state.hemi.push(slot);
                    LightUniforms::Hemisphere(slot)
                }
            };
            *self.get(light) = uniforms;

            if light.cast_shadow && !matches!(light.kind, LightKind::Ambient | LightKind::Hemisphere(_)) {
                state.shadows += 1;
            }
        }

        let key = format!(
            "{},{},{},{},{}",
            state.directional.len(),
            state.point.len(),
            state.spot.len(),
            state.hemi.len(),
            state.shadows
        );
        state.hash = xxh3_64(key.as_bytes());
        self.state = state;
        &self.state
    }

    /// Forgets the slot of a removed light.
    pub fn remove(&mut self, light: &Light) {
        self.slots.remove(&light.uuid());
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.state = LightsState::default();
    }
}

fn view_direction(view_matrix: &Mat4, position: Vec3, target: Vec3) -> Vec3 {
    view_matrix
        .transform_vector3(position - target)
        .normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lights_by_kind() {
        let lights = [
            Light::new_ambient(Vec3::ONE, 0.5),
            Light::new_ambient(Vec3::ONE, 0.25),
            Light::new_directional(Vec3::ONE, 1.0).with_shadow(true),
            Light::new_point(Vec3::ONE, 1.0, 10.0).with_shadow(true),
            Light::new_hemisphere(Vec3::ONE, Vec3::ZERO, 1.0),
        ];
        let mut gl_lights = GlLights::new();
        let state = gl_lights.setup(&lights, &Mat4::IDENTITY);

        assert_eq!(state.ambient, Vec3::splat(0.75));
        assert_eq!(state.num_dir_lights(), 1);
        assert_eq!(state.num_point_lights(), 1);
        assert_eq!(state.num_spot_lights(), 0);
        assert_eq!(state.num_hemi_lights(), 1);
        assert_eq!(state.shadows, 2);
        assert_eq!(state.point_shadows, 1);
    }

    #[test]
    fn hash_follows_counts_only() {
        let mut gl_lights = GlLights::new();
        let one = [Light::new_directional(Vec3::ONE, 1.0)];
        let other = [Light::new_directional(Vec3::X, 3.0).with_position(Vec3::Z)];
        let two = [
            Light::new_directional(Vec3::ONE, 1.0),
            Light::new_directional(Vec3::ONE, 1.0),
        ];
        let a = gl_lights.setup(&one, &Mat4::IDENTITY).hash;
        let b = gl_lights.setup(&other, &Mat4::IDENTITY).hash;
        let c = gl_lights.setup(&two, &Mat4::IDENTITY).hash;
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn directional_points_from_target_to_light() {
        let light = Light::new_directional(Vec3::ONE, 1.0).with_position(Vec3::new(0.0, 10.0, 0.0));
        let mut gl_lights = GlLights::new();
        let state = gl_lights.setup(std::slice::from_ref(&light), &Mat4::IDENTITY);
        assert!((state.directional[0].direction - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn invisible_lights_are_skipped() {
        let mut light = Light::new_point(Vec3::ONE, 1.0, 0.0);
        light.visible = false;
        let mut gl_lights = GlLights::new();
        assert_eq!(gl_lights.setup(&[light], &Mat4::IDENTITY).num_point_lights(), 0);
    }
}
