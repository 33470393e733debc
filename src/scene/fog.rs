use glam::Vec3;

/// Scene fog, linear or exponential-squared.
#[derive(Debug, Clone, PartialEq)]
pub enum Fog {
    Linear { color: Vec3, near: f32, far: f32 },
    Exp2 { color: Vec3, density: f32 },
}

impl Fog {
    #[must_use]
    pub fn is_exp2(&self) -> bool {
        matches!(self, Self::Exp2 { .. })
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        match self {
            Self::Linear { color, .. } | Self::Exp2 { color, .. } => *color,
        }
    }
}
