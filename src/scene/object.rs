use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;
use uuid::Uuid;

use crate::resources::{BufferGeometry, Geometry};

/// Triangle assembly for meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Skeleton data the program selector needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    pub bone_count: usize,
    /// Bone matrices are stored in a float texture instead of uniforms.
    pub use_vertex_texture: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Mesh { draw_mode: DrawMode },
    SkinnedMesh { draw_mode: DrawMode, skeleton: Skeleton },
    /// Connected line strip.
    Line,
    /// Independent segments.
    LineSegments,
    LineLoop,
    Points,
}

impl ObjectKind {
    #[must_use]
    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Mesh { .. } | Self::SkinnedMesh { .. })
    }

    #[must_use]
    pub fn is_line(&self) -> bool {
        matches!(self, Self::Line | Self::LineSegments | Self::LineLoop)
    }

    #[must_use]
    pub fn is_points(&self) -> bool {
        matches!(self, Self::Points)
    }

    #[must_use]
    pub fn skeleton(&self) -> Option<&Skeleton> {
        match self {
            Self::SkinnedMesh { skeleton, .. } => Some(skeleton),
            _ => None,
        }
    }
}

/// The geometry attached to a renderable: already flat, or legacy face-list.
#[derive(Debug, Clone)]
pub enum ObjectGeometry {
    Buffer(Rc<RefCell<BufferGeometry>>),
    Legacy(Rc<RefCell<Geometry>>),
}

impl ObjectGeometry {
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Buffer(g) => g.borrow().uuid(),
            Self::Legacy(g) => g.borrow().uuid(),
        }
    }
}

impl From<BufferGeometry> for ObjectGeometry {
    fn from(geometry: BufferGeometry) -> Self {
        Self::Buffer(Rc::new(RefCell::new(geometry)))
    }
}

impl From<Geometry> for ObjectGeometry {
    fn from(geometry: Geometry) -> Self {
        Self::Legacy(Rc::new(RefCell::new(geometry)))
    }
}

/// A drawable handed to the renderer by scene traversal.
#[derive(Debug, Clone)]
pub struct RenderObject {
    uuid: Uuid,
    pub kind: ObjectKind,
    pub geometry: ObjectGeometry,
    pub world_matrix: Mat4,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl RenderObject {
    #[must_use]
    pub fn new(kind: ObjectKind, geometry: impl Into<ObjectGeometry>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            geometry: geometry.into(),
            world_matrix: Mat4::IDENTITY,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    #[must_use]
    pub fn mesh(geometry: impl Into<ObjectGeometry>) -> Self {
        Self::new(
            ObjectKind::Mesh {
                draw_mode: DrawMode::Triangles,
            },
            geometry,
        )
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}
