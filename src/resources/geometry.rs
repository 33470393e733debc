//! Legacy face-list geometry.
//!
//! Shared vertices referenced by [`Face3`] triangles, with per-face or
//! per-corner normals and colors. The renderer never draws this model
//! directly: it is flattened once into a [`BufferGeometry`] through
//! [`DirectGeometry`].
//!
//! [`BufferGeometry`]: crate::resources::BufferGeometry
//! [`DirectGeometry`]: crate::resources::DirectGeometry

use glam::{Vec2, Vec3, Vec4};
use uuid::Uuid;

use crate::resources::bounds::{BoundingBox, BoundingSphere};

/// A triangle over three shared vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Face3 {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub normal: Vec3,
    /// Per-corner normals; used instead of `normal` when exactly three are set.
    pub vertex_normals: Vec<Vec3>,
    pub color: Vec3,
    /// Per-corner colors; used instead of `color` when exactly three are set.
    pub vertex_colors: Vec<Vec3>,
    pub material_index: u32,
}

impl Face3 {
    #[must_use]
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self {
            a,
            b,
            c,
            normal: Vec3::ZERO,
            vertex_normals: Vec::new(),
            color: Vec3::ONE,
            vertex_colors: Vec::new(),
            material_index: 0,
        }
    }

    #[must_use]
    pub fn with_material_index(mut self, material_index: u32) -> Self {
        self.material_index = material_index;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MorphTarget {
    pub name: String,
    pub vertices: Vec<Vec3>,
}

/// Per-face corner normals of one morph target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MorphNormals {
    pub vertex_normals: Vec<[Vec3; 3]>,
}

#[derive(Debug, Clone)]
pub struct Geometry {
    uuid: Uuid,
    pub name: String,
    pub vertices: Vec<Vec3>,
    /// Per-vertex colors, used by points and lines.
    pub colors: Vec<Vec3>,
    pub faces: Vec<Face3>,
    /// Two uv layers, one optional corner triple per face.
    pub face_vertex_uvs: [Vec<Option<[Vec2; 3]>>; 2],
    pub morph_targets: Vec<MorphTarget>,
    pub morph_normals: Vec<MorphNormals>,
    pub skin_indices: Vec<Vec4>,
    pub skin_weights: Vec<Vec4>,
    pub line_distances: Vec<f32>,
    pub bounding_box: Option<BoundingBox>,
    pub bounding_sphere: Option<BoundingSphere>,

    /// Face topology changed; the flattened form is rebuilt from scratch.
    pub elements_need_update: bool,
    pub vertices_need_update: bool,
    pub normals_need_update: bool,
    pub colors_need_update: bool,
    pub uvs_need_update: bool,
    pub groups_need_update: bool,
    pub line_distances_need_update: bool,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: String::new(),
            vertices: Vec::new(),
            colors: Vec::new(),
            faces: Vec::new(),
            face_vertex_uvs: [Vec::new(), Vec::new()],
            morph_targets: Vec::new(),
            morph_normals: Vec::new(),
            skin_indices: Vec::new(),
            skin_weights: Vec::new(),
            line_distances: Vec::new(),
            bounding_box: None,
            bounding_sphere: None,
            elements_need_update: false,
            vertices_need_update: false,
            normals_need_update: false,
            colors_need_update: false,
            uvs_need_update: false,
            groups_need_update: false,
            line_distances_need_update: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Sets each face normal from its winding, `(c - b) × (a - b)` normalized.
    /// Faces referencing missing vertices are left untouched.
    pub fn compute_face_normals(&mut self) {
        let vertices = &self.vertices;
        for face in &mut self.faces {
            let (Some(&va), Some(&vb), Some(&vc)) = (
                vertices.get(face.a as usize),
                vertices.get(face.b as usize),
                vertices.get(face.c as usize),
            ) else {
                continue;
            };
            face.normal = (vc - vb).cross(va - vb).normalize_or_zero();
        }
    }

    pub fn compute_bounding_box(&mut self) -> BoundingBox {
        let bbox = BoundingBox::from_points(self.vertices.iter().copied());
        self.bounding_box = Some(bbox);
        bbox
    }

    pub fn compute_bounding_sphere(&mut self) -> BoundingSphere {
        let sphere = BoundingSphere::from_points(&self.vertices);
        self.bounding_sphere = Some(sphere);
        sphere
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_normals_follow_ccw_winding() {
        let mut geometry = Geometry::new();
        geometry.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        geometry.faces.push(Face3::new(0, 1, 2));
        geometry.compute_face_normals();
        assert_eq!(geometry.faces[0].normal, Vec3::Z);
    }
}
