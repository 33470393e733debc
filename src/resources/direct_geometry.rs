use glam::{Vec2, Vec3, Vec4};

use crate::errors::{LumenError, Result};
use crate::resources::bounds::{BoundingBox, BoundingSphere};
use crate::resources::buffer_geometry::Group;
use crate::resources::geometry::{Face3, Geometry};

/// A named morph target expanded to one entry per face corner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MorphData {
    pub name: String,
    pub data: Vec<Vec3>,
}

/// Face-corner expansion of a legacy [`Geometry`]: three entries per face in
/// every stream, ready to be copied into flat attribute arrays.
#[derive(Debug, Clone, Default)]
pub struct DirectGeometry {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub uvs2: Vec<Vec2>,
    pub groups: Vec<Group>,
    pub morph_positions: Vec<MorphData>,
    pub morph_normals: Vec<MorphData>,
    pub skin_indices: Vec<Vec4>,
    pub skin_weights: Vec<Vec4>,
    pub bounding_box: Option<BoundingBox>,
    pub bounding_sphere: Option<BoundingSphere>,
}

fn corner(vertices: &[Vec3], index: u32, face: usize) -> Result<Vec3> {
    vertices.get(index as usize).copied().ok_or_else(|| {
        LumenError::InvalidGeometry(format!(
            "face {face} references vertex {index}, geometry has {}",
            vertices.len()
        ))
    })
}

/// Three per-corner values when exactly three are given, else the face value repeated.
fn corners_or(per_corner: &[Vec3], fallback: Vec3) -> [Vec3; 3] {
    match per_corner {
        [a, b, c] => [*a, *b, *c],
        _ => [fallback; 3],
    }
}

impl DirectGeometry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits the corner range wherever the face material index changes.
    pub fn compute_groups(&mut self, faces: &[Face3]) {
        let mut groups: Vec<Group> = Vec::new();
        let mut current: Option<Group> = None;

        for (i, face) in faces.iter().enumerate() {
            let start = i * 3;
            if current.is_some_and(|g| g.material_index == face.material_index) {
                continue;
            }
            if let Some(mut group) = current.take() {
                group.count = start - group.start;
                groups.push(group);
            }
            current = Some(Group {
                start,
                count: 0,
                material_index: face.material_index,
            });
        }

        if let Some(mut group) = current {
            group.count = faces.len() * 3 - group.start;
            groups.push(group);
        }

        self.groups = groups;
    }

    pub fn from_geometry(geometry: &Geometry) -> Result<Self> {
        let faces = &geometry.faces;
        let vertices = &geometry.vertices;
        let corner_count = faces.len() * 3;

        let has_uvs = !geometry.face_vertex_uvs[0].is_empty();
        let has_uvs2 = !geometry.face_vertex_uvs[1].is_empty();

        let mut direct = Self {
            vertices: Vec::with_capacity(corner_count),
            normals: Vec::with_capacity(corner_count),
            colors: Vec::with_capacity(corner_count),
            ..Self::default()
        };

        direct.morph_positions = geometry
            .morph_targets
            .iter()
            .map(|t| MorphData {
                name: t.name.clone(),
                data: Vec::with_capacity(corner_count),
            })
            .collect();
        direct.morph_normals = (0..geometry.morph_normals.len())
            .map(|_| MorphData::default())
            .collect();

        let has_skin_indices = geometry.skin_indices.len() == vertices.len();
        let has_skin_weights = geometry.skin_weights.len() == vertices.len();

        for (i, face) in faces.iter().enumerate() {
            let indices = [face.a, face.b, face.c];
            for &index in &indices {
                direct.vertices.push(corner(vertices, index, i)?);
            }

            direct
                .normals
                .extend(corners_or(&face.vertex_normals, face.normal));
            direct
                .colors
                .extend(corners_or(&face.vertex_colors, face.color));

            if has_uvs {
                direct.uvs.extend(face_uvs(geometry, 0, i));
            }
            if has_uvs2 {
                direct.uvs2.extend(face_uvs(geometry, 1, i));
            }

            for (target, morph) in geometry.morph_targets.iter().zip(&mut direct.morph_positions) {
                for &index in &indices {
                    morph.data.push(corner(&target.vertices, index, i)?);
                }
            }
            for (normals, morph) in geometry.morph_normals.iter().zip(&mut direct.morph_normals) {
                let triple = normals.vertex_normals.get(i).copied().ok_or_else(|| {
                    LumenError::InvalidGeometry(format!("morph normals missing face {i}"))
                })?;
                morph.data.extend(triple);
            }

            for &index in &indices {
                if has_skin_indices {
                    direct.skin_indices.push(geometry.skin_indices[index as usize]);
                }
                if has_skin_weights {
                    direct.skin_weights.push(geometry.skin_weights[index as usize]);
                }
            }
        }

        direct.compute_groups(faces);

        direct.bounding_box = geometry.bounding_box;
        direct.bounding_sphere = geometry.bounding_sphere;

        Ok(direct)
    }
}

fn face_uvs(geometry: &Geometry, layer: usize, face: usize) -> [Vec2; 3] {
    match geometry.face_vertex_uvs[layer].get(face) {
        Some(Some(uvs)) => *uvs,
        _ => {
            log::warn!("DirectGeometry: undefined uv layer {layer} for face {face}");
            [Vec2::ZERO; 3]
        }
    }
}
