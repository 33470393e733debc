//! Flat, GPU-ready geometry.
//!
//! A [`BufferGeometry`] maps attribute names to [`Attribute`]s, holds an
//! optional index, draw range and material groups, and caches bounding
//! volumes. It is also the flattening target of the legacy [`Geometry`]
//! model (see [`BufferGeometry::set_from_object`]).

use glam::{Mat3, Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::errors::{LumenError, Result};
use crate::resources::attribute::{Attribute, BufferAttribute};
use crate::resources::bounds::{BoundingBox, BoundingSphere};
use crate::resources::direct_geometry::DirectGeometry;
use crate::resources::geometry::Geometry;
use crate::scene::ObjectKind;

/// Largest index addressable with 16-bit indices.
pub const MAX_INDEX: u32 = 65535;

/// A sub-range of the index (or vertex) sequence drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    pub start: usize,
    pub count: usize,
    pub material_index: u32,
}

/// The portion of the geometry actually rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub start: usize,
    pub count: usize,
}

impl Default for DrawRange {
    fn default() -> Self {
        Self {
            start: 0,
            count: i32::MAX as usize,
        }
    }
}

#[derive(Debug)]
pub struct BufferGeometry {
    uuid: Uuid,
    pub name: String,

    index: Option<BufferAttribute>,
    attributes: FxHashMap<String, Attribute>,
    morph_attributes: FxHashMap<String, Vec<BufferAttribute>>,

    groups: Vec<Group>,
    draw_range: DrawRange,
    /// Instance count for instanced drawing; `None` for ordinary geometry.
    pub max_instanced_count: Option<u32>,

    bounding_box: Option<BoundingBox>,
    bounding_sphere: Option<BoundingSphere>,

    /// Expansion kept from the last legacy flattening, refreshed by `update_from_object`.
    direct: Option<DirectGeometry>,
}

impl Default for BufferGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BufferGeometry {
    /// Deep copy with fresh identities for the geometry and its planar attributes.
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        copy.copy_from(self);
        copy
    }
}

impl BufferGeometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: String::new(),
            index: None,
            attributes: FxHashMap::default(),
            morph_attributes: FxHashMap::default(),
            groups: Vec::new(),
            draw_range: DrawRange::default(),
            max_instanced_count: None,
            bounding_box: None,
            bounding_sphere: None,
            direct: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    // ========================================================================
    // Index & attributes
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<&BufferAttribute> {
        self.index.as_ref()
    }

    #[inline]
    pub fn index_mut(&mut self) -> Option<&mut BufferAttribute> {
        self.index.as_mut()
    }

    pub fn set_index(&mut self, index: Option<BufferAttribute>) {
        self.index = index;
    }

    /// Adds or replaces the attribute called `name`.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: impl Into<Attribute>) {
        self.attributes.insert(name.into(), attribute.into());
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(name)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attributes_mut(&mut self) -> impl Iterator<Item = (&str, &mut Attribute)> {
        self.attributes.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn morph_attributes(&self, name: &str) -> &[BufferAttribute] {
        self.morph_attributes.get(name).map_or(&[], Vec::as_slice)
    }

    /// Every morph target list with its attribute name.
    pub fn morph_attribute_sets(&self) -> impl Iterator<Item = (&str, &[BufferAttribute])> {
        self.morph_attributes
            .iter()
            .map(|(name, targets)| (name.as_str(), targets.as_slice()))
    }

    pub fn morph_attributes_mut(&mut self) -> impl Iterator<Item = &mut BufferAttribute> {
        self.morph_attributes.values_mut().flatten()
    }

    pub fn set_morph_attribute(&mut self, name: impl Into<String>, targets: Vec<BufferAttribute>) {
        self.morph_attributes.insert(name.into(), targets);
    }

    fn position(&self) -> Result<&Attribute> {
        self.attributes
            .get("position")
            .ok_or_else(|| LumenError::InvalidGeometry("missing \"position\" attribute".into()))
    }

    // ========================================================================
    // Groups & draw range
    // ========================================================================

    pub fn add_group(&mut self, start: usize, count: usize, material_index: u32) {
        self.groups.push(Group {
            start,
            count,
            material_index,
        });
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn set_draw_range(&mut self, start: usize, count: usize) {
        self.draw_range = DrawRange { start, count };
    }

    #[inline]
    #[must_use]
    pub fn draw_range(&self) -> DrawRange {
        self.draw_range
    }

    // ========================================================================
    // Bounding volumes
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    #[inline]
    #[must_use]
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    fn positions(&self) -> Vec<Vec3> {
        self.attributes
            .get("position")
            .map(|p| (0..p.count()).map(|i| p.get_vec3(i)).collect())
            .unwrap_or_default()
    }

    /// Recomputes the box from "position"; a missing or empty attribute gives
    /// [`BoundingBox::ZERO`].
    pub fn compute_bounding_box(&mut self) -> BoundingBox {
        let bbox = BoundingBox::from_points(self.positions());
        self.bounding_box = Some(bbox);
        bbox
    }

    pub fn compute_bounding_sphere(&mut self) -> BoundingSphere {
        let sphere = BoundingSphere::from_points(&self.positions());
        self.bounding_sphere = Some(sphere);
        sphere
    }

    // ========================================================================
    // Normals
    // ========================================================================

    /// Accumulates `(C - B) × (A - B)` per triangle into the "normal"
    /// attribute (allocating it if absent) and normalizes the result.
    ///
    /// Indexed geometry walks each group (or the whole index when there are
    /// none); non-indexed geometry uses consecutive vertex triples.
    pub fn compute_vertex_normals(&mut self) -> Result<()> {
        let count = self.position()?.count();
        let positions = self.positions();
        let mut normals = vec![Vec3::ZERO; count];

        let vertex = |i: u32| -> Result<Vec3> {
            positions.get(i as usize).copied().ok_or_else(|| {
                LumenError::InvalidGeometry(format!("index {i} exceeds vertex count {count}"))
            })
        };

        if let Some(index) = &self.index {
            let index_count = index.count();
            let whole = [Group {
                start: 0,
                count: index_count,
                material_index: 0,
            }];
            let groups = if self.groups.is_empty() {
                &whole[..]
            } else {
                &self.groups[..]
            };

            for group in groups {
                let end = (group.start + group.count).min(index_count);
                let mut j = group.start;
                while j + 2 < end {
                    let [a, b, c] = [0, 1, 2].map(|k| index.array().get_u32(j + k));
                    let (pa, pb, pc) = (vertex(a)?, vertex(b)?, vertex(c)?);
                    let cb = (pc - pb).cross(pa - pb);
                    normals[a as usize] += cb;
                    normals[b as usize] += cb;
                    normals[c as usize] += cb;
                    j += 3;
                }
            }
        } else {
            let mut i = 0;
            while i + 2 < count {
                let cb = (positions[i + 2] - positions[i + 1]).cross(positions[i] - positions[i + 1]);
                normals[i] = cb;
                normals[i + 1] = cb;
                normals[i + 2] = cb;
                i += 3;
            }
        }

        let reuse = self
            .attributes
            .get("normal")
            .is_some_and(|n| n.count() == count && n.item_size() == 3);
        if !reuse {
            self.set_attribute("normal", BufferAttribute::zeroed_f32(count, 3));
        }
        if let Some(attribute) = self.attributes.get_mut("normal") {
            for (i, n) in normals.into_iter().enumerate() {
                attribute.set_vec3(i, n);
            }
        }

        self.normalize_normals()
    }

    /// Scales every normal to unit length in place.
    ///
    /// A zero-length normal becomes NaN; callers feeding degenerate triangles
    /// get what the division gives them.
    pub fn normalize_normals(&mut self) -> Result<()> {
        let normals = self
            .attributes
            .get_mut("normal")
            .ok_or_else(|| LumenError::InvalidGeometry("missing \"normal\" attribute".into()))?;
        for i in 0..normals.count() {
            let n = normals.get_vec3(i);
            let inv = 1.0 / (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();
            normals.set_vec3(i, n * inv);
        }
        normals.set_needs_update(true);
        Ok(())
    }

    // ========================================================================
    // Combination
    // ========================================================================

    /// Copies `other`'s raw values into each attribute `self` also has,
    /// starting at element `offset`. Attributes present on only one side are
    /// skipped.
    pub fn merge(&mut self, other: &BufferGeometry, offset: usize) -> Result<()> {
        // Every shared attribute is checked before any is written.
        for (name, attribute) in &self.attributes {
            let Some(source) = other.attributes.get(name) else {
                continue;
            };
            let end = offset * attribute.item_size() + source.count() * source.item_size();
            let capacity = attribute.count() * attribute.item_size();
            if end > capacity {
                return Err(LumenError::InvalidGeometry(format!(
                    "merge of \"{name}\" writes {} values past the end",
                    end - capacity
                )));
            }
        }

        for (name, attribute) in &mut self.attributes {
            let Some(source) = other.attributes.get(name) else {
                continue;
            };
            let item_size = attribute.item_size();
            let source_item = source.item_size();
            let start = offset * item_size;
            for i in 0..source.count() * source_item {
                let value = source.get_component(i / source_item, i % source_item);
                let at = start + i;
                attribute.set_component(at / item_size, at % item_size, value);
            }
            attribute.set_needs_update(true);
        }
        Ok(())
    }

    /// Expands every attribute through the index, giving a geometry without one.
    #[must_use]
    pub fn to_non_indexed(&self) -> BufferGeometry {
        let Some(index) = &self.index else {
            log::warn!("BufferGeometry::to_non_indexed: geometry is already non-indexed");
            return self.clone();
        };

        let indices: Vec<usize> = (0..index.count())
            .map(|i| index.array().get_u32(i) as usize)
            .collect();

        let mut out = BufferGeometry::new();
        out.name.clone_from(&self.name);
        for (name, attribute) in &self.attributes {
            out.set_attribute(name.clone(), attribute.gather(&indices));
        }
        out.groups.clone_from(&self.groups);
        out
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Transforms positions by `matrix` and normals by its normal matrix.
    /// Cached bounds are recomputed if present.
    pub fn apply_matrix(&mut self, matrix: &Mat4) {
        if let Some(position) = self.attributes.get_mut("position") {
            for i in 0..position.count() {
                let p = matrix.transform_point3(position.get_vec3(i));
                position.set_vec3(i, p);
            }
            position.set_needs_update(true);
        }

        if let Some(normal) = self.attributes.get_mut("normal") {
            let normal_matrix = Mat3::from_mat4(*matrix).inverse().transpose();
            for i in 0..normal.count() {
                let n = (normal_matrix * normal.get_vec3(i)).normalize_or_zero();
                normal.set_vec3(i, n);
            }
            normal.set_needs_update(true);
        }

        if self.bounding_box.is_some() {
            self.compute_bounding_box();
        }
        if self.bounding_sphere.is_some() {
            self.compute_bounding_sphere();
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.apply_matrix(&Mat4::from_translation(offset));
    }

    pub fn scale(&mut self, factors: Vec3) {
        self.apply_matrix(&Mat4::from_scale(factors));
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.apply_matrix(&Mat4::from_quat(Quat::from_rotation_x(angle)));
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.apply_matrix(&Mat4::from_quat(Quat::from_rotation_y(angle)));
    }

    pub fn rotate_z(&mut self, angle: f32) {
        self.apply_matrix(&Mat4::from_quat(Quat::from_rotation_z(angle)));
    }

    /// Moves the box centre to the origin, returning the applied offset.
    pub fn center(&mut self) -> Vec3 {
        let offset = -self.compute_bounding_box().center();
        self.translate(offset);
        offset
    }

    // ========================================================================
    // Legacy geometry conversion
    // ========================================================================

    /// Flattens a legacy geometry for the given kind of object.
    ///
    /// Points and lines take the shared vertex, color and line-distance
    /// streams as-is; meshes are expanded per face corner.
    pub fn set_from_object(&mut self, kind: &ObjectKind, geometry: &Geometry) -> Result<()> {
        if kind.is_points() || kind.is_line() {
            let count = geometry.vertices.len();
            let mut position = BufferAttribute::zeroed_f32(count, 3);
            position.copy_vector3s_array(&geometry.vertices);
            self.set_attribute("position", position);

            let mut color = BufferAttribute::zeroed_f32(geometry.colors.len(), 3);
            color.copy_colors_array(&geometry.colors);
            self.set_attribute("color", color);

            if kind.is_line() && geometry.line_distances.len() == count {
                let mut distances = BufferAttribute::zeroed_f32(count, 1);
                distances.copy_array(&geometry.line_distances);
                self.set_attribute("lineDistance", distances);
            }

            self.bounding_box = geometry.bounding_box;
            self.bounding_sphere = geometry.bounding_sphere;
            Ok(())
        } else {
            self.from_geometry(geometry)
        }
    }

    /// Re-copies the streams the legacy geometry flags as changed, then clears
    /// the flags. A topology change rebuilds the whole flattened form.
    pub fn update_from_object(&mut self, kind: &ObjectKind, geometry: &mut Geometry) -> Result<()> {
        if kind.is_mesh() {
            if geometry.elements_need_update || self.direct.is_none() {
                geometry.elements_need_update = false;
                clear_update_flags(geometry);
                return self.from_geometry(geometry);
            }
            if has_update_flags(geometry) {
                let direct = DirectGeometry::from_geometry(geometry)?;
                self.copy_flagged(geometry, &direct.vertices, &direct.normals, &direct.colors);
                if geometry.uvs_need_update {
                    update_vec2s(self.attributes.get_mut("uv"), &direct.uvs);
                }
                if geometry.groups_need_update {
                    self.groups.clone_from(&direct.groups);
                }
                self.direct = Some(direct);
            }
        } else {
            self.copy_flagged(geometry, &geometry.vertices, &[], &geometry.colors);
            if geometry.line_distances_need_update
                && let Some(attribute) = self.attributes.get_mut("lineDistance")
                && let Attribute::Buffer(buffer) = attribute
            {
                buffer.copy_array(&geometry.line_distances);
                buffer.set_needs_update(true);
            }
        }
        clear_update_flags(geometry);
        Ok(())
    }

    fn copy_flagged(&mut self, flags: &Geometry, vertices: &[Vec3], normals: &[Vec3], colors: &[Vec3]) {
        if flags.vertices_need_update {
            update_vec3s(self.attributes.get_mut("position"), vertices);
        }
        if flags.normals_need_update {
            update_vec3s(self.attributes.get_mut("normal"), normals);
        }
        if flags.colors_need_update {
            update_vec3s(self.attributes.get_mut("color"), colors);
        }
    }

    pub fn from_geometry(&mut self, geometry: &Geometry) -> Result<()> {
        let direct = DirectGeometry::from_geometry(geometry)?;
        self.from_direct_geometry(direct);
        Ok(())
    }

    /// Moves the expanded streams into flat attributes.
    pub fn from_direct_geometry(&mut self, direct: DirectGeometry) {
        let count = direct.vertices.len();

        let mut position = BufferAttribute::zeroed_f32(count, 3);
        position.copy_vector3s_array(&direct.vertices);
        self.set_attribute("position", position);

        if !direct.normals.is_empty() {
            let mut normal = BufferAttribute::zeroed_f32(direct.normals.len(), 3);
            normal.copy_vector3s_array(&direct.normals);
            self.set_attribute("normal", normal);
        }

        if !direct.colors.is_empty() {
            let mut color = BufferAttribute::zeroed_f32(direct.colors.len(), 3);
            color.copy_colors_array(&direct.colors);
            self.set_attribute("color", color);
        }

        if !direct.uvs.is_empty() {
            let mut uv = BufferAttribute::zeroed_f32(direct.uvs.len(), 2);
            uv.copy_vector2s_array(&direct.uvs);
            self.set_attribute("uv", uv);
        }

        if !direct.uvs2.is_empty() {
            let mut uv2 = BufferAttribute::zeroed_f32(direct.uvs2.len(), 2);
            uv2.copy_vector2s_array(&direct.uvs2);
            self.set_attribute("uv2", uv2);
        }

        self.groups.clone_from(&direct.groups);

        let to_attributes = |targets: &[crate::resources::direct_geometry::MorphData]| {
            targets
                .iter()
                .map(|t| {
                    let mut attr = BufferAttribute::zeroed_f32(t.data.len(), 3);
                    attr.copy_vector3s_array(&t.data);
                    attr
                })
                .collect::<Vec<_>>()
        };
        if !direct.morph_positions.is_empty() {
            self.set_morph_attribute("position", to_attributes(&direct.morph_positions));
        }
        if !direct.morph_normals.is_empty() {
            self.set_morph_attribute("normal", to_attributes(&direct.morph_normals));
        }

        if !direct.skin_indices.is_empty() {
            let mut skin_index = BufferAttribute::zeroed_f32(direct.skin_indices.len(), 4);
            skin_index.copy_vector4s_array(&direct.skin_indices);
            self.set_attribute("skinIndex", skin_index);
        }

        if !direct.skin_weights.is_empty() {
            let mut skin_weight = BufferAttribute::zeroed_f32(direct.skin_weights.len(), 4);
            skin_weight.copy_vector4s_array(&direct.skin_weights);
            self.set_attribute("skinWeight", skin_weight);
        }

        self.bounding_box = direct.bounding_box;
        self.bounding_sphere = direct.bounding_sphere;
        self.direct = Some(direct);
    }

    // ========================================================================
    // Copy
    // ========================================================================

    /// Structural copy of `source`. Planar attributes are deep-copied;
    /// interleaved views keep sharing their buffer.
    pub fn copy_from(&mut self, source: &BufferGeometry) -> &mut Self {
        self.name.clone_from(&source.name);
        self.index.clone_from(&source.index);
        self.attributes.clone_from(&source.attributes);
        self.morph_attributes.clone_from(&source.morph_attributes);
        self.groups.clone_from(&source.groups);
        self.draw_range = source.draw_range;
        self.max_instanced_count = source.max_instanced_count;
        self.bounding_box = source.bounding_box;
        self.bounding_sphere = source.bounding_sphere;
        self.direct.clone_from(&source.direct);
        self
    }
}

fn has_update_flags(geometry: &Geometry) -> bool {
    geometry.vertices_need_update
        || geometry.normals_need_update
        || geometry.colors_need_update
        || geometry.uvs_need_update
        || geometry.groups_need_update
}

fn clear_update_flags(geometry: &mut Geometry) {
    geometry.vertices_need_update = false;
    geometry.normals_need_update = false;
    geometry.colors_need_update = false;
    geometry.uvs_need_update = false;
    geometry.groups_need_update = false;
    geometry.line_distances_need_update = false;
}

fn update_vec3s(attribute: Option<&mut Attribute>, values: &[Vec3]) {
    if let Some(Attribute::Buffer(buffer)) = attribute {
        buffer.copy_vector3s_array(values);
        buffer.set_needs_update(true);
    }
}

fn update_vec2s(attribute: Option<&mut Attribute>, values: &[glam::Vec2]) {
    if let Some(Attribute::Buffer(buffer)) = attribute {
        buffer.copy_vector2s_array(values);
        buffer.set_needs_update(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draw_range_is_unbounded() {
        let geometry = BufferGeometry::new();
        assert_eq!(geometry.draw_range(), DrawRange { start: 0, count: i32::MAX as usize });
    }

    #[test]
    fn groups_are_ordered() {
        let mut geometry = BufferGeometry::new();
        geometry.add_group(0, 3, 0);
        geometry.add_group(3, 6, 1);
        assert_eq!(geometry.groups()[1].material_index, 1);
        geometry.clear_groups();
        assert!(geometry.groups().is_empty());
    }

    #[test]
    fn missing_position_is_invalid_for_normals() {
        let mut geometry = BufferGeometry::new();
        assert!(matches!(
            geometry.compute_vertex_normals(),
            Err(LumenError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn clone_gets_new_identity() {
        let mut geometry = BufferGeometry::new();
        geometry.set_attribute("position", BufferAttribute::zeroed_f32(3, 3));
        let copy = geometry.clone();
        assert_ne!(copy.uuid(), geometry.uuid());
        let a = geometry.attribute("position").unwrap().data().id();
        let b = copy.attribute("position").unwrap().data().id();
        assert_ne!(a, b);
    }
}
