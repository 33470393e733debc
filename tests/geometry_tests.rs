//! Geometry Model Tests
//!
//! Tests for:
//! - Attribute addressing and change versions
//! - Vertex normal computation
//! - Merge of partially overlapping attribute sets
//! - Index expansion and legacy geometry flattening, skin and morph streams included
//! - Bounding volumes

mod common;

use glam::{Vec3, Vec4};

use common::{quad, vec3_approx};
use lumen::resources::{BoundingBox, Face3, MorphNormals, MorphTarget};
use lumen::{Attribute, BufferAttribute, BufferGeometry, Geometry};

// ============================================================================
// Attribute addressing
// ============================================================================

#[test]
fn set_xyz_reads_back_per_component() {
    let mut attribute = BufferAttribute::zeroed_f32(4, 3);
    attribute.set_xyz(2, 1.5, -2.0, 3.25);

    assert_eq!(attribute.count(), 4);
    assert_eq!(attribute.get_x(2), 1.5);
    assert_eq!(attribute.get_y(2), -2.0);
    assert_eq!(attribute.get_z(2), 3.25);
    assert_eq!(attribute.array().get(7), -2.0);
    assert_eq!(attribute.get_x(1), 0.0);
}

#[test]
fn count_is_length_over_item_size() {
    let attribute = BufferAttribute::from_f32(vec![0.0; 12], 4);
    assert_eq!(attribute.count(), 3);
    assert_eq!(attribute.item_size(), 4);
}

#[test]
fn needs_update_strictly_increments_version() {
    let mut attribute = BufferAttribute::zeroed_f32(1, 3);
    let before = attribute.version();
    attribute.set_needs_update(true);
    assert!(attribute.version() > before);
    let after = attribute.version();
    attribute.set_needs_update(false);
    assert_eq!(attribute.version(), after);
}

#[test]
fn copy_at_moves_one_element() {
    let source = BufferAttribute::from_f32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
    let mut target = BufferAttribute::zeroed_f32(2, 3);
    target.copy_at(0, &source, 1).unwrap();
    assert_eq!(target.get_vec3(0), Vec3::new(4.0, 5.0, 6.0));
    assert_eq!(target.get_vec3(1), Vec3::ZERO);
}

#[test]
fn copy_at_rejects_mismatched_item_size() {
    let source = BufferAttribute::from_f32(vec![1.0, 2.0], 2);
    let mut target = BufferAttribute::zeroed_f32(2, 3);
    assert!(target.copy_at(0, &source, 0).is_err());
}

// ============================================================================
// Normals
// ============================================================================

#[test]
fn single_triangle_normal_points_up_z() {
    let mut geometry = BufferGeometry::new();
    geometry.set_attribute(
        "position",
        BufferAttribute::from_f32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3),
    );
    geometry.compute_vertex_normals().unwrap();

    let normal = geometry.attribute("normal").unwrap();
    for i in 0..3 {
        assert!(vec3_approx(normal.get_vec3(i), Vec3::Z), "vertex {i}: {:?}", normal.get_vec3(i));
    }
}

#[test]
fn indexed_normals_accumulate_over_shared_vertices() {
    let mut geometry = quad();
    geometry.compute_vertex_normals().unwrap();

    let normal = geometry.attribute("normal").unwrap();
    assert_eq!(normal.count(), 4);
    for i in 0..4 {
        assert!(vec3_approx(normal.get_vec3(i), Vec3::Z));
    }
}

#[test]
fn normals_require_positions() {
    let mut geometry = BufferGeometry::new();
    assert!(geometry.compute_vertex_normals().is_err());
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn merge_skips_attributes_the_source_lacks() {
    let mut target = BufferGeometry::new();
    target.set_attribute("position", BufferAttribute::zeroed_f32(2, 3));
    target.set_attribute("normal", BufferAttribute::from_f32(vec![9.0; 6], 3));

    let mut source = BufferGeometry::new();
    source.set_attribute("position", BufferAttribute::from_f32(vec![1.0, 2.0, 3.0], 3));

    target.merge(&source, 1).unwrap();

    let position = target.attribute("position").unwrap();
    assert_eq!(position.get_vec3(0), Vec3::ZERO);
    assert_eq!(position.get_vec3(1), Vec3::new(1.0, 2.0, 3.0));
    let normal = target.attribute("normal").unwrap();
    assert_eq!(normal.get_vec3(1), Vec3::splat(9.0));
}

#[test]
fn merge_past_the_end_is_an_error() {
    let mut target = BufferGeometry::new();
    target.set_attribute("position", BufferAttribute::zeroed_f32(1, 3));
    let mut source = BufferGeometry::new();
    source.set_attribute("position", BufferAttribute::zeroed_f32(1, 3));
    assert!(target.merge(&source, 1).is_err());
}

#[test]
fn failed_merge_leaves_the_target_untouched() {
    let mut target = BufferGeometry::new();
    target.set_attribute("position", BufferAttribute::zeroed_f32(2, 3));
    target.set_attribute("normal", BufferAttribute::zeroed_f32(1, 3));
    let mut source = BufferGeometry::new();
    source.set_attribute("position", BufferAttribute::from_f32(vec![1.0; 3], 3));
    source.set_attribute("normal", BufferAttribute::from_f32(vec![1.0; 3], 3));

    let versions: Vec<u64> = ["position", "normal"]
        .iter()
        .map(|name| target.attribute(name).unwrap().version())
        .collect();
    assert!(target.merge(&source, 1).is_err());

    for (name, version) in ["position", "normal"].into_iter().zip(versions) {
        let attribute = target.attribute(name).unwrap();
        assert_eq!(attribute.version(), version, "{name}");
        assert_eq!(attribute.get_vec3(attribute.count() - 1), Vec3::ZERO, "{name}");
    }
}

// ============================================================================
// Index expansion and legacy geometry
// ============================================================================

#[test]
fn to_non_indexed_gathers_through_the_index() {
    let expanded = quad().to_non_indexed();
    assert!(expanded.index().is_none());

    let position = expanded.attribute("position").unwrap();
    assert_eq!(position.count(), 6);
    assert_eq!(position.get_vec3(3), Vec3::ZERO);
    assert_eq!(position.get_vec3(5), Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn legacy_faces_expand_to_one_vertex_per_corner() {
    let mut legacy = Geometry::new();
    legacy.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
    legacy.faces = vec![Face3::new(0, 1, 2), Face3::new(0, 2, 3).with_material_index(1)];

    let mut geometry = BufferGeometry::new();
    geometry.from_geometry(&legacy).unwrap();

    let position = geometry.attribute("position").unwrap();
    assert_eq!(position.count(), 6);
    assert_eq!(position.get_vec3(4), Vec3::new(1.0, 1.0, 0.0));
    assert!(geometry.has_attribute("normal"));
    assert_eq!(geometry.groups().len(), 2);
    assert_eq!(geometry.groups()[1].material_index, 1);
}

#[test]
fn legacy_skin_and_morph_streams_become_attributes() {
    let mut legacy = Geometry::new();
    legacy.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    legacy.faces = vec![Face3::new(0, 1, 2)];
    legacy.skin_indices = vec![Vec4::ZERO, Vec4::X, Vec4::Y];
    legacy.skin_weights = vec![Vec4::X; 3];
    legacy.morph_targets.push(MorphTarget {
        name: "lift".to_owned(),
        vertices: vec![Vec3::Z, Vec3::X + Vec3::Z, Vec3::Y + Vec3::Z],
    });
    legacy.morph_normals.push(MorphNormals {
        vertex_normals: vec![[Vec3::Z; 3]],
    });

    let mut geometry = BufferGeometry::new();
    geometry.from_geometry(&legacy).unwrap();

    let skin_index = geometry.attribute("skinIndex").unwrap();
    assert_eq!(skin_index.item_size(), 4);
    assert_eq!(skin_index.count(), 3);
    assert_eq!(skin_index.get_component(1, 0), 1.0);
    assert_eq!(geometry.attribute("skinWeight").unwrap().count(), 3);

    let morph_positions = geometry.morph_attributes("position");
    assert_eq!(morph_positions.len(), 1);
    assert_eq!(morph_positions[0].get_vec3(2), Vec3::new(0.0, 1.0, 1.0));
    assert_eq!(geometry.morph_attributes("normal").len(), 1);
    assert_eq!(geometry.morph_attributes("normal")[0].count(), 3);
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn bounding_box_spans_positions() {
    let mut geometry = quad();
    let bbox = geometry.compute_bounding_box();
    assert_eq!(bbox.min, Vec3::ZERO);
    assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 0.0));
    assert_eq!(geometry.bounding_box(), Some(bbox));
}

#[test]
fn bounding_box_of_empty_geometry_is_degenerate() {
    let mut geometry = BufferGeometry::new();
    assert_eq!(geometry.compute_bounding_box(), BoundingBox::ZERO);
}

#[test]
fn attribute_enum_wraps_buffers() {
    let attribute: Attribute = BufferAttribute::zeroed_f32(3, 2).into();
    assert_eq!(attribute.count(), 3);
    assert!(attribute.as_buffer().is_some());
}
