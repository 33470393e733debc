//! GPU Buffer Cache Tests
//!
//! Tests for:
//! - Version-driven re-upload of attribute buffers
//! - Legacy geometry memoization
//! - Wireframe edge deduplication
//! - Buffer lifetime on dispose and attribute replacement

mod common;

use std::rc::Rc;

use glam::Vec3;

use common::{headless, quad};
use lumen::renderer::GlObjects;
use lumen::renderer::gl::headless::GlCall;
use lumen::resources::{AttributeArray, Face3, InterleavedBufferAttribute};
use lumen::scene::ObjectGeometry;
use lumen::{BufferAttribute, BufferGeometry, Geometry, InterleavedBuffer, RenderObject};

fn uploads(calls: &[GlCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, GlCall::BufferData { .. } | GlCall::BufferSubData { .. }))
        .count()
}

#[test]
fn update_uploads_once_per_version() {
    let (headless, context) = headless();
    let mut objects = GlObjects::new(context, true);
    let object = RenderObject::mesh(quad());

    objects.update(&object).unwrap();
    assert_eq!(uploads(&headless.calls()), 2);

    headless.clear_calls();
    objects.update(&object).unwrap();
    assert_eq!(uploads(&headless.calls()), 0);

    let ObjectGeometry::Buffer(geometry) = &object.geometry else {
        unreachable!()
    };
    {
        let mut geometry = geometry.borrow_mut();
        let position = geometry.attribute_mut("position").unwrap();
        position.set_vec3(2, Vec3::new(2.0, 2.0, 0.0));
        position.set_needs_update(true);
    }
    objects.update(&object).unwrap();
    assert_eq!(uploads(&headless.calls()), 1);
}

#[test]
fn legacy_geometry_is_flattened_once() {
    let (_, context) = headless();
    let mut objects = GlObjects::new(context, true);

    let mut legacy = Geometry::new();
    legacy.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    legacy.faces = vec![Face3::new(0, 1, 2)];
    let object = RenderObject::mesh(legacy);

    let first = objects.update(&object).unwrap();
    let second = objects.update(&object).unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(objects.geometries().count(), 1);
    assert_eq!(first.borrow().attribute("position").unwrap().count(), 3);
}

#[test]
fn two_triangles_sharing_an_edge_give_five_segments() {
    let (_, context) = headless();
    let mut objects = GlObjects::new(context, true);

    let wireframe = objects.wireframe_attribute(&quad()).unwrap();
    assert_eq!(wireframe.count(), 10);

    let mut edges: Vec<(u32, u32)> = (0..5)
        .map(|i| {
            let a = wireframe.array().get_u32(i * 2);
            let b = wireframe.array().get_u32(i * 2 + 1);
            (a.min(b), a.max(b))
        })
        .collect();
    edges.sort_unstable();
    assert_eq!(edges, [(0, 1), (0, 2), (0, 3), (1, 2), (2, 3)]);
}

#[test]
fn dispose_releases_every_buffer() {
    let (headless, context) = headless();
    let mut objects = GlObjects::new(context, true);
    let object = RenderObject::mesh(quad());
    let geometry = objects.update(&object).unwrap();
    objects.wireframe_attribute(&geometry.borrow()).unwrap();
    assert_eq!(headless.live_buffers(), 3);

    objects.dispose_geometry(&object.geometry.uuid());
    assert_eq!(headless.live_buffers(), 0);
    assert_eq!(objects.buffer_count(), 0);
    assert!(!objects.geometries().contains(&object.geometry.uuid()));
}

#[test]
fn replaced_attribute_frees_its_old_buffer() {
    let (headless, context) = headless();
    let mut objects = GlObjects::new(context, true);
    let object = RenderObject::mesh(quad());
    objects.update(&object).unwrap();
    assert_eq!(headless.live_buffers(), 2);

    let ObjectGeometry::Buffer(geometry) = &object.geometry else {
        unreachable!()
    };
    geometry
        .borrow_mut()
        .set_attribute("position", BufferAttribute::zeroed_f32(4, 3));
    objects.update(&object).unwrap();
    assert_eq!(headless.live_buffers(), 2);

    objects.dispose_geometry(&object.geometry.uuid());
    assert_eq!(headless.live_buffers(), 0);
}

#[test]
fn reflattened_legacy_geometry_keeps_buffer_count() {
    let (headless, context) = headless();
    let mut objects = GlObjects::new(context, true);

    let mut legacy = Geometry::new();
    legacy.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    legacy.faces = vec![Face3::new(0, 1, 2)];
    let object = RenderObject::mesh(legacy);
    objects.update(&object).unwrap();
    let live = headless.live_buffers();
    assert!(live > 0);

    let ObjectGeometry::Legacy(legacy) = &object.geometry else {
        unreachable!()
    };
    legacy.borrow_mut().elements_need_update = true;
    objects.update(&object).unwrap();
    assert_eq!(headless.live_buffers(), live);

    objects.dispose_geometry(&object.geometry.uuid());
    assert_eq!(headless.live_buffers(), 0);
    assert_eq!(objects.buffer_count(), 0);
}

#[test]
fn shared_attribute_survives_disposing_one_owner() {
    let (headless, context) = headless();
    let mut objects = GlObjects::new(context, true);
    let buffer = InterleavedBuffer::new(AttributeArray::Float32(vec![0.0; 9]), 3).shared();
    let mut first = BufferGeometry::new();
    first.set_attribute("position", InterleavedBufferAttribute::new(buffer.clone(), 3, 0));
    first.set_index(Some(BufferAttribute::from_u16(vec![0, 1, 2], 1)));
    let mut second = BufferGeometry::new();
    second.set_attribute("position", InterleavedBufferAttribute::new(buffer, 3, 0));
    let first = RenderObject::mesh(first);
    let second = RenderObject::mesh(second);
    objects.update(&first).unwrap();
    objects.update(&second).unwrap();
    assert_eq!(headless.live_buffers(), 2);

    objects.dispose_geometry(&first.geometry.uuid());
    assert_eq!(headless.live_buffers(), 1);
    objects.dispose_geometry(&second.geometry.uuid());
    assert_eq!(headless.live_buffers(), 0);
}

#[test]
fn wireframe_follows_index_changes() {
    let (headless, context) = headless();
    let mut objects = GlObjects::new(context, true);
    let mut geometry = quad();
    assert_eq!(objects.wireframe_attribute(&geometry).unwrap().count(), 10);

    geometry.set_index(Some(BufferAttribute::from_u16(vec![0, 1, 2], 1)));
    assert_eq!(objects.wireframe_attribute(&geometry).unwrap().count(), 6);
    assert_eq!(headless.live_buffers(), 1);
}
