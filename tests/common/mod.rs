//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use glam::Vec3;
use lumen::renderer::gl::headless::{HeadlessGl, HeadlessLimits};
use lumen::{BufferAttribute, BufferGeometry, GlContext};

pub const EPSILON: f32 = 1e-5;

pub fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

/// Routes `log` output through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A recording context plus the same context behind the backend trait.
pub fn headless() -> (Rc<HeadlessGl>, GlContext) {
    headless_with(HeadlessLimits::default())
}

pub fn headless_with(limits: HeadlessLimits) -> (Rc<HeadlessGl>, GlContext) {
    let headless = Rc::new(HeadlessGl::with_limits(limits));
    let context: GlContext = headless.clone();
    (headless, context)
}

/// Unit quad in the XY plane as two indexed triangles sharing the 0-2 edge.
pub fn quad() -> BufferGeometry {
    let mut geometry = BufferGeometry::new();
    geometry.set_attribute(
        "position",
        BufferAttribute::from_f32(
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0,
            ],
            3,
        ),
    );
    geometry.set_index(Some(BufferAttribute::from_u16(vec![0, 1, 2, 0, 2, 3], 1)));
    geometry
}
