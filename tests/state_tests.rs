//! GL State Cache Tests
//!
//! Tests for:
//! - Redundant setters issuing no GL calls
//! - Material-driven state transitions
//! - Vertex attribute slot tracking

mod common;

use common::headless;
use lumen::renderer::gl::constants as gl;
use lumen::renderer::gl::headless::GlCall;
use lumen::renderer::{CullFace, GlCapabilities, GlState};
use lumen::resources::{Blending, Side};
use lumen::Material;

fn state() -> (std::rc::Rc<lumen::HeadlessGl>, GlState) {
    let (headless, context) = headless();
    let capabilities = GlCapabilities::new(&context);
    let mut state = GlState::new(context, &capabilities);
    state.init();
    headless.clear_calls();
    (headless, state)
}

#[test]
fn depth_write_twice_issues_one_call() {
    let (headless, mut state) = state();
    state.set_depth_write(true);
    state.set_depth_write(true);
    assert_eq!(headless.calls(), [GlCall::DepthMask(true)]);
}

#[test]
fn depth_write_toggle_issues_two_calls() {
    let (headless, mut state) = state();
    state.set_depth_write(true);
    state.set_depth_write(false);
    assert_eq!(headless.calls(), [GlCall::DepthMask(true), GlCall::DepthMask(false)]);
}

#[test]
fn init_sets_defaults_once() {
    let (headless, mut state) = state();
    state.init();
    assert!(headless.calls().is_empty());
    assert_eq!(state.is_enabled(gl::DEPTH_TEST), Some(true));
    assert_eq!(state.is_enabled(gl::CULL_FACE), Some(true));
}

#[test]
fn double_sided_transparent_material() {
    let (headless, mut state) = state();
    let mut material = Material::basic();
    material.side = Side::Double;
    material.transparent = true;
    material.blending = Blending::Additive;

    state.set_material(&material);
    let calls = headless.calls();
    assert!(calls.contains(&GlCall::Disable(gl::CULL_FACE)));
    assert!(calls.contains(&GlCall::BlendFunc(gl::SRC_ALPHA, gl::ONE)));

    headless.clear_calls();
    state.set_material(&material);
    assert!(headless.calls().is_empty());
}

#[test]
fn opaque_material_disables_blending() {
    let (headless, mut state) = state();
    state.set_material(&Material::basic());
    assert!(headless.calls().contains(&GlCall::Disable(gl::BLEND)));
    assert_eq!(state.is_enabled(gl::BLEND), Some(false));
}

#[test]
fn back_side_flips_front_face() {
    let (headless, mut state) = state();
    let mut material = Material::basic();
    material.side = Side::Back;
    state.set_material(&material);
    assert!(headless.calls().contains(&GlCall::FrontFace(gl::CW)));
}

#[test]
fn cull_face_modes_map_to_gl() {
    let (headless, mut state) = state();
    state.set_cull_face(CullFace::FrontBack);
    assert_eq!(headless.calls(), [GlCall::CullFace(gl::FRONT_AND_BACK)]);
}

#[test]
fn unused_attributes_are_disabled() {
    let (headless, mut state) = state();
    state.init_attributes();
    state.enable_attribute(0);
    state.enable_attribute(1);
    state.disable_unused_attributes();

    state.init_attributes();
    state.enable_attribute(0);
    state.disable_unused_attributes();

    assert_eq!(
        headless.calls(),
        [
            GlCall::EnableVertexAttribArray(0),
            GlCall::EnableVertexAttribArray(1),
            GlCall::DisableVertexAttribArray(1),
        ]
    );
    assert!(state.is_attribute_enabled(0));
    assert!(!state.is_attribute_enabled(1));
}

#[test]
fn reset_forgets_everything() {
    let (headless, mut state) = state();
    state.set_depth_write(true);
    state.reset();
    headless.clear_calls();
    state.set_depth_write(true);
    assert_eq!(headless.calls(), [GlCall::DepthMask(true)]);
}
