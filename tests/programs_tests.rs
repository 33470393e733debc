//! Shader Program Cache Tests
//!
//! Tests for:
//! - Sharing of programs between materials with equal parameters
//! - Reference counting down to destruction
//! - Parameter sensitivity to lights, fog and settings
//! - Graceful compile failures

mod common;

use glam::{Mat4, Vec3};

use common::headless;
use lumen::renderer::program::ProgramParameters;
use lumen::renderer::{GlCapabilities, GlLights, GlPrograms, LightsState, ProgramHandle};
use lumen::resources::{MaterialKind, ShaderSource};
use lumen::{BufferGeometry, Fog, Light, Material, RenderObject, RendererSettings};

fn programs() -> (std::rc::Rc<lumen::HeadlessGl>, GlPrograms) {
    let (headless, context) = headless();
    let capabilities = GlCapabilities::new(&context);
    (headless, GlPrograms::new(context, capabilities))
}

fn parameters(
    programs: &GlPrograms,
    material: &Material,
    lights: &LightsState,
    fog: Option<&Fog>,
) -> ProgramParameters {
    let object = RenderObject::mesh(BufferGeometry::new());
    programs.get_parameters(material, lights, fog, &object, &RendererSettings::default())
}

fn acquire(programs: &mut GlPrograms, material: &Material) -> ProgramHandle {
    let params = parameters(programs, material, &LightsState::default(), None);
    let code = programs.program_code(material, &params);
    programs.acquire(material, &params, code).unwrap()
}

#[test]
fn usage_count_tracks_live_acquirers() {
    let (headless, mut programs) = programs();
    let materials: Vec<Material> = (0..3).map(|_| Material::standard()).collect();
    let handles: Vec<ProgramHandle> = materials
        .iter()
        .map(|m| acquire(&mut programs, m))
        .collect();

    assert!(handles.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(programs.used_times(handles[0]), 3);
    assert_eq!(headless.live_programs(), 1);

    for (released, handle) in handles.iter().enumerate() {
        let destroyed = programs.release(*handle);
        assert_eq!(destroyed, released == 2);
    }
    assert!(programs.is_empty());
    assert_eq!(headless.live_programs(), 0);
}

#[test]
fn light_counts_change_the_code() {
    let (_, programs) = programs();
    let material = Material::phong();

    let mut lights = GlLights::new();
    let unlit = lights.setup(&[], &Mat4::IDENTITY).clone();
    let lit = lights
        .setup(
            &[Light::new_point(Vec3::ONE, 1.0, 10.0).with_position(Vec3::Y)],
            &Mat4::IDENTITY,
        )
        .clone();
    assert_ne!(unlit.hash, lit.hash);

    let a = parameters(&programs, &material, &unlit, None);
    let b = parameters(&programs, &material, &lit, None);
    assert_ne!(programs.program_code(&material, &a), programs.program_code(&material, &b));
}

#[test]
fn fog_kind_changes_the_code() {
    let (_, programs) = programs();
    let material = Material::basic();
    let lights = LightsState::default();
    let linear = Fog::Linear {
        color: Vec3::ONE,
        near: 1.0,
        far: 100.0,
    };
    let exp2 = Fog::Exp2 {
        color: Vec3::ONE,
        density: 0.1,
    };

    let codes: Vec<String> = [None, Some(&linear), Some(&exp2)]
        .into_iter()
        .map(|fog| {
            let params = parameters(&programs, &material, &lights, fog);
            programs.program_code(&material, &params)
        })
        .collect();
    assert_ne!(codes[0], codes[1]);
    assert_ne!(codes[1], codes[2]);
}

#[test]
fn broken_shader_yields_a_non_runnable_program() {
    let (headless, mut programs) = programs();
    let material = Material::new(MaterialKind::Shader(ShaderSource {
        vertex: "void main() { gl_Position = vec4(position, 1.0); }".to_string(),
        fragment: "#error broken\nvoid main() {}".to_string(),
    }));

    let handle = acquire(&mut programs, &material);
    let program = programs.get(handle).unwrap();
    assert!(!program.is_runnable());
    let diagnostics = program.diagnostics().unwrap();
    assert!(!diagnostics.fragment_log.is_empty());
    assert_eq!(headless.live_shaders(), 0);
}
