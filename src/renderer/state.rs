//! Write-through cache of GL pipeline state.
//!
//! Every setter compares against the last value it issued and only calls
//! into the context on change. The cache stays truthful as long as all state
//! changes go through it; [`GlState::reset`] forgets everything after the
//! context was lost or touched behind its back.

use glam::{IVec4, Vec4};
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use super::capabilities::GlCapabilities;
use super::gl::{GlContext, ProgramId, TextureId, constants as gl};
use crate::resources::{
    BlendEquation, BlendFactor, BlendSettings, Blending, DepthFunc, Material, Side,
};

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    None,
    Back,
    Front,
    FrontBack,
}

/// The six values behind a custom blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CustomBlend {
    equation: BlendEquation,
    equation_alpha: BlendEquation,
    src: BlendFactor,
    dst: BlendFactor,
    src_alpha: BlendFactor,
    dst_alpha: BlendFactor,
}

impl From<&BlendSettings> for CustomBlend {
    fn from(settings: &BlendSettings) -> Self {
        Self {
            equation: settings.equation,
            equation_alpha: settings.equation_alpha.unwrap_or(settings.equation),
            src: settings.src,
            dst: settings.dst,
            src_alpha: settings.src_alpha.unwrap_or(settings.src),
            dst_alpha: settings.dst_alpha.unwrap_or(settings.dst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StencilFunc {
    func: u32,
    reference: i32,
    mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StencilOp {
    fail: u32,
    zfail: u32,
    zpass: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundTexture {
    target: u32,
    texture: Option<TextureId>,
}

/// Cached values. `None` means unknown: the next setter always issues.
#[derive(Debug, Default)]
struct Current {
    capabilities: FxHashMap<u32, bool>,

    blending: Option<(Blending, bool)>,
    custom_blend: Option<CustomBlend>,

    depth_func: Option<DepthFunc>,
    depth_write: Option<bool>,
    color_write: Option<bool>,

    stencil_func: Option<StencilFunc>,
    stencil_op: Option<StencilOp>,
    stencil_write: Option<u32>,

    flip_sided: Option<bool>,
    cull_face: Option<CullFace>,
    line_width: Option<f32>,
    polygon_offset: Option<(f32, f32)>,

    texture_slot: Option<u32>,
    bound_textures: FxHashMap<u32, BoundTexture>,

    clear_color: Option<Vec4>,
    clear_depth: Option<f32>,
    clear_stencil: Option<i32>,
    scissor: Option<IVec4>,
    viewport: Option<IVec4>,

    program: Option<ProgramId>,
}

pub struct GlState {
    gl: GlContext,
    max_textures: u32,
    instanced_arrays: bool,

    new_attributes: SmallVec<[bool; 16]>,
    enabled_attributes: SmallVec<[bool; 16]>,
    attribute_divisors: SmallVec<[u32; 16]>,

    current: Current,
}

impl GlState {
    #[must_use]
    pub fn new(gl: GlContext, capabilities: &GlCapabilities) -> Self {
        let slots = capabilities.attribute_slots();
        Self {
            gl,
            max_textures: capabilities.max_textures.max(1) as u32,
            instanced_arrays: capabilities.instanced_arrays,
            new_attributes: smallvec![false; slots],
            enabled_attributes: smallvec![false; slots],
            attribute_divisors: smallvec![0; slots],
            current: Current::default(),
        }
    }

    /// Puts the context into the renderer's default state.
    pub fn init(&mut self) {
        self.clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        self.clear_depth(1.0);
        self.clear_stencil(0);

        self.set_depth_test(true);
        self.set_depth_func(DepthFunc::LessEqual);

        self.set_flip_sided(false);
        self.set_cull_face(CullFace::Back);

        self.set_blending(Blending::Normal, &BlendSettings::default(), false);
    }

    // ------------------------------------------------------------------
    // Vertex attributes
    // ------------------------------------------------------------------

    /// Number of attribute slots tracked.
    #[must_use]
    pub fn attribute_slots(&self) -> usize {
        self.enabled_attributes.len()
    }

    /// Starts collecting the attributes used by the next draw.
    pub fn init_attributes(&mut self) {
        self.new_attributes.fill(false);
    }

    pub fn enable_attribute(&mut self, attribute: u32) {
        self.enable_attribute_and_divisor(attribute, 0);
    }

    /// Enables `attribute` and sets its instancing divisor.
    pub fn enable_attribute_and_divisor(&mut self, attribute: u32, divisor: u32) {
        let index = attribute as usize;
        if index >= self.enabled_attributes.len() {
            log::error!(
                "Attribute slot {attribute} exceeds the {} available",
                self.enabled_attributes.len()
            );
            return;
        }

        self.new_attributes[index] = true;
        if !self.enabled_attributes[index] {
            self.gl.enable_vertex_attrib_array(attribute);
            self.enabled_attributes[index] = true;
        }

        if self.attribute_divisors[index] != divisor {
            if self.instanced_arrays {
                self.gl.vertex_attrib_divisor(attribute, divisor);
            }
            self.attribute_divisors[index] = divisor;
        }
    }

    /// Disables every slot enabled earlier but not requested since
    /// [`init_attributes`](Self::init_attributes).
    pub fn disable_unused_attributes(&mut self) {
        for (index, (enabled, requested)) in self
            .enabled_attributes
            .iter_mut()
            .zip(&self.new_attributes)
            .enumerate()
        {
            if *enabled && !*requested {
                self.gl.disable_vertex_attrib_array(index as u32);
                *enabled = false;
            }
        }
    }

    #[must_use]
    pub fn is_attribute_enabled(&self, attribute: u32) -> bool {
        self.enabled_attributes
            .get(attribute as usize)
            .copied()
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    pub fn enable(&mut self, capability: u32) {
        if self.current.capabilities.get(&capability) != Some(&true) {
            self.gl.enable(capability);
            self.current.capabilities.insert(capability, true);
        }
    }

    pub fn disable(&mut self, capability: u32) {
        if self.current.capabilities.get(&capability) != Some(&false) {
            self.gl.disable(capability);
            self.current.capabilities.insert(capability, false);
        }
    }

    fn toggle(&mut self, capability: u32, on: bool) {
        if on {
            self.enable(capability);
        } else {
            self.disable(capability);
        }
    }

    #[must_use]
    pub fn is_enabled(&self, capability: u32) -> Option<bool> {
        self.current.capabilities.get(&capability).copied()
    }

    // ------------------------------------------------------------------
    // Blending
    // ------------------------------------------------------------------

    /// Applies a blend preset, or the explicit factors in `custom` for
    /// [`Blending::Custom`].
    pub fn set_blending(
        &mut self,
        blending: Blending,
        custom: &BlendSettings,
        premultiplied_alpha: bool,
    ) {
        self.toggle(gl::BLEND, blending != Blending::None);

        if self.current.blending != Some((blending, premultiplied_alpha)) {
            self.apply_blend_preset(blending, premultiplied_alpha);
            self.current.blending = Some((blending, premultiplied_alpha));
        }

        if blending != Blending::Custom {
            self.current.custom_blend = None;
            return;
        }

        let requested = CustomBlend::from(custom);
        let previous = self.current.custom_blend;
        let equations_changed = previous.is_none_or(|p| {
            (p.equation, p.equation_alpha) != (requested.equation, requested.equation_alpha)
        });
        if equations_changed {
            self.gl.blend_equation_separate(
                blend_equation(requested.equation),
                blend_equation(requested.equation_alpha),
            );
        }
        let factors_changed = previous.is_none_or(|p| {
            (p.src, p.dst, p.src_alpha, p.dst_alpha)
                != (requested.src, requested.dst, requested.src_alpha, requested.dst_alpha)
        });
        if factors_changed {
            self.gl.blend_func_separate(
                blend_factor(requested.src),
                blend_factor(requested.dst),
                blend_factor(requested.src_alpha),
                blend_factor(requested.dst_alpha),
            );
        }
        self.current.custom_blend = Some(requested);
    }

    fn apply_blend_preset(&self, blending: Blending, premultiplied: bool) {
        let separate = |src, dst, src_alpha, dst_alpha| {
            self.gl.blend_equation_separate(gl::FUNC_ADD, gl::FUNC_ADD);
            self.gl.blend_func_separate(src, dst, src_alpha, dst_alpha);
        };
        let single = |src, dst| {
            self.gl.blend_equation(gl::FUNC_ADD);
            self.gl.blend_func(src, dst);
        };

        match (blending, premultiplied) {
            (Blending::None | Blending::Custom, _) => {}
            (Blending::Normal, true) => separate(
                gl::ONE,
                gl::ONE_MINUS_SRC_ALPHA,
                gl::ONE,
                gl::ONE_MINUS_SRC_ALPHA,
            ),
            (Blending::Normal, false) => separate(
                gl::SRC_ALPHA,
                gl::ONE_MINUS_SRC_ALPHA,
                gl::ONE,
                gl::ONE_MINUS_SRC_ALPHA,
            ),
            (Blending::Additive, true) => separate(gl::ONE, gl::ONE, gl::ONE, gl::ONE),
            (Blending::Additive, false) => single(gl::SRC_ALPHA, gl::ONE),
            (Blending::Subtractive, true) => separate(
                gl::ZERO,
                gl::ZERO,
                gl::ONE_MINUS_SRC_COLOR,
                gl::ONE_MINUS_SRC_ALPHA,
            ),
            (Blending::Subtractive, false) => single(gl::ZERO, gl::ONE_MINUS_SRC_COLOR),
            (Blending::Multiply, true) => {
                separate(gl::ZERO, gl::SRC_COLOR, gl::ZERO, gl::SRC_ALPHA);
            }
            (Blending::Multiply, false) => single(gl::ZERO, gl::SRC_COLOR),
        }
    }

    // ------------------------------------------------------------------
    // Depth, color and stencil
    // ------------------------------------------------------------------

    pub fn set_depth_test(&mut self, depth_test: bool) {
        self.toggle(gl::DEPTH_TEST, depth_test);
    }

    pub fn set_depth_func(&mut self, depth_func: DepthFunc) {
        if self.current.depth_func != Some(depth_func) {
            self.gl.depth_func(depth_function(depth_func));
            self.current.depth_func = Some(depth_func);
        }
    }

    pub fn set_depth_write(&mut self, depth_write: bool) {
        if self.current.depth_write != Some(depth_write) {
            self.gl.depth_mask(depth_write);
            self.current.depth_write = Some(depth_write);
        }
    }

    pub fn set_color_write(&mut self, color_write: bool) {
        if self.current.color_write != Some(color_write) {
            self.gl
                .color_mask(color_write, color_write, color_write, color_write);
            self.current.color_write = Some(color_write);
        }
    }

    pub fn set_stencil_test(&mut self, stencil_test: bool) {
        self.toggle(gl::STENCIL_TEST, stencil_test);
    }

    pub fn set_stencil_func(&mut self, func: u32, reference: i32, mask: u32) {
        let requested = StencilFunc {
            func,
            reference,
            mask,
        };
        if self.current.stencil_func != Some(requested) {
            self.gl.stencil_func(func, reference, mask);
            self.current.stencil_func = Some(requested);
        }
    }

    pub fn set_stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        let requested = StencilOp { fail, zfail, zpass };
        if self.current.stencil_op != Some(requested) {
            self.gl.stencil_op(fail, zfail, zpass);
            self.current.stencil_op = Some(requested);
        }
    }

    /// Stencil write mask.
    pub fn set_stencil_write(&mut self, mask: u32) {
        if self.current.stencil_write != Some(mask) {
            self.gl.stencil_mask(mask);
            self.current.stencil_write = Some(mask);
        }
    }

    // ------------------------------------------------------------------
    // Rasterizer
    // ------------------------------------------------------------------

    /// Clockwise front faces when `true`.
    pub fn set_flip_sided(&mut self, flip_sided: bool) {
        if self.current.flip_sided != Some(flip_sided) {
            self.gl.front_face(if flip_sided { gl::CW } else { gl::CCW });
            self.current.flip_sided = Some(flip_sided);
        }
    }

    pub fn set_cull_face(&mut self, cull_face: CullFace) {
        if self.current.cull_face == Some(cull_face) {
            return;
        }
        let mode = match cull_face {
            CullFace::None => None,
            CullFace::Back => Some(gl::BACK),
            CullFace::Front => Some(gl::FRONT),
            CullFace::FrontBack => Some(gl::FRONT_AND_BACK),
        };
        match mode {
            Some(mode) => {
                self.enable(gl::CULL_FACE);
                self.gl.cull_face(mode);
            }
            None => self.disable(gl::CULL_FACE),
        }
        self.current.cull_face = Some(cull_face);
    }

    pub fn set_line_width(&mut self, width: f32) {
        if self.current.line_width != Some(width) {
            self.gl.line_width(width);
            self.current.line_width = Some(width);
        }
    }

    pub fn set_polygon_offset(&mut self, polygon_offset: bool, factor: f32, units: f32) {
        self.toggle(gl::POLYGON_OFFSET_FILL, polygon_offset);
        if polygon_offset && self.current.polygon_offset != Some((factor, units)) {
            self.gl.polygon_offset(factor, units);
            self.current.polygon_offset = Some((factor, units));
        }
    }

    pub fn set_scissor_test(&mut self, scissor_test: bool) {
        self.toggle(gl::SCISSOR_TEST, scissor_test);
    }

    #[must_use]
    pub fn scissor_test(&self) -> bool {
        self.is_enabled(gl::SCISSOR_TEST).unwrap_or(false)
    }

    /// Applies the per-draw state a material asks for.
    pub fn set_material(&mut self, material: &Material) {
        self.set_cull_face(if material.side == Side::Double {
            CullFace::None
        } else {
            CullFace::Back
        });
        self.set_flip_sided(material.side == Side::Back);

        if material.transparent {
            self.set_blending(
                material.blending,
                &material.blend,
                material.premultiplied_alpha,
            );
        } else {
            self.set_blending(Blending::None, &material.blend, false);
        }

        self.set_depth_func(material.depth_func);
        self.set_depth_test(material.depth_test);
        self.set_depth_write(material.depth_write);
        self.set_color_write(material.color_write);
        self.set_polygon_offset(
            material.polygon_offset,
            material.polygon_offset_factor,
            material.polygon_offset_units,
        );
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Activates texture unit `TEXTURE0 + unit`.
    pub fn active_texture(&mut self, unit: u32) {
        let slot = gl::TEXTURE0 + unit;
        if self.current.texture_slot != Some(slot) {
            self.gl.active_texture(slot);
            self.current.texture_slot = Some(slot);
        }
    }

    /// Binds on the active unit, or on the last unit if none was activated.
    pub fn bind_texture(&mut self, target: u32, texture: Option<TextureId>) {
        let slot = match self.current.texture_slot {
            Some(slot) => slot,
            None => {
                self.active_texture(self.max_textures - 1);
                gl::TEXTURE0 + self.max_textures - 1
            }
        };

        let requested = BoundTexture { target, texture };
        if self.current.bound_textures.get(&slot) != Some(&requested) {
            self.gl.bind_texture(target, texture);
            self.current.bound_textures.insert(slot, requested);
        }
    }

    // ------------------------------------------------------------------
    // Clear values and rectangles
    // ------------------------------------------------------------------

    pub fn clear_color(&mut self, color: Vec4) {
        if self.current.clear_color != Some(color) {
            self.gl.clear_color(color.x, color.y, color.z, color.w);
            self.current.clear_color = Some(color);
        }
    }

    pub fn clear_depth(&mut self, depth: f32) {
        if self.current.clear_depth != Some(depth) {
            self.gl.clear_depth(depth);
            self.current.clear_depth = Some(depth);
        }
    }

    pub fn clear_stencil(&mut self, stencil: i32) {
        if self.current.clear_stencil != Some(stencil) {
            self.gl.clear_stencil(stencil);
            self.current.clear_stencil = Some(stencil);
        }
    }

    /// `(x, y, width, height)`.
    pub fn scissor(&mut self, rect: IVec4) {
        if self.current.scissor != Some(rect) {
            self.gl.scissor(rect.x, rect.y, rect.z, rect.w);
            self.current.scissor = Some(rect);
        }
    }

    /// `(x, y, width, height)`.
    pub fn viewport(&mut self, rect: IVec4) {
        if self.current.viewport != Some(rect) {
            self.gl.viewport(rect.x, rect.y, rect.z, rect.w);
            self.current.viewport = Some(rect);
        }
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    /// Returns `true` when the program actually changed.
    pub fn use_program(&mut self, program: Option<ProgramId>) -> bool {
        if self.current.program == program {
            return false;
        }
        self.gl.use_program(program);
        self.current.program = program;
        true
    }

    #[must_use]
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current.program
    }

    /// Disables every attribute slot and forgets all cached values.
    pub fn reset(&mut self) {
        for (index, enabled) in self.enabled_attributes.iter_mut().enumerate() {
            if *enabled {
                self.gl.disable_vertex_attrib_array(index as u32);
                *enabled = false;
            }
        }
        self.new_attributes.fill(false);
        self.attribute_divisors.fill(0);
        self.current = Current::default();
    }
}

fn blend_equation(equation: BlendEquation) -> u32 {
    match equation {
        BlendEquation::Add => gl::FUNC_ADD,
        BlendEquation::Subtract => gl::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
        BlendEquation::Min => gl::MIN,
        BlendEquation::Max => gl::MAX,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => gl::ZERO,
        BlendFactor::One => gl::ONE,
        BlendFactor::SrcColor => gl::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => gl::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => gl::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => gl::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => gl::ONE_MINUS_DST_ALPHA,
        BlendFactor::DstColor => gl::DST_COLOR,
        BlendFactor::OneMinusDstColor => gl::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlphaSaturate => gl::SRC_ALPHA_SATURATE,
    }
}

fn depth_function(func: DepthFunc) -> u32 {
    match func {
        DepthFunc::Never => gl::NEVER,
        DepthFunc::Always => gl::ALWAYS,
        DepthFunc::Less => gl::LESS,
        DepthFunc::LessEqual => gl::LEQUAL,
        DepthFunc::Equal => gl::EQUAL,
        DepthFunc::GreaterEqual => gl::GEQUAL,
        DepthFunc::Greater => gl::GREATER,
        DepthFunc::NotEqual => gl::NOTEQUAL,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::renderer::gl::headless::{GlCall, HeadlessGl};

    fn state() -> (Rc<HeadlessGl>, GlState) {
        let headless = Rc::new(HeadlessGl::new());
        let context: GlContext = headless.clone();
        let caps = GlCapabilities::new(&context);
        (headless, GlState::new(context, &caps))
    }

    #[test]
    fn init_goes_through_the_cache() {
        let (headless, mut state) = state();
        state.init();
        let issued = headless.calls().len();
        state.init();
        assert_eq!(headless.calls().len(), issued);
        assert_eq!(state.is_enabled(gl::DEPTH_TEST), Some(true));
        assert_eq!(state.is_enabled(gl::CULL_FACE), Some(true));
        assert_eq!(state.is_enabled(gl::BLEND), Some(true));
    }

    #[test]
    fn custom_blend_reissues_only_changed_halves() {
        let (headless, mut state) = state();
        let mut custom = BlendSettings::default();
        state.set_blending(Blending::Custom, &custom, false);
        headless.clear_calls();

        state.set_blending(Blending::Custom, &custom, false);
        assert!(headless.calls().is_empty());

        custom.dst_alpha = Some(BlendFactor::One);
        state.set_blending(Blending::Custom, &custom, false);
        assert_eq!(
            headless.calls(),
            [GlCall::BlendFuncSeparate(
                gl::SRC_ALPHA,
                gl::ONE_MINUS_SRC_ALPHA,
                gl::SRC_ALPHA,
                gl::ONE
            )]
        );
    }

    #[test]
    fn leaving_custom_forgets_its_factors() {
        let (headless, mut state) = state();
        let custom = BlendSettings::default();
        state.set_blending(Blending::Custom, &custom, false);
        state.set_blending(Blending::Additive, &custom, false);
        headless.clear_calls();

        state.set_blending(Blending::Custom, &custom, false);
        assert_eq!(
            headless.count_calls(|c| matches!(c, GlCall::BlendEquationSeparate(..))),
            1
        );
        assert_eq!(
            headless.count_calls(|c| matches!(c, GlCall::BlendFuncSeparate(..))),
            1
        );
    }

    #[test]
    fn presets_issue_fixed_factors() {
        let (headless, mut state) = state();
        let custom = BlendSettings::default();
        state.set_blending(Blending::Multiply, &custom, false);
        assert!(headless.calls().contains(&GlCall::BlendFunc(gl::ZERO, gl::SRC_COLOR)));

        state.set_blending(Blending::None, &custom, false);
        assert!(headless.calls().contains(&GlCall::Disable(gl::BLEND)));
    }

    #[test]
    fn unchanged_setters_are_silent() {
        let (headless, mut state) = state();
        state.set_depth_write(false);
        state.set_line_width(2.0);
        state.set_stencil_func(gl::ALWAYS, 1, 0xff);
        state.viewport(IVec4::new(0, 0, 640, 480));
        headless.clear_calls();

        state.set_depth_write(false);
        state.set_line_width(2.0);
        state.set_stencil_func(gl::ALWAYS, 1, 0xff);
        state.viewport(IVec4::new(0, 0, 640, 480));
        assert!(headless.calls().is_empty());

        state.viewport(IVec4::new(0, 0, 320, 240));
        assert_eq!(headless.calls(), [GlCall::Viewport([0, 0, 320, 240])]);
    }

    #[test]
    fn polygon_offset_values_only_while_enabled() {
        let (headless, mut state) = state();
        state.set_polygon_offset(false, 1.0, 1.0);
        assert_eq!(headless.count_calls(|c| matches!(c, GlCall::PolygonOffset(..))), 0);
        state.set_polygon_offset(true, 1.0, 1.0);
        state.set_polygon_offset(true, 1.0, 1.0);
        assert_eq!(headless.count_calls(|c| matches!(c, GlCall::PolygonOffset(..))), 1);
    }

    #[test]
    fn attributes_not_requested_are_disabled() {
        let (headless, mut state) = state();
        state.init_attributes();
        state.enable_attribute(0);
        state.enable_attribute(1);
        state.disable_unused_attributes();

        state.init_attributes();
        state.enable_attribute(0);
        state.disable_unused_attributes();

        assert!(state.is_attribute_enabled(0));
        assert!(!state.is_attribute_enabled(1));
        assert_eq!(
            headless.count_calls(|c| *c == GlCall::EnableVertexAttribArray(0)),
            1
        );
        assert_eq!(
            headless.count_calls(|c| *c == GlCall::DisableVertexAttribArray(1)),
            1
        );
    }

    #[test]
    fn divisors_follow_requests() {
        let (headless, mut state) = state();
        state.enable_attribute_and_divisor(2, 1);
        state.enable_attribute_and_divisor(2, 1);
        state.enable_attribute(2);
        assert_eq!(
            headless.calls(),
            [
                GlCall::EnableVertexAttribArray(2),
                GlCall::VertexAttribDivisor(2, 1),
                GlCall::VertexAttribDivisor(2, 0),
            ]
        );
    }

    #[test]
    fn out_of_range_attribute_is_ignored() {
        let (headless, mut state) = state();
        let slots = state.attribute_slots() as u32;
        state.enable_attribute(slots);
        assert!(headless.calls().is_empty());
    }

    #[test]
    fn bind_without_active_unit_uses_the_last() {
        let (headless, mut state) = state();
        state.bind_texture(gl::TEXTURE_2D, None);
        let last = gl::TEXTURE0 + headless.limits().max_textures as u32 - 1;
        assert_eq!(headless.calls()[0], GlCall::ActiveTexture(last));

        state.active_texture(0);
        state.bind_texture(gl::TEXTURE_2D, None);
        state.bind_texture(gl::TEXTURE_2D, None);
        assert_eq!(headless.count_calls(|c| matches!(c, GlCall::BindTexture(..))), 2);
    }

    #[test]
    fn set_material_follows_side_and_transparency() {
        let (headless, mut state) = state();
        let mut material = crate::resources::Material::basic();
        material.side = Side::Double;
        state.set_material(&material);
        assert_eq!(state.is_enabled(gl::CULL_FACE), Some(false));
        assert_eq!(state.is_enabled(gl::BLEND), Some(false));

        material.side = Side::Back;
        material.transparent = true;
        state.set_material(&material);
        assert_eq!(state.is_enabled(gl::BLEND), Some(true));
        assert!(headless.calls().contains(&GlCall::FrontFace(gl::CW)));
    }

    #[test]
    fn reset_forgets_state_and_disables_attributes() {
        let (headless, mut state) = state();
        state.set_depth_write(true);
        state.enable_attribute(3);
        assert!(!state.use_program(None));
        state.reset();
        assert!(headless.calls().contains(&GlCall::DisableVertexAttribArray(3)));

        headless.clear_calls();
        state.set_depth_write(true);
        assert_eq!(headless.calls(), [GlCall::DepthMask(true)]);
    }
}
