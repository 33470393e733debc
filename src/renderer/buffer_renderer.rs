//! Draw-call issuing.
//!
//! [`GlBufferRenderer`] draws vertex ranges with `drawArrays`,
//! [`GlIndexedBufferRenderer`] draws index ranges with `drawElements`. Both
//! record what they draw into a [`RenderInfo`].

use super::gl::{GlContext, constants as gl};
use super::info::RenderInfo;
use crate::resources::BufferAttribute;

pub trait BufferRenderer {
    /// Primitive mode for subsequent draws.
    fn set_mode(&mut self, mode: u32);

    fn mode(&self) -> u32;

    /// Draws `count` elements starting at element `start`.
    fn render(&mut self, info: &mut RenderInfo, start: usize, count: usize);

    /// Instanced variant of [`render`](Self::render). Without
    /// `ANGLE_instanced_arrays` the draw is skipped with an error log.
    fn render_instances(&mut self, info: &mut RenderInfo, start: usize, count: usize, instances: u32);
}

pub struct GlBufferRenderer {
    gl: GlContext,
    instanced_arrays: bool,
    mode: u32,
}

impl GlBufferRenderer {
    #[must_use]
    pub fn new(gl: GlContext, instanced_arrays: bool) -> Self {
        Self {
            gl,
            instanced_arrays,
            mode: gl::TRIANGLES,
        }
    }
}

impl BufferRenderer for GlBufferRenderer {
    fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn render(&mut self, info: &mut RenderInfo, start: usize, count: usize) {
        self.gl.draw_arrays(self.mode, start as i32, count as i32);
        info.record_draw(self.mode, count, 1);
    }

    fn render_instances(&mut self, info: &mut RenderInfo, start: usize, count: usize, instances: u32) {
        if !self.instanced_arrays {
            log::error!("ANGLE_instanced_arrays unavailable: skipping instanced draw");
            return;
        }
        self.gl
            .draw_arrays_instanced(self.mode, start as i32, count as i32, instances as i32);
        info.record_draw(self.mode, count, instances);
    }
}

pub struct GlIndexedBufferRenderer {
    gl: GlContext,
    element_index_uint: bool,
    instanced_arrays: bool,
    mode: u32,
    index_type: u32,
    bytes_per_element: usize,
}

impl GlIndexedBufferRenderer {
    #[must_use]
    pub fn new(gl: GlContext, element_index_uint: bool, instanced_arrays: bool) -> Self {
        Self {
            gl,
            element_index_uint,
            instanced_arrays,
            mode: gl::TRIANGLES,
            index_type: gl::UNSIGNED_SHORT,
            bytes_per_element: 2,
        }
    }

    /// Picks 32-bit indices for a `u32` index when the context supports them,
    /// 16-bit otherwise.
    pub fn set_index(&mut self, index: &BufferAttribute) {
        self.set_wide_indices(index.array().is_u32());
    }

    /// As [`set_index`](Self::set_index), for an index known only by its
    /// element width.
    pub fn set_wide_indices(&mut self, wide: bool) {
        if wide && self.element_index_uint {
            self.index_type = gl::UNSIGNED_INT;
            self.bytes_per_element = 4;
        } else {
            self.index_type = gl::UNSIGNED_SHORT;
            self.bytes_per_element = 2;
        }
    }

    #[must_use]
    pub fn index_type(&self) -> u32 {
        self.index_type
    }

    fn byte_offset(&self, start: usize) -> i32 {
        (start * self.bytes_per_element) as i32
    }
}

impl BufferRenderer for GlIndexedBufferRenderer {
    fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn render(&mut self, info: &mut RenderInfo, start: usize, count: usize) {
        self.gl.draw_elements(
            self.mode,
            count as i32,
            self.index_type,
            self.byte_offset(start),
        );
        info.record_draw(self.mode, count, 1);
    }

    fn render_instances(&mut self, info: &mut RenderInfo, start: usize, count: usize, instances: u32) {
        if !self.instanced_arrays {
            log::error!("ANGLE_instanced_arrays unavailable: skipping instanced draw");
            return;
        }
        self.gl.draw_elements_instanced(
            self.mode,
            count as i32,
            self.index_type,
            self.byte_offset(start),
            instances as i32,
        );
        info.record_draw(self.mode, count, instances);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::renderer::gl::headless::{GlCall, HeadlessGl};

    fn context() -> (Rc<HeadlessGl>, GlContext) {
        let headless = Rc::new(HeadlessGl::new());
        let context: GlContext = headless.clone();
        (headless, context)
    }

    #[test]
    fn u32_index_needs_the_extension() {
        let (_, gl) = context();
        let index = BufferAttribute::from_u32(vec![0, 1, 2], 1);

        let mut renderer = GlIndexedBufferRenderer::new(gl.clone(), true, true);
        renderer.set_index(&index);
        assert_eq!(renderer.index_type(), gl::UNSIGNED_INT);

        let mut renderer = GlIndexedBufferRenderer::new(gl, false, true);
        renderer.set_index(&index);
        assert_eq!(renderer.index_type(), gl::UNSIGNED_SHORT);
    }

    #[test]
    fn indexed_offsets_are_in_bytes() {
        let (headless, gl) = context();
        let mut renderer = GlIndexedBufferRenderer::new(gl, true, true);
        renderer.set_index(&BufferAttribute::from_u32(vec![0; 12], 1));
        let mut info = RenderInfo::default();
        renderer.render(&mut info, 3, 6);

        assert_eq!(
            headless.calls(),
            [GlCall::DrawElements {
                mode: gl::TRIANGLES,
                count: 6,
                index_type: gl::UNSIGNED_INT,
                offset: 12,
            }]
        );
        assert_eq!(info.render.faces, 2);
    }

    #[test]
    fn instanced_draw_skipped_without_extension() {
        let (headless, gl) = context();
        let mut renderer = GlBufferRenderer::new(gl, false);
        let mut info = RenderInfo::default();
        renderer.render_instances(&mut info, 0, 3, 5);
        assert!(headless.calls().is_empty());
        assert_eq!(info.render.calls, 0);
    }

    #[test]
    fn instanced_draw_scales_stats() {
        let (headless, gl) = context();
        let mut renderer = GlBufferRenderer::new(gl, true);
        renderer.set_mode(gl::POINTS);
        let mut info = RenderInfo::default();
        renderer.render_instances(&mut info, 0, 4, 3);
        assert_eq!(
            headless.calls(),
            [GlCall::DrawArraysInstanced {
                mode: gl::POINTS,
                first: 0,
                count: 4,
                instances: 3,
            }]
        );
        assert_eq!(info.render.points, 12);
    }
}
