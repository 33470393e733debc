use std::fmt;

use super::gl::{BufferId, GlContext};
use crate::errors::{LumenError, Result};

/// A native buffer object, deleted when dropped.
pub struct GpuBuffer {
    gl: GlContext,
    id: BufferId,
    target: u32,
    usage: u32,
    size: usize,
}

impl GpuBuffer {
    /// Creates a buffer and uploads `data` as its whole store.
    pub fn new(gl: &GlContext, target: u32, data: &[u8], usage: u32) -> Result<Self> {
        let id = gl.create_buffer().map_err(LumenError::Gl)?;
        gl.bind_buffer(target, Some(id));
        gl.buffer_data(target, data, usage);
        Ok(Self {
            gl: GlContext::clone(gl),
            id,
            target,
            usage,
            size: data.len(),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> u32 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> u32 {
        self.usage
    }

    /// Size of the store in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bind(&self) {
        self.gl.bind_buffer(self.target, Some(self.id));
    }

    /// Replaces the whole store. Reallocates when `data` no longer fits.
    pub fn upload(&mut self, data: &[u8]) {
        self.bind();
        if data.len() > self.size {
            log::debug!(
                "Resizing buffer {:?} from {} to {} bytes",
                self.id,
                self.size,
                data.len()
            );
            self.gl.buffer_data(self.target, data, self.usage);
            self.size = data.len();
        } else {
            self.gl.buffer_sub_data(self.target, 0, data);
        }
    }

    /// Writes `data` at `byte_offset` into the existing store.
    pub fn upload_range(&mut self, byte_offset: usize, data: &[u8]) {
        self.bind();
        self.gl.buffer_sub_data(self.target, byte_offset as i32, data);
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.gl.delete_buffer(self.id);
    }
}

impl fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::renderer::gl::constants as gl;
    use crate::renderer::gl::headless::{GlCall, HeadlessGl};

    #[test]
    fn drop_deletes_native_buffer() {
        let headless = Rc::new(HeadlessGl::new());
        let context: GlContext = headless.clone();
        let buffer = GpuBuffer::new(&context, gl::ARRAY_BUFFER, &[0; 12], gl::STATIC_DRAW).unwrap();
        assert_eq!(headless.live_buffers(), 1);
        drop(buffer);
        assert_eq!(headless.live_buffers(), 0);
    }

    #[test]
    fn growing_upload_reallocates() {
        let headless = Rc::new(HeadlessGl::new());
        let context: GlContext = headless.clone();
        let mut buffer = GpuBuffer::new(&context, gl::ARRAY_BUFFER, &[0; 8], gl::STATIC_DRAW).unwrap();
        headless.clear_calls();

        buffer.upload(&[0; 8]);
        buffer.upload(&[0; 16]);
        let calls = headless.calls();
        assert!(calls.contains(&GlCall::BufferSubData {
            target: gl::ARRAY_BUFFER,
            offset: 0,
            len: 8
        }));
        assert!(calls.contains(&GlCall::BufferData {
            target: gl::ARRAY_BUFFER,
            len: 16,
            usage: gl::STATIC_DRAW
        }));
        assert_eq!(buffer.size(), 16);
    }
}
