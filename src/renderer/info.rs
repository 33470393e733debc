//! Render statistics for telemetry and HUD consumers.

use serde::Serialize;

use super::gl::constants as gl;

/// Per-frame draw counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderStats {
    pub calls: u64,
    /// Vertices submitted; shared vertices of indexed draws count once per use.
    pub vertices: u64,
    pub faces: u64,
    pub lines: u64,
    pub points: u64,
}

/// Live GPU resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemoryStats {
    pub geometries: usize,
    pub buffers: usize,
    pub programs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderInfo {
    pub render: RenderStats,
    pub memory: MemoryStats,
}

impl RenderInfo {
    /// Counts one draw of `count` vertices in `mode`, repeated `instances` times.
    pub fn record_draw(&mut self, mode: u32, count: usize, instances: u32) {
        let count = count as u64;
        let instances = u64::from(instances.max(1));

        self.render.calls += 1;
        self.render.vertices += count * instances;
        let primitives = match mode {
            gl::TRIANGLES => count / 3,
            gl::TRIANGLE_STRIP | gl::TRIANGLE_FAN => count.saturating_sub(2),
            gl::LINES => count / 2,
            gl::LINE_STRIP => count.saturating_sub(1),
            gl::LINE_LOOP | gl::POINTS => count,
            _ => 0,
        };
        match mode {
            gl::TRIANGLES | gl::TRIANGLE_STRIP | gl::TRIANGLE_FAN => {
                self.render.faces += primitives * instances;
            }
            gl::LINES | gl::LINE_STRIP | gl::LINE_LOOP => self.render.lines += primitives * instances,
            gl::POINTS => self.render.points += primitives * instances,
            _ => {}
        }
    }

    /// Zeroes the per-frame counters.
    pub fn reset(&mut self) {
        self.render = RenderStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangles_count_faces() {
        let mut info = RenderInfo::default();
        info.record_draw(gl::TRIANGLES, 6, 1);
        assert_eq!(info.render.calls, 1);
        assert_eq!(info.render.vertices, 6);
        assert_eq!(info.render.faces, 2);
    }

    #[test]
    fn instances_multiply_counts() {
        let mut info = RenderInfo::default();
        info.record_draw(gl::TRIANGLES, 3, 4);
        info.record_draw(gl::POINTS, 10, 0);
        assert_eq!(info.render.calls, 2);
        assert_eq!(info.render.vertices, 22);
        assert_eq!(info.render.faces, 4);
        assert_eq!(info.render.points, 10);
    }

    #[test]
    fn reset_keeps_memory() {
        let mut info = RenderInfo::default();
        info.memory.programs = 2;
        info.record_draw(gl::LINES, 4, 1);
        assert_eq!(info.render.lines, 2);
        info.reset();
        assert_eq!(info.render, RenderStats::default());
        assert_eq!(info.memory.programs, 2);
    }
}
