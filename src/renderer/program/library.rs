//! Built-in GLSL sources.
//!
//! Shaders live in `shaders/<id>.vert.glsl` / `shaders/<id>.frag.glsl`,
//! include chunks in `shaders/chunks/<name>.glsl`, all embedded at build
//! time. Chunks registered at runtime shadow embedded ones of the same name.

use std::borrow::Cow;

use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;

use crate::errors::{LumenError, Result};

#[derive(RustEmbed)]
#[folder = "src/renderer/program/shaders"]
struct ShaderAssets;

fn embedded(path: &str) -> Option<Cow<'static, str>> {
    let file = ShaderAssets::get(path)?;
    match file.data {
        Cow::Borrowed(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
        Cow::Owned(bytes) => String::from_utf8(bytes).ok().map(Cow::Owned),
    }
}

/// Vertex and fragment source of one built-in shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    chunks: FxHashMap<String, String>,
}

impl ShaderLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overrides) an include chunk.
    pub fn register_chunk(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.chunks.insert(name.into(), source.into());
    }

    /// Source of the `#include <name>` chunk.
    #[must_use]
    pub fn chunk(&self, name: &str) -> Option<Cow<'_, str>> {
        if let Some(source) = self.chunks.get(name) {
            return Some(Cow::Borrowed(source.as_str()));
        }
        embedded(&format!("chunks/{name}.glsl"))
    }

    /// Both stages of the built-in shader `id`.
    pub fn shader(&self, id: &str) -> Result<ShaderPair> {
        let stage = |suffix: &str| {
            let path = format!("{id}.{suffix}.glsl");
            embedded(&path).ok_or(LumenError::ShaderInclude { chunk: path })
        };
        Ok(ShaderPair {
            vertex: stage("vert")?,
            fragment: stage("frag")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MaterialKind;

    #[test]
    fn every_builtin_shader_is_embedded() {
        let library = ShaderLibrary::new();
        let kinds = [
            MaterialKind::Basic,
            MaterialKind::Lambert,
            MaterialKind::Phong,
            MaterialKind::Standard,
            MaterialKind::Points,
            MaterialKind::LineDashed,
            MaterialKind::Depth,
            MaterialKind::Normal,
        ];
        for kind in kinds {
            let id = kind.shader_id().unwrap();
            let pair = library.shader(id).unwrap();
            assert!(pair.vertex.contains("void main()"), "{id}");
            assert!(pair.fragment.contains("gl_FragColor"), "{id}");
        }
    }

    #[test]
    fn registered_chunks_shadow_embedded_ones() {
        let mut library = ShaderLibrary::new();
        assert!(library.chunk("common").unwrap().contains("#define PI"));
        library.register_chunk("common", "// replaced");
        assert_eq!(library.chunk("common").as_deref(), Some("// replaced"));
        assert!(library.chunk("no_such_chunk").is_none());
    }

    #[test]
    fn unknown_shader_is_an_error() {
        assert!(matches!(
            ShaderLibrary::new().shader("toon"),
            Err(LumenError::ShaderInclude { .. })
        ));
    }
}
