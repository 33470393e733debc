//! Reference-counted program cache.
//!
//! Programs are keyed by their full program code. Lookup goes through an
//! xxh3 digest of the code and confirms with a string comparison, so two
//! materials with the same code always share one [`GlProgram`].

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_64;

use super::library::ShaderLibrary;
use super::parameters::{self, ProgramParameters};
use super::program::GlProgram;
use crate::errors::Result;
use crate::renderer::capabilities::GlCapabilities;
use crate::renderer::gl::GlContext;
use crate::renderer::lights::LightsState;
use crate::renderer::settings::RendererSettings;
use crate::resources::Material;
use crate::scene::{Fog, RenderObject};

new_key_type! {
    /// A program acquired from [`GlPrograms`].
    pub struct ProgramHandle;
}

struct ProgramEntry {
    program: GlProgram,
    used_times: usize,
}

pub struct GlPrograms {
    gl: GlContext,
    library: ShaderLibrary,
    capabilities: GlCapabilities,
    entries: SlotMap<ProgramHandle, ProgramEntry>,
    /// Acquisition order.
    active: Vec<ProgramHandle>,
    lookup: FxHashMap<u64, SmallVec<[ProgramHandle; 1]>>,
}

impl GlPrograms {
    #[must_use]
    pub fn new(gl: GlContext, capabilities: GlCapabilities) -> Self {
        Self {
            gl,
            library: ShaderLibrary::new(),
            capabilities,
            entries: SlotMap::with_key(),
            active: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &GlCapabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    /// Chunks registered here apply to programs built afterwards.
    pub fn library_mut(&mut self) -> &mut ShaderLibrary {
        &mut self.library
    }

    #[must_use]
    pub fn get_parameters(
        &self,
        material: &Material,
        lights: &LightsState,
        fog: Option<&Fog>,
        object: &RenderObject,
        settings: &RendererSettings,
    ) -> ProgramParameters {
        parameters::get_parameters(material, lights, fog, object, settings, &self.capabilities)
    }

    #[must_use]
    pub fn program_code(&self, material: &Material, parameters: &ProgramParameters) -> String {
        parameters::program_code(material, parameters)
    }

    fn find(&self, digest: u64, code: &str) -> Option<ProgramHandle> {
        self.lookup
            .get(&digest)?
            .iter()
            .copied()
            .find(|&handle| self.entries[handle].program.code() == code)
    }

    /// Returns the program built for `code`, compiling it on first use.
    ///
    /// Every successful call must be balanced by one [`release`](Self::release).
    pub fn acquire(
        &mut self,
        material: &Material,
        parameters: &ProgramParameters,
        code: String,
    ) -> Result<ProgramHandle> {
        let digest = xxh3_64(code.as_bytes());
        if let Some(handle) = self.find(digest, &code) {
            self.entries[handle].used_times += 1;
            return Ok(handle);
        }

        let program = GlProgram::new(&self.gl, &self.library, material, parameters, code)?;
        log::debug!("Compiled program {:?}", program.id());

        let handle = self.entries.insert(ProgramEntry {
            program,
            used_times: 1,
        });
        self.active.push(handle);
        self.lookup.entry(digest).or_default().push(handle);
        Ok(handle)
    }

    /// Drops one use of `handle`. Returns `true` when the program was destroyed.
    pub fn release(&mut self, handle: ProgramHandle) -> bool {
        let Some(entry) = self.entries.get_mut(handle) else {
            return false;
        };
        entry.used_times -= 1;
        if entry.used_times > 0 {
            return false;
        }

        if let Some(entry) = self.entries.remove(handle) {
            let digest = xxh3_64(entry.program.code().as_bytes());
            if let Some(bucket) = self.lookup.get_mut(&digest) {
                bucket.retain(|h| *h != handle);
                if bucket.is_empty() {
                    self.lookup.remove(&digest);
                }
            }
        }
        self.active.retain(|h| *h != handle);
        true
    }

    #[must_use]
    pub fn get(&self, handle: ProgramHandle) -> Option<&GlProgram> {
        self.entries.get(handle).map(|e| &e.program)
    }

    #[must_use]
    pub fn used_times(&self, handle: ProgramHandle) -> usize {
        self.entries.get(handle).map_or(0, |e| e.used_times)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Live programs in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = (ProgramHandle, &GlProgram)> {
        self.active
            .iter()
            .map(|&handle| (handle, &self.entries[handle].program))
    }

    /// Destroys every program regardless of use count.
    pub fn clear(&mut self) {
        self.active.clear();
        self.lookup.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::renderer::gl::headless::HeadlessGl;
    use crate::resources::BufferGeometry;

    fn programs() -> (Rc<HeadlessGl>, GlPrograms) {
        let headless = Rc::new(HeadlessGl::new());
        let gl: GlContext = headless.clone();
        let caps = GlCapabilities::new(&gl);
        (headless, GlPrograms::new(gl, caps))
    }

    fn acquire(programs: &mut GlPrograms, material: &Material) -> ProgramHandle {
        let object = RenderObject::mesh(BufferGeometry::new());
        let params = programs.get_parameters(
            material,
            &LightsState::default(),
            None,
            &object,
            &RendererSettings::default(),
        );
        let code = programs.program_code(material, &params);
        programs.acquire(material, &params, code).unwrap()
    }

    #[test]
    fn equal_codes_share_a_program() {
        let (headless, mut programs) = programs();
        let a = acquire(&mut programs, &Material::phong());
        let b = acquire(&mut programs, &Material::phong());

        assert_eq!(a, b);
        assert_eq!(programs.len(), 1);
        assert_eq!(programs.used_times(a), 2);
        assert_eq!(headless.live_programs(), 1);
    }

    #[test]
    fn release_destroys_at_zero() {
        let (headless, mut programs) = programs();
        let a = acquire(&mut programs, &Material::basic());
        acquire(&mut programs, &Material::basic());

        assert!(!programs.release(a));
        assert_eq!(programs.used_times(a), 1);
        assert!(programs.release(a));
        assert!(programs.get(a).is_none());
        assert!(programs.is_empty());
        assert_eq!(headless.live_programs(), 0);
        assert!(!programs.release(a));
    }

    #[test]
    fn distinct_codes_get_distinct_programs() {
        let (_, mut programs) = programs();
        let basic = acquire(&mut programs, &Material::basic());
        let phong = acquire(&mut programs, &Material::phong());
        assert_ne!(basic, phong);
        let order: Vec<_> = programs.iter().map(|(h, _)| h).collect();
        assert_eq!(order, [basic, phong]);
    }

    #[test]
    fn clear_frees_everything() {
        let (headless, mut programs) = programs();
        acquire(&mut programs, &Material::basic());
        acquire(&mut programs, &Material::standard());
        programs.clear();
        assert!(programs.is_empty());
        assert_eq!(headless.live_programs(), 0);
    }
}
