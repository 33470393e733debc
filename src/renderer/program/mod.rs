//! Shader permutation pipeline.
//!
//! - parameters: material + lights + object -> [`ProgramParameters`] and program code
//! - preprocess: include splicing, light-count substitution, loop unrolling
//! - library: embedded built-in shaders and chunks
//! - program: one compiled and linked [`GlProgram`]
//! - programs: the reference-counted [`GlPrograms`] cache

pub mod library;
pub mod parameters;
pub mod preprocess;
pub mod program;
pub mod programs;

pub use library::{ShaderLibrary, ShaderPair};
pub use parameters::{ProgramParameters, get_parameters, program_code};
pub use program::{GlProgram, ProgramDiagnostics};
pub use programs::{GlPrograms, ProgramHandle};
