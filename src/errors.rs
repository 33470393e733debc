//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`LumenError`] covers the recoverable failure modes:
//! - Malformed geometry (missing attributes, out-of-range face indices)
//! - Shader source assembly failures (unresolved or cyclic `#include`)
//! - Native GL object creation failures
//!
//! Shader compile and link failures are deliberately absent: a program that
//! fails to build is still returned (see [`GlProgram::is_runnable`]) and its
//! diagnostics are logged.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for `std::result::Result<T, LumenError>`.
//!
//! ```rust,ignore
//! use lumen::errors::{LumenError, Result};
//!
//! fn prepare(geometry: &mut BufferGeometry) -> Result<()> {
//!     geometry.compute_vertex_normals()?;
//!     Ok(())
//! }
//! ```
//!
//! [`GlProgram::is_runnable`]: crate::renderer::program::GlProgram::is_runnable

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LumenError {
    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// Geometry data is missing an expected attribute or is internally inconsistent.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Two attributes that must share an item size do not.
    #[error("Attribute item size mismatch: expected {expected}, found {found}")]
    AttributeMismatch {
        /// Item size of the destination attribute
        expected: usize,
        /// Item size of the source attribute
        found: usize,
    },

    // ========================================================================
    // Shader Source Errors
    // ========================================================================
    /// An `#include <chunk>` directive names a chunk that is not registered.
    #[error("Can not resolve #include <{chunk}>")]
    ShaderInclude {
        /// Name of the missing chunk
        chunk: String,
    },

    /// A chunk includes itself, directly or transitively.
    #[error("Cyclic #include <{chunk}>")]
    IncludeCycle {
        /// Name of the chunk that closed the cycle
        chunk: String,
    },

    // ========================================================================
    // GL Errors
    // ========================================================================
    /// The native API failed to create an object.
    #[error("GL error: {0}")]
    Gl(String),

    /// The GL context was lost; every cached native handle is invalid.
    #[error("GL context lost")]
    ContextLost,
}

/// Alias for `Result<T, LumenError>`.
pub type Result<T> = std::result::Result<T, LumenError>;
