//! # AIAC Common Library
//!
//! Shared code for the AIAC compile studio including:
//! - Project data model (metadata, compile options, missing components)
//! - Common error type
//! - Configuration loading
//! - Time helpers

pub mod config;
pub mod error;
pub mod project;
pub mod time;

pub use error::{Error, Result};
pub use project::{CompileOptions, MissingComponent, ProjectMetadata};
