//! # kiln-core
//!
//! Core crate for the kiln build container. Contains configuration
//! schemas and the unified error system.
//!
//! This crate has **no** internal dependencies on other kiln crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::{ContainerConfig, LoggingConfig, OutputConfig};
pub use error::{BuildError, ErrorKind};
pub use result::BuildResult;
