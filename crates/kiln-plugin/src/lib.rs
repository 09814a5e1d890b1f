//! # kiln-plugin
//!
//! Plugin container for the kiln build tool. Provides:
//!
//! - The [`BuildPlugin`] protocol with all-optional hooks
//! - The [`PluginContainer`] hook dispatcher driving the seven build
//!   phases over an ordered plugin list
//! - The shared [`HookContext`] exposing parsing, resolution,
//!   module-info lookup, asset emission, watch registration, and
//!   diagnostics to plugins
//! - Asset emission with template-derived, content-hashed filenames
//!   and deferred reference resolution
//!
//! The container defines composition semantics only; it does not build
//! a module graph or cache results across calls. A higher-level build
//! driver composes the resolve/load/transform primitives into a graph.

pub mod container;
pub mod context;
pub mod emitter;
pub mod hooks;
pub mod modules;
pub mod parser;
pub mod plugin;
pub mod watch;

pub use container::{ContainerBuilder, PluginContainer};
pub use context::HookContext;
pub use emitter::{
    AssetEmitter, AssetRegistry, EmitKind, EmittedAsset, EmittedFile, FileSink, FsSink, MemorySink,
    FILE_URL_PREFIX,
};
pub use hooks::definitions::{
    BuildOptions, HookKind, LoadResult, LoadedModule, ResolveIdResult, ResolvedId, SyntaxExtension,
    TransformResult,
};
pub use modules::{ModuleInfo, ModuleInfoHandle, ModuleInfoRegistry};
pub use parser::{OxcParser, ParseOptions, ParsedModule, ParserRegistry, SourceComment, SyntaxParser};
pub use plugin::BuildPlugin;
pub use watch::WatchSet;
