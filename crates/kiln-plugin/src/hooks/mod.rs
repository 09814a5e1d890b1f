//! Hook kinds and the payload/result types exchanged with plugins.

pub mod definitions;

pub use definitions::{
    BuildOptions, HookKind, LoadResult, LoadedModule, ResolveIdResult, ResolvedId, SyntaxExtension,
    TransformResult,
};
