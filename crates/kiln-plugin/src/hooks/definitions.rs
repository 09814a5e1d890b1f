//! Hook definitions — the seven build phases and their typed results.
//!
//! Plugins may return either a bare value or a structured one from the
//! resolution and loading hooks; the variants are modeled as tagged
//! unions rather than runtime type inspection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Enumeration of the hooks a plugin may implement.
///
/// A plugin participates in a hook chain only when the corresponding
/// kind appears in its [`hooks`](crate::plugin::BuildPlugin::hooks)
/// list; the container never probes for hook presence any other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Sequential reduce over the build options at construction time.
    Options,
    /// Build-start notification, fanned out to all plugins and joined.
    BuildStart,
    /// Module id resolution chain.
    ResolveId,
    /// Module source loading chain.
    Load,
    /// Source transformation pipe.
    Transform,
    /// Watched-file change notification.
    WatchChange,
    /// Import-meta property resolution chain.
    ResolveImportMeta,
}

impl HookKind {
    /// Returns the string name of this hook.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "options",
            Self::BuildStart => "build_start",
            Self::ResolveId => "resolve_id",
            Self::Load => "load",
            Self::Transform => "transform",
            Self::WatchChange => "watch_change",
            Self::ResolveImportMeta => "resolve_import_meta",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Syntax extensions that `options` hooks may request.
///
/// After the options chain finishes, any extensions in the final options
/// replace the active parser for all subsequent parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxExtension {
    /// Enable JSX syntax.
    Jsx,
    /// Enable TypeScript syntax.
    Typescript,
}

/// Build options threaded through the `options` hook chain.
///
/// Each plugin receives the accumulated value and may return a
/// replacement; plugin-defined fields live in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Parser syntax extensions requested by plugins.
    #[serde(default)]
    pub syntax: Vec<SyntaxExtension>,
    /// Arbitrary plugin-defined option fields.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl BuildOptions {
    /// Creates empty build options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a syntax extension.
    pub fn with_syntax(mut self, extension: SyntaxExtension) -> Self {
        self.syntax.push(extension);
        self
    }

    /// Inserts a plugin-defined option field.
    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// Result of one plugin's `resolve_id` hook.
#[derive(Debug, Clone)]
pub enum ResolveIdResult {
    /// A bare replacement id for the rest of the chain.
    Id(String),
    /// A replacement id plus extra fields to merge into the final result.
    Full(ResolvedId),
}

/// Final result of an id resolution chain.
///
/// `meta` holds the merged extra fields produced by structured hook
/// results; later plugins override earlier fields of the same name.
#[derive(Debug, Clone)]
pub struct ResolvedId {
    /// The resolved module id.
    pub id: String,
    /// Merged plugin-defined fields.
    pub meta: HashMap<String, serde_json::Value>,
}

impl ResolvedId {
    /// Creates a resolved id with no extra fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            meta: HashMap::new(),
        }
    }

    /// Adds an extra field.
    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }
}

/// Result of one plugin's `load` hook.
#[derive(Debug, Clone)]
pub enum LoadResult {
    /// Bare source code.
    Code(String),
    /// Source code with a source map.
    Full {
        /// The loaded source code.
        code: String,
        /// An optional source map.
        map: Option<String>,
    },
}

/// Final result of a load chain: the first truthy hook result, unchanged.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// The loaded source code.
    pub code: String,
    /// An optional source map.
    pub map: Option<String>,
}

impl From<LoadResult> for LoadedModule {
    fn from(result: LoadResult) -> Self {
        match result {
            LoadResult::Code(code) => Self { code, map: None },
            LoadResult::Full { code, map } => Self { code, map },
        }
    }
}

/// Result of one plugin's `transform` hook.
///
/// A `None` return from the hook leaves the code unchanged and the pipe
/// continues to the next plugin.
#[derive(Debug, Clone)]
pub enum TransformResult {
    /// Bare replacement code.
    Code(String),
    /// Replacement code with a source map.
    Full {
        /// The transformed code.
        code: String,
        /// An optional source map.
        map: Option<String>,
    },
}

impl TransformResult {
    /// Returns the replacement code, discarding any map.
    pub fn into_code(self) -> String {
        match self {
            Self::Code(code) | Self::Full { code, .. } => code,
        }
    }
}
