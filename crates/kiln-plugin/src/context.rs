//! Shared hook context — the execution receiver passed to every hook.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use kiln_core::BuildResult;

use crate::container::ContainerCore;
use crate::emitter::EmittedFile;
use crate::hooks::definitions::BuildOptions;
use crate::modules::ModuleInfoHandle;
use crate::parser::{ParseOptions, ParsedModule};

/// Context exposed to plugins while one of their hooks is being
/// dispatched.
///
/// The underlying registries (module info, watch set, asset registry)
/// are shared by reference across every hook invocation for the
/// container's lifetime. The plugin name is captured at dispatch time,
/// so diagnostics stay correctly attributed even when a hook suspends
/// while another chain advances.
pub struct HookContext<'a> {
    /// Shared container state.
    core: &'a ContainerCore,
    /// Name of the plugin this context was created for.
    plugin_name: &'a str,
}

impl<'a> HookContext<'a> {
    /// Creates a context bound to one plugin dispatch.
    pub(crate) fn new(core: &'a ContainerCore, plugin_name: &'a str) -> Self {
        Self { core, plugin_name }
    }

    /// Returns the name of the plugin being dispatched.
    pub fn plugin_name(&self) -> &str {
        self.plugin_name
    }

    /// Parses source text with the active parser.
    pub async fn parse(&self, code: &str, options: &ParseOptions) -> BuildResult<ParsedModule> {
        self.core.parser.parse(code, options).await
    }

    /// Resolves an id through the full `resolve_id` chain.
    ///
    /// When the chain reports unresolved but `id` is syntactically a
    /// relative specifier, falls back to resolving it against the
    /// importer's directory (the importer itself is anchored at the
    /// configured root when relative) and returns that as a best-effort
    /// id. Returns `None` if nothing resolves even via the fallback.
    pub async fn resolve(&self, id: &str, importer: Option<&str>) -> BuildResult<Option<String>> {
        if let Some(resolved) = self.core.resolve_id(id, importer).await? {
            return Ok(Some(resolved.id));
        }

        if !is_relative_specifier(id) {
            return Ok(None);
        }

        let base = match importer {
            Some(importer) => {
                let importer = Path::new(importer);
                let dir = importer.parent().unwrap_or(Path::new(""));
                if importer.is_absolute() {
                    dir.to_path_buf()
                } else {
                    self.core.root.join(dir)
                }
            }
            None => self.core.root.clone(),
        };

        let joined = normalize(&base.join(id));
        Ok(Some(joined.to_string_lossy().into_owned()))
    }

    /// Gets or creates the shared module info record for `id`.
    pub async fn get_module_info(&self, id: &str) -> ModuleInfoHandle {
        self.core.modules.get_or_create(id).await
    }

    /// Emits a file through the asset emitter; returns the reference
    /// id.
    pub async fn emit_file(&self, file: EmittedFile) -> BuildResult<String> {
        self.core.emitter.emit(file).await
    }

    /// Registers a path in the watch set.
    pub async fn add_watch_file(&self, path: &str) {
        self.core.watch.add(path).await;
    }

    /// Emits a diagnostic attributed to the plugin being dispatched.
    /// Advisory only; never affects control flow.
    pub fn warn(&self, message: &str) {
        warn!(plugin = %self.plugin_name, "{message}");
    }

    /// Returns a snapshot of the current normalized build options.
    pub async fn options(&self) -> BuildOptions {
        self.core.options.read().await.clone()
    }
}

/// Returns whether an id is syntactically a relative specifier.
fn is_relative_specifier(id: &str) -> bool {
    id.starts_with("./") || id.starts_with("../")
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
