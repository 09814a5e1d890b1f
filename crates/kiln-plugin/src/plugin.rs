//! The build plugin protocol.

use async_trait::async_trait;

use kiln_core::BuildResult;

use crate::context::HookContext;
use crate::hooks::definitions::{
    BuildOptions, HookKind, LoadResult, ResolveIdResult, TransformResult,
};

/// Trait that all build plugins implement.
///
/// Every hook is optional: a plugin participates in a hook chain only
/// when the corresponding [`HookKind`] appears in its [`hooks`] list.
/// Hooks receive the shared [`HookContext`] and must be safe to call
/// multiple times with different arguments; beyond registration order
/// they must not assume other plugins' hooks ran before or after them.
///
/// A `None` return from a participating hook is the "no result" value;
/// what it means depends on the chain (see
/// [`PluginContainer`](crate::container::PluginContainer)).
///
/// [`hooks`]: BuildPlugin::hooks
#[async_trait]
#[allow(unused_variables)]
pub trait BuildPlugin: Send + Sync {
    /// Returns the plugin name, used for diagnostics attribution.
    fn name(&self) -> &str;

    /// Returns the hook kinds this plugin implements.
    fn hooks(&self) -> Vec<HookKind>;

    /// Receives the accumulated build options and may return a
    /// replacement. `None` keeps the previous value.
    async fn options(
        &self,
        ctx: &HookContext<'_>,
        options: &BuildOptions,
    ) -> BuildResult<Option<BuildOptions>> {
        Ok(None)
    }

    /// Called once when the build starts.
    async fn build_start(&self, ctx: &HookContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    /// Resolves a module id. A string result replaces the id for the
    /// rest of the chain; `None` aborts resolution for the whole chain.
    async fn resolve_id(
        &self,
        ctx: &HookContext<'_>,
        id: &str,
        importer: Option<&str>,
    ) -> BuildResult<Option<ResolveIdResult>> {
        Ok(None)
    }

    /// Loads the source for a module id. The first plugin returning
    /// `Some` wins.
    async fn load(&self, ctx: &HookContext<'_>, id: &str) -> BuildResult<Option<LoadResult>> {
        Ok(None)
    }

    /// Transforms module source. `None` leaves the code unchanged for
    /// the next plugin in the pipe.
    async fn transform(
        &self,
        ctx: &HookContext<'_>,
        code: &str,
        id: &str,
    ) -> BuildResult<Option<TransformResult>> {
        Ok(None)
    }

    /// Notified when a registered watch path changes. Results are
    /// ignored.
    async fn watch_change(&self, ctx: &HookContext<'_>, path: &str) -> BuildResult<()> {
        Ok(())
    }

    /// Resolves an `import.meta` property to replacement source text.
    /// The first plugin returning `Some` wins.
    async fn resolve_import_meta(
        &self,
        ctx: &HookContext<'_>,
        property: &str,
    ) -> BuildResult<Option<String>> {
        Ok(None)
    }
}
