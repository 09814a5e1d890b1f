//! Plugin container — drives the ordered plugin list through the seven
//! hook chains.
//!
//! Chain semantics per hook:
//! - `options`: sequential reduce; a `None` return keeps the previous
//!   value.
//! - `build_start`: concurrent fan-out over all plugins, joined before
//!   the phase completes.
//! - `resolve_id`: sequential chain that aborts on the first `None`.
//! - `load`: sequential first-match.
//! - `transform`: sequential pipe with no short-circuit.
//! - `watch_change`: notification only, filtered by the watch set.
//! - `resolve_import_meta`: sequential first-match with a built-in
//!   file-reference fallback.
//!
//! The first hook error aborts the current phase via `?`; earlier
//! completed hook calls within the phase are not undone.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use kiln_core::{BuildResult, ContainerConfig};

use crate::context::HookContext;
use crate::emitter::{AssetEmitter, AssetRegistry, FileSink, FsSink, FILE_URL_PREFIX};
use crate::hooks::definitions::{
    BuildOptions, HookKind, LoadedModule, ResolveIdResult, ResolvedId, TransformResult,
};
use crate::modules::ModuleInfoRegistry;
use crate::parser::{OxcParser, ParserRegistry, SyntaxParser};
use crate::plugin::BuildPlugin;
use crate::watch::WatchSet;

/// Shared state behind the container, borrowed by every hook context.
pub(crate) struct ContainerCore {
    /// Ordered plugin list; order is fixed for the container's lifetime
    /// and defines hook execution precedence.
    pub(crate) plugins: Vec<Arc<dyn BuildPlugin>>,
    /// Hook kind → plugin indices implementing it, in registration
    /// order. Precomputed at construction.
    pub(crate) by_hook: HashMap<HookKind, Vec<usize>>,
    /// Absolute working-directory root.
    pub(crate) root: PathBuf,
    /// Current normalized build options.
    pub(crate) options: RwLock<BuildOptions>,
    /// The active syntax parser.
    pub(crate) parser: ParserRegistry,
    /// Per-module metadata records.
    pub(crate) modules: ModuleInfoRegistry,
    /// Registered watch paths.
    pub(crate) watch: WatchSet,
    /// Asset emission and reference registry.
    pub(crate) emitter: AssetEmitter,
}

impl ContainerCore {
    /// Returns the plugin indices implementing a hook, in registration
    /// order.
    fn hook_plugins(&self, kind: HookKind) -> &[usize] {
        self.by_hook.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Builds a context bound to one plugin dispatch.
    fn hook_ctx<'a>(&'a self, plugin: &'a dyn BuildPlugin) -> HookContext<'a> {
        HookContext::new(self, plugin.name())
    }

    pub(crate) async fn reduce_options(&self, input: BuildOptions) -> BuildResult<BuildOptions> {
        let indices = self.hook_plugins(HookKind::Options);
        debug!(hook = %HookKind::Options, plugins = indices.len(), "Dispatching hook");

        let mut accumulated = input;
        for &idx in indices {
            let plugin = self.plugins[idx].as_ref();
            let ctx = self.hook_ctx(plugin);
            if let Some(replacement) = plugin.options(&ctx, &accumulated).await? {
                trace!(plugin = %plugin.name(), "Options replaced");
                accumulated = replacement;
            }
        }

        self.parser.extend(&accumulated.syntax).await;
        *self.options.write().await = accumulated.clone();
        Ok(accumulated)
    }

    pub(crate) async fn build_start(&self) -> BuildResult<()> {
        let indices = self.hook_plugins(HookKind::BuildStart);
        if indices.is_empty() {
            return Ok(());
        }
        debug!(hook = %HookKind::BuildStart, plugins = indices.len(), "Dispatching hook");

        let hooks = indices.iter().map(|&idx| {
            let plugin = self.plugins[idx].clone();
            async move {
                let ctx = HookContext::new(self, plugin.name());
                plugin.build_start(&ctx).await
            }
        });
        try_join_all(hooks).await?;
        Ok(())
    }

    pub(crate) async fn resolve_id(
        &self,
        id: &str,
        importer: Option<&str>,
    ) -> BuildResult<Option<ResolvedId>> {
        let indices = self.hook_plugins(HookKind::ResolveId);
        debug!(hook = %HookKind::ResolveId, id = %id, plugins = indices.len(), "Dispatching hook");

        let mut current = id.to_string();
        let mut meta = HashMap::new();
        for &idx in indices {
            let plugin = self.plugins[idx].as_ref();
            let ctx = self.hook_ctx(plugin);
            match plugin.resolve_id(&ctx, &current, importer).await? {
                None => {
                    trace!(plugin = %plugin.name(), id = %current, "Resolution aborted");
                    return Ok(None);
                }
                Some(ResolveIdResult::Id(next)) => current = next,
                Some(ResolveIdResult::Full(resolved)) => {
                    current = resolved.id;
                    meta.extend(resolved.meta);
                }
            }
        }

        Ok(Some(ResolvedId { id: current, meta }))
    }

    pub(crate) async fn load(&self, id: &str) -> BuildResult<Option<LoadedModule>> {
        let indices = self.hook_plugins(HookKind::Load);
        debug!(hook = %HookKind::Load, id = %id, plugins = indices.len(), "Dispatching hook");

        for &idx in indices {
            let plugin = self.plugins[idx].as_ref();
            let ctx = self.hook_ctx(plugin);
            if let Some(result) = plugin.load(&ctx, id).await? {
                trace!(plugin = %plugin.name(), id = %id, "Module loaded");
                return Ok(Some(result.into()));
            }
        }
        Ok(None)
    }

    pub(crate) async fn transform(&self, code: String, id: &str) -> BuildResult<String> {
        let indices = self.hook_plugins(HookKind::Transform);
        debug!(hook = %HookKind::Transform, id = %id, plugins = indices.len(), "Dispatching hook");

        let mut current = code;
        for &idx in indices {
            let plugin = self.plugins[idx].as_ref();
            let ctx = self.hook_ctx(plugin);
            match plugin.transform(&ctx, &current, id).await? {
                Some(TransformResult::Code(next)) => current = next,
                Some(TransformResult::Full { code: next, .. }) => current = next,
                None => {}
            }
        }
        Ok(current)
    }

    pub(crate) async fn watch_change(&self, path: &str) -> BuildResult<()> {
        if !self.watch.contains(path).await {
            return Ok(());
        }

        let indices = self.hook_plugins(HookKind::WatchChange);
        debug!(hook = %HookKind::WatchChange, path = %path, plugins = indices.len(), "Dispatching hook");

        for &idx in indices {
            let plugin = self.plugins[idx].as_ref();
            let ctx = self.hook_ctx(plugin);
            plugin.watch_change(&ctx, path).await?;
        }
        Ok(())
    }

    pub(crate) async fn resolve_import_meta(&self, property: &str) -> BuildResult<Option<String>> {
        let indices = self.hook_plugins(HookKind::ResolveImportMeta);
        debug!(hook = %HookKind::ResolveImportMeta, property = %property, plugins = indices.len(), "Dispatching hook");

        for &idx in indices {
            let plugin = self.plugins[idx].as_ref();
            let ctx = self.hook_ctx(plugin);
            if let Some(result) = plugin.resolve_import_meta(&ctx, property).await? {
                return Ok(Some(result));
            }
        }

        // Built-in fallback: a reference marker carrying a numeric
        // asset id resolves to the emitted file's URL literal.
        if let Some(reference_id) = property.strip_prefix(FILE_URL_PREFIX) {
            if !reference_id.is_empty() && reference_id.bytes().all(|b| b.is_ascii_digit()) {
                return self.emitter.resolve_file_url(reference_id).await;
            }
        }
        Ok(None)
    }
}

/// Builder for [`PluginContainer`].
pub struct ContainerBuilder {
    plugins: Vec<Arc<dyn BuildPlugin>>,
    config: ContainerConfig,
    sink: Option<Arc<dyn FileSink>>,
    assets: Option<Arc<AssetRegistry>>,
    parser: Option<Arc<dyn SyntaxParser>>,
}

impl ContainerBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            plugins: Vec::new(),
            config,
            sink: None,
            assets: None,
            parser: None,
        }
    }

    /// Appends a plugin to the ordered list.
    pub fn plugin(mut self, plugin: Arc<dyn BuildPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Appends several plugins, preserving their order.
    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn BuildPlugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Overrides the output file writer.
    pub fn sink(mut self, sink: Arc<dyn FileSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Shares an asset registry with other container instances so they
    /// allocate from one id space.
    pub fn shared_assets(mut self, assets: Arc<AssetRegistry>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Overrides the initial syntax parser.
    pub fn parser(mut self, parser: Arc<dyn SyntaxParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Builds the container. The plugin list and output configuration
    /// are immutable from here on.
    pub fn build(self) -> BuildResult<PluginContainer> {
        let root = if self.config.root.is_absolute() {
            self.config.root.clone()
        } else {
            std::env::current_dir()?.join(&self.config.root)
        };

        let sink = self.sink.unwrap_or_else(|| Arc::new(FsSink));
        let assets = self.assets.unwrap_or_default();
        let emitter = AssetEmitter::new(&root, &self.config.output, sink, assets)?;
        let parser = ParserRegistry::new(
            self.parser
                .unwrap_or_else(|| Arc::new(OxcParser::default())),
        );

        let mut by_hook: HashMap<HookKind, Vec<usize>> = HashMap::new();
        for (idx, plugin) in self.plugins.iter().enumerate() {
            for kind in plugin.hooks() {
                by_hook.entry(kind).or_default().push(idx);
            }
        }

        info!(plugins = self.plugins.len(), "Plugin container created");

        Ok(PluginContainer {
            core: ContainerCore {
                plugins: self.plugins,
                by_hook,
                root,
                options: RwLock::new(BuildOptions::default()),
                parser,
                modules: ModuleInfoRegistry::new(),
                watch: WatchSet::new(),
                emitter,
            },
        })
    }
}

/// The plugin container: loads an ordered list of build plugins and
/// drives them through the phases of a module build.
///
/// An external driver creates one container from a plugin list and
/// output configuration, calls [`options`](Self::options) once at
/// construction and [`build_start`](Self::build_start) once, then any
/// number of resolve/load/transform calls per module,
/// [`watch_change`](Self::watch_change) on file-system events, and
/// [`resolve_import_meta`](Self::resolve_import_meta) /
/// [`resolve_file_url`](Self::resolve_file_url) when generated code
/// references an emitted asset.
///
/// Hook chains are dispatched strictly sequentially; concurrent
/// dispatch of overlapping phases is unsupported.
pub struct PluginContainer {
    core: ContainerCore,
}

impl PluginContainer {
    /// Returns a builder.
    pub fn builder(config: ContainerConfig) -> ContainerBuilder {
        ContainerBuilder::new(config)
    }

    /// Creates a container with the default sink, parser, and an
    /// unshared asset registry.
    pub fn new(
        plugins: Vec<Arc<dyn BuildPlugin>>,
        config: ContainerConfig,
    ) -> BuildResult<Self> {
        Self::builder(config).plugins(plugins).build()
    }

    /// Runs the `options` reduce chain, extends the parser with any
    /// syntax extensions in the final options, stores them as the
    /// current options, and returns them.
    pub async fn options(&self, input: BuildOptions) -> BuildResult<BuildOptions> {
        self.core.reduce_options(input).await
    }

    /// Runs every plugin's `build_start` hook concurrently and waits
    /// for all of them to finish.
    pub async fn build_start(&self) -> BuildResult<()> {
        self.core.build_start().await
    }

    /// Runs the `resolve_id` chain. Returns `None` as soon as any
    /// participating plugin reports unresolved, without consulting the
    /// remaining plugins.
    pub async fn resolve_id(
        &self,
        id: &str,
        importer: Option<&str>,
    ) -> BuildResult<Option<ResolvedId>> {
        self.core.resolve_id(id, importer).await
    }

    /// Runs the `load` chain; first truthy result wins. `None` means
    /// not found.
    pub async fn load(&self, id: &str) -> BuildResult<Option<LoadedModule>> {
        self.core.load(id).await
    }

    /// Runs the `transform` pipe over `code` and returns the final
    /// code.
    pub async fn transform(&self, code: String, id: &str) -> BuildResult<String> {
        self.core.transform(code, id).await
    }

    /// Notifies plugins of a changed path, if it was registered in the
    /// watch set.
    pub async fn watch_change(&self, path: &str) -> BuildResult<()> {
        self.core.watch_change(path).await
    }

    /// Resolves an `import.meta` property; falls back to the emitted
    /// file-reference marker convention.
    pub async fn resolve_import_meta(&self, property: &str) -> BuildResult<Option<String>> {
        self.core.resolve_import_meta(property).await
    }

    /// Resolves an emitted asset reference id to its URL literal.
    pub async fn resolve_file_url(&self, reference_id: &str) -> BuildResult<Option<String>> {
        self.core.emitter.resolve_file_url(reference_id).await
    }

    /// Returns a snapshot of the current normalized build options.
    pub async fn current_options(&self) -> BuildOptions {
        self.core.options.read().await.clone()
    }

    /// Returns the asset emitter.
    pub fn emitter(&self) -> &AssetEmitter {
        &self.core.emitter
    }

    /// Returns the module info registry.
    pub fn modules(&self) -> &ModuleInfoRegistry {
        &self.core.modules
    }

    /// Returns the watch set.
    pub fn watch(&self) -> &WatchSet {
        &self.core.watch
    }

    /// Returns the asset registry, for sharing with other containers.
    pub fn assets(&self) -> Arc<AssetRegistry> {
        self.core.emitter.assets().clone()
    }

    /// Returns the number of loaded plugins.
    pub fn plugin_count(&self) -> usize {
        self.core.plugins.len()
    }

    /// Clears the module info and watch registries. For long-lived
    /// hosts that would otherwise grow without bound; asset reference
    /// ids stay monotonic across resets so references never alias.
    pub async fn reset(&self) {
        self.core.modules.clear().await;
        self.core.watch.clear().await;
        debug!("Container registries reset");
    }
}

impl std::fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContainer")
            .field("plugins", &self.core.plugins.len())
            .field("root", &self.core.root)
            .finish()
    }
}
