//! Asset emitter — deterministic output naming, content hashing, and
//! immediate writes through an injectable sink.
//!
//! Emission is not deferred to a later generate phase: a successful
//! `emit` call has already written the file when it returns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use md5::{Digest, Md5};
use tokio::sync::RwLock;
use tracing::debug;

use kiln_core::{BuildError, BuildResult, OutputConfig};

/// Marker prefix for asset references embedded in generated code.
///
/// `resolve_import_meta` recognizes properties of the form
/// `FILE_URL_<id>` and substitutes the emitted asset's URL literal.
pub const FILE_URL_PREFIX: &str = "FILE_URL_";

/// Kind of an emitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitKind {
    /// A non-module output file (image, font, stylesheet).
    Asset,
    /// A generated code chunk.
    Chunk,
    /// An entry chunk.
    Entry,
}

impl std::fmt::Display for EmitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset => write!(f, "asset"),
            Self::Chunk => write!(f, "chunk"),
            Self::Entry => write!(f, "entry"),
        }
    }
}

/// Descriptor passed to `emit_file`.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    /// Kind of output. Only [`EmitKind::Asset`] is supported.
    pub kind: EmitKind,
    /// Source name used for filename templating.
    pub name: Option<String>,
    /// Explicit output filename, bypassing templates.
    pub file_name: Option<String>,
    /// File contents.
    pub source: Vec<u8>,
}

impl EmittedFile {
    /// Creates an asset descriptor with a template-derived filename.
    pub fn asset(name: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: EmitKind::Asset,
            name: Some(name.into()),
            file_name: None,
            source: source.into(),
        }
    }

    /// Sets an explicit output filename.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Record of one emitted asset.
#[derive(Debug, Clone)]
pub struct EmittedAsset {
    /// Reference id, rendered as a string.
    pub id: String,
    /// Source name the asset was emitted under.
    pub name: String,
    /// Absolute path the asset was written to.
    pub file_name: PathBuf,
}

/// Registry of emitted assets with monotonic id allocation.
///
/// Ids start at `"1"` and are never reused. Sharing one registry across
/// several containers gives them a single id space.
#[derive(Debug)]
pub struct AssetRegistry {
    /// Next id to allocate.
    next_id: AtomicU64,
    /// Reference id → asset record.
    assets: RwLock<HashMap<String, EmittedAsset>>,
}

impl AssetRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates the next reference id.
    pub fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    /// Registers an asset record.
    pub async fn insert(&self, asset: EmittedAsset) {
        self.assets.write().await.insert(asset.id.clone(), asset);
    }

    /// Looks up an asset by reference id.
    pub async fn get(&self, reference_id: &str) -> Option<EmittedAsset> {
        self.assets.read().await.get(reference_id).cloned()
    }

    /// Returns the number of registered assets.
    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    /// Returns whether no assets are registered.
    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for output file writers.
///
/// The default sink writes straight to the filesystem; hosts that must
/// not touch a real filesystem (tests, in-memory dev servers) inject
/// their own.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Writes a file, creating parent directories as needed.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> BuildResult<()>;
}

/// Default sink backed by the real filesystem.
#[derive(Debug, Default)]
pub struct FsSink;

#[async_trait]
impl FileSink for FsSink {
    async fn write_file(&self, path: &Path, contents: &[u8]) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        Ok(())
    }
}

/// In-memory sink for tests and in-memory dev servers.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Written path → contents.
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemorySink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the contents written to a path, if any.
    pub async fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().await.get(path).cloned()
    }

    /// Returns the number of files written.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Returns whether no files were written.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl FileSink for MemorySink {
    async fn write_file(&self, path: &Path, contents: &[u8]) -> BuildResult<()> {
        self.files
            .write()
            .await
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}

/// Emits assets under the configured output directory and maintains the
/// id → filename registry used for later reference resolution.
pub struct AssetEmitter {
    /// Absolute output directory.
    out_dir: PathBuf,
    /// Configured single output file, used as the entry template.
    out_file: Option<PathBuf>,
    /// Filename pattern for assets.
    asset_pattern: String,
    /// Filename pattern for entry chunks.
    entry_pattern: String,
    /// Output writer.
    sink: Arc<dyn FileSink>,
    /// Asset records, possibly shared across containers.
    assets: Arc<AssetRegistry>,
}

impl AssetEmitter {
    /// Creates an emitter for the given output configuration.
    ///
    /// `root` anchors a relative output directory; the directory is
    /// made absolute here so that output paths are absolute before any
    /// write occurs.
    pub fn new(
        root: &Path,
        output: &OutputConfig,
        sink: Arc<dyn FileSink>,
        assets: Arc<AssetRegistry>,
    ) -> BuildResult<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        let out_dir = if output.dir.is_absolute() {
            output.dir.clone()
        } else {
            root.join(&output.dir)
        };

        Ok(Self {
            out_dir,
            out_file: output.file.clone(),
            asset_pattern: output.asset_file_names.clone(),
            entry_pattern: output.entry_file_names.clone(),
            sink,
            assets,
        })
    }

    /// Returns the absolute output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Returns the asset registry.
    pub fn assets(&self) -> &Arc<AssetRegistry> {
        &self.assets
    }

    /// Emits a file: allocates an id, derives the output filename,
    /// writes the contents through the sink, and registers the record.
    ///
    /// Returns the reference id, intended to be embedded in generated
    /// code as a `FILE_URL_<id>` marker.
    pub async fn emit(&self, file: EmittedFile) -> BuildResult<String> {
        if file.kind != EmitKind::Asset {
            return Err(BuildError::unsupported(format!(
                "Emit type '{}' is not supported",
                file.kind
            )));
        }

        let id = self.assets.next_id();
        let path = match &file.file_name {
            Some(explicit) => self.under_out_dir(Path::new(explicit)),
            None => {
                let name = file.name.as_deref().ok_or_else(|| {
                    BuildError::emit("Emitted asset needs a name or an explicit file_name")
                })?;
                let pattern = self.template_for(file.kind);
                self.under_out_dir(Path::new(&render_pattern(&pattern, name, &file.source)))
            }
        };

        self.sink.write_file(&path, &file.source).await?;

        let name = file.name.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        debug!(
            asset_id = %id,
            name = %name,
            file = %path.display(),
            bytes = file.source.len(),
            "Asset emitted"
        );

        self.assets
            .insert(EmittedAsset {
                id: id.clone(),
                name,
                file_name: path,
            })
            .await;

        Ok(id)
    }

    /// Resolves a reference id to a quoted URL literal, suitable for
    /// direct splicing into generated source.
    ///
    /// The literal is the emitted path relative to the output directory
    /// with a leading slash, JSON-string-escaped. Returns `Ok(None)`
    /// for unknown ids.
    pub async fn resolve_file_url(&self, reference_id: &str) -> BuildResult<Option<String>> {
        let Some(asset) = self.assets.get(reference_id).await else {
            return Ok(None);
        };

        let relative = asset
            .file_name
            .strip_prefix(&self.out_dir)
            .unwrap_or(&asset.file_name);
        let mut url = String::from("/");
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        url.push_str(&segments.join("/"));

        Ok(Some(serde_json::to_string(&url)?))
    }

    /// Returns the emitted filename registered for a reference id.
    pub async fn file_name(&self, reference_id: &str) -> Option<PathBuf> {
        self.assets.get(reference_id).await.map(|a| a.file_name)
    }

    /// Chooses the filename template for an emit kind: the single
    /// output file for entries (when configured), otherwise the
    /// per-kind pattern.
    fn template_for(&self, kind: EmitKind) -> String {
        if kind == EmitKind::Entry {
            if let Some(file) = &self.out_file {
                return file.to_string_lossy().into_owned();
            }
        }
        match kind {
            EmitKind::Asset => self.asset_pattern.clone(),
            EmitKind::Chunk | EmitKind::Entry => self.entry_pattern.clone(),
        }
    }

    /// Resolves a rendered filename under the output directory.
    fn under_out_dir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.out_dir.join(path)
        }
    }
}

impl std::fmt::Debug for AssetEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetEmitter")
            .field("out_dir", &self.out_dir)
            .finish()
    }
}

/// Substitutes the `[hash]`, `[extname]`, `[ext]`, and `[name]`
/// placeholders of a filename pattern.
fn render_pattern(pattern: &str, name: &str, source: &[u8]) -> String {
    let path = Path::new(name);
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extname = if ext.is_empty() {
        String::new()
    } else {
        format!(".{ext}")
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());

    let mut rendered = pattern.to_string();
    if rendered.contains("[hash]") {
        let digest = format!("{:x}", Md5::digest(source));
        rendered = rendered.replace("[hash]", &digest[..5]);
    }
    rendered
        .replace("[extname]", &extname)
        .replace("[ext]", &ext)
        .replace("[name]", &stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter_with(sink: Arc<dyn FileSink>) -> AssetEmitter {
        let output = OutputConfig::default();
        AssetEmitter::new(
            Path::new("/build/root"),
            &output,
            sink,
            Arc::new(AssetRegistry::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_render_pattern_placeholders() {
        let rendered = render_pattern("[name]-[hash][extname]", "logo.png", b"bytes");
        assert!(rendered.starts_with("logo-"));
        assert!(rendered.ends_with(".png"));
        // "logo-" + 5 hash chars + ".png"
        assert_eq!(rendered.len(), "logo-".len() + 5 + ".png".len());

        assert_eq!(render_pattern("[name].[ext]", "logo.png", b""), "logo.png");
        assert_eq!(render_pattern("[name][extname]", "noext", b""), "noext");
    }

    #[test]
    fn test_render_pattern_hash_is_deterministic() {
        let a = render_pattern("[hash]", "a.css", b"body{}");
        let b = render_pattern("[hash]", "b.css", b"body{}");
        let c = render_pattern("[hash]", "a.css", b"body{color:red}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_template_priority_entry_uses_output_file() {
        let output = OutputConfig {
            file: Some(PathBuf::from("bundle.js")),
            ..OutputConfig::default()
        };
        let emitter = AssetEmitter::new(
            Path::new("/build/root"),
            &output,
            Arc::new(MemorySink::new()),
            Arc::new(AssetRegistry::new()),
        )
        .unwrap();

        assert_eq!(emitter.template_for(EmitKind::Entry), "bundle.js");
        assert_eq!(emitter.template_for(EmitKind::Asset), "[name][extname]");
        assert_eq!(emitter.template_for(EmitKind::Chunk), "[name].js");
    }

    #[tokio::test]
    async fn test_emit_rejects_non_asset_kinds() {
        let emitter = emitter_with(Arc::new(MemorySink::new()));
        let err = emitter
            .emit(EmittedFile {
                kind: EmitKind::Chunk,
                name: Some("chunk.js".into()),
                file_name: None,
                source: b"x".to_vec(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, kiln_core::ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_emit_writes_through_sink_and_registers() {
        let sink = Arc::new(MemorySink::new());
        let emitter = emitter_with(sink.clone());

        let id = emitter
            .emit(EmittedFile::asset("logo.png", b"png-bytes".to_vec()))
            .await
            .unwrap();
        assert_eq!(id, "1");

        let path = emitter.file_name(&id).await.unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, Path::new("/build/root/dist/logo.png"));
        assert_eq!(sink.contents(&path).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_ids_are_strictly_increasing_even_on_name_collision() {
        let emitter = emitter_with(Arc::new(MemorySink::new()));
        let first = emitter
            .emit(EmittedFile::asset("logo.png", b"a".to_vec()))
            .await
            .unwrap();
        let second = emitter
            .emit(EmittedFile::asset("logo.png", b"b".to_vec()))
            .await
            .unwrap();
        assert_eq!(first, "1");
        assert_eq!(second, "2");
    }

    #[tokio::test]
    async fn test_resolve_file_url_quotes_and_prefixes() {
        let emitter = emitter_with(Arc::new(MemorySink::new()));
        let id = emitter
            .emit(EmittedFile::asset("logo.png", b"png".to_vec()))
            .await
            .unwrap();

        let url = emitter.resolve_file_url(&id).await.unwrap().unwrap();
        assert_eq!(url, "\"/logo.png\"");

        assert!(emitter.resolve_file_url("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_explicit_file_name_bypasses_template() {
        let sink = Arc::new(MemorySink::new());
        let emitter = emitter_with(sink.clone());
        let id = emitter
            .emit(EmittedFile::asset("logo.png", b"png".to_vec()).with_file_name("img/brand.png"))
            .await
            .unwrap();
        let path = emitter.file_name(&id).await.unwrap();
        assert_eq!(path, Path::new("/build/root/dist/img/brand.png"));

        let url = emitter.resolve_file_url(&id).await.unwrap().unwrap();
        assert_eq!(url, "\"/img/brand.png\"");
    }

    #[tokio::test]
    async fn test_shared_registry_spans_emitters() {
        let registry = Arc::new(AssetRegistry::new());
        let output = OutputConfig::default();
        let a = AssetEmitter::new(
            Path::new("/build/a"),
            &output,
            Arc::new(MemorySink::new()),
            registry.clone(),
        )
        .unwrap();
        let b = AssetEmitter::new(
            Path::new("/build/b"),
            &output,
            Arc::new(MemorySink::new()),
            registry.clone(),
        )
        .unwrap();

        let first = a
            .emit(EmittedFile::asset("x.txt", b"x".to_vec()))
            .await
            .unwrap();
        let second = b
            .emit(EmittedFile::asset("y.txt", b"y".to_vec()))
            .await
            .unwrap();
        assert_eq!(first, "1");
        assert_eq!(second, "2");
        assert_eq!(registry.len().await, 2);
    }
}
