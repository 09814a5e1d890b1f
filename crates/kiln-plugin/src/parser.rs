//! Parser registry — the active syntax parser and plugin-supplied
//! syntax extensions.
//!
//! The default parser is backed by the oxc toolchain. Parsing always
//! uses module source type and the latest language level; callers can
//! override the source type by supplying a file path. Because oxc ASTs
//! are arena-allocated, [`ParsedModule`] exposes the facts plugins
//! actually consult: import specifiers, best-effort export names, and
//! the collected comments with byte offsets.

use std::path::PathBuf;
use std::sync::Arc;

use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Declaration, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use kiln_core::{BuildError, BuildResult};

use crate::hooks::definitions::SyntaxExtension;

/// Options for one parse call. Caller-supplied values override the
/// registry defaults.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// File path the code came from; its extension overrides the
    /// default source type (e.g. `.tsx` enables TypeScript and JSX).
    pub path: Option<PathBuf>,
    /// Whether to skip comment collection. Comments are collected by
    /// default.
    pub skip_comments: bool,
}

/// A comment collected during parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceComment {
    /// Raw comment text, including delimiters.
    pub text: String,
    /// Whether this is a block comment.
    pub block: bool,
    /// Byte offset of the comment start.
    pub start: u32,
    /// Byte offset past the comment end.
    pub end: u32,
}

/// Caller-visible result of parsing one module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedModule {
    /// Module specifiers referenced by import and re-export statements,
    /// in source order.
    pub imports: Vec<String>,
    /// Best-effort exported names; `default` for default exports and
    /// `*` for unnamed re-export-all.
    pub exports: Vec<String>,
    /// Collected comments, in source order.
    pub comments: Vec<SourceComment>,
}

/// Trait for syntax parser implementations.
pub trait SyntaxParser: Send + Sync {
    /// Parses source text.
    fn parse(&self, code: &str, options: &ParseOptions) -> BuildResult<ParsedModule>;

    /// Returns a parser with the given syntax extensions enabled.
    fn with_syntax(&self, extensions: &[SyntaxExtension]) -> Arc<dyn SyntaxParser>;
}

/// Default parser backed by `oxc_parser`.
#[derive(Debug, Clone, Copy)]
pub struct OxcParser {
    /// Source type applied when no path is supplied.
    source_type: SourceType,
}

impl Default for OxcParser {
    fn default() -> Self {
        Self {
            source_type: SourceType::mjs(),
        }
    }
}

impl SyntaxParser for OxcParser {
    fn parse(&self, code: &str, options: &ParseOptions) -> BuildResult<ParsedModule> {
        let allocator = Allocator::default();
        let source_type = match options.path.as_deref() {
            Some(path) => SourceType::from_path(path).unwrap_or(self.source_type),
            None => self.source_type,
        };

        let ret = Parser::new(&allocator, code, source_type).parse();
        if !ret.errors.is_empty() {
            let errors: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
            return Err(BuildError::parse(format!(
                "Parse errors: {}",
                errors.join("; ")
            )));
        }
        if ret.panicked {
            return Err(BuildError::parse("Parser panicked without diagnostics"));
        }

        let mut module = ParsedModule::default();

        for stmt in &ret.program.body {
            match stmt {
                Statement::ImportDeclaration(decl) => {
                    module.imports.push(decl.source.value.to_string());
                }
                Statement::ExportNamedDeclaration(decl) => {
                    if let Some(source) = &decl.source {
                        module.imports.push(source.value.to_string());
                    }
                    for spec in &decl.specifiers {
                        module.exports.push(spec.exported.name().to_string());
                    }
                    if let Some(declaration) = &decl.declaration {
                        collect_declared_names(declaration, &mut module.exports);
                    }
                }
                Statement::ExportDefaultDeclaration(_) => {
                    module.exports.push("default".to_string());
                }
                Statement::ExportAllDeclaration(decl) => {
                    module.imports.push(decl.source.value.to_string());
                    match &decl.exported {
                        Some(name) => module.exports.push(name.name().to_string()),
                        None => module.exports.push("*".to_string()),
                    }
                }
                _ => {}
            }
        }

        if !options.skip_comments {
            for comment in &ret.program.comments {
                module.comments.push(SourceComment {
                    text: comment.span.source_text(code).to_string(),
                    block: comment.is_block(),
                    start: comment.span.start,
                    end: comment.span.end,
                });
            }
        }

        Ok(module)
    }

    fn with_syntax(&self, extensions: &[SyntaxExtension]) -> Arc<dyn SyntaxParser> {
        let mut source_type = self.source_type;
        for extension in extensions {
            source_type = match extension {
                SyntaxExtension::Jsx => source_type.with_jsx(true),
                SyntaxExtension::Typescript => source_type.with_typescript(true),
            };
        }
        Arc::new(Self { source_type })
    }
}

/// Collects the names bound by an exported declaration.
fn collect_declared_names(declaration: &Declaration<'_>, exports: &mut Vec<String>) {
    match declaration {
        Declaration::VariableDeclaration(decl) => {
            for declarator in &decl.declarations {
                if let BindingPattern::BindingIdentifier(ident) = &declarator.id {
                    exports.push(ident.name.to_string());
                }
            }
        }
        Declaration::FunctionDeclaration(decl) => {
            if let Some(ident) = &decl.id {
                exports.push(ident.name.to_string());
            }
        }
        Declaration::ClassDeclaration(decl) => {
            if let Some(ident) = &decl.id {
                exports.push(ident.name.to_string());
            }
        }
        _ => {}
    }
}

/// Holds the currently active parser and applies syntax extensions.
pub struct ParserRegistry {
    /// The active parser; replaced wholesale when extended.
    active: RwLock<Arc<dyn SyntaxParser>>,
}

impl ParserRegistry {
    /// Creates a registry around the given parser.
    pub fn new(parser: Arc<dyn SyntaxParser>) -> Self {
        Self {
            active: RwLock::new(parser),
        }
    }

    /// Parses source text with the active parser.
    pub async fn parse(&self, code: &str, options: &ParseOptions) -> BuildResult<ParsedModule> {
        let parser = self.active.read().await.clone();
        parser.parse(code, options)
    }

    /// Extends the active parser, replacing it for all subsequent
    /// parsing.
    pub async fn extend(&self, extensions: &[SyntaxExtension]) {
        if extensions.is_empty() {
            return;
        }
        debug!(extensions = extensions.len(), "Extending syntax parser");
        let mut active = self.active.write().await;
        *active = active.with_syntax(extensions);
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new(Arc::new(OxcParser::default()))
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collects_imports_and_exports() {
        let parser = OxcParser::default();
        let code = r#"
import { h } from 'preact';
import './style.css';
export const title = 'home';
export default function App() { return null; }
export { render } from 'preact';
"#;
        let module = parser.parse(code, &ParseOptions::default()).unwrap();
        assert_eq!(module.imports, vec!["preact", "./style.css", "preact"]);
        assert_eq!(module.exports, vec!["title", "default", "render"]);
    }

    #[test]
    fn test_parse_collects_comments_with_offsets() {
        let parser = OxcParser::default();
        let code = "// header\nconst x = 1; /* inline */\n";
        let module = parser.parse(code, &ParseOptions::default()).unwrap();
        assert_eq!(module.comments.len(), 2);
        assert_eq!(module.comments[0].text, "// header");
        assert!(!module.comments[0].block);
        assert_eq!(module.comments[0].start, 0);
        assert!(module.comments[1].block);
    }

    #[test]
    fn test_skip_comments() {
        let parser = OxcParser::default();
        let options = ParseOptions {
            skip_comments: true,
            ..ParseOptions::default()
        };
        let module = parser.parse("// ignored\nconst x = 1;", &options).unwrap();
        assert!(module.comments.is_empty());
    }

    #[test]
    fn test_typescript_requires_extension() {
        let parser = OxcParser::default();
        let code = "const x: number = 1;";
        assert!(parser.parse(code, &ParseOptions::default()).is_err());

        let extended = parser.with_syntax(&[SyntaxExtension::Typescript]);
        assert!(extended.parse(code, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_path_overrides_source_type() {
        let parser = OxcParser::default();
        let options = ParseOptions {
            path: Some(PathBuf::from("src/app.ts")),
            ..ParseOptions::default()
        };
        assert!(parser.parse("const x: number = 1;", &options).is_ok());
    }

    #[tokio::test]
    async fn test_registry_extend_replaces_parser() {
        let registry = ParserRegistry::default();
        let code = "const x: number = 1;";
        assert!(registry.parse(code, &ParseOptions::default()).await.is_err());

        registry.extend(&[SyntaxExtension::Typescript]).await;
        assert!(registry.parse(code, &ParseOptions::default()).await.is_ok());
    }
}
