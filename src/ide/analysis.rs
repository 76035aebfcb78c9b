//! Analysis host: buffer ownership, parse caching, and query entry points.
//!
//! [`AnalysisHost`] owns the buffers and the macro table. [`Analysis`] is a
//! read-only view over the host; every query goes through it. Parsing is
//! lazy and cached per buffer version: asking twice about an unmodified
//! buffer reuses the same [`ParsedUnit`], editing the buffer invalidates
//! it, and nothing is parsed until a query needs it.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::base::{FileId, LineIndex, TextSize};
use crate::hir::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::hir::extract::extract;
use crate::hir::scope::ScopeGraph;
use crate::hir::source::FileSet;
use crate::syntax::{MacroTable, Token, expand, lex};

// ============================================================================
// QUERY ERRORS
// ============================================================================

/// Malformed-request failures. Queries at well-formed positions never
/// fail: an unresolvable name is an empty result, not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("offset {offset:?} is past the end of the buffer (length {len:?})")]
    OffsetOutOfBounds { offset: TextSize, len: TextSize },

    #[error("offset {offset:?} is not a character boundary")]
    OffsetNotCharBoundary { offset: TextSize },

    #[error("no buffer registered for {0:?}")]
    FileNotRegistered(FileId),
}

// ============================================================================
// PARSED UNIT
// ============================================================================

/// Everything derived from one version of one buffer. Immutable once
/// built; queries walk it without touching the host again.
pub struct ParsedUnit {
    pub version: u64,
    pub text: Arc<str>,
    pub line_index: LineIndex,
    pub tokens: Vec<Token>,
    pub graph: ScopeGraph,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedUnit {
    /// Validate a query offset against this unit's text.
    pub fn check_offset(&self, offset: TextSize) -> Result<(), QueryError> {
        let len = TextSize::of(&*self.text);
        if offset > len {
            return Err(QueryError::OffsetOutOfBounds { offset, len });
        }
        if !self.text.is_char_boundary(offset.into()) {
            return Err(QueryError::OffsetNotCharBoundary { offset });
        }
        Ok(())
    }
}

// ============================================================================
// ANALYSIS HOST
// ============================================================================

/// Owns buffers and the macro table; hands out [`Analysis`] views.
///
/// Mutation goes through the host, queries through the view. The parse
/// cache is shared: any view may fill it, edits and macro changes drain
/// it.
#[derive(Default)]
pub struct AnalysisHost {
    files: FileSet,
    macros: MacroTable,
    cache: RwLock<FxHashMap<FileId, Arc<ParsedUnit>>>,
}

impl AnalysisHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a buffer. Returns its stable id.
    pub fn set_file_content(&mut self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> FileId {
        let file = self.files.file_id(path.as_ref());
        self.files.set_contents(file, text);
        file
    }

    /// The id a path was registered under, if any.
    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.files.existing_id(path.as_ref())
    }

    /// Drop a buffer and its cached parse.
    pub fn remove_file(&mut self, file: FileId) {
        self.files.remove(file);
        self.cache.get_mut().remove(&file);
    }

    /// Replace the macro table. Substitution happens at parse time, so
    /// every cached unit is stale afterwards.
    pub fn set_macro_table(&mut self, macros: MacroTable) {
        self.macros = macros;
        self.cache.get_mut().clear();
    }

    pub fn macro_table(&self) -> &MacroTable {
        &self.macros
    }

    /// A read-only view for querying.
    pub fn analysis(&self) -> Analysis<'_> {
        Analysis { host: self }
    }

    fn parse(&self, file: FileId, version: u64, text: Arc<str>) -> ParsedUnit {
        let line_index = LineIndex::new(&text);
        let raw = lex(&text);
        let expansion = expand(&raw, &self.macros);

        let mut collector = DiagnosticCollector::new();
        for m in &expansion.mismatches {
            collector.macro_arity(file, &line_index, m.range, &m.name, m.expected, m.found);
        }
        let graph = extract(file, &expansion.tokens, &line_index, &mut collector);
        let diagnostics = collector.take();

        debug!(
            file = ?file,
            version,
            tokens = expansion.tokens.len(),
            diagnostics = diagnostics.len(),
            "parsed buffer"
        );

        ParsedUnit {
            version,
            text,
            line_index,
            tokens: expansion.tokens,
            graph,
            diagnostics,
        }
    }
}

// ============================================================================
// ANALYSIS VIEW
// ============================================================================

/// Read-only query access to an [`AnalysisHost`].
pub struct Analysis<'a> {
    host: &'a AnalysisHost,
}

impl<'a> Analysis<'a> {
    /// The parsed form of a buffer, reusing the cache when the buffer has
    /// not changed since the last query.
    pub fn unit(&self, file: FileId) -> Result<Arc<ParsedUnit>, QueryError> {
        let text = self
            .host
            .files
            .contents(file)
            .ok_or(QueryError::FileNotRegistered(file))?;
        let version = self.host.files.version(file).unwrap_or(0);

        {
            let cache = self.host.cache.read();
            if let Some(unit) = cache.get(&file) {
                if unit.version == version {
                    return Ok(Arc::clone(unit));
                }
            }
        }

        let unit = Arc::new(self.host.parse(file, version, text));
        self.host
            .cache
            .write()
            .insert(file, Arc::clone(&unit));
        Ok(unit)
    }

    /// Parse every registered buffer in parallel, warming the cache.
    pub fn parse_all(&self) {
        self.host.files.files().par_iter().for_each(|&file| {
            let _ = self.unit(file);
        });
    }

    /// Diagnostics collected while parsing a buffer.
    pub fn diagnostics(&self, file: FileId) -> Result<Vec<Diagnostic>, QueryError> {
        Ok(self.unit(file)?.diagnostics.clone())
    }

    /// Completion candidates at an offset. See [`crate::ide::complete`].
    pub fn complete(
        &self,
        file: FileId,
        offset: TextSize,
    ) -> Result<super::completion::CandidateList, QueryError> {
        let unit = self.unit(file)?;
        super::completion::complete(&unit, offset)
    }

    /// Definition of the name under an offset. See
    /// [`crate::ide::goto_definition`].
    pub fn goto_definition(
        &self,
        file: FileId,
        offset: TextSize,
    ) -> Result<Option<super::goto::GotoTarget>, QueryError> {
        let unit = self.unit(file)?;
        super::goto::goto_definition(&unit, offset)
    }

    /// Flat outline of every declaration in a buffer. See
    /// [`crate::ide::document_symbols`].
    pub fn document_symbols(
        &self,
        file: FileId,
    ) -> Result<Vec<super::symbols::SymbolInfo>, QueryError> {
        let unit = self.unit(file)?;
        Ok(super::symbols::document_symbols(&unit))
    }

    /// Ids of all registered buffers.
    pub fn files(&self) -> Vec<FileId> {
        self.host.files.files()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_is_cached_until_edit() {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/test.cpp", "int x;");

        let analysis = host.analysis();
        let first = analysis.unit(file).unwrap();
        let second = analysis.unit(file).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        drop(analysis);
        host.set_file_content("/test.cpp", "int x; int y;");
        let third = host.analysis().unit(file).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.version, 2);
    }

    #[test]
    fn test_macro_table_change_invalidates_cache() {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/test.cpp", "DECLARE(x);");
        let first = host.analysis().unit(file).unwrap();

        let mut macros = MacroTable::new();
        macros.define_function("DECLARE", &["n"], "int n");
        host.set_macro_table(macros);

        let second = host.analysis().unit(file).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        // The unit holds the substituted stream, and the macro now
        // expands to a real declaration
        assert!(second.tokens.iter().any(|t| t.text == "int"));
        assert!(
            second
                .graph
                .all_decls()
                .any(|(_, d)| second.graph.name_text(d.name) == "x")
        );
    }

    #[test]
    fn test_cycle_diagnostic_points_at_base_decl() {
        use crate::base::LineCol;

        let src = "class B : public A { public: int bee; };\n\
                   class A : public B { public: int aye; };\n\
                   void f() { B obj; obj. }\n";
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/cycle.cpp", src);

        let diags = host.analysis().diagnostics(file).unwrap();
        let cycle: Vec<_> = diags
            .iter()
            .filter(|d| d.code.as_deref() == Some("E0001"))
            .collect();
        assert_eq!(cycle.len(), 1);
        assert!(cycle[0].message.contains("cannot derive from"));

        // Related info names the base's own declaration on line 0
        assert_eq!(cycle[0].related.len(), 1);
        assert_eq!(cycle[0].related[0].pos, LineCol::new(0, 6));
        assert!(cycle[0].related[0].message.contains("declared here"));

        // The surviving edge still feeds completion
        let offset = TextSize::from((src.find("obj. }").unwrap() + 4) as u32);
        let list = host.analysis().complete(file, offset).unwrap();
        let names: Vec<_> = list.items.iter().map(|i| i.label.to_string()).collect();
        assert_eq!(names, vec!["bee", "aye"]);
    }

    #[test]
    fn test_unregistered_file_is_an_error() {
        let host = AnalysisHost::new();
        let missing = FileId::new(99);
        assert_eq!(
            host.analysis().unit(missing).err(),
            Some(QueryError::FileNotRegistered(missing))
        );
    }

    #[test]
    fn test_check_offset_bounds() {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/test.cpp", "int x;");
        let unit = host.analysis().unit(file).unwrap();

        assert!(unit.check_offset(TextSize::from(0)).is_ok());
        assert!(unit.check_offset(TextSize::from(6)).is_ok());
        assert_eq!(
            unit.check_offset(TextSize::from(7)),
            Err(QueryError::OffsetOutOfBounds {
                offset: TextSize::from(7),
                len: TextSize::from(6),
            })
        );
    }

    #[test]
    fn test_check_offset_char_boundary() {
        let mut host = AnalysisHost::new();
        // "é" is two bytes; offset 4 lands inside it
        let file = host.set_file_content("/test.cpp", "// é\n");
        let unit = host.analysis().unit(file).unwrap();

        assert_eq!(
            unit.check_offset(TextSize::from(4)),
            Err(QueryError::OffsetNotCharBoundary {
                offset: TextSize::from(4),
            })
        );
    }

    #[test]
    fn test_parse_all_warms_cache() {
        let mut host = AnalysisHost::new();
        let a = host.set_file_content("/a.cpp", "int a;");
        let b = host.set_file_content("/b.cpp", "int b;");

        let analysis = host.analysis();
        analysis.parse_all();

        let cache = analysis.host.cache.read();
        assert!(cache.contains_key(&a));
        assert!(cache.contains_key(&b));
    }
}
