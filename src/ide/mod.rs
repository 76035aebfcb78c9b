//! Editor-facing queries over parsed buffers.
//!
//! This layer connects the semantic model to whatever front end asks the
//! questions. It speaks its own types, converted at the editor boundary,
//! and every query is a pure function over a [`ParsedUnit`].
//!
//! The usual entry point is [`AnalysisHost`]:
//!
//! ```
//! use scopal::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! let file = host.set_file_content(
//!     "point.cpp",
//!     "class Point { public: int x; int y; };",
//! );
//!
//! let analysis = host.analysis();
//! let symbols = analysis.document_symbols(file).unwrap();
//! assert_eq!(symbols[0].name, "Point");
//! ```

mod analysis;
mod completion;
mod goto;
mod symbols;

pub use analysis::{Analysis, AnalysisHost, ParsedUnit, QueryError};
pub use completion::{CandidateList, CompletionItem, CompletionKind, complete};
pub use goto::{GotoTarget, goto_definition};
pub use symbols::{SymbolInfo, document_symbols, workspace_symbols};
