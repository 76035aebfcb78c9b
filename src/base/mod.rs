//! Foundation types for the scopal analysis engine.
//!
//! Everything above this layer speaks in these terms:
//! - [`FileId`] - Interned buffer identifiers
//! - [`TextRange`], [`TextSize`] - Byte spans into source text
//! - [`LineCol`], [`LineIndex`] - Offset to line/column conversion
//! - [`Name`], [`Interner`] - Identifier interning
//!
//! This module has NO dependencies on other scopal modules.

mod file_id;
mod intern;
mod span;

pub use file_id::FileId;
pub use intern::{Interner, Name};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
