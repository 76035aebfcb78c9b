//! Go to definition: the declaration site of the name under the cursor.
//!
//! The word is widened from the offset in both directions, then resolved
//! with the same receiver-chain rules completion uses. Where several
//! declarations share the name (overloads), the first one in resolution
//! order wins; an in-class declaration merged with its out-of-line
//! definition answers with the in-class site.

use smol_str::SmolStr;
use tracing::debug;

use crate::base::{FileId, TextRange, TextSize};
use crate::hir::resolve::Resolver;
use crate::hir::symbols::DeclKind;

use super::analysis::{ParsedUnit, QueryError};
use super::completion::read_query;

/// A resolved definition site.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GotoTarget {
    pub file: FileId,
    /// Range of the declared name token.
    pub range: TextRange,
    pub name: SmolStr,
    pub kind: DeclKind,
    /// Qualified path of the containing scope, empty at the global scope.
    pub container: SmolStr,
}

/// Definition of the identifier at `offset`, or `None` when the offset is
/// not on a resolvable name.
pub fn goto_definition(
    unit: &ParsedUnit,
    offset: TextSize,
) -> Result<Option<GotoTarget>, QueryError> {
    unit.check_offset(offset)?;

    let Some(word_end) = word_end_at(&unit.text, offset.into()) else {
        return Ok(None);
    };

    let query = read_query(&unit.text, word_end);
    if query.fragment.is_empty() {
        return Ok(None);
    }

    let origin = unit.graph.scope_at(offset);
    let resolver = Resolver::new(&unit.graph);
    let decls = if query.receiver.is_empty() {
        resolver.lookup_unqualified(origin, query.fragment)
    } else {
        resolver.lookup_member(origin, &query.receiver, query.fragment)
    };

    debug!(
        offset = u32::from(offset),
        word = query.fragment,
        matches = decls.len(),
        "goto definition"
    );

    let Some(&decl_id) = decls.first() else {
        return Ok(None);
    };
    let decl = unit.graph.decl(decl_id);
    Ok(Some(GotoTarget {
        file: unit.graph.file(),
        range: decl.range,
        name: unit.graph.name_text(decl.name),
        kind: decl.kind,
        container: unit.graph.qualified_name(decl.scope),
    }))
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// End of the identifier containing or touching `offset`, or `None` when
/// the offset is not on one.
fn word_end_at(text: &str, offset: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut end = offset;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    let on_word = end > offset || (offset > 0 && is_ident_byte(bytes[offset - 1]));
    on_word.then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ide::analysis::AnalysisHost;
    use std::sync::Arc;

    fn unit_of(text: &str) -> Arc<ParsedUnit> {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/test.cpp", text);
        host.analysis().unit(file).unwrap()
    }

    fn goto_at(text: &str, marker: &str) -> Option<GotoTarget> {
        let offset = text.find(marker).expect("marker missing") + marker.len() / 2;
        let unit = unit_of(text);
        goto_definition(&unit, TextSize::from(offset as u32)).unwrap()
    }

    #[test]
    fn test_goto_local_variable() {
        let source = "
            void misc() {
                int counter;
                counter = 1;
            }
        ";
        let target = goto_at(source, "counter = 1").unwrap();
        assert_eq!(target.name, "counter");
        assert_eq!(target.kind, DeclKind::Variable);
        let decl_at = source.find("counter").unwrap() as u32;
        assert_eq!(u32::from(target.range.start()), decl_at);
    }

    #[test]
    fn test_goto_member_through_receiver() {
        let source = "
            class Foo {
            public:
                int Mumble;
            };
            void misc() {
                Foo myFoo;
                myFoo.Mumble = 3;
            }
        ";
        let offset = source.find(".Mumble").unwrap() + 2;
        let unit = unit_of(source);
        let target = goto_definition(&unit, TextSize::from(offset as u32))
            .unwrap()
            .unwrap();
        assert_eq!(target.name, "Mumble");
        assert_eq!(target.kind, DeclKind::Field);
        assert_eq!(target.container, "Foo");
    }

    #[test]
    fn test_goto_receiver_resolves_as_plain_name() {
        let source = "
            class Foo { public: int Mumble; };
            void misc() {
                Foo myFoo;
                myFoo.Mumble = 3;
            }
        ";
        // Cursor inside `myFoo`, before the dot
        let offset = source.find("myFoo.Mumble").unwrap() + 2;
        let unit = unit_of(source);
        let target = goto_definition(&unit, TextSize::from(offset as u32))
            .unwrap()
            .unwrap();
        assert_eq!(target.name, "myFoo");
        assert_eq!(target.kind, DeclKind::Variable);
    }

    #[test]
    fn test_goto_method_answers_in_class_site() {
        let source = "
            class Foo {
            public:
                int get();
            };
            int Foo::get() { return 0; }
            void misc() {
                Foo f;
                f.get();
            }
        ";
        let offset = source.find("f.get").unwrap() + 3;
        let unit = unit_of(source);
        let target = goto_definition(&unit, TextSize::from(offset as u32))
            .unwrap()
            .unwrap();
        // The merged declaration keeps its first (in-class) name range
        let in_class = source.find("get").unwrap() as u32;
        assert_eq!(u32::from(target.range.start()), in_class);
        assert_eq!(target.container, "Foo");
    }

    #[test]
    fn test_goto_type_name() {
        let source = "
            namespace outer { class Widget {}; }
            outer::Widget w;
        ";
        let offset = source.find("Widget w").unwrap() + 2;
        let unit = unit_of(source);
        let target = goto_definition(&unit, TextSize::from(offset as u32))
            .unwrap()
            .unwrap();
        assert_eq!(target.name, "Widget");
        assert_eq!(target.kind, DeclKind::Type);
        assert_eq!(target.container, "outer");
    }

    #[test]
    fn test_goto_on_whitespace_is_none() {
        let unit = unit_of("int x;  \n");
        assert_eq!(goto_definition(&unit, TextSize::from(7)).unwrap(), None);
    }

    #[test]
    fn test_goto_unresolved_is_none() {
        let source = "void misc() { ghost = 1; }";
        let offset = source.find("ghost").unwrap() + 2;
        let unit = unit_of(source);
        assert_eq!(
            goto_definition(&unit, TextSize::from(offset as u32)).unwrap(),
            None
        );
    }
}
