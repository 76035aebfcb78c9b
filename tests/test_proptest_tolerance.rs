//! Property-based tolerance tests for the completion pipeline.
//!
//! Uses proptest to generate source shapes and cut points, checking the
//! robustness contract: any buffer, truncated anywhere, parses into a
//! queryable graph, and only a malformed offset makes a query fail.
//!
//! Identifiers are drawn from a plain `[a-z]` alphabet, so a generated
//! name can collide with a keyword. That is intentional: the properties
//! here assert totality and idempotence, never specific candidates.
#![cfg(feature = "proptest")]

use proptest::prelude::*;

use scopal::TextSize;
use scopal::ide::AnalysisHost;

// ============================================================================
// SOURCE STRATEGIES
// ============================================================================

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn arb_member() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_ident().prop_map(|n| format!("int {n};")),
        (arb_ident(), arb_ident()).prop_map(|(n, a)| format!("void {n}(int {a});")),
    ]
}

fn arb_item() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_ident().prop_map(|n| format!("int {n};")),
        (arb_ident(), prop::collection::vec(arb_member(), 0..4)).prop_map(|(n, members)| {
            format!("class {n} {{ public: {} }};", members.join(" "))
        }),
        (arb_ident(), arb_ident())
            .prop_map(|(ns, v)| format!("namespace {ns} {{ int {v}; }}")),
        (arb_ident(), arb_ident()).prop_map(|(f, l)| format!("void {f}() {{ int {l}; }}")),
        (arb_ident(), arb_ident(), arb_ident()).prop_map(|(c, b, m)| {
            format!("class {c} : public {b} {{ public: int {m}; }};")
        }),
    ]
}

fn arb_source() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_item(), 0..8).prop_map(|items| items.join("\n"))
}

fn floor_char_boundary(text: &str, mut at: usize) -> usize {
    at = at.min(text.len());
    while at > 0 && !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    /// Every prefix of a source is a valid buffer: extraction succeeds
    /// and completion at the cut point answers.
    #[test]
    fn truncated_buffers_always_answer(source in arb_source(), ratio in 0.0f64..=1.0) {
        let cut = floor_char_boundary(&source, (source.len() as f64 * ratio) as usize);
        let prefix = &source[..cut];

        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/fuzz.cpp", prefix);
        let result = host.analysis().complete(file, TextSize::from(cut as u32));
        prop_assert!(result.is_ok());
    }

    /// A query fails exactly when the offset is out of bounds or inside
    /// a character.
    #[test]
    fn offset_validation_is_exact(text in "\\PC{0,120}", offset in 0usize..200) {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/fuzz.cpp", text.clone());
        let result = host.analysis().complete(file, TextSize::from(offset as u32));

        let well_formed = offset <= text.len() && text.is_char_boundary(offset);
        prop_assert_eq!(result.is_ok(), well_formed);
    }

    /// The same offset on the same buffer yields the same candidates.
    #[test]
    fn completion_is_idempotent(source in arb_source(), ratio in 0.0f64..=1.0) {
        let cut = floor_char_boundary(&source, (source.len() as f64 * ratio) as usize);

        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/fuzz.cpp", source.clone());
        let analysis = host.analysis();

        let first = analysis.complete(file, TextSize::from(cut as u32)).unwrap();
        let second = analysis.complete(file, TextSize::from(cut as u32)).unwrap();
        prop_assert_eq!(first.items, second.items);
    }

    /// Parsing diagnostics never abort the pipeline: whatever the input,
    /// the outline query still runs.
    #[test]
    fn outline_is_total(text in "\\PC{0,200}") {
        let mut host = AnalysisHost::new();
        let file = host.set_file_content("/fuzz.cpp", text);
        prop_assert!(host.analysis().document_symbols(file).is_ok());
    }
}
