//! Marker-driven completion scenarios.
//!
//! Fixtures embed their own expectations: `// -N-` marks a cursor
//! position (the query offset is the start of that comment), and a
//! nearby `// #N# ( "a" "b" )` line lists the candidate names expected
//! at it, in order. The harness pairs them up, so a fixture reads like
//! the editing session it simulates.

use once_cell::sync::Lazy;
use rstest::rstest;

use scopal::TextSize;
use scopal::ide::{AnalysisHost, CandidateList};

// ============================================================================
// HARNESS
// ============================================================================

/// Offset of cursor marker `-n-`: the position right before its `//`.
fn cursor_offset(fixture: &str, n: u32) -> TextSize {
    let marker = format!("// -{n}-");
    let pos = fixture
        .find(&marker)
        .unwrap_or_else(|| panic!("fixture has no marker -{n}-"));
    TextSize::from(pos as u32)
}

/// Expected candidate names listed on the `#n#` line.
fn expected_names(fixture: &str, n: u32) -> Vec<String> {
    let marker = format!("#{n}# (");
    let pos = fixture
        .find(&marker)
        .unwrap_or_else(|| panic!("fixture has no expectation #{n}#"));
    let rest = &fixture[pos + marker.len()..];
    let end = rest.find(')').expect("unterminated expectation list");
    rest[..end]
        .split('"')
        .skip(1)
        .step_by(2)
        .map(str::to_string)
        .collect()
}

fn labels(list: &CandidateList) -> Vec<String> {
    list.items.iter().map(|i| i.label.to_string()).collect()
}

fn check_marker(host: &AnalysisHost, file: scopal::FileId, fixture: &str, n: u32) {
    let offset = cursor_offset(fixture, n);
    let expected = expected_names(fixture, n);
    let list = host
        .analysis()
        .complete(file, offset)
        .unwrap_or_else(|e| panic!("marker -{n}- failed: {e}"));
    assert_eq!(labels(&list), expected, "candidates at marker -{n}-");
}

// ============================================================================
// DOUBLE NAMESPACE FIXTURE
// ============================================================================

/// Class declarations up top stand in for the header the definitions
/// below would normally include.
const DOUBLE_NS: &str = r#"
namespace Name1 {
  namespace Name2 {
    class Foo {
      int pMumble;
      void publishStuff(int a, int b);
      void sendStuff(int a, int b);
    public:
      Foo();
      ~Foo();
      int Mumble;
      int get();
    };
  }
}
typedef Name1::Name2::Foo stage1_Foo;
typedef stage1_Foo stage2_Foo;
typedef stage2_Foo stage3_Foo;

namespace Name1 {
  namespace Name2 {

    Foo::Foo()
    {
      p// -1-
	// #1# ( "pMumble" "publishStuff" )
	;
    }

    int Foo::get() // ^1^
    {
      p// -2-
	// #2# ( "pMumble" "publishStuff" )
	;
      return 0;
    }

    void Foo::publishStuff(int /* a */, int /* b */) // ^2^
    {
    }

    void Foo::sendStuff(int /* a */, int /* b */) // ^3^
    {
    }

  } // namespace Name2
} // namespace Name1

// Multiple levels of typedef expansion
int test_fcn () {
  stage3_Foo MyFoo;

  MyFoo.// -3-
    // #3# ( "Mumble" "get" )
    ;
}

// Namespace reopening: the method body lives in the second block, the
// field's class in the first
namespace A {
  class foo {
  public:
    void aa();
    void bb();
  };
}
namespace A {
  class bar {
  public:
    void xx();
  public:
    foo myFoo;
  };

  void bar::xx()
  {
    myFoo.// -4-
      // #4# ( "aa" "bb" )
      ;
  }
}

// Inheritance across a doubly-nested namespace: the base of Bar is
// found inside b before the walk ever leaves it
namespace a {
  namespace b {
    class Foo {
    protected:
      int dumdum;
    public:
      Foo();
      int gloria();
    };
  }
}
namespace a {
  namespace b {

    class Bar : public Foo
    {
      int baz();
    };

    int Bar::baz()
    {
      return dum// -5-
	// #5# ( "dumdum" )
	;
    }

  } // namespace b
} // namespace a
"#;

static DOUBLE_NS_HOST: Lazy<(AnalysisHost, scopal::FileId)> = Lazy::new(|| {
    let mut host = AnalysisHost::new();
    let file = host.set_file_content("/testdoublens.cpp", DOUBLE_NS);
    (host, file)
});

#[rstest]
#[case::ctor_body_prefix(1)]
#[case::method_body_prefix(2)]
#[case::typedef_chain_member(3)]
#[case::reopened_namespace_member(4)]
#[case::inherited_protected(5)]
fn double_ns_marker(#[case] n: u32) {
    let (host, file) = &*DOUBLE_NS_HOST;
    check_marker(host, *file, DOUBLE_NS, n);
}

#[test]
fn double_ns_parses_clean() {
    let (host, file) = &*DOUBLE_NS_HOST;
    let diagnostics = host.analysis().diagnostics(*file).unwrap();
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {diagnostics:?}"
    );
}

#[test]
fn definition_jumps_to_in_class_declaration() {
    let (host, file) = &*DOUBLE_NS_HOST;

    // Cursor on `get` in the out-of-line `int Foo::get() // ^1^`
    let def_line = DOUBLE_NS.find("Foo::get() // ^1^").unwrap();
    let offset = TextSize::from((def_line + "Foo::g".len()) as u32);

    let target = host
        .analysis()
        .goto_definition(*file, offset)
        .unwrap()
        .expect("get should resolve");
    assert_eq!(target.name, "get");
    assert_eq!(target.container, "Name1::Name2::Foo");

    let in_class = DOUBLE_NS.find("int get();").unwrap() + "int ".len();
    assert_eq!(u32::from(target.range.start()), in_class as u32);
}

/// The `^2^`/`^3^` out-of-line definitions merge into the in-class
/// declarations instead of adding a second symbol.
#[rstest]
#[case::publish_stuff("publishStuff")]
#[case::send_stuff("sendStuff")]
fn out_of_line_definition_merges_into_one_symbol(#[case] name: &str) {
    let (host, file) = &*DOUBLE_NS_HOST;
    let symbols = host.analysis().document_symbols(*file).unwrap();
    let hits: Vec<_> = symbols.iter().filter(|s| s.name == name).collect();
    assert_eq!(hits.len(), 1, "{name} should appear once");
    assert_eq!(hits[0].container, "Name1::Name2::Foo");
    assert_eq!(hits[0].detail.as_deref(), Some("(int, int)"));
}

// ============================================================================
// EDITING SCENARIOS
// ============================================================================

/// The buffer mid-edit: unclosed braces, a dangling member access, a
/// half-typed statement. Completion still answers.
const MID_EDIT: &str = r#"
class Widget {
public:
    int width;
    int height;
    void resize(int w, int h);
};

void sketch() {
    Widget w;
    w.--MARK--
"#;

#[test]
fn unclosed_body_still_completes() {
    let mut host = AnalysisHost::new();
    let src = MID_EDIT.replace("--MARK--", "");
    let file = host.set_file_content("/sketch.cpp", src.clone());

    let offset = TextSize::from((src.find("w.").unwrap() + 2) as u32);
    let list = host.analysis().complete(file, offset).unwrap();
    let names = labels(&list);
    assert_eq!(names, vec!["width", "height", "resize"]);
}

#[test]
fn edit_invalidates_and_requeries() {
    let mut host = AnalysisHost::new();
    let file = host.set_file_content(
        "/grow.cpp",
        "class P { public: int x; };\nvoid f() { P p; p. }",
    );
    let analysis = host.analysis();
    let offset = TextSize::from(
        ("class P { public: int x; };\nvoid f() { P p; p.".len()) as u32,
    );
    assert_eq!(labels(&analysis.complete(file, offset).unwrap()), vec!["x"]);
    drop(analysis);

    host.set_file_content(
        "/grow.cpp",
        "class P { public: int x; int y; };\nvoid f() { P p; p. }",
    );
    let offset = TextSize::from(
        ("class P { public: int x; int y; };\nvoid f() { P p; p.".len()) as u32,
    );
    let list = host.analysis().complete(file, offset).unwrap();
    assert_eq!(labels(&list), vec!["x", "y"]);
}

#[test]
fn completion_is_idempotent_at_offset() {
    let (host, file) = &*DOUBLE_NS_HOST;
    let offset = cursor_offset(DOUBLE_NS, 3);

    let first = host.analysis().complete(*file, offset).unwrap();
    let second = host.analysis().complete(*file, offset).unwrap();
    assert_eq!(first.items, second.items);
}

#[test]
fn offset_past_end_is_rejected() {
    let (host, file) = &*DOUBLE_NS_HOST;
    let offset = TextSize::from(DOUBLE_NS.len() as u32 + 10);
    assert!(host.analysis().complete(*file, offset).is_err());
}
