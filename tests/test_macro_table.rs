//! Macro substitution feeding extraction and completion.
//!
//! The macro table arrives from outside; this engine never reads
//! `#define` lines itself. These scenarios mirror the classic
//! preprocessor shapes: keywords that vanish, words that rewrite to
//! types, punctuation splices, and function-like declaration stampers.

use scopal::FileId;
use scopal::TextSize;
use scopal::ide::AnalysisHost;
use scopal::syntax::MacroTable;

fn host_with(macros: MacroTable, text: &str) -> (AnalysisHost, FileId) {
    let mut host = AnalysisHost::new();
    host.set_macro_table(macros);
    let file = host.set_file_content("/test.cpp", text);
    (host, file)
}

fn labels_at(host: &AnalysisHost, file: FileId, offset: usize) -> Vec<String> {
    let list = host
        .analysis()
        .complete(file, TextSize::from(offset as u32))
        .unwrap();
    list.items.iter().map(|i| i.label.to_string()).collect()
}

#[test]
fn keyword_macro_expands_to_nothing() {
    let mut macros = MacroTable::new();
    macros.define_object("EMU", "");

    let text = "char parse_around_emu EMU ()\n{\n}\n";
    let (host, file) = host_with(macros, text);

    let symbols = host.analysis().document_symbols(file).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "parse_around_emu");
}

#[test]
fn object_macro_rewrites_a_word() {
    let mut macros = MacroTable::new();
    macros.define_object("FLOATY", "float");

    let text = "FLOATY returnanfloat()\n{\n}\n";
    let (host, file) = host_with(macros, text);

    let symbols = host.analysis().document_symbols(file).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "returnanfloat");
}

#[test]
fn punctuation_macro_splices_a_receiver() {
    let mut macros = MacroTable::new();
    macros.define_object("SUPER", "mysuper::");

    let text = "
        class mysuper {
        public:
            int baz();
        };
        int SUPER baz ()
        {
        }
        void misc() { mysuper obj; obj. }
    ";
    let (host, file) = host_with(macros, text);

    // The expanded out-of-line definition lands on the in-class baz
    let offset = text.find("obj. }").unwrap() + 4;
    assert_eq!(labels_at(&host, file, offset), vec!["baz"]);

    let symbols = host.analysis().document_symbols(file).unwrap();
    let bazzes: Vec<_> = symbols.iter().filter(|s| s.name == "baz").collect();
    assert_eq!(bazzes.len(), 1, "definition should merge, not duplicate");
}

#[test]
fn function_macro_stamps_declarations() {
    let mut macros = MacroTable::new();
    macros.define_function("DECL_INT", &["n"], "int n;");

    let text = "
        DECL_INT(moose)
        DECL_INT(penguin)
        void misc() { pen }
    ";
    let (host, file) = host_with(macros, text);

    let offset = text.find("pen }").unwrap() + 3;
    assert_eq!(labels_at(&host, file, offset), vec!["penguin"]);
}

#[test]
fn multi_arg_macro_fills_a_struct_body() {
    let mut macros = MacroTable::new();
    macros.define_function("FIELDS3", &["a", "b", "c"], "int a; int b; int c;");

    let text = "
        struct ma_struct { FIELDS3(moose, penguin, emu) };
        void misc() { ma_struct s; s. }
    ";
    let (host, file) = host_with(macros, text);

    let offset = text.find("s. }").unwrap() + 2;
    assert_eq!(labels_at(&host, file, offset), vec!["moose", "penguin", "emu"]);
}

#[test]
fn macro_chain_expands_to_completable_type() {
    let mut macros = MacroTable::new();
    macros.define_object("METATYPE", "MYTYPE");
    macros.define_object("MYTYPE", "mytype");

    let text = "
        class mytype { public: int datum; };
        METATYPE obj;
        void misc() { obj. }
    ";
    let (host, file) = host_with(macros, text);

    let offset = text.find("obj. }").unwrap() + 4;
    assert_eq!(labels_at(&host, file, offset), vec!["datum"]);
}

#[test]
fn arity_mismatch_warns_and_continues() {
    let mut macros = MacroTable::new();
    macros.define_function("PAIR", &["a", "b"], "int a; int b;");

    let text = "
        PAIR(alone)
        int survivor;
    ";
    let (host, file) = host_with(macros, text);

    let diagnostics = host.analysis().diagnostics(file).unwrap();
    assert!(
        diagnostics
            .iter()
            .any(|d| d.code.as_deref() == Some("W0004")),
        "expected an arity warning, got {diagnostics:?}"
    );

    // The rest of the buffer still parsed
    let symbols = host.analysis().document_symbols(file).unwrap();
    assert!(symbols.iter().any(|s| s.name == "survivor"));
}

#[test]
fn object_macro_expands_inside_class_body() {
    let mut macros = MacroTable::new();
    macros.define_object("WIDTH", "int width;");

    let text = "
        class Box { public: WIDTH };
        void misc() { Box b; b. }
    ";
    let (host, file) = host_with(macros, text);

    let offset = text.find("b. }").unwrap() + 2;
    assert_eq!(labels_at(&host, file, offset), vec!["width"]);
}
