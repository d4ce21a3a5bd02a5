//! Integration tests for the compile pipeline
//!
//! Recipes go through module export, classification, emission and
//! assembly. Emitted data is read back with a small reader for the
//! data subset of Nix (null, booleans, numbers, strings, lists and
//! attribute sets) to check that the text means what the graph says.

use rstest::rstest;
use std::path::PathBuf;

use nixkit_codegen::{CompilationOptions, Compiler, Emitter, Error, ModuleResolver, Style};
use nixkit_core::{Args, AttrSet, FnModule, ModuleContext, RecipeValue, Shared, YamlModule};

// =============================================================================
// Reader for emitted data
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Punct(char),
    Word(String),
    Str(String),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if "{}[]();=".contains(c) {
            tokens.push(Token::Punct(c));
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next().expect("unterminated string") {
                    '"' => break,
                    '\\' => match chars.next().expect("dangling escape") {
                        'n' => s.push('\n'),
                        'r' => s.push('\r'),
                        't' => s.push('\t'),
                        other => s.push(other),
                    },
                    '$' if chars.peek() == Some(&'{') => panic!("unescaped interpolation"),
                    other => s.push(other),
                }
            }
            tokens.push(Token::Str(s));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || "{}[]();=\"".contains(c) {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }
    tokens
}

struct Reader {
    tokens: Vec<Token>,
    pos: usize,
}

impl Reader {
    fn new(text: &str) -> Self {
        Self {
            tokens: tokenize(text),
            pos: 0,
        }
    }

    fn next(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expect(&mut self, c: char) {
        assert_eq!(self.next(), Token::Punct(c));
    }

    fn value(&mut self) -> RecipeValue {
        match self.next() {
            Token::Str(s) => RecipeValue::String(s),
            Token::Punct('(') => {
                let value = self.value();
                self.expect(')');
                value
            }
            Token::Punct('[') => {
                let mut items = Vec::new();
                while self.peek() != Some(&Token::Punct(']')) {
                    items.push(self.value());
                }
                self.expect(']');
                RecipeValue::list(items)
            }
            Token::Punct('{') => {
                let mut attrs = AttrSet::new();
                while self.peek() != Some(&Token::Punct('}')) {
                    let key = match self.next() {
                        Token::Word(w) => w,
                        Token::Str(s) => s,
                        other => panic!("unexpected key {:?}", other),
                    };
                    self.expect('=');
                    let value = self.value();
                    self.expect(';');
                    attrs.insert(key, value);
                }
                self.expect('}');
                RecipeValue::from(attrs)
            }
            Token::Word(w) => match w.as_str() {
                "null" => RecipeValue::Null,
                "true" => RecipeValue::Bool(true),
                "false" => RecipeValue::Bool(false),
                w if w.contains('.') => RecipeValue::Float(w.parse().unwrap()),
                w => RecipeValue::Int(w.parse().unwrap()),
            },
            other => panic!("unexpected token {:?}", other),
        }
    }

    fn finish(self) {
        assert_eq!(self.pos, self.tokens.len(), "trailing tokens");
    }
}

fn read_back(text: &str) -> RecipeValue {
    let mut reader = Reader::new(text);
    let value = reader.value();
    reader.finish();
    value
}

fn emit(value: &RecipeValue, style: Style) -> Result<String, Error> {
    Emitter::new(&ModuleResolver::new("/work"), style).emit(value)
}

fn sample_graphs() -> Vec<RecipeValue> {
    vec![
        RecipeValue::attrs([("name", "foo"), ("version", "1.0")]),
        RecipeValue::list([
            RecipeValue::Int(1),
            RecipeValue::Int(-2),
            RecipeValue::Float(-0.25),
            RecipeValue::Float(3.0),
            RecipeValue::Null,
        ]),
        RecipeValue::attrs([
            ("enableParallelBuilding", RecipeValue::Bool(true)),
            ("doCheck", RecipeValue::Bool(false)),
            (
                "meta",
                RecipeValue::attrs([
                    ("description", RecipeValue::string("a \"quoted\"\nline")),
                    ("maintainers", RecipeValue::list(Vec::<RecipeValue>::new())),
                    ("with", RecipeValue::from(AttrSet::new())),
                ]),
            ),
            ("configure-flags", RecipeValue::list(["--enable-shared", "${out}"])),
        ]),
        RecipeValue::list([RecipeValue::list([RecipeValue::list([1, 2])]), "x".into()]),
    ]
}

// =============================================================================
// Emission properties
// =============================================================================

#[test]
fn test_round_trip_through_reader() {
    for graph in sample_graphs() {
        for style in [Style::Compact, Style::Pretty] {
            let text = emit(&graph, style).unwrap();
            assert_eq!(read_back(&text), graph, "style {:?}: {}", style, text);
        }
    }
}

#[test]
fn test_formatting_neutrality() {
    for graph in sample_graphs() {
        let compact = emit(&graph, Style::Compact).unwrap();
        let pretty = emit(&graph, Style::Pretty).unwrap();
        assert_eq!(tokenize(&compact), tokenize(&pretty));
    }
}

#[rstest]
#[case("plain")]
#[case("say \"hi\"")]
#[case("back\\slash")]
#[case("two\nlines\r\n")]
#[case("tab\there")]
#[case("${interpolation}")]
#[case("$notinterpolation {}")]
#[case("ünïcödé ✓")]
#[case("")]
fn test_escaping_reads_back_exactly(#[case] input: &str) {
    let text = emit(&RecipeValue::string(input), Style::Compact).unwrap();
    assert_eq!(read_back(&text), RecipeValue::string(input));
}

#[test]
fn test_cycle_is_rejected_not_expanded() {
    let slot = Shared::new();
    let package = RecipeValue::attrs([
        ("name", RecipeValue::string("loop")),
        ("passthru", RecipeValue::attrs([("self", slot.clone())])),
    ]);
    slot.bind(package.clone()).unwrap();

    for style in [Style::Compact, Style::Pretty] {
        match emit(&package, style).unwrap_err() {
            Error::ValueKind { path, message } => {
                assert_eq!(path, "<root>.passthru.self");
                assert!(message.contains("cycle"));
            }
            other => panic!("Expected ValueKind, got {:?}", other),
        }
    }
}

#[test]
fn test_compilation_is_idempotent() {
    let module = YamlModule::from_str(HELLO, "/pkgs/hello/index.yaml").unwrap();
    let compiler = Compiler::new(ModuleResolver::new("/work"));
    for pretty in [false, true] {
        let options = CompilationOptions::new("hello").unwrap().pretty(pretty);
        let first = compiler.compile_module(&module, &options).unwrap();
        let second = compiler.compile_module(&module, &options).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.hash, second.hash);
    }
}

// =============================================================================
// Compiled packages
// =============================================================================

#[test]
fn test_two_string_bindings_keep_insertion_order() {
    let module = FnModule::anonymous(|_args: &Args, _module: &ModuleContext| {
        Ok(RecipeValue::attrs([(
            "foo",
            RecipeValue::attrs([("name", "foo"), ("version", "1.0")]),
        )]))
    });
    let compiled = Compiler::new(ModuleResolver::new("/work"))
        .compile_module(&module, &CompilationOptions::new("foo").unwrap())
        .unwrap();
    assert_eq!(
        compiled.text,
        "{ pkgs ? import <nixpkgs> {} }: { foo = { name = \"foo\"; version = \"1.0\"; }; }\n"
    );
}

#[test]
fn test_local_file_resolves_next_to_module() {
    let module = FnModule::new("/pkgs/foo/index", |_args: &Args, module: &ModuleContext| {
        Ok(RecipeValue::attrs([(
            "foo",
            RecipeValue::attrs([(
                "patches",
                RecipeValue::list([RecipeValue::file("patch.diff", module.clone())]),
            )]),
        )]))
    });
    let compiled = Compiler::new(ModuleResolver::new("/work"))
        .compile_module(&module, &CompilationOptions::new("foo").unwrap())
        .unwrap();
    assert!(compiled.text.contains("patches = [ /pkgs/foo/patch.diff ];"));
}

// =============================================================================
// YAML recipes end to end
// =============================================================================

const HELLO: &str = r#"
hello: !call
  function: !pkg stdenv.mkDerivation
  argument:
    name: hello-2.12
    src: !call
      function: !pkg fetchurl
      argument:
        url: !url https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz
        sha256: 1ayhp9v4m4rdhjmnl2bq3cibrbqqkgjbl3s7yk2nhlh8vj3ay16g
    patches:
      - !file ./fix-tests.patch
    buildInputs:
      - !pkg zlib
    meta:
      homepage: !url https://www.gnu.org/software/hello/
"#;

#[test]
fn test_yaml_recipe_compact() {
    let module = YamlModule::from_str(HELLO, "/pkgs/hello/index.yaml").unwrap();
    let compiled = Compiler::new(ModuleResolver::new("/work"))
        .compile_module(&module, &CompilationOptions::new("hello").unwrap())
        .unwrap();

    let text = &compiled.text;
    assert!(text.starts_with("{ pkgs ? import <nixpkgs> {} }: { hello = pkgs.stdenv.mkDerivation {"));
    assert!(text.contains("src = pkgs.fetchurl { url = https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz;"));
    assert!(text.contains("patches = [ /pkgs/hello/fix-tests.patch ];"));
    assert!(text.contains("buildInputs = [ pkgs.zlib ];"));
    assert!(text.contains("homepage = https://www.gnu.org/software/hello/;"));
}

#[test]
fn test_yaml_recipe_pretty_is_line_per_binding() {
    let module = YamlModule::from_str(HELLO, "/pkgs/hello/index.yaml").unwrap();
    let compiled = Compiler::new(ModuleResolver::new("/work"))
        .compile_module(
            &module,
            &CompilationOptions::new("hello").unwrap().pretty(true),
        )
        .unwrap();

    assert!(compiled.text.contains("\n{\n  hello = pkgs.stdenv.mkDerivation {\n    name = \"hello-2.12\";\n"));
    assert!(compiled.text.ends_with("  };\n}\n"));
}

#[test]
fn test_yaml_async_package() {
    let source = "hello: !async\n  name: hello\n";
    let module = YamlModule::from_str(source, "/pkgs/hello.yaml").unwrap();
    let compiler = Compiler::new(ModuleResolver::new("/work"));

    let err = compiler
        .compile_module(&module, &CompilationOptions::new("hello").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));

    let compiled = compiler
        .compile_module(
            &module,
            &CompilationOptions::new("hello").unwrap().asynchronous(true),
        )
        .unwrap();
    assert!(compiled.text.contains("hello = resolve ({ name = \"hello\"; });"));
}

#[test]
fn test_yaml_module_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pkgs.yaml");
    std::fs::write(&path, HELLO).unwrap();

    let module = YamlModule::load(&path).unwrap();
    let compiled = Compiler::new(ModuleResolver::new("/work"))
        .compile_module(&module, &CompilationOptions::new("hello").unwrap())
        .unwrap();

    let patch = PathBuf::from(dir.path()).join("fix-tests.patch");
    assert!(compiled.text.contains(&patch.display().to_string()));
}
