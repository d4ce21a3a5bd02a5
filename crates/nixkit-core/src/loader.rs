//! YAML recipe modules
//!
//! A recipe module file is a YAML document whose top-level mapping holds the
//! package set. Plain YAML data maps onto plain recipe values; tags express
//! the special forms:
//!
//! | Tag        | Node     | Recipe value                              |
//! |------------|----------|-------------------------------------------|
//! | `!url`     | string   | URL literal                               |
//! | `!file`    | string   | file relative to this module              |
//! | `!expr`    | string   | raw expression text                       |
//! | `!pkg`     | string   | package-set accessor (`stdenv.mkDerivation`) |
//! | `!call`    | mapping  | `function` applied to `argument`          |
//! | `!import`  | any      | `import <value>`; a string imports a file next to this module |
//! | `!rec`     | mapping  | recursive attribute set                   |
//! | `!async`   | any      | marks a package as deferred (packages only) |
//!
//! ```yaml
//! hello: !call
//!   function: !pkg stdenv.mkDerivation
//!   argument:
//!     name: hello-2.12
//!     src: !call
//!       function: !pkg fetchurl
//!       argument:
//!         url: !url mirror://gnu/hello/hello-2.12.tar.gz
//!         sha256: 1ayhp9v4m4rdhjmnl2bq3cibrbqqkgjbl3s7yk2nhlh8vj3ay16g
//!     builder: !file builder.sh
//! ```

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::error::{Error, Result};
use crate::module::{ModuleExport, RecipeModule};
use crate::names::AttrPath;
use crate::value::{AttrSet, ModuleContext, RecipeValue};

/// A recipe module loaded from a YAML file
#[derive(Debug, Clone)]
pub struct YamlModule {
    path: PathBuf,
    document: Value,
}

impl YamlModule {
    /// Load a module from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ModuleNotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading recipe module {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents, path)
    }

    /// Parse module source; `path` is where the module claims to live
    pub fn from_str(source: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document: Value = serde_yaml::from_str(source)?;

        if !matches!(document, Value::Mapping(_)) {
            return Err(Error::InvalidRecipe {
                module: path.display().to_string(),
                location: "<root>".to_string(),
                message: "top level of a recipe module must be a mapping".to_string(),
            });
        }

        Ok(Self { path, document })
    }

    /// Names of the top-level packages, in document order
    pub fn packages(&self) -> Vec<String> {
        match &self.document {
            Value::Mapping(mapping) => mapping
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The node bound at `attribute`, and whether an enclosing set is `!async`
    fn lookup(&self, attribute: &AttrPath) -> Option<(&Value, bool)> {
        let mut node = &self.document;
        let mut deferred = false;
        for segment in attribute.segments() {
            let (mapping, is_async) = bindings(node)?;
            deferred |= is_async;
            node = mapping.get(segment.as_str())?;
        }
        Some((node, deferred))
    }
}

/// Bindings of a set node, looking through `!rec` and `!async`
fn bindings(node: &Value) -> Option<(&Mapping, bool)> {
    match node {
        Value::Mapping(mapping) => Some((mapping, false)),
        Value::Tagged(tagged) => match tag_name(&tagged.tag.to_string()) {
            "rec" => bindings(&tagged.value),
            "async" => bindings(&tagged.value).map(|(mapping, _)| (mapping, true)),
            _ => None,
        },
        _ => None,
    }
}

impl RecipeModule for YamlModule {
    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn export(&self, args: &Args, attribute: &AttrPath) -> Result<ModuleExport> {
        let (node, inherited) = self
            .lookup(attribute)
            .ok_or_else(|| Error::AttributeNotFound {
                attribute: attribute.to_string(),
                module: self.describe(),
            })?;

        let converter = Converter {
            args,
            module: &self.path,
            context: ModuleContext::new(self.path.clone()),
        };
        let location = attribute.to_string();

        match node {
            Value::Tagged(tagged) if tag_name(&tagged.tag.to_string()) == "async" => {
                let value = converter.convert(&tagged.value, &location)?;
                Ok(ModuleExport::Deferred(value))
            }
            _ if inherited => Ok(ModuleExport::Deferred(converter.convert(node, &location)?)),
            _ => Ok(ModuleExport::Ready(converter.convert(node, &location)?)),
        }
    }
}

fn tag_name(tag: &str) -> &str {
    tag.trim_start_matches('!')
}

struct Converter<'a> {
    args: &'a Args,
    module: &'a Path,
    context: ModuleContext,
}

impl Converter<'_> {
    fn convert(&self, node: &Value, location: &str) -> Result<RecipeValue> {
        match node {
            Value::Null => Ok(RecipeValue::Null),
            Value::Bool(b) => Ok(RecipeValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(RecipeValue::Int(i))
                } else if n.is_f64() {
                    // Non-finite floats are kept; the emitter rejects them with a path.
                    Ok(RecipeValue::Float(n.as_f64().unwrap_or(f64::NAN)))
                } else {
                    Err(self.invalid(location, format!("integer {} is out of range", n)))
                }
            }
            Value::String(s) => Ok(RecipeValue::String(s.clone())),
            Value::Sequence(items) => {
                let values = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.convert(item, &format!("{}[{}]", location, i)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(RecipeValue::from(values))
            }
            Value::Mapping(_) => Ok(RecipeValue::from(self.attrs(node, location)?)),
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                self.convert_tagged(tag_name(&tag), &tagged.value, location)
            }
        }
    }

    fn convert_tagged(&self, tag: &str, node: &Value, location: &str) -> Result<RecipeValue> {
        match tag {
            "url" => Ok(RecipeValue::url(self.scalar(tag, node, location)?)),
            "file" => Ok(RecipeValue::file(
                self.scalar(tag, node, location)?,
                self.context.clone(),
            )),
            "expr" => Ok(RecipeValue::raw(self.scalar(tag, node, location)?)),
            "pkg" => {
                let name = self.scalar(tag, node, location)?;
                let accessor = self
                    .args
                    .package(&name)
                    .map_err(|e| self.invalid(location, e.to_string()))?;
                Ok(accessor.value())
            }
            "call" => {
                let Value::Mapping(mapping) = node else {
                    return Err(self.invalid(location, "!call expects a mapping".to_string()));
                };
                let part = |key: &str| {
                    mapping
                        .get(key)
                        .ok_or_else(|| self.invalid(location, format!("!call is missing '{}'", key)))
                };
                let function = self.convert(part("function")?, &format!("{}.<function>", location))?;
                let argument = self.convert(part("argument")?, &format!("{}.<argument>", location))?;
                if mapping.len() > 2 {
                    return Err(self.invalid(
                        location,
                        "!call only accepts 'function' and 'argument'".to_string(),
                    ));
                }
                Ok(RecipeValue::call(function, argument))
            }
            "import" => match node {
                // `!import ./other.nix` imports a file next to this module.
                Value::String(path) => Ok(RecipeValue::import(RecipeValue::file(
                    path.clone(),
                    self.context.clone(),
                ))),
                _ => Ok(RecipeValue::import(
                    self.convert(node, &format!("{}.<import>", location))?,
                )),
            },
            "rec" => Ok(RecipeValue::recursive(self.attrs(node, location)?)),
            "async" => Err(self.invalid(
                location,
                "!async may only mark a package, not a nested value".to_string(),
            )),
            other => Err(self.invalid(location, format!("unknown tag '!{}'", other))),
        }
    }

    fn attrs(&self, node: &Value, location: &str) -> Result<AttrSet> {
        let Value::Mapping(mapping) = node else {
            return Err(self.invalid(location, "expected a mapping".to_string()));
        };

        let mut attrs = AttrSet::new();
        for (key, value) in mapping {
            let key = match key {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(self.invalid(
                        location,
                        format!("attribute names must be scalars, found {:?}", other),
                    ));
                }
            };
            let child = format!("{}.{}", location, key);
            attrs.insert(key, self.convert(value, &child)?);
        }
        Ok(attrs)
    }

    fn scalar(&self, tag: &str, node: &Value, location: &str) -> Result<String> {
        match node {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.invalid(location, format!("!{} expects a string", tag))),
        }
    }

    fn invalid(&self, location: &str, message: String) -> Error {
        Error::InvalidRecipe {
            module: self.module.display().to_string(),
            location: location.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Readiness;
    use crate::value::Wrapper;

    const PYTHON: &str = r#"
python: !call
  function: !pkg stdenv.mkDerivation
  argument:
    name: python-2.7.18
    src: !call
      function: !pkg fetchurl
      argument:
        url: !url http://www.python.org/ftp/python/2.7.18/Python-2.7.18.tar.xz
        sha256: 0hzgxl94hnflis0d6m4szjx0b52gah7wpmcg5g00q7am6xwhwb5n
    patches:
      - !file search-path.patch
      - !file nix-store-mtime.patch
    configureFlags: --enable-shared
    meta:
      homepage: !url http://python.org
"#;

    fn export(source: &str, attribute: &str) -> Result<ModuleExport> {
        let module = YamlModule::from_str(source, "/pkgs/python/index.yaml")?;
        module.export(&Args::new(), &AttrPath::parse(attribute).unwrap())
    }

    #[test]
    fn test_plain_values() {
        let source = "foo:\n  name: foo\n  version: \"1.0\"\n  jobs: 4\n  ratio: 0.5\n  enable: true\n  extra: ~\n";
        let export = export(source, "foo").unwrap();
        assert_eq!(
            export,
            ModuleExport::Ready(RecipeValue::attrs([
                ("name", RecipeValue::string("foo")),
                ("version", RecipeValue::string("1.0")),
                ("jobs", RecipeValue::Int(4)),
                ("ratio", RecipeValue::Float(0.5)),
                ("enable", RecipeValue::Bool(true)),
                ("extra", RecipeValue::Null),
            ]))
        );
    }

    #[test]
    fn test_tagged_package() {
        let export = export(PYTHON, "python").unwrap();
        let RecipeValue::Call(call) = export.value() else {
            panic!("Expected call");
        };
        assert_eq!(call.function, RecipeValue::raw("pkgs.stdenv.mkDerivation"));

        let attrs = call.argument.as_attrs().unwrap();
        let RecipeValue::List(patches) = attrs.get("patches").unwrap() else {
            panic!("Expected list");
        };
        match &patches[0] {
            RecipeValue::Wrapper(w) => match &**w {
                Wrapper::File(file) => {
                    assert_eq!(file.value, "search-path.patch");
                    assert_eq!(
                        file.module.location(),
                        Some(Path::new("/pkgs/python/index.yaml"))
                    );
                }
                other => panic!("Expected file, got {:?}", other),
            },
            other => panic!("Expected wrapper, got {:?}", other),
        }

        let meta = attrs.get("meta").unwrap().as_attrs().unwrap();
        assert_eq!(meta.get("homepage"), Some(&RecipeValue::url("http://python.org")));
    }

    #[test]
    fn test_async_package_is_deferred() {
        let source = "later: !async\n  name: later\n";
        let export = export(source, "later").unwrap();
        assert_eq!(export.readiness(), Readiness::Deferred);
        assert_eq!(export.value(), &RecipeValue::attrs([("name", "later")]));
    }

    #[test]
    fn test_nested_async_rejected() {
        let source = "pkg:\n  inner: !async 1\n";
        let err = export(source, "pkg").unwrap_err();
        assert!(err.to_string().contains("pkg.inner"));
    }

    #[test]
    fn test_dotted_attribute() {
        let source = "perlPackages:\n  JSON:\n    name: perl-JSON\n";
        let export = export(source, "perlPackages.JSON").unwrap();
        assert_eq!(export.value(), &RecipeValue::attrs([("name", "perl-JSON")]));
    }

    #[test]
    fn test_missing_attribute() {
        let err = export("foo: 1\n", "bar").unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { .. }));
    }

    #[test]
    fn test_unknown_tag() {
        let err = export("foo: !frobnicate 1\n", "foo").unwrap_err();
        assert!(err.to_string().contains("unknown tag '!frobnicate'"));
    }

    #[test]
    fn test_call_requires_function_and_argument() {
        let err = export("foo: !call\n  function: !pkg hello\n", "foo").unwrap_err();
        assert!(err.to_string().contains("missing 'argument'"));
    }

    #[test]
    fn test_invalid_accessor() {
        let err = export("foo: !pkg \"not valid\"\n", "foo").unwrap_err();
        assert!(matches!(err, Error::InvalidRecipe { .. }));
    }

    #[test]
    fn test_rec_and_import() {
        let source = "foo: !rec\n  a: 1\n  b: !import ./sub.nix\n";
        let value = export(source, "foo").unwrap().value().clone();
        let RecipeValue::Wrapper(w) = value else {
            panic!("Expected wrapper");
        };
        let Wrapper::Recursive(attrs) = &*w else {
            panic!("Expected rec");
        };
        assert_eq!(attrs.get("a"), Some(&RecipeValue::Int(1)));
        assert_eq!(attrs.get("b").map(RecipeValue::kind), Some("import"));
    }

    #[test]
    fn test_package_inside_rec_set() {
        let source = "perlPackages: !rec\n  JSON:\n    name: perl-JSON\n";
        let export = export(source, "perlPackages.JSON").unwrap();
        assert_eq!(export.readiness(), Readiness::Ready);
        assert_eq!(export.value(), &RecipeValue::attrs([("name", "perl-JSON")]));
    }

    #[test]
    fn test_package_inside_async_set_is_deferred() {
        let source = "pythonPackages: !async\n  six:\n    name: python-six\n";
        let export = export(source, "pythonPackages.six").unwrap();
        assert_eq!(export.readiness(), Readiness::Deferred);
        assert_eq!(export.value(), &RecipeValue::attrs([("name", "python-six")]));
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let err = YamlModule::from_str("- 1\n- 2\n", "/x.yaml").unwrap_err();
        assert!(matches!(err, Error::InvalidRecipe { .. }));
    }

    #[test]
    fn test_packages_in_document_order() {
        let module = YamlModule::from_str("zeta: 1\nalpha: 2\n", "/x.yaml").unwrap();
        assert_eq!(module.packages(), ["zeta", "alpha"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = YamlModule::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, Error::ModuleNotFound { .. }));
    }
}
