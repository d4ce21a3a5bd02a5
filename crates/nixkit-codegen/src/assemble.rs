//! Expression assembly
//!
//! Wraps an emitted package body into a standalone Nix file: a function
//! over the package set, returning an attribute set with the selected
//! package bound at its attribute path so `nix-build -A <attr>` finds it.
//! Deferred packages go through one resolution step first.

use nixkit_core::args::PACKAGE_SET;
use nixkit_core::{AttrPath, Readiness};

use crate::emit::Style;
use crate::syntax;

/// Default package-set expression
pub const DEFAULT_PACKAGE_SET: &str = "import <nixpkgs> {}";

/// Composes the final expression text
#[derive(Debug, Clone)]
pub struct Assembler {
    package_set: String,
    style: Style,
}

impl Assembler {
    /// Assembler binding `pkgs` to `package_set` by default
    pub fn new(package_set: impl Into<String>, style: Style) -> Self {
        Self {
            package_set: package_set.into(),
            style,
        }
    }

    /// Nesting depth the body must be emitted at to line up with the
    /// surrounding text
    pub fn body_depth(&self) -> usize {
        match self.style {
            Style::Compact => 0,
            Style::Pretty => 1,
        }
    }

    /// The complete expression for `body` bound at `attribute`
    pub fn assemble(&self, body: &str, readiness: Readiness, attribute: &AttrPath) -> String {
        let header = format!("{{ {} ? {} }}:", PACKAGE_SET, self.package_set);
        let key = attribute
            .segments()
            .iter()
            .map(|s| syntax::attr_name(s))
            .collect::<Vec<_>>()
            .join(".");
        let value = match readiness {
            Readiness::Ready => body.to_string(),
            Readiness::Deferred => format!("resolve ({})", body),
        };
        let resolve = format!(
            "resolve = value: if builtins.isFunction value then value {} else value;",
            PACKAGE_SET
        );

        match (self.style, readiness) {
            (Style::Compact, Readiness::Ready) => {
                format!("{} {{ {} = {}; }}\n", header, key, value)
            }
            (Style::Compact, Readiness::Deferred) => {
                format!("{} let {} in {{ {} = {}; }}\n", header, resolve, key, value)
            }
            (Style::Pretty, Readiness::Ready) => {
                format!("{}\n\n{{\n  {} = {};\n}}\n", header, key, value)
            }
            (Style::Pretty, Readiness::Deferred) => {
                format!(
                    "{}\n\nlet\n  {}\nin\n{{\n  {} = {};\n}}\n",
                    header, resolve, key, value
                )
            }
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(DEFAULT_PACKAGE_SET, Style::Compact)
    }
}
