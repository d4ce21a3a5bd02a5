//! Identifiers and attribute paths
//!
//! Attribute names that can appear bare in a Nix expression, and the dotted
//! attribute paths used to select a package (`-A python.pkgs`).

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{Error, Result};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_'-]*$").expect("identifier regex is valid"));

/// Words the expression language reserves; they can never be bare attribute names.
static RESERVED: phf::Set<&'static str> = phf::phf_set! {
    "if", "then", "else", "assert", "with", "let", "in", "rec", "inherit", "or",
};

/// Returns `true` if `name` is a reserved word
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

/// Returns `true` if `name` may be written as a bare attribute name
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !is_reserved(name)
}

/// A non-empty, dotted path of identifiers such as `perlPackages.JSON`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrPath {
    segments: Vec<String>,
}

impl AttrPath {
    /// Parse a dotted attribute path
    pub fn parse(attribute: &str) -> Result<Self> {
        if attribute.is_empty() {
            return Err(Error::InvalidAttribute {
                attribute: attribute.to_string(),
                message: "attribute path is empty".to_string(),
            });
        }

        let segments: Vec<String> = attribute.split('.').map(str::to_string).collect();
        if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
            return Err(Error::InvalidAttribute {
                attribute: attribute.to_string(),
                message: if bad.is_empty() {
                    "empty path component".to_string()
                } else {
                    format!("'{}' is not an identifier", bad)
                },
            });
        }

        Ok(Self { segments })
    }

    /// Path components, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl std::str::FromStr for AttrPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
