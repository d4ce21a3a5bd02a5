//! The package-set capability handed to recipes
//!
//! Recipes never import build helpers directly. They receive an [`Args`]
//! value and reach helpers through its accessors, each of which names an
//! attribute of the package set the assembled expression binds as `pkgs`.

use crate::error::{Error, Result};
use crate::names::is_identifier;
use crate::value::RecipeValue;

/// Name the assembled expression binds the package set to
pub const PACKAGE_SET: &str = "pkgs";

/// Accessors for the built-in helpers a recipe may reference
#[derive(Debug, Clone, Default)]
pub struct Args {
    _private: (),
}

/// Reference to an attribute of the package set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    path: Vec<String>,
}

macro_rules! accessors {
    ($($(#[$doc:meta])* $method:ident => $attr:literal),* $(,)?) => {
        impl Args {
            $(
                $(#[$doc])*
                pub fn $method(&self) -> Accessor {
                    Accessor::root($attr)
                }
            )*
        }
    };
}

accessors! {
    /// The standard build environment
    stdenv => "stdenv",
    /// Fetch a file by URL and hash
    fetchurl => "fetchurl",
    /// Fetch a git revision
    fetchgit => "fetchgit",
    /// Fetch and unpack an archive
    fetchzip => "fetchzip",
    /// Library functions
    lib => "lib",
    /// Write a text file into the store
    write_text_file => "writeTextFile",
    /// Run a shell command producing a store path
    run_command => "runCommand",
    /// zlib
    zlib => "zlib",
    /// bzip2
    bzip2 => "bzip2",
    /// OpenSSL
    openssl => "openssl",
    /// Perl interpreter
    perl => "perl",
    /// Python interpreter
    python => "python",
}

impl Args {
    /// Create the capability set
    pub fn new() -> Self {
        Self::default()
    }

    /// Any attribute of the package set, by dotted name (`perlPackages.JSON`)
    pub fn package(&self, name: &str) -> Result<Accessor> {
        let path: Vec<String> = name.split('.').map(str::to_string).collect();
        if path.iter().any(|segment| !is_identifier(segment)) {
            return Err(Error::InvalidAccessor {
                name: name.to_string(),
            });
        }
        Ok(Accessor { path })
    }
}

impl Accessor {
    fn root(name: &str) -> Self {
        Self {
            path: vec![name.to_string()],
        }
    }

    /// Select a member (`stdenv` → `stdenv.mkDerivation`)
    pub fn attr(&self, name: &str) -> Result<Accessor> {
        if !is_identifier(name) {
            return Err(Error::InvalidAccessor {
                name: format!("{}.{}", self.path.join("."), name),
            });
        }
        let mut path = self.path.clone();
        path.push(name.to_string());
        Ok(Accessor { path })
    }

    /// Apply the referenced function to `argument`
    pub fn call(&self, argument: impl Into<RecipeValue>) -> RecipeValue {
        RecipeValue::call(self.value(), argument)
    }

    /// `stdenv.mkDerivation <argument>`
    pub fn mk_derivation(&self, argument: impl Into<RecipeValue>) -> RecipeValue {
        let mut path = self.path.clone();
        path.push("mkDerivation".to_string());
        Accessor { path }.call(argument)
    }

    /// Expression text selecting the attribute from the package set
    pub fn expression(&self) -> String {
        format!("{}.{}", PACKAGE_SET, self.path.join("."))
    }

    /// The reference as a recipe value
    pub fn value(&self) -> RecipeValue {
        RecipeValue::raw(self.expression())
    }
}

impl From<Accessor> for RecipeValue {
    fn from(accessor: Accessor) -> Self {
        accessor.value()
    }
}

impl From<&Accessor> for RecipeValue {
    fn from(accessor: &Accessor) -> Self {
        accessor.value()
    }
}
