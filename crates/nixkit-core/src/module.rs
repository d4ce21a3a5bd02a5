//! Recipe modules
//!
//! A recipe module exports a package set: a function from the injected
//! [`Args`] capability to a value graph. The compiler asks a module for a
//! single attribute of that set.

use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::error::{Error, Result};
use crate::names::AttrPath;
use crate::value::{ModuleContext, RecipeValue};

/// Whether an exported value is final or needs one more resolution step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The value is the package itself
    Ready,
    /// The value must be resolved by the evaluator before it is selected
    Deferred,
}

/// A value exported by a recipe module
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleExport {
    /// Directly usable value
    Ready(RecipeValue),
    /// Value defined asynchronously
    Deferred(RecipeValue),
}

impl ModuleExport {
    /// The exported value
    pub fn value(&self) -> &RecipeValue {
        match self {
            ModuleExport::Ready(value) | ModuleExport::Deferred(value) => value,
        }
    }

    /// Readiness tag
    pub fn readiness(&self) -> Readiness {
        match self {
            ModuleExport::Ready(_) => Readiness::Ready,
            ModuleExport::Deferred(_) => Readiness::Deferred,
        }
    }

    /// Re-tag the export as deferred
    pub fn into_deferred(self) -> Self {
        match self {
            ModuleExport::Ready(value) => ModuleExport::Deferred(value),
            deferred => deferred,
        }
    }
}

/// A source of package definitions
pub trait RecipeModule {
    /// Location of the module on disk, if it has one
    fn location(&self) -> Option<&Path>;

    /// Evaluate the module and return the selected attribute
    fn export(&self, args: &Args, attribute: &AttrPath) -> Result<ModuleExport>;

    /// Human-readable module name for diagnostics
    fn describe(&self) -> String {
        self.location()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<anonymous module>".to_string())
    }
}

/// Walk `attribute` through nested attribute sets
pub fn select<'a>(root: &'a RecipeValue, attribute: &AttrPath) -> Option<&'a RecipeValue> {
    attribute
        .segments()
        .iter()
        .try_fold(root, |value, segment| value.as_attrs()?.get(segment))
}

/// A recipe module written in Rust
///
/// The function receives the capability set and the module's own context
/// (for [`RecipeValue::file`]) and returns the whole package set.
pub struct FnModule<F> {
    context: ModuleContext,
    location: Option<PathBuf>,
    readiness: Readiness,
    packages: F,
}

impl<F> FnModule<F>
where
    F: Fn(&Args, &ModuleContext) -> Result<RecipeValue>,
{
    /// Module declared at `location`
    pub fn new(location: impl Into<PathBuf>, packages: F) -> Self {
        let location = location.into();
        Self {
            context: ModuleContext::new(location.clone()),
            location: Some(location),
            readiness: Readiness::Ready,
            packages,
        }
    }

    /// Module without a location on disk
    pub fn anonymous(packages: F) -> Self {
        Self {
            context: ModuleContext::unknown(),
            location: None,
            readiness: Readiness::Ready,
            packages,
        }
    }

    /// Mark every package of the module as asynchronously defined
    pub fn deferred(mut self) -> Self {
        self.readiness = Readiness::Deferred;
        self
    }
}

impl<F> RecipeModule for FnModule<F>
where
    F: Fn(&Args, &ModuleContext) -> Result<RecipeValue>,
{
    fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn export(&self, args: &Args, attribute: &AttrPath) -> Result<ModuleExport> {
        let packages = (self.packages)(args, &self.context)?;
        let value = select(&packages, attribute)
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound {
                attribute: attribute.to_string(),
                module: self.describe(),
            })?;

        Ok(match self.readiness {
            Readiness::Ready => ModuleExport::Ready(value),
            Readiness::Deferred => ModuleExport::Deferred(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages(args: &Args, module: &ModuleContext) -> Result<RecipeValue> {
        Ok(RecipeValue::attrs([
            (
                "hello",
                args.stdenv().mk_derivation(RecipeValue::attrs([
                    ("name", RecipeValue::string("hello-2.12")),
                    ("builder", RecipeValue::file("builder.sh", module.clone())),
                ])),
            ),
            (
                "perlPackages",
                RecipeValue::attrs([("JSON", RecipeValue::string("json"))]),
            ),
        ]))
    }

    #[test]
    fn test_fn_module_selects_attribute() {
        let module = FnModule::new("/pkgs/index", packages);
        let export = module
            .export(&Args::new(), &AttrPath::parse("hello").unwrap())
            .unwrap();
        assert_eq!(export.readiness(), Readiness::Ready);
        assert!(matches!(export.value(), RecipeValue::Call(_)));
    }

    #[test]
    fn test_fn_module_selects_dotted_attribute() {
        let module = FnModule::anonymous(packages);
        let export = module
            .export(&Args::new(), &AttrPath::parse("perlPackages.JSON").unwrap())
            .unwrap();
        assert_eq!(export.value(), &RecipeValue::string("json"));
    }

    #[test]
    fn test_fn_module_missing_attribute() {
        let module = FnModule::new("/pkgs/index", packages);
        let err = module
            .export(&Args::new(), &AttrPath::parse("missing").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { .. }));
        assert!(err.to_string().contains("/pkgs/index"));
    }

    #[test]
    fn test_deferred_module() {
        let module = FnModule::anonymous(packages).deferred();
        let export = module
            .export(&Args::new(), &AttrPath::parse("hello").unwrap())
            .unwrap();
        assert_eq!(export.readiness(), Readiness::Deferred);
    }

    #[test]
    fn test_into_deferred() {
        let export = ModuleExport::Ready(RecipeValue::Null).into_deferred();
        assert_eq!(export, ModuleExport::Deferred(RecipeValue::Null));
    }
}
