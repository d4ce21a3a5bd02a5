//! Recipe compiler
//!
//! Ties the stages together: ask the module for the selected package,
//! emit it, and assemble the standalone expression.

use sha2::{Digest, Sha256};

use nixkit_core::{Args, AttrPath, ModuleExport, Readiness, RecipeModule};

use crate::assemble::{Assembler, DEFAULT_PACKAGE_SET};
use crate::emit::{Emitter, Style};
use crate::error::{Error, Result};
use crate::options::CompilationOptions;
use crate::resolver::ModuleResolver;

/// Compiles recipe modules to Nix expressions
#[derive(Debug, Clone)]
pub struct Compiler {
    resolver: ModuleResolver,
    package_set: String,
}

impl Compiler {
    /// Compiler resolving files with `resolver`
    pub fn new(resolver: ModuleResolver) -> Self {
        Self {
            resolver,
            package_set: DEFAULT_PACKAGE_SET.to_string(),
        }
    }

    /// Use `expression` as the default package set
    pub fn with_package_set(mut self, expression: impl Into<String>) -> Self {
        self.package_set = expression.into();
        self
    }

    /// Evaluate `module` and compile the selected package
    pub fn compile_module(
        &self,
        module: &dyn RecipeModule,
        options: &CompilationOptions,
    ) -> Result<CompiledExpression> {
        tracing::debug!(
            "Compiling '{}' from {}",
            options.attribute,
            module.describe()
        );

        let export = module
            .export(&Args::new(), &options.attribute)
            .map_err(|e| match e {
                // Selecting a package the module lacks is a caller mistake
                e @ nixkit_core::Error::AttributeNotFound { .. } => Error::usage(e.to_string()),
                other => Error::from(other),
            })?;
        let export = match (export.readiness(), options.asynchronous_modules) {
            (Readiness::Deferred, false) => {
                return Err(Error::usage(format!(
                    "package '{}' is defined asynchronously; use --async",
                    options.attribute
                )));
            }
            (Readiness::Ready, true) => export.into_deferred(),
            _ => export,
        };

        self.compile_export(&export, options)
    }

    /// Compile an already exported value
    pub fn compile_export(
        &self,
        export: &ModuleExport,
        options: &CompilationOptions,
    ) -> Result<CompiledExpression> {
        let style = Style::from_pretty(options.format_pretty);
        let assembler = Assembler::new(self.package_set.clone(), style);

        let body = Emitter::new(&self.resolver, style).emit_at(export.value(), assembler.body_depth())?;
        let text = assembler.assemble(&body, export.readiness(), &options.attribute);
        let hash = content_hash(&text);

        tracing::debug!(
            "Generated {} bytes for '{}' (sha256 {})",
            text.len(),
            options.attribute,
            &hash[..12]
        );

        Ok(CompiledExpression {
            attribute: options.attribute.clone(),
            readiness: export.readiness(),
            text,
            hash,
        })
    }
}

/// An assembled expression, ready to print or build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpression {
    /// Selected package
    pub attribute: AttrPath,

    /// Whether the package went through the deferred wrapper
    pub readiness: Readiness,

    /// Complete Nix source
    pub text: String,

    /// SHA-256 of `text`, hex encoded
    pub hash: String,
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
