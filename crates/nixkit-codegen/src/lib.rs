//! nixkit Code Generation
//!
//! This crate turns recipe value graphs into Nix expressions and drives
//! `nix-build` on the result.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌─────────┐     ┌──────────┐     ┌─────────┐     ┌──────────┐     ┌───────────┐
//! │ Recipe  │────▶│ Classify │────▶│  Emit   │────▶│ Assemble │────▶│ nix-build │
//! │ Module  │     │ (+cycles)│     │ (text)  │     │ (header) │     │ (process) │
//! └─────────┘     └──────────┘     └─────────┘     └──────────┘     └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nixkit_codegen::{CompilationOptions, Compiler, ModuleResolver};
//! use nixkit_core::YamlModule;
//!
//! let compiler = Compiler::new(ModuleResolver::from_current_dir()?);
//! let module = YamlModule::load("pkgs.yaml")?;
//! let expression = compiler.compile_module(&module, &CompilationOptions::new("hello")?)?;
//! print!("{}", expression.text);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assemble;
pub mod build;
pub mod classify;
pub mod compiler;
pub mod emit;
pub mod error;
pub mod options;
pub mod resolver;
pub mod syntax;

pub use assemble::Assembler;
pub use build::{BuildResult, BuildState, BuilderSettings, Orchestrator};
pub use classify::{Classifier, Rule, ValuePath};
pub use compiler::{CompiledExpression, Compiler};
pub use emit::{Emitter, Style};
pub use error::{Error, Result};
pub use options::{BuildOptions, CompilationOptions, OutLink};
pub use resolver::ModuleResolver;
